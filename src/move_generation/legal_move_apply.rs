//! In-place move making and unmaking.
//!
//! `make_move_in_place` mutates every derived cache incrementally (bitboards,
//! occupancy, square cache, piece lists, Zobrist key, repetition counts) and
//! pushes an `UndoState`; `unmake_move_in_place` reverses all of it exactly.
//! The incremental key must always agree with `ZobristTable::compute_key`.

use crate::game_state::{chess_types::*, game_state::GameState, undo_state::UndoState};
use crate::moves::move_descriptions::{
    move_captured_piece, move_from, move_moved_piece, move_promotion_piece, move_to, FLAG_CAPTURE,
    FLAG_CASTLING, FLAG_DOUBLE_PAWN_PUSH, FLAG_EN_PASSANT,
};
use crate::search::zobrist::ZobristTable;

/// Apply a legal move description to the state.
///
/// The move must come from the legal generator for this exact position;
/// a stale or malformed description is reported as `Err` with the state
/// left untouched only up to the first validation.
pub fn make_move_in_place(
    game_state: &mut GameState,
    zobrist: &ZobristTable,
    move_description: u64,
) -> Result<(), String> {
    let from = move_from(move_description);
    let to = move_to(move_description);
    let from_mask = 1u64 << from;
    let to_mask = 1u64 << to;

    let own = game_state.side_to_move;
    let enemy = own.opposite();

    let moved_piece = move_moved_piece(move_description)
        .ok_or_else(|| format!("move description {move_description:#x} has no moved piece"))?;
    if game_state.piece_at[from as usize] != Some(moved_piece)
        || (game_state.occupancy_by_color[own.index()] & from_mask) == 0
    {
        return Err(format!(
            "no {own:?} {moved_piece:?} on square {from} to move"
        ));
    }

    let undo = UndoState {
        mv: move_description,
        moved_piece,
        captured_piece: move_captured_piece(move_description),
        prev_castling_rights: game_state.castling_rights,
        prev_en_passant_square: game_state.en_passant_square,
        prev_halfmove_clock: game_state.halfmove_clock,
        prev_zobrist_key: game_state.zobrist_key,
    };

    let mut key = game_state.zobrist_key;

    // Lift the mover off its origin square.
    game_state.pieces[own.index()][moved_piece.index()] &= !from_mask;
    game_state.occupancy_by_color[own.index()] &= !from_mask;
    game_state.piece_at[from as usize] = None;
    key ^= zobrist.piece_square_key(own, moved_piece, from);

    // Remove the captured piece, if any.
    if (move_description & FLAG_EN_PASSANT) != 0 {
        let capture_sq = match own {
            Color::Light => to - 8,
            Color::Dark => to + 8,
        };
        let capture_mask = 1u64 << capture_sq;
        game_state.pieces[enemy.index()][PieceKind::Pawn.index()] &= !capture_mask;
        game_state.occupancy_by_color[enemy.index()] &= !capture_mask;
        game_state.piece_at[capture_sq as usize] = None;
        game_state.list_remove(enemy, PieceKind::Pawn, capture_sq)?;
        key ^= zobrist.piece_square_key(enemy, PieceKind::Pawn, capture_sq);
    } else if (move_description & FLAG_CAPTURE) != 0 {
        let captured = undo
            .captured_piece
            .ok_or_else(|| format!("capture move {move_description:#x} names no captured piece"))?;
        game_state.pieces[enemy.index()][captured.index()] &= !to_mask;
        game_state.occupancy_by_color[enemy.index()] &= !to_mask;
        game_state.list_remove(enemy, captured, to)?;
        key ^= zobrist.piece_square_key(enemy, captured, to);
    }

    // Drop the mover (or its promotion) onto the destination.
    let promotion = move_promotion_piece(move_description);
    let placed = promotion.unwrap_or(moved_piece);
    game_state.pieces[own.index()][placed.index()] |= to_mask;
    game_state.occupancy_by_color[own.index()] |= to_mask;
    game_state.piece_at[to as usize] = Some(placed);
    key ^= zobrist.piece_square_key(own, placed, to);

    if promotion.is_some() {
        game_state.list_remove(own, PieceKind::Pawn, from)?;
        game_state.list_add(own, placed, to);
    } else {
        game_state.list_move(own, moved_piece, from, to)?;
    }

    // Relocate the rook on castling.
    if (move_description & FLAG_CASTLING) != 0 {
        let (rook_from, rook_to) = match (own, from, to) {
            (Color::Light, 4, 6) => (7u8, 5u8),
            (Color::Light, 4, 2) => (0, 3),
            (Color::Dark, 60, 62) => (63, 61),
            (Color::Dark, 60, 58) => (56, 59),
            _ => {
                return Err(format!(
                    "malformed castling move from {from} to {to} for {own:?}"
                ))
            }
        };
        let rook_from_mask = 1u64 << rook_from;
        let rook_to_mask = 1u64 << rook_to;
        game_state.pieces[own.index()][PieceKind::Rook.index()] &= !rook_from_mask;
        game_state.pieces[own.index()][PieceKind::Rook.index()] |= rook_to_mask;
        game_state.occupancy_by_color[own.index()] &= !rook_from_mask;
        game_state.occupancy_by_color[own.index()] |= rook_to_mask;
        game_state.piece_at[rook_from as usize] = None;
        game_state.piece_at[rook_to as usize] = Some(PieceKind::Rook);
        game_state.list_move(own, PieceKind::Rook, rook_from, rook_to)?;
        key ^= zobrist.piece_square_key(own, PieceKind::Rook, rook_from);
        key ^= zobrist.piece_square_key(own, PieceKind::Rook, rook_to);
    }

    game_state.occupancy_all = game_state.occupancy_by_color[Color::Light.index()]
        | game_state.occupancy_by_color[Color::Dark.index()];

    update_castling_rights(game_state, own, from, to, moved_piece);

    // En-passant availability is hashed as a single toggle; flip it whenever
    // availability changes between positions.
    let new_en_passant = if (move_description & FLAG_DOUBLE_PAWN_PUSH) != 0 {
        Some((from + to) / 2)
    } else {
        None
    };
    if new_en_passant.is_some() != game_state.en_passant_square.is_some() {
        key ^= zobrist.en_passant_legal_key();
    }
    game_state.en_passant_square = new_en_passant;

    // Side-to-move toggle flips on every move.
    key ^= zobrist.light_to_move_key();

    if moved_piece == PieceKind::Pawn || (move_description & FLAG_CAPTURE) != 0 {
        game_state.halfmove_clock = 0;
    } else {
        game_state.halfmove_clock = game_state.halfmove_clock.saturating_add(1);
    }
    if own == Color::Dark {
        game_state.fullmove_number = game_state.fullmove_number.saturating_add(1);
    }

    game_state.side_to_move = enemy;
    game_state.ply = game_state.ply.saturating_add(1);
    game_state.zobrist_key = key;
    *game_state.repetition_counts.entry(key).or_insert(0) += 1;
    game_state.undo_stack.push(undo);

    Ok(())
}

/// Reverse the most recent `make_move_in_place`.
pub fn unmake_move_in_place(game_state: &mut GameState) -> Result<(), String> {
    let undo = game_state
        .undo_stack
        .pop()
        .ok_or("unmake called with an empty undo stack")?;

    // Drop this position from the repetition history before rewinding.
    let current_key = game_state.zobrist_key;
    match game_state.repetition_counts.get_mut(&current_key) {
        Some(count) if *count > 1 => *count -= 1,
        Some(_) => {
            game_state.repetition_counts.remove(&current_key);
        }
        None => {
            return Err(format!(
                "repetition history is missing the current key {current_key:#x}"
            ))
        }
    }

    let own = game_state.side_to_move.opposite();
    let enemy = own.opposite();
    let from = move_from(undo.mv);
    let to = move_to(undo.mv);
    let from_mask = 1u64 << from;
    let to_mask = 1u64 << to;

    let promotion = move_promotion_piece(undo.mv);
    let placed = promotion.unwrap_or(undo.moved_piece);

    // Lift the mover (or promoted piece) off the destination.
    game_state.pieces[own.index()][placed.index()] &= !to_mask;
    game_state.occupancy_by_color[own.index()] &= !to_mask;
    game_state.piece_at[to as usize] = None;

    if promotion.is_some() {
        game_state.list_remove(own, placed, to)?;
        game_state.list_add(own, PieceKind::Pawn, from);
    } else {
        game_state.list_move(own, undo.moved_piece, to, from)?;
    }

    // Put the mover back on its origin.
    game_state.pieces[own.index()][undo.moved_piece.index()] |= from_mask;
    game_state.occupancy_by_color[own.index()] |= from_mask;
    game_state.piece_at[from as usize] = Some(undo.moved_piece);

    // Restore the captured piece.
    if (undo.mv & FLAG_EN_PASSANT) != 0 {
        let capture_sq = match own {
            Color::Light => to - 8,
            Color::Dark => to + 8,
        };
        let capture_mask = 1u64 << capture_sq;
        game_state.pieces[enemy.index()][PieceKind::Pawn.index()] |= capture_mask;
        game_state.occupancy_by_color[enemy.index()] |= capture_mask;
        game_state.piece_at[capture_sq as usize] = Some(PieceKind::Pawn);
        game_state.list_add(enemy, PieceKind::Pawn, capture_sq);
    } else if (undo.mv & FLAG_CAPTURE) != 0 {
        let captured = undo
            .captured_piece
            .ok_or_else(|| format!("undo record for {:#x} names no captured piece", undo.mv))?;
        game_state.pieces[enemy.index()][captured.index()] |= to_mask;
        game_state.occupancy_by_color[enemy.index()] |= to_mask;
        game_state.piece_at[to as usize] = Some(captured);
        game_state.list_add(enemy, captured, to);
    }

    // Walk the rook back on castling.
    if (undo.mv & FLAG_CASTLING) != 0 {
        let (rook_from, rook_to) = match (own, from, to) {
            (Color::Light, 4, 6) => (7u8, 5u8),
            (Color::Light, 4, 2) => (0, 3),
            (Color::Dark, 60, 62) => (63, 61),
            (Color::Dark, 60, 58) => (56, 59),
            _ => {
                return Err(format!(
                    "malformed castling move from {from} to {to} in undo record"
                ))
            }
        };
        let rook_from_mask = 1u64 << rook_from;
        let rook_to_mask = 1u64 << rook_to;
        game_state.pieces[own.index()][PieceKind::Rook.index()] &= !rook_to_mask;
        game_state.pieces[own.index()][PieceKind::Rook.index()] |= rook_from_mask;
        game_state.occupancy_by_color[own.index()] &= !rook_to_mask;
        game_state.occupancy_by_color[own.index()] |= rook_from_mask;
        game_state.piece_at[rook_to as usize] = None;
        game_state.piece_at[rook_from as usize] = Some(PieceKind::Rook);
        game_state.list_move(own, PieceKind::Rook, rook_to, rook_from)?;
    }

    game_state.occupancy_all = game_state.occupancy_by_color[Color::Light.index()]
        | game_state.occupancy_by_color[Color::Dark.index()];

    game_state.castling_rights = undo.prev_castling_rights;
    game_state.en_passant_square = undo.prev_en_passant_square;
    game_state.halfmove_clock = undo.prev_halfmove_clock;
    game_state.zobrist_key = undo.prev_zobrist_key;
    game_state.side_to_move = own;
    game_state.ply = game_state.ply.saturating_sub(1);
    if own == Color::Dark {
        game_state.fullmove_number = game_state.fullmove_number.saturating_sub(1);
    }

    Ok(())
}

fn update_castling_rights(
    game_state: &mut GameState,
    moving_color: Color,
    from: Square,
    to: Square,
    moved_piece: PieceKind,
) {
    if moved_piece == PieceKind::King {
        if moving_color == Color::Light {
            game_state.castling_rights &= !(CASTLE_LIGHT_KINGSIDE | CASTLE_LIGHT_QUEENSIDE);
        } else {
            game_state.castling_rights &= !(CASTLE_DARK_KINGSIDE | CASTLE_DARK_QUEENSIDE);
        }
    }

    if moved_piece == PieceKind::Rook {
        match from {
            0 => game_state.castling_rights &= !CASTLE_LIGHT_QUEENSIDE,
            7 => game_state.castling_rights &= !CASTLE_LIGHT_KINGSIDE,
            56 => game_state.castling_rights &= !CASTLE_DARK_QUEENSIDE,
            63 => game_state.castling_rights &= !CASTLE_DARK_KINGSIDE,
            _ => {}
        }
    }

    // Capturing a rook on its original square also removes that right.
    match to {
        0 => game_state.castling_rights &= !CASTLE_LIGHT_QUEENSIDE,
        7 => game_state.castling_rights &= !CASTLE_LIGHT_KINGSIDE,
        56 => game_state.castling_rights &= !CASTLE_DARK_QUEENSIDE,
        63 => game_state.castling_rights &= !CASTLE_DARK_KINGSIDE,
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::{make_move_in_place, unmake_move_in_place};
    use crate::game_state::chess_types::{Color, PieceKind, CASTLE_LIGHT_KINGSIDE};
    use crate::game_state::game_state::GameState;
    use crate::move_generation::legal_move_generator::generate_legal_moves;
    use crate::moves::magic_moves::MagicTables;
    use crate::moves::move_descriptions::{move_from, move_to, FLAG_CASTLING, FLAG_EN_PASSANT};
    use crate::search::zobrist::ZobristTable;

    fn find_move(moves: &[u64], from: u8, to: u8) -> u64 {
        *moves
            .iter()
            .find(|&&mv| move_from(mv) == from && move_to(mv) == to)
            .expect("expected move should be generated")
    }

    #[test]
    fn double_push_sets_en_passant_and_matches_recompute() {
        let tables = MagicTables::new();
        let zobrist = ZobristTable::new();
        let mut game = GameState::new_game();
        let moves = generate_legal_moves(&tables, &game).expect("generation should succeed");
        let e2e4 = find_move(&moves, 12, 28);

        make_move_in_place(&mut game, &zobrist, e2e4).expect("move should apply");
        assert_eq!(game.en_passant_square, Some(20));
        assert_eq!(game.halfmove_clock, 0);
        assert_eq!(game.side_to_move, Color::Dark);
        assert_eq!(game.zobrist_key, zobrist.compute_key(&game));
        assert!(game.derived_state_is_consistent(&zobrist));
    }

    #[test]
    fn make_unmake_restores_everything() {
        let tables = MagicTables::new();
        let zobrist = ZobristTable::new();
        let mut game = GameState::new_game();
        let before_fen = game.get_fen();
        let before_key = game.zobrist_key;

        let moves = generate_legal_moves(&tables, &game).expect("generation should succeed");
        for &mv in &moves {
            make_move_in_place(&mut game, &zobrist, mv).expect("move should apply");
            unmake_move_in_place(&mut game).expect("unmake should succeed");

            assert_eq!(game.get_fen(), before_fen);
            assert_eq!(game.zobrist_key, before_key);
            assert!(game.derived_state_is_consistent(&zobrist));
        }
        assert_eq!(game.repetition_counts.get(&before_key), Some(&1));
    }

    #[test]
    fn kingside_castle_relocates_rook_and_clears_rights() {
        let tables = MagicTables::new();
        let zobrist = ZobristTable::new();
        let mut game = GameState::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1")
            .expect("FEN should parse");
        let moves = generate_legal_moves(&tables, &game).expect("generation should succeed");
        let castle = find_move(&moves, 4, 6);
        assert_ne!(castle & FLAG_CASTLING, 0);

        make_move_in_place(&mut game, &zobrist, castle).expect("move should apply");
        assert_eq!(game.piece_at[6], Some(PieceKind::King));
        assert_eq!(game.piece_at[5], Some(PieceKind::Rook));
        assert_eq!(game.piece_at[7], None);
        assert_eq!(game.castling_rights & CASTLE_LIGHT_KINGSIDE, 0);
        assert_eq!(game.zobrist_key, zobrist.compute_key(&game));

        unmake_move_in_place(&mut game).expect("unmake should succeed");
        assert_eq!(game.piece_at[4], Some(PieceKind::King));
        assert_eq!(game.piece_at[7], Some(PieceKind::Rook));
        assert_ne!(game.castling_rights & CASTLE_LIGHT_KINGSIDE, 0);
        assert!(game.derived_state_is_consistent(&zobrist));
    }

    #[test]
    fn en_passant_capture_removes_the_bypassed_pawn() {
        let tables = MagicTables::new();
        let zobrist = ZobristTable::new();
        let mut game =
            GameState::from_fen("k7/8/8/3pP3/8/8/8/4K3 w - d6 0 1").expect("FEN should parse");
        let moves = generate_legal_moves(&tables, &game).expect("generation should succeed");
        let ep = *moves
            .iter()
            .find(|&&mv| (mv & FLAG_EN_PASSANT) != 0)
            .expect("en passant should be generated");

        make_move_in_place(&mut game, &zobrist, ep).expect("move should apply");
        assert_eq!(game.piece_at[43], Some(PieceKind::Pawn)); // d6
        assert_eq!(game.piece_at[35], None); // d5 emptied
        assert_eq!(game.zobrist_key, zobrist.compute_key(&game));

        unmake_move_in_place(&mut game).expect("unmake should succeed");
        assert_eq!(game.piece_at[35], Some(PieceKind::Pawn));
        assert_eq!(game.en_passant_square, Some(43));
        assert!(game.derived_state_is_consistent(&zobrist));
    }

    #[test]
    fn promotion_swaps_the_pawn_for_the_chosen_piece() {
        let tables = MagicTables::new();
        let zobrist = ZobristTable::new();
        let mut game =
            GameState::from_fen("8/P7/8/8/8/8/8/k6K w - - 0 1").expect("FEN should parse");
        let moves = generate_legal_moves(&tables, &game).expect("generation should succeed");
        let promo = *moves
            .iter()
            .find(|&&mv| {
                crate::moves::move_descriptions::move_promotion_piece(mv)
                    == Some(PieceKind::Queen)
            })
            .expect("queen promotion should be generated");

        make_move_in_place(&mut game, &zobrist, promo).expect("move should apply");
        assert_eq!(game.piece_at[56], Some(PieceKind::Queen));
        assert_eq!(
            game.piece_squares[Color::Light.index()][PieceKind::Pawn.index()].len(),
            0
        );
        assert_eq!(game.zobrist_key, zobrist.compute_key(&game));

        unmake_move_in_place(&mut game).expect("unmake should succeed");
        assert_eq!(game.piece_at[48], Some(PieceKind::Pawn));
        assert_eq!(game.piece_at[56], None);
        assert!(game.derived_state_is_consistent(&zobrist));
    }

    #[test]
    fn repetition_counts_track_repeated_positions() {
        let tables = MagicTables::new();
        let zobrist = ZobristTable::new();
        let mut game = GameState::new_game();
        let start_key = game.zobrist_key;

        for (from, to) in [(6u8, 21u8), (62, 45), (21, 6), (45, 62)] {
            let moves = generate_legal_moves(&tables, &game).expect("generation should succeed");
            let mv = find_move(&moves, from, to);
            make_move_in_place(&mut game, &zobrist, mv).expect("move should apply");
        }

        assert_eq!(game.zobrist_key, start_key);
        assert_eq!(game.repetition_counts.get(&start_key), Some(&2));
    }

    #[test]
    fn unmake_on_fresh_state_is_an_error() {
        let mut game = GameState::new_game();
        assert!(unmake_move_in_place(&mut game).is_err());
    }
}
