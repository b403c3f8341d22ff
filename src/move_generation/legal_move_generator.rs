//! Legal move generation by mask filtering.
//!
//! No apply-and-test: pseudo-legal destination sets from the attack tables
//! are intersected with the pin rays and the single-check restriction mask,
//! so every emitted move is legal by construction. The only simulation left
//! is the en-passant discovered-check probe, which edits a copy of the
//! occupancy bitboard and never touches the game state.

use crate::game_state::chess_types::*;
use crate::move_generation::check_analysis::{analyze, CheckAnalysis, CheckState};
use crate::move_generation::move_generator::MoveGenResult;
use crate::moves::king_moves::king_attacks;
use crate::moves::knight_moves::knight_attacks;
use crate::moves::magic_moves::MagicTables;
use crate::moves::move_descriptions::{
    pack_move_description, FLAG_CAPTURE, FLAG_CASTLING, FLAG_DOUBLE_PAWN_PUSH, FLAG_EN_PASSANT,
};
use crate::moves::pawn_moves::{pawn_attacks, pawn_promotion_rank, pawn_pushes, pawn_start_rank};

// Castling geometry. Transit sets include the king's destination square;
// queenside additionally requires b1/b8 empty even though the king never
// crosses it.
const LIGHT_KINGSIDE_TRANSIT: u64 = 0x60; // f1, g1
const LIGHT_QUEENSIDE_EMPTY: u64 = 0x0E; // b1, c1, d1
const LIGHT_QUEENSIDE_TRANSIT: u64 = 0x0C; // c1, d1
const DARK_KINGSIDE_TRANSIT: u64 = LIGHT_KINGSIDE_TRANSIT << 56;
const DARK_QUEENSIDE_EMPTY: u64 = LIGHT_QUEENSIDE_EMPTY << 56;
const DARK_QUEENSIDE_TRANSIT: u64 = LIGHT_QUEENSIDE_TRANSIT << 56;

const PROMOTION_KINDS: [PieceKind; 4] = [
    PieceKind::Queen,
    PieceKind::Rook,
    PieceKind::Bishop,
    PieceKind::Knight,
];

/// Every legal move for the side to move.
pub fn generate_legal_moves(
    tables: &MagicTables,
    game_state: &GameState,
) -> MoveGenResult<Vec<u64>> {
    generate_filtered(tables, game_state, false)
}

/// Captures, promotions, and en-passant only. Same legality pipeline with
/// destinations additionally intersected with enemy occupancy.
pub fn generate_quiescence_moves(
    tables: &MagicTables,
    game_state: &GameState,
) -> MoveGenResult<Vec<u64>> {
    generate_filtered(tables, game_state, true)
}

fn generate_filtered(
    tables: &MagicTables,
    game_state: &GameState,
    captures_only: bool,
) -> MoveGenResult<Vec<u64>> {
    let analysis = analyze(tables, game_state)?;
    let own = game_state.side_to_move;
    let enemy = own.opposite();
    let own_occ = game_state.occupancy_by_color[own.index()];
    let enemy_occ = game_state.occupancy_by_color[enemy.index()];
    let occ = game_state.occupancy_all;

    let mut moves = Vec::with_capacity(48);

    generate_king_moves(game_state, &analysis, captures_only, enemy_occ, &mut moves);

    let check_mask = match analysis.check_state {
        CheckState::None => !0u64,
        CheckState::Single { restriction } => restriction,
        // Only the king may move out of a double check.
        CheckState::Double => return Ok(moves),
    };

    let own_pieces = &game_state.pieces[own.index()];

    let mut knights = own_pieces[PieceKind::Knight.index()];
    while knights != 0 {
        let from = knights.trailing_zeros() as Square;
        knights &= knights - 1;

        // A pinned knight can never stay on its pin ray, so the AND below
        // empties its destination set.
        let mut dests =
            knight_attacks(from) & !own_occ & check_mask & analysis.pin_rays[from as usize];
        if captures_only {
            dests &= enemy_occ;
        }
        push_piece_moves(game_state, from, PieceKind::Knight, dests, &mut moves);
    }

    for (piece, attack_fn) in [
        (
            PieceKind::Bishop,
            MagicTables::bishop_attacks as fn(&MagicTables, Square, u64) -> u64,
        ),
        (PieceKind::Rook, MagicTables::rook_attacks),
        (PieceKind::Queen, MagicTables::queen_attacks),
    ] {
        let mut sliders = own_pieces[piece.index()];
        while sliders != 0 {
            let from = sliders.trailing_zeros() as Square;
            sliders &= sliders - 1;

            let mut dests = attack_fn(tables, from, occ)
                & !own_occ
                & check_mask
                & analysis.pin_rays[from as usize];
            if captures_only {
                dests &= enemy_occ;
            }
            push_piece_moves(game_state, from, piece, dests, &mut moves);
        }
    }

    generate_pawn_moves(
        tables,
        game_state,
        &analysis,
        check_mask,
        captures_only,
        &mut moves,
    );

    if !captures_only && analysis.check_state == CheckState::None {
        generate_castling_moves(game_state, &analysis, &mut moves);
    }

    Ok(moves)
}

fn generate_king_moves(
    game_state: &GameState,
    analysis: &CheckAnalysis,
    captures_only: bool,
    enemy_occ: u64,
    moves: &mut Vec<u64>,
) {
    let own = game_state.side_to_move;
    let Some(king_square) = game_state.king_square(own) else {
        return;
    };
    let own_occ = game_state.occupancy_by_color[own.index()];

    let mut dests = king_attacks(king_square) & !own_occ & !analysis.attacked;
    if captures_only {
        dests &= enemy_occ;
    }
    push_piece_moves(game_state, king_square, PieceKind::King, dests, moves);
}

fn push_piece_moves(
    game_state: &GameState,
    from: Square,
    piece: PieceKind,
    mut dests: u64,
    moves: &mut Vec<u64>,
) {
    while dests != 0 {
        let to = dests.trailing_zeros() as Square;
        dests &= dests - 1;

        let captured = game_state.piece_at[to as usize];
        let flags = if captured.is_some() { FLAG_CAPTURE } else { 0 };
        moves.push(pack_move_description(from, to, piece, captured, None, flags));
    }
}

fn generate_pawn_moves(
    tables: &MagicTables,
    game_state: &GameState,
    analysis: &CheckAnalysis,
    check_mask: u64,
    captures_only: bool,
    moves: &mut Vec<u64>,
) {
    let own = game_state.side_to_move;
    let enemy = own.opposite();
    let enemy_occ = game_state.occupancy_by_color[enemy.index()];
    let occ = game_state.occupancy_all;
    let promotion_rank = pawn_promotion_rank(own);
    let start_rank = pawn_start_rank(own);

    let mut pawns = game_state.pieces[own.index()][PieceKind::Pawn.index()];
    while pawns != 0 {
        let from = pawns.trailing_zeros() as Square;
        pawns &= pawns - 1;
        let pin_ray = analysis.pin_rays[from as usize];

        // Pushes.
        let single = pawn_pushes(own, from) & !occ;
        let mut push_dests = single;
        if single != 0 && from / 8 == start_rank {
            let single_sq = single.trailing_zeros() as Square;
            push_dests |= pawn_pushes(own, single_sq) & !occ;
        }
        push_dests &= check_mask & pin_ray;
        if captures_only {
            // Quiescence keeps only promoting pushes.
            push_dests &= rank_mask(promotion_rank);
        }

        let mut dests = push_dests;
        while dests != 0 {
            let to = dests.trailing_zeros() as Square;
            dests &= dests - 1;

            if to / 8 == promotion_rank {
                for promo in PROMOTION_KINDS {
                    moves.push(pack_move_description(
                        from,
                        to,
                        PieceKind::Pawn,
                        None,
                        Some(promo),
                        0,
                    ));
                }
            } else {
                let flags = if from.abs_diff(to) == 16 {
                    FLAG_DOUBLE_PAWN_PUSH
                } else {
                    0
                };
                moves.push(pack_move_description(
                    from,
                    to,
                    PieceKind::Pawn,
                    None,
                    None,
                    flags,
                ));
            }
        }

        // Captures.
        let mut captures = pawn_attacks(own, from) & enemy_occ & check_mask & pin_ray;
        while captures != 0 {
            let to = captures.trailing_zeros() as Square;
            captures &= captures - 1;

            let captured = game_state.piece_at[to as usize];
            if to / 8 == promotion_rank {
                for promo in PROMOTION_KINDS {
                    moves.push(pack_move_description(
                        from,
                        to,
                        PieceKind::Pawn,
                        captured,
                        Some(promo),
                        FLAG_CAPTURE,
                    ));
                }
            } else {
                moves.push(pack_move_description(
                    from,
                    to,
                    PieceKind::Pawn,
                    captured,
                    None,
                    FLAG_CAPTURE,
                ));
            }
        }

        // En-passant.
        if let Some(ep_square) = game_state.en_passant_square {
            if (pawn_attacks(own, from) & (1u64 << ep_square)) != 0 {
                generate_en_passant_move(tables, game_state, analysis, from, ep_square, moves);
            }
        }
    }
}

/// En-passant bypasses the check mask: the captured pawn may itself be the
/// checker. Legality is settled by simulating the post-capture occupancy and
/// probing both slider families from the king.
fn generate_en_passant_move(
    tables: &MagicTables,
    game_state: &GameState,
    analysis: &CheckAnalysis,
    from: Square,
    ep_square: Square,
    moves: &mut Vec<u64>,
) {
    let own = game_state.side_to_move;
    let enemy = own.opposite();
    let captured_square = match own {
        Color::Light => ep_square - 8,
        Color::Dark => ep_square + 8,
    };

    if let CheckState::Single { restriction } = analysis.check_state {
        let captures_checker = (analysis.checkers & (1u64 << captured_square)) != 0;
        let blocks_check = (restriction & (1u64 << ep_square)) != 0;
        if !captures_checker && !blocks_check {
            return;
        }
    }

    let Some(king_square) = game_state.king_square(own) else {
        return;
    };

    // Both pawns leave their rank at once; rebuild occupancy and look for a
    // discovered slider attack on the king.
    let simulated_occ =
        (game_state.occupancy_all & !(1u64 << from) & !(1u64 << captured_square))
            | (1u64 << ep_square);

    let enemy_pieces = &game_state.pieces[enemy.index()];
    let rook_like = enemy_pieces[PieceKind::Rook.index()] | enemy_pieces[PieceKind::Queen.index()];
    let bishop_like =
        enemy_pieces[PieceKind::Bishop.index()] | enemy_pieces[PieceKind::Queen.index()];

    if (tables.rook_attacks(king_square, simulated_occ) & rook_like) != 0 {
        return;
    }
    if (tables.bishop_attacks(king_square, simulated_occ) & bishop_like) != 0 {
        return;
    }

    moves.push(pack_move_description(
        from,
        ep_square,
        PieceKind::Pawn,
        Some(PieceKind::Pawn),
        None,
        FLAG_CAPTURE | FLAG_EN_PASSANT,
    ));
}

fn generate_castling_moves(game_state: &GameState, analysis: &CheckAnalysis, moves: &mut Vec<u64>) {
    let occ = game_state.occupancy_all;
    let attacked = analysis.attacked;
    let rights = game_state.castling_rights;

    match game_state.side_to_move {
        Color::Light => {
            let rooks = game_state.pieces[Color::Light.index()][PieceKind::Rook.index()];
            if (rights & CASTLE_LIGHT_KINGSIDE) != 0
                && (occ & LIGHT_KINGSIDE_TRANSIT) == 0
                && (attacked & LIGHT_KINGSIDE_TRANSIT) == 0
                && (rooks & (1u64 << 7)) != 0
            {
                moves.push(pack_move_description(
                    4,
                    6,
                    PieceKind::King,
                    None,
                    None,
                    FLAG_CASTLING,
                ));
            }
            if (rights & CASTLE_LIGHT_QUEENSIDE) != 0
                && (occ & LIGHT_QUEENSIDE_EMPTY) == 0
                && (attacked & LIGHT_QUEENSIDE_TRANSIT) == 0
                && (rooks & 1u64) != 0
            {
                moves.push(pack_move_description(
                    4,
                    2,
                    PieceKind::King,
                    None,
                    None,
                    FLAG_CASTLING,
                ));
            }
        }
        Color::Dark => {
            let rooks = game_state.pieces[Color::Dark.index()][PieceKind::Rook.index()];
            if (rights & CASTLE_DARK_KINGSIDE) != 0
                && (occ & DARK_KINGSIDE_TRANSIT) == 0
                && (attacked & DARK_KINGSIDE_TRANSIT) == 0
                && (rooks & (1u64 << 63)) != 0
            {
                moves.push(pack_move_description(
                    60,
                    62,
                    PieceKind::King,
                    None,
                    None,
                    FLAG_CASTLING,
                ));
            }
            if (rights & CASTLE_DARK_QUEENSIDE) != 0
                && (occ & DARK_QUEENSIDE_EMPTY) == 0
                && (attacked & DARK_QUEENSIDE_TRANSIT) == 0
                && (rooks & (1u64 << 56)) != 0
            {
                moves.push(pack_move_description(
                    60,
                    58,
                    PieceKind::King,
                    None,
                    None,
                    FLAG_CASTLING,
                ));
            }
        }
    }
}

#[inline]
fn rank_mask(rank: u8) -> u64 {
    0xFFu64 << (u64::from(rank) * 8)
}

#[cfg(test)]
mod tests {
    use super::{generate_legal_moves, generate_quiescence_moves};
    use crate::game_state::chess_types::{Color, PieceKind};
    use crate::game_state::game_state::GameState;
    use crate::move_generation::check_analysis::is_king_in_check;
    use crate::moves::magic_moves::MagicTables;
    use crate::moves::move_descriptions::{
        move_from, move_is_capture, move_moved_piece, move_promotion_piece, move_to,
        FLAG_CASTLING, FLAG_EN_PASSANT,
    };

    #[test]
    fn starting_position_has_twenty_moves() {
        let tables = MagicTables::new();
        let game = GameState::new_game();
        let moves = generate_legal_moves(&tables, &game).expect("generation should succeed");
        assert_eq!(moves.len(), 20);
    }

    #[test]
    fn double_check_allows_only_king_moves() {
        let tables = MagicTables::new();
        let game =
            GameState::from_fen("4r2k/8/8/8/7b/8/8/4K3 w - - 0 1").expect("FEN should parse");
        let moves = generate_legal_moves(&tables, &game).expect("generation should succeed");
        assert!(!moves.is_empty());
        assert!(moves
            .iter()
            .all(|&mv| move_moved_piece(mv) == Some(PieceKind::King)));
    }

    #[test]
    fn checkmate_yields_no_moves_while_in_check() {
        let tables = MagicTables::new();
        // Back-rank mate.
        let game =
            GameState::from_fen("R5k1/5ppp/8/8/8/8/8/6K1 b - - 0 1").expect("FEN should parse");
        let in_check =
            is_king_in_check(&tables, &game, Color::Dark).expect("check test should succeed");
        let moves = generate_legal_moves(&tables, &game).expect("generation should succeed");
        assert!(in_check);
        assert!(moves.is_empty());
    }

    #[test]
    fn stalemate_yields_no_moves_without_check() {
        let tables = MagicTables::new();
        let game =
            GameState::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").expect("FEN should parse");
        let in_check =
            is_king_in_check(&tables, &game, Color::Dark).expect("check test should succeed");
        let moves = generate_legal_moves(&tables, &game).expect("generation should succeed");
        assert!(!in_check);
        assert!(moves.is_empty());
    }

    #[test]
    fn pinned_rook_stays_on_its_file() {
        let tables = MagicTables::new();
        let game =
            GameState::from_fen("4r2k/8/8/8/8/8/4R3/4K3 w - - 0 1").expect("FEN should parse");
        let moves = generate_legal_moves(&tables, &game).expect("generation should succeed");

        let mut rook_moves = 0usize;
        for &mv in &moves {
            if move_from(mv) == 12 {
                rook_moves += 1;
                assert_eq!(move_to(mv) % 8, 4, "pinned rook left the e-file");
            }
        }
        assert!(rook_moves > 0);
    }

    #[test]
    fn en_passant_fixture_counts_seven_moves() {
        let tables = MagicTables::new();
        let game =
            GameState::from_fen("k7/8/8/3pP3/8/8/8/4K3 w - d6 0 1").expect("FEN should parse");
        let moves = generate_legal_moves(&tables, &game).expect("generation should succeed");
        assert_eq!(moves.len(), 7);
        assert_eq!(
            moves
                .iter()
                .filter(|&&mv| (mv & FLAG_EN_PASSANT) != 0)
                .count(),
            1
        );
    }

    #[test]
    fn en_passant_rejected_when_it_uncovers_a_rank_attack() {
        let tables = MagicTables::new();
        // Black pawn on e4 could take d3 en passant, but both pawns leaving
        // rank 4 exposes the black king on a4 to the queen on h4.
        let game =
            GameState::from_fen("8/8/8/8/k2Pp2Q/8/8/4K3 b - d3 0 1").expect("FEN should parse");
        let moves = generate_legal_moves(&tables, &game).expect("generation should succeed");
        assert!(moves.iter().all(|&mv| (mv & FLAG_EN_PASSANT) == 0));
    }

    #[test]
    fn en_passant_may_capture_a_checking_pawn() {
        let tables = MagicTables::new();
        // Black's d7-d5 double push checks the king on e4; exd6 en passant
        // removes the checker and must be generated.
        let game =
            GameState::from_fen("k7/8/8/3pP3/4K3/8/8/8 w - d6 0 1").expect("FEN should parse");
        let moves = generate_legal_moves(&tables, &game).expect("generation should succeed");
        assert!(moves.iter().any(|&mv| (mv & FLAG_EN_PASSANT) != 0));
    }

    #[test]
    fn castling_both_wings_when_paths_are_clear() {
        let tables = MagicTables::new();
        let game = GameState::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1")
            .expect("FEN should parse");
        let moves = generate_legal_moves(&tables, &game).expect("generation should succeed");
        let castles = moves
            .iter()
            .filter(|&&mv| (mv & FLAG_CASTLING) != 0)
            .count();
        assert_eq!(castles, 2);
    }

    #[test]
    fn castling_blocked_by_attacked_transit_square() {
        let tables = MagicTables::new();
        // Black rook on f4 covers f1: kingside is out, queenside stays.
        let game = GameState::from_fen("r3k2r/8/8/8/5r2/8/8/R3K2R w KQkq - 0 1")
            .expect("FEN should parse");
        let moves = generate_legal_moves(&tables, &game).expect("generation should succeed");
        let castles: Vec<u64> = moves
            .iter()
            .copied()
            .filter(|&mv| (mv & FLAG_CASTLING) != 0)
            .collect();
        assert_eq!(castles.len(), 1);
        assert_eq!(move_to(castles[0]), 2);
    }

    #[test]
    fn quiescence_moves_equal_the_noisy_subset_of_full_generation() {
        let tables = MagicTables::new();
        let fens = [
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "k7/8/8/3pP3/8/8/8/4K3 w - d6 0 1",
            "8/P7/8/8/8/8/8/k6K w - - 0 1",
            "4r2k/8/8/8/7b/8/8/4K3 w - - 0 1",
        ];

        for fen in fens {
            let game = GameState::from_fen(fen).expect("FEN should parse");
            let mut noisy: Vec<u64> = generate_legal_moves(&tables, &game)
                .expect("generation should succeed")
                .into_iter()
                .filter(|&mv| move_is_capture(mv) || move_promotion_piece(mv).is_some())
                .collect();
            let mut quiescence =
                generate_quiescence_moves(&tables, &game).expect("generation should succeed");

            noisy.sort_unstable();
            quiescence.sort_unstable();
            assert_eq!(quiescence, noisy, "noisy-move mismatch for {fen}");
        }
    }

    #[test]
    fn quiescence_variant_keeps_promotions_and_drops_quiets() {
        let tables = MagicTables::new();
        let game = GameState::from_fen("8/P7/8/8/8/8/8/k6K w - - 0 1").expect("FEN should parse");
        let moves = generate_quiescence_moves(&tables, &game).expect("generation should succeed");
        // Four promotion pieces, nothing else.
        assert_eq!(moves.len(), 4);
        assert!(moves
            .iter()
            .all(|&mv| move_from(mv) == 48 && move_to(mv) == 56));
    }
}
