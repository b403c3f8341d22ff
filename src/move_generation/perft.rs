//! Perft node counting over the make/unmake engine.
//!
//! Used as the correctness oracle for the whole movement stack: any fault in
//! generation, application, or unmake shows up as a node-count mismatch
//! against the published reference values.

use crate::game_state::game_state::GameState;
use crate::move_generation::legal_move_apply::{make_move_in_place, unmake_move_in_place};
use crate::move_generation::legal_move_generator::generate_legal_moves;
use crate::move_generation::move_generator::{MoveGenResult, MoveGenerationError};
use crate::moves::magic_moves::MagicTables;
use crate::moves::move_descriptions::{
    move_promotion_piece_code, FLAG_CAPTURE, FLAG_CASTLING, FLAG_EN_PASSANT, NO_PIECE_CODE,
};
use crate::search::zobrist::ZobristTable;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerftCounts {
    pub nodes: u64,
    pub captures: u64,
    pub en_passant: u64,
    pub castles: u64,
    pub promotions: u64,
}

/// Walk the move tree to `depth`, counting leaves and classifying the moves
/// that reached them.
pub fn perft(
    tables: &MagicTables,
    zobrist: &ZobristTable,
    game_state: &mut GameState,
    depth: u8,
) -> MoveGenResult<PerftCounts> {
    let mut counts = PerftCounts {
        nodes: 0,
        ..PerftCounts::default()
    };

    if depth == 0 {
        counts.nodes = 1;
        return Ok(counts);
    }

    perft_recurse(tables, zobrist, game_state, depth, &mut counts)?;
    Ok(counts)
}

fn perft_recurse(
    tables: &MagicTables,
    zobrist: &ZobristTable,
    game_state: &mut GameState,
    depth: u8,
    counts: &mut PerftCounts,
) -> MoveGenResult<()> {
    let moves = generate_legal_moves(tables, game_state)?;

    if depth == 1 {
        counts.nodes += moves.len() as u64;
        for &mv in &moves {
            if (mv & FLAG_CAPTURE) != 0 {
                counts.captures += 1;
            }
            if (mv & FLAG_EN_PASSANT) != 0 {
                counts.en_passant += 1;
            }
            if (mv & FLAG_CASTLING) != 0 {
                counts.castles += 1;
            }
            if move_promotion_piece_code(mv) != NO_PIECE_CODE {
                counts.promotions += 1;
            }
        }
        return Ok(());
    }

    for mv in moves {
        make_move_in_place(game_state, zobrist, mv).map_err(MoveGenerationError::InvalidState)?;
        let walked = perft_recurse(tables, zobrist, game_state, depth - 1, counts);
        unmake_move_in_place(game_state).map_err(MoveGenerationError::InvalidState)?;
        walked?;
    }

    Ok(())
}
