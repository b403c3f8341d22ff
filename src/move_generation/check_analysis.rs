//! Check, pin, and attack-mask analysis for the side to move.
//!
//! Checkers are found by symmetric attack reuse: attacks computed *from* the
//! defending king's square as each piece type, intersected with the enemy
//! bitboard of that type. Pins are found by x-raying from the king along the
//! slider lines with the exactly-one-own-blocker rule.

use crate::game_state::chess_types::*;
use crate::move_generation::move_generator::{MoveGenResult, MoveGenerationError};
use crate::moves::king_moves::king_attacks;
use crate::moves::knight_moves::knight_attacks;
use crate::moves::magic_moves::MagicTables;
use crate::moves::pawn_moves::pawn_attacks;

/// Three-state check model driving the legal move filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    None,
    /// Exactly one checker. `restriction` is the set of squares a non-king
    /// move may target: the checker itself, plus (for sliders) the squares
    /// between checker and king.
    Single { restriction: u64 },
    /// Two checkers; only king moves can resolve.
    Double,
}

/// Full analysis of the defending side's tactical constraints.
#[derive(Debug, Clone)]
pub struct CheckAnalysis {
    pub check_state: CheckState,
    pub checkers: u64,
    /// Squares holding absolutely pinned defenders.
    pub pinned: u64,
    /// Per-square movement restriction: the pin ray (pinner included) for
    /// pinned squares, all-ones everywhere else.
    pub pin_rays: [u64; 64],
    /// Every square the opponent attacks, computed with the defending king
    /// removed from occupancy so the king cannot retreat along a checking ray.
    pub attacked: u64,
}

/// Bitboard of enemy pieces giving check to `defender`'s king.
pub fn checkers(
    tables: &MagicTables,
    game_state: &GameState,
    defender: Color,
    king_square: Square,
) -> u64 {
    let enemy = defender.opposite();
    let enemy_pieces = &game_state.pieces[enemy.index()];
    let occ = game_state.occupancy_all;

    let mut out = 0u64;
    out |= knight_attacks(king_square) & enemy_pieces[PieceKind::Knight.index()];
    out |= pawn_attacks(defender, king_square) & enemy_pieces[PieceKind::Pawn.index()];
    out |= tables.rook_attacks(king_square, occ)
        & (enemy_pieces[PieceKind::Rook.index()] | enemy_pieces[PieceKind::Queen.index()]);
    out |= tables.bishop_attacks(king_square, occ)
        & (enemy_pieces[PieceKind::Bishop.index()] | enemy_pieces[PieceKind::Queen.index()]);
    out
}

/// Whether `color`'s king is currently attacked.
pub fn is_king_in_check(
    tables: &MagicTables,
    game_state: &GameState,
    color: Color,
) -> MoveGenResult<bool> {
    let king_square = game_state
        .king_square(color)
        .ok_or_else(|| MoveGenerationError::InvalidState(format!("{color:?} has no king")))?;
    Ok(checkers(tables, game_state, color, king_square) != 0)
}

/// Union of every square the `attacker` side attacks against `occupancy`.
pub fn attack_mask(
    tables: &MagicTables,
    game_state: &GameState,
    attacker: Color,
    occupancy: u64,
) -> u64 {
    let pieces = &game_state.pieces[attacker.index()];
    let mut out = 0u64;

    let mut pawns = pieces[PieceKind::Pawn.index()];
    while pawns != 0 {
        let sq = pawns.trailing_zeros() as Square;
        out |= pawn_attacks(attacker, sq);
        pawns &= pawns - 1;
    }

    let mut knights = pieces[PieceKind::Knight.index()];
    while knights != 0 {
        let sq = knights.trailing_zeros() as Square;
        out |= knight_attacks(sq);
        knights &= knights - 1;
    }

    let mut bishops = pieces[PieceKind::Bishop.index()] | pieces[PieceKind::Queen.index()];
    while bishops != 0 {
        let sq = bishops.trailing_zeros() as Square;
        out |= tables.bishop_attacks(sq, occupancy);
        bishops &= bishops - 1;
    }

    let mut rooks = pieces[PieceKind::Rook.index()] | pieces[PieceKind::Queen.index()];
    while rooks != 0 {
        let sq = rooks.trailing_zeros() as Square;
        out |= tables.rook_attacks(sq, occupancy);
        rooks &= rooks - 1;
    }

    let mut kings = pieces[PieceKind::King.index()];
    while kings != 0 {
        let sq = kings.trailing_zeros() as Square;
        out |= king_attacks(sq);
        kings &= kings - 1;
    }

    out
}

/// Analyze checks, pins, and the opponent attack mask for the side to move.
pub fn analyze(tables: &MagicTables, game_state: &GameState) -> MoveGenResult<CheckAnalysis> {
    let defender = game_state.side_to_move;
    let enemy = defender.opposite();
    let king_square = game_state
        .king_square(defender)
        .ok_or_else(|| MoveGenerationError::InvalidState(format!("{defender:?} has no king")))?;

    let checker_bb = checkers(tables, game_state, defender, king_square);
    let check_state = match checker_bb.count_ones() {
        0 => CheckState::None,
        1 => {
            let checker_sq = checker_bb.trailing_zeros() as Square;
            let restriction = checker_bb | tables.ray_between(king_square, checker_sq);
            CheckState::Single { restriction }
        }
        _ => CheckState::Double,
    };

    let (pinned, pin_rays) = compute_pins(tables, game_state, defender, king_square);

    // Occupancy without the defending king: a checked king must not be able
    // to step one square further along the checking ray.
    let occ_without_king = game_state.occupancy_all & !(1u64 << king_square);
    let attacked = attack_mask(tables, game_state, enemy, occ_without_king);

    Ok(CheckAnalysis {
        check_state,
        checkers: checker_bb,
        pinned,
        pin_rays,
        attacked,
    })
}

fn compute_pins(
    tables: &MagicTables,
    game_state: &GameState,
    defender: Color,
    king_square: Square,
) -> (u64, [u64; 64]) {
    let enemy = defender.opposite();
    let enemy_pieces = &game_state.pieces[enemy.index()];
    let own_occ = game_state.occupancy_by_color[defender.index()];
    let occ = game_state.occupancy_all;

    let mut pinned = 0u64;
    let mut pin_rays = [!0u64; 64];

    let rook_like =
        enemy_pieces[PieceKind::Rook.index()] | enemy_pieces[PieceKind::Queen.index()];
    let bishop_like =
        enemy_pieces[PieceKind::Bishop.index()] | enemy_pieces[PieceKind::Queen.index()];

    // Candidate pinners sit on the king's slider lines through an empty board.
    let mut candidates = (tables.rook_attacks(king_square, 0) & rook_like)
        | (tables.bishop_attacks(king_square, 0) & bishop_like);

    while candidates != 0 {
        let pinner_sq = candidates.trailing_zeros() as Square;
        candidates &= candidates - 1;

        let between = tables.ray_between(king_square, pinner_sq);
        let blockers = between & occ;
        if blockers.count_ones() == 1 && (blockers & own_occ) != 0 {
            let pinned_sq = blockers.trailing_zeros() as Square;
            pinned |= blockers;
            pin_rays[pinned_sq as usize] = between | (1u64 << pinner_sq);
        }
    }

    (pinned, pin_rays)
}
