//! Core incremental board state representation.
//!
//! `GameState` is the central model for the engine. Piece bitboards are the
//! canonical representation; occupancy caches, the `piece_at` square cache,
//! and the per-type piece square lists are derived state maintained
//! incrementally by make/unmake and rebuilt wholesale at FEN import.

use std::collections::HashMap;

use crate::game_state::chess_rules::STARTING_POSITION_FEN;
use crate::game_state::chess_types::*;
use crate::search::zobrist::ZobristTable;
use crate::utils::fen_generator::generate_fen;
use crate::utils::fen_parser::parse_fen;

/// Incremental game state optimized for fast move making/unmaking.
#[derive(Debug, Clone)]
pub struct GameState {
    // --- Bitboard representation (canonical) ---
    // [color][piece_kind]
    pub pieces: [[u64; 6]; 2],

    // --- Derived occupancy caches ---
    pub occupancy_by_color: [u64; 2],
    pub occupancy_all: u64,

    // --- Derived square caches ---
    pub piece_at: [Option<PieceKind>; 64],
    pub piece_squares: [[Vec<Square>; 6]; 2],

    // --- Side and state flags ---
    pub side_to_move: Color,
    pub castling_rights: CastlingRights,
    pub en_passant_square: Option<Square>,

    // --- Clocks / move counters ---
    pub halfmove_clock: u16,
    pub fullmove_number: u16,

    // --- Incremental hashing / repetition support ---
    pub zobrist_key: u64,
    pub ply: u16,
    pub repetition_counts: HashMap<u64, u32>,

    // --- Make/unmake stack ---
    pub undo_stack: Vec<UndoState>,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            pieces: [[0; 6]; 2],
            occupancy_by_color: [0; 2],
            occupancy_all: 0,

            piece_at: [None; 64],
            piece_squares: Default::default(),

            side_to_move: Color::Light,
            castling_rights: 0,
            en_passant_square: None,

            halfmove_clock: 0,
            fullmove_number: 1,

            zobrist_key: 0,
            ply: 0,
            repetition_counts: HashMap::new(),

            undo_stack: Vec::new(),
        }
    }
}

impl GameState {
    #[inline]
    pub fn new_empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn new_game() -> Self {
        parse_fen(STARTING_POSITION_FEN).expect("starting FEN should always parse")
    }

    #[inline]
    pub fn from_fen(fen: &str) -> Result<Self, String> {
        parse_fen(fen)
    }

    #[inline]
    pub fn get_fen(&self) -> String {
        generate_fen(self)
    }

    /// Color and piece kind on a square, resolved from the derived caches.
    #[inline]
    pub fn piece_on(&self, square: Square) -> Option<(Color, PieceKind)> {
        let kind = self.piece_at[square as usize]?;
        let color = if (self.occupancy_by_color[Color::Light.index()] & (1u64 << square)) != 0 {
            Color::Light
        } else {
            Color::Dark
        };
        Some((color, kind))
    }

    #[inline]
    pub fn king_square(&self, color: Color) -> Option<Square> {
        let bb = self.pieces[color.index()][PieceKind::King.index()];
        if bb == 0 {
            None
        } else {
            Some(bb.trailing_zeros() as Square)
        }
    }

    /// Rebuild every derived field from the piece bitboards.
    ///
    /// Called at FEN import; make/unmake maintain the same fields
    /// incrementally and must agree with this reconstruction.
    pub fn refresh_derived_state(&mut self, zobrist: &ZobristTable) {
        self.occupancy_by_color[Color::Light.index()] = self.pieces[Color::Light.index()]
            .iter()
            .copied()
            .fold(0u64, |acc, bb| acc | bb);
        self.occupancy_by_color[Color::Dark.index()] = self.pieces[Color::Dark.index()]
            .iter()
            .copied()
            .fold(0u64, |acc, bb| acc | bb);
        self.occupancy_all = self.occupancy_by_color[Color::Light.index()]
            | self.occupancy_by_color[Color::Dark.index()];

        self.piece_at = [None; 64];
        self.piece_squares = Default::default();
        for color in [Color::Light, Color::Dark] {
            for piece in ALL_PIECE_KINDS {
                let mut bb = self.pieces[color.index()][piece.index()];
                while bb != 0 {
                    let sq = bb.trailing_zeros() as Square;
                    self.piece_at[sq as usize] = Some(piece);
                    self.piece_squares[color.index()][piece.index()].push(sq);
                    bb &= bb - 1;
                }
            }
        }

        self.zobrist_key = zobrist.compute_key(self);
        self.repetition_counts.clear();
        self.repetition_counts.insert(self.zobrist_key, 1);
        self.undo_stack.clear();
    }

    /// Relocate a square inside a piece list. `Err` when the list disagrees
    /// with the bitboards.
    pub fn list_move(
        &mut self,
        color: Color,
        piece: PieceKind,
        from: Square,
        to: Square,
    ) -> Result<(), String> {
        let list = &mut self.piece_squares[color.index()][piece.index()];
        match list.iter().position(|&sq| sq == from) {
            Some(idx) => {
                list[idx] = to;
                Ok(())
            }
            None => Err(format!(
                "piece list for {color:?} {piece:?} is missing square {from}"
            )),
        }
    }

    pub fn list_remove(
        &mut self,
        color: Color,
        piece: PieceKind,
        square: Square,
    ) -> Result<(), String> {
        let list = &mut self.piece_squares[color.index()][piece.index()];
        match list.iter().position(|&sq| sq == square) {
            Some(idx) => {
                list.swap_remove(idx);
                Ok(())
            }
            None => Err(format!(
                "piece list for {color:?} {piece:?} is missing square {square}"
            )),
        }
    }

    #[inline]
    pub fn list_add(&mut self, color: Color, piece: PieceKind, square: Square) {
        self.piece_squares[color.index()][piece.index()].push(square);
    }

    /// Verify that every derived field agrees with the canonical bitboards.
    /// Square lists are compared as multisets; their internal order is free.
    pub fn derived_state_is_consistent(&self, zobrist: &ZobristTable) -> bool {
        let mut reference = self.clone();
        reference.refresh_derived_state(zobrist);

        if reference.occupancy_by_color != self.occupancy_by_color
            || reference.occupancy_all != self.occupancy_all
            || reference.piece_at != self.piece_at
            || reference.zobrist_key != self.zobrist_key
        {
            return false;
        }

        for color in [Color::Light, Color::Dark] {
            for piece in ALL_PIECE_KINDS {
                let mut mine = self.piece_squares[color.index()][piece.index()].clone();
                let mut theirs = reference.piece_squares[color.index()][piece.index()].clone();
                mine.sort_unstable();
                theirs.sort_unstable();
                if mine != theirs {
                    return false;
                }
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::GameState;
    use crate::game_state::chess_types::{Color, PieceKind};
    use crate::search::zobrist::ZobristTable;

    #[test]
    fn new_game_populates_derived_caches() {
        let game = GameState::new_game();
        assert_eq!(game.occupancy_all.count_ones(), 32);
        assert_eq!(game.piece_at[4], Some(PieceKind::King));
        assert_eq!(game.piece_at[27], None);
        assert_eq!(
            game.piece_squares[Color::Light.index()][PieceKind::Pawn.index()].len(),
            8
        );
        assert_eq!(game.king_square(Color::Light), Some(4));
        assert_eq!(game.king_square(Color::Dark), Some(60));
    }

    #[test]
    fn new_game_derived_state_is_consistent() {
        let zobrist = ZobristTable::new();
        let game = GameState::new_game();
        assert!(game.derived_state_is_consistent(&zobrist));
        assert_eq!(game.repetition_counts.get(&game.zobrist_key), Some(&1));
    }

    #[test]
    fn piece_on_resolves_color_and_kind() {
        let game = GameState::new_game();
        assert_eq!(game.piece_on(0), Some((Color::Light, PieceKind::Rook)));
        assert_eq!(game.piece_on(59), Some((Color::Dark, PieceKind::Queen)));
        assert_eq!(game.piece_on(35), None);
    }
}
