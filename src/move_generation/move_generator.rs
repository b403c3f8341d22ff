//! Move generation error types and the generator trait seam.
//!
//! The trait exists so engines and perft harnesses can run against mock
//! generators; the production implementations wrap the mask-filter pipeline
//! in `legal_move_generator`.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::game_state::game_state::GameState;
use crate::move_generation::legal_move_generator::{
    generate_legal_moves, generate_quiescence_moves,
};
use crate::moves::magic_moves::MagicTables;

pub type MoveGenResult<T> = Result<T, MoveGenerationError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveGenerationError {
    /// The position is malformed (missing king, impossible occupancy, bad
    /// move description). Recoverable by fixing the input.
    InvalidState(String),
    /// An internal contract was broken; the engine state can no longer be
    /// trusted.
    InvariantViolation(String),
}

impl fmt::Display for MoveGenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveGenerationError::InvalidState(msg) => write!(f, "invalid game state: {msg}"),
            MoveGenerationError::InvariantViolation(msg) => {
                write!(f, "engine invariant violated: {msg}")
            }
        }
    }
}

impl Error for MoveGenerationError {}

pub trait MoveGenerator: Send + Sync {
    fn generate_legal_moves(&self, game_state: &GameState) -> MoveGenResult<Vec<u64>>;
}

/// Full legal move generation over shared magic tables.
pub struct LegalMoveGenerator {
    tables: Arc<MagicTables>,
}

impl LegalMoveGenerator {
    pub fn new(tables: Arc<MagicTables>) -> Self {
        Self { tables }
    }

    #[inline]
    pub fn tables(&self) -> &MagicTables {
        &self.tables
    }
}

impl MoveGenerator for LegalMoveGenerator {
    fn generate_legal_moves(&self, game_state: &GameState) -> MoveGenResult<Vec<u64>> {
        generate_legal_moves(&self.tables, game_state)
    }
}

/// Captures, promotions, and en-passant only; used by quiescence search.
pub struct QuiescenceMoveGenerator {
    tables: Arc<MagicTables>,
}

impl QuiescenceMoveGenerator {
    pub fn new(tables: Arc<MagicTables>) -> Self {
        Self { tables }
    }
}

impl MoveGenerator for QuiescenceMoveGenerator {
    fn generate_legal_moves(&self, game_state: &GameState) -> MoveGenResult<Vec<u64>> {
        generate_quiescence_moves(&self.tables, game_state)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{LegalMoveGenerator, MoveGenerator, QuiescenceMoveGenerator};
    use crate::game_state::game_state::GameState;
    use crate::moves::magic_moves::MagicTables;
    use crate::moves::move_descriptions::move_is_quiet;

    #[test]
    fn legal_generator_counts_twenty_opening_moves() {
        let tables = Arc::new(MagicTables::new());
        let generator = LegalMoveGenerator::new(tables);
        let game = GameState::new_game();
        let moves = generator
            .generate_legal_moves(&game)
            .expect("move generation should succeed");
        assert_eq!(moves.len(), 20);
    }

    #[test]
    fn quiescence_generator_emits_no_quiet_moves() {
        let tables = Arc::new(MagicTables::new());
        let generator = QuiescenceMoveGenerator::new(tables);
        let game = GameState::from_fen("4k3/8/3p4/4P3/8/8/8/4K3 w - - 0 1")
            .expect("FEN should parse");
        let moves = generator
            .generate_legal_moves(&game)
            .expect("move generation should succeed");
        assert!(!moves.is_empty());
        assert!(moves.iter().all(|&mv| !move_is_quiet(mv)));
    }
}
