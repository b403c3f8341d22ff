//! Zobrist hashing for position identity, repetition tracking, and the
//! transposition tables.
//!
//! Keys live in an explicit `ZobristTable` handed around by the callers that
//! hash, so tests can build independent tables and the key material is
//! deterministic from a fixed seed. The hash covers piece placement, the side
//! to move, and whether an en-passant capture is currently possible; castling
//! rights are deliberately outside the hash and are compared by the callers
//! that care.

use crate::game_state::{chess_types::*, game_state::GameState};

pub const ZOBRIST_SEED: u64 = 0x9E37_79B9_7F4A_7C15;

#[derive(Debug)]
pub struct ZobristTable {
    piece_square: [[[u64; 64]; 6]; 2],
    light_to_move: u64,
    en_passant_legal: u64,
}

impl ZobristTable {
    pub fn new() -> Self {
        Self::from_seed(ZOBRIST_SEED)
    }

    pub fn from_seed(seed: u64) -> Self {
        let mut state = seed;

        let mut piece_square = [[[0u64; 64]; 6]; 2];
        for color in &mut piece_square {
            for piece in color {
                for sq in piece {
                    *sq = next_random_u64(&mut state);
                }
            }
        }

        let light_to_move = next_random_u64(&mut state);
        let en_passant_legal = next_random_u64(&mut state);

        Self {
            piece_square,
            light_to_move,
            en_passant_legal,
        }
    }

    /// Key for a `(color, piece, square)` occupancy term.
    #[inline]
    pub fn piece_square_key(&self, color: Color, piece: PieceKind, square: Square) -> u64 {
        self.piece_square[color.index()][piece.index()][square as usize]
    }

    /// Toggle key present while Light is to move.
    #[inline]
    pub fn light_to_move_key(&self) -> u64 {
        self.light_to_move
    }

    /// Toggle key present while an en-passant target square exists.
    #[inline]
    pub fn en_passant_legal_key(&self) -> u64 {
        self.en_passant_legal
    }

    /// Full position key from scratch. Incremental updates in the move
    /// applier must always agree with this.
    pub fn compute_key(&self, game_state: &GameState) -> u64 {
        let mut key = 0u64;

        for color in [Color::Light, Color::Dark] {
            for piece in ALL_PIECE_KINDS {
                let mut bb = game_state.pieces[color.index()][piece.index()];
                while bb != 0 {
                    let sq = bb.trailing_zeros() as Square;
                    key ^= self.piece_square_key(color, piece, sq);
                    bb &= bb - 1;
                }
            }
        }

        if game_state.side_to_move == Color::Light {
            key ^= self.light_to_move;
        }

        if game_state.en_passant_square.is_some() {
            key ^= self.en_passant_legal;
        }

        key
    }
}

impl Default for ZobristTable {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn next_random_u64(state: &mut u64) -> u64 {
    // splitmix64
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::ZobristTable;
    use crate::game_state::game_state::GameState;

    #[test]
    fn same_seed_gives_identical_keys() {
        let a = ZobristTable::new();
        let b = ZobristTable::new();
        let game = GameState::new_game();
        assert_eq!(a.compute_key(&game), b.compute_key(&game));
    }

    #[test]
    fn different_seeds_give_different_keys() {
        let a = ZobristTable::from_seed(1);
        let b = ZobristTable::from_seed(2);
        let game = GameState::new_game();
        assert_ne!(a.compute_key(&game), b.compute_key(&game));
    }

    #[test]
    fn side_to_move_changes_hash() {
        let zobrist = ZobristTable::new();
        let w = GameState::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").expect("FEN should parse");
        let b = GameState::from_fen("4k3/8/8/8/8/8/8/4K3 b - - 0 1").expect("FEN should parse");
        assert_ne!(zobrist.compute_key(&w), zobrist.compute_key(&b));
    }

    #[test]
    fn en_passant_availability_changes_hash() {
        let zobrist = ZobristTable::new();
        let no_ep =
            GameState::from_fen("4k3/8/8/8/4P3/8/8/4K3 b - - 0 1").expect("FEN should parse");
        let ep =
            GameState::from_fen("4k3/8/8/8/4P3/8/8/4K3 b - e3 0 1").expect("FEN should parse");
        assert_ne!(zobrist.compute_key(&no_ep), zobrist.compute_key(&ep));
    }

    #[test]
    fn castling_rights_do_not_change_hash() {
        let zobrist = ZobristTable::new();
        let with_rights =
            GameState::from_fen("4k3/8/8/8/8/8/8/R3K2R w KQ - 0 1").expect("FEN should parse");
        let without_rights =
            GameState::from_fen("4k3/8/8/8/8/8/8/R3K2R w - - 0 1").expect("FEN should parse");
        assert_eq!(
            zobrist.compute_key(&with_rights),
            zobrist.compute_key(&without_rights)
        );
    }

    #[test]
    fn stored_key_matches_recompute_after_parsing() {
        let zobrist = ZobristTable::new();
        let game = GameState::from_fen("r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1")
            .expect("FEN should parse");
        assert_eq!(game.zobrist_key, zobrist.compute_key(&game));
    }
}
