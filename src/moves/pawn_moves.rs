//! Precomputed pawn attack and push tables.
//!
//! Attack tables are also reused backwards: `pawn_attacks(defender, king_sq)`
//! intersected with enemy pawns finds pawn checkers by symmetry.

use crate::game_state::chess_types::Color;

pub const LIGHT_PAWN_ATTACKS: [u64; 64] = generate_pawn_attacks(true);
pub const DARK_PAWN_ATTACKS: [u64; 64] = generate_pawn_attacks(false);

pub const LIGHT_PAWN_PUSHES: [u64; 64] = generate_pawn_pushes(true);
pub const DARK_PAWN_PUSHES: [u64; 64] = generate_pawn_pushes(false);

#[inline]
pub const fn pawn_attacks(color: Color, square: u8) -> u64 {
    match color {
        Color::Light => LIGHT_PAWN_ATTACKS[square as usize],
        Color::Dark => DARK_PAWN_ATTACKS[square as usize],
    }
}

/// Single-step push target (no occupancy applied; the caller masks blockers).
#[inline]
pub const fn pawn_pushes(color: Color, square: u8) -> u64 {
    match color {
        Color::Light => LIGHT_PAWN_PUSHES[square as usize],
        Color::Dark => DARK_PAWN_PUSHES[square as usize],
    }
}

/// Starting rank for double pushes.
#[inline]
pub const fn pawn_start_rank(color: Color) -> u8 {
    match color {
        Color::Light => 1,
        Color::Dark => 6,
    }
}

/// Rank a pawn promotes on.
#[inline]
pub const fn pawn_promotion_rank(color: Color) -> u8 {
    match color {
        Color::Light => 7,
        Color::Dark => 0,
    }
}

const fn generate_pawn_attacks(light: bool) -> [u64; 64] {
    let mut table = [0u64; 64];
    let mut sq = 0usize;

    while sq < 64 {
        let file = sq % 8;
        let rank = sq / 8;
        let mut attacks = 0u64;

        if light {
            if rank < 7 {
                if file > 0 {
                    attacks |= 1u64 << (sq + 7);
                }
                if file < 7 {
                    attacks |= 1u64 << (sq + 9);
                }
            }
        } else if rank > 0 {
            if file > 0 {
                attacks |= 1u64 << (sq - 9);
            }
            if file < 7 {
                attacks |= 1u64 << (sq - 7);
            }
        }

        table[sq] = attacks;
        sq += 1;
    }

    table
}

const fn generate_pawn_pushes(light: bool) -> [u64; 64] {
    let mut table = [0u64; 64];
    let mut sq = 0usize;

    while sq < 64 {
        let rank = sq / 8;

        table[sq] = if light {
            if rank < 7 {
                1u64 << (sq + 8)
            } else {
                0
            }
        } else if rank > 0 {
            1u64 << (sq - 8)
        } else {
            0
        };

        sq += 1;
    }

    table
}

#[cfg(test)]
mod tests {
    use super::{pawn_attacks, pawn_pushes, DARK_PAWN_ATTACKS, LIGHT_PAWN_ATTACKS};
    use crate::game_state::chess_types::Color;

    #[test]
    fn light_pawn_attacks_from_e2() {
        let e2 = 12u8;
        let expected = (1u64 << 19) | (1u64 << 21);
        assert_eq!(LIGHT_PAWN_ATTACKS[e2 as usize], expected);
        assert_eq!(pawn_attacks(Color::Light, e2), expected);
    }

    #[test]
    fn dark_pawn_attacks_from_e7() {
        let e7 = 52u8;
        let expected = (1u64 << 43) | (1u64 << 45);
        assert_eq!(DARK_PAWN_ATTACKS[e7 as usize], expected);
        assert_eq!(pawn_attacks(Color::Dark, e7), expected);
    }

    #[test]
    fn edge_files_do_not_wrap() {
        let a4 = 24u8;
        assert_eq!(pawn_attacks(Color::Light, a4), 1u64 << 33);
        let h5 = 39u8;
        assert_eq!(pawn_attacks(Color::Dark, h5), 1u64 << 30);
    }

    #[test]
    fn pushes_advance_one_rank_toward_promotion() {
        assert_eq!(pawn_pushes(Color::Light, 12), 1u64 << 20);
        assert_eq!(pawn_pushes(Color::Dark, 52), 1u64 << 44);
        assert_eq!(pawn_pushes(Color::Light, 60), 0);
        assert_eq!(pawn_pushes(Color::Dark, 4), 0);
    }
}
