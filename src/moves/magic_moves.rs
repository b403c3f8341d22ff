//! Magic bitboard attack tables for the sliding pieces.
//!
//! A lookup is `attacks[offset[sq] + ((occ & mask[sq]) * magic[sq] >> shift[sq])]`.
//! Tables are built at construction time by enumerating every blocker subset
//! of each square's relevance mask and ray-casting the true attack set. The
//! magic multipliers are a fixed, verified data payload; shifts and offsets
//! are derived from the relevance masks.
//!
//! Everything lives inside an explicitly constructed [`MagicTables`] value so
//! callers decide where the tables live and how they are shared.

use crate::game_state::chess_types::Square;

#[rustfmt::skip]
const ROOK_MAGICS: [u64; 64] = [
    324268244150067216, 18014467241615360, 144133098098016288, 9835879179034305920,
    2341893796599431808, 72058693650744320, 72138957906837508, 36031718687244416,
    9429417088524417, 3448137205161984, 599541975809556992, 24206986510467089,
    9225764591361853442, 1299570010489946152, 2324701927143178244, 289497015695460608,
    1188950576547758144, 22518273019486208, 150083874115584, 72480356527245318,
    622061898095134864, 282574522155016, 1513354610365432208, 4505798717767745,
    36033475312148480, 9042385782718464, 9042385782706176, 146375786131095680,
    9241461204310820864, 11263399264125056, 4509183089578022, 1549379062991045888,
    36029072077234177, 282033356030564, 648537875641540608, 149535804362752,
    144119588278257664, 563023001422856, 867242304870547969, 140772930224896,
    36068964627415040, 2312633594369556480, 2882374688608223264, 4611704443839315978,
    743376530318622736, 288793394971541572, 576746633916645632, 288232035151118337,
    9337371051694237952, 2900459172409647360, 140806209929344, 1153255760570908800,
    9233826195559678080, 146648471594860800, 9288831031312640, 117375068610339072,
    88510713348353, 4621348666215514117, 145276555823317074, 4611862391259680769,
    72620612914251778, 844459325784069, 36031064895947012, 714962008014946,
];

#[rustfmt::skip]
const BISHOP_MAGICS: [u64; 64] = [
    580610875736196, 23564740739597186, 326529222334482440, 77691588255417536,
    1130985450111360, 4611972303834579969, 1130315334811664, 2315207556594663936,
    9223970858442211456, 18031995028275712, 576469583309971472, 4450265595906,
    2305865019312570880, 217523137082843666, 4045642047909150722, 4710837787133356048,
    434880007787511936, 9009433585680512, 436849172780421152, 108649358224916772,
    438540779691705378, 35192970682377, 649081313491486720, 576847870658939912,
    27035144259896384, 1319572837126377617, 1155175503460828416, 9804340787373408264,
    1153488854787851781, 36100815047401473, 9232521077431212034, 2594372731718076560,
    1130573932306952, 576614890645490304, 2595201520813278208, 289359031280599552,
    1154329996182815008, 148621056000790529, 289958812725561412, 54330187963237376,
    144260529904435472, 2306040990160650752, 35326911842304, 5931291424623436032,
    74036998572082176, 9042389024940161, 6944551733516304896, 9800118666640099842,
    9235778941229858816, 900755763354943488, 2305845209479021065, 578862094850990096,
    2379167309467090945, 576496074418061450, 2938952834131167360, 1161933104089677892,
    18298381948686900, 18312403876054272, 11529496522221159426, 4611690528285924352,
    1170936316574368768, 8814904738050, 7084338273224524178, 93458500239262209,
];

/// Brute-force rook attacks by ray casting. Ground truth for table
/// construction and cross-checks in tests.
pub fn rook_ray_attacks(square: u8, occupancy: u64) -> u64 {
    let sq = square as i32;
    let mut attacks = 0u64;

    attacks |= trace_ray(sq, 0, 1, occupancy);
    attacks |= trace_ray(sq, 0, -1, occupancy);
    attacks |= trace_ray(sq, 1, 0, occupancy);
    attacks |= trace_ray(sq, -1, 0, occupancy);

    attacks
}

/// Brute-force bishop attacks by ray casting.
pub fn bishop_ray_attacks(square: u8, occupancy: u64) -> u64 {
    let sq = square as i32;
    let mut attacks = 0u64;

    attacks |= trace_ray(sq, 1, 1, occupancy);
    attacks |= trace_ray(sq, 1, -1, occupancy);
    attacks |= trace_ray(sq, -1, 1, occupancy);
    attacks |= trace_ray(sq, -1, -1, occupancy);

    attacks
}

fn trace_ray(square: i32, file_step: i32, rank_step: i32, occupancy: u64) -> u64 {
    let mut file = (square % 8) + file_step;
    let mut rank = (square / 8) + rank_step;
    let mut attacks = 0u64;

    while (0..8).contains(&file) && (0..8).contains(&rank) {
        let target = (rank * 8 + file) as usize;
        let bit = 1u64 << target;
        attacks |= bit;

        if (occupancy & bit) != 0 {
            break;
        }

        file += file_step;
        rank += rank_step;
    }

    attacks
}

/// Rook relevance mask: ray squares excluding the board edge. A blocker on
/// the edge never changes the reachable set, so edge squares carry no index
/// information.
pub fn rook_relevance_mask(square: u8) -> u64 {
    let file = i32::from(square % 8);
    let rank = i32::from(square / 8);
    let mut mask = 0u64;

    let mut r = rank + 1;
    while r <= 6 {
        mask |= 1u64 << (r * 8 + file);
        r += 1;
    }
    let mut r = rank - 1;
    while r >= 1 {
        mask |= 1u64 << (r * 8 + file);
        r -= 1;
    }
    let mut f = file + 1;
    while f <= 6 {
        mask |= 1u64 << (rank * 8 + f);
        f += 1;
    }
    let mut f = file - 1;
    while f >= 1 {
        mask |= 1u64 << (rank * 8 + f);
        f -= 1;
    }

    mask
}

/// Bishop relevance mask: diagonal squares excluding the board edge.
pub fn bishop_relevance_mask(square: u8) -> u64 {
    let file = i32::from(square % 8);
    let rank = i32::from(square / 8);
    let mut mask = 0u64;

    for (file_step, rank_step) in [(1, 1), (1, -1), (-1, 1), (-1, -1)] {
        let mut f = file + file_step;
        let mut r = rank + rank_step;
        while (1..=6).contains(&f) && (1..=6).contains(&r) {
            mask |= 1u64 << (r * 8 + f);
            f += file_step;
            r += rank_step;
        }
    }

    mask
}

/// One sliding piece family's lookup table.
#[derive(Debug, Clone)]
struct MagicTable {
    magic: [u64; 64],
    mask: [u64; 64],
    shift: [u32; 64],
    offset: [usize; 64],
    attacks: Vec<u64>,
}

impl MagicTable {
    fn build(magics: &[u64; 64], mask_fn: fn(u8) -> u64, attack_fn: fn(u8, u64) -> u64) -> Self {
        let mut mask = [0u64; 64];
        let mut shift = [0u32; 64];
        let mut offset = [0usize; 64];
        let mut total = 0usize;

        for sq in 0..64u8 {
            let m = mask_fn(sq);
            mask[sq as usize] = m;
            shift[sq as usize] = 64 - m.count_ones();
            offset[sq as usize] = total;
            total += 1usize << m.count_ones();
        }

        let mut attacks = vec![0u64; total];
        for sq in 0..64u8 {
            let m = mask[sq as usize];
            // Carry-rippler: walks every subset of the mask, ending on 0.
            let mut subset = 0u64;
            loop {
                let index = offset[sq as usize]
                    + ((subset.wrapping_mul(magics[sq as usize]) >> shift[sq as usize]) as usize);
                let truth = attack_fn(sq, subset);
                debug_assert!(
                    attacks[index] == 0 || attacks[index] == truth,
                    "magic collision on square {sq}"
                );
                attacks[index] = truth;

                subset = subset.wrapping_sub(m) & m;
                if subset == 0 {
                    break;
                }
            }
        }

        Self {
            magic: *magics,
            mask,
            shift,
            offset,
            attacks,
        }
    }

    #[inline]
    fn attacks(&self, square: Square, occupancy: u64) -> u64 {
        let sq = square as usize;
        let index = ((occupancy & self.mask[sq]).wrapping_mul(self.magic[sq]) >> self.shift[sq])
            as usize;
        self.attacks[self.offset[sq] + index]
    }
}

/// All sliding-piece lookup state, plus the between table.
///
/// Construction is a few milliseconds; build once per process (or per test)
/// and share by reference.
#[derive(Debug, Clone)]
pub struct MagicTables {
    rook: MagicTable,
    bishop: MagicTable,
    between: Box<[[u64; 64]; 64]>,
}

impl MagicTables {
    pub fn new() -> Self {
        let rook = MagicTable::build(&ROOK_MAGICS, rook_relevance_mask, rook_ray_attacks);
        let bishop = MagicTable::build(&BISHOP_MAGICS, bishop_relevance_mask, bishop_ray_attacks);
        let between = build_between_table();
        Self {
            rook,
            bishop,
            between,
        }
    }

    #[inline]
    pub fn rook_attacks(&self, square: Square, occupancy: u64) -> u64 {
        self.rook.attacks(square, occupancy)
    }

    #[inline]
    pub fn bishop_attacks(&self, square: Square, occupancy: u64) -> u64 {
        self.bishop.attacks(square, occupancy)
    }

    #[inline]
    pub fn queen_attacks(&self, square: Square, occupancy: u64) -> u64 {
        self.rook.attacks(square, occupancy) | self.bishop.attacks(square, occupancy)
    }

    /// Squares strictly between two aligned squares; empty when the squares
    /// share neither rank, file, nor diagonal.
    #[inline]
    pub fn ray_between(&self, a: Square, b: Square) -> u64 {
        self.between[a as usize][b as usize]
    }
}

impl Default for MagicTables {
    fn default() -> Self {
        Self::new()
    }
}

fn build_between_table() -> Box<[[u64; 64]; 64]> {
    let mut between = vec![[0u64; 64]; 64];

    for a in 0..64u8 {
        for b in 0..64u8 {
            if a == b {
                continue;
            }
            let a_bit = 1u64 << a;
            let b_bit = 1u64 << b;

            if (rook_ray_attacks(a, 0) & b_bit) != 0 {
                between[a as usize][b as usize] =
                    rook_ray_attacks(a, b_bit) & rook_ray_attacks(b, a_bit);
            } else if (bishop_ray_attacks(a, 0) & b_bit) != 0 {
                between[a as usize][b as usize] =
                    bishop_ray_attacks(a, b_bit) & bishop_ray_attacks(b, a_bit);
            }
        }
    }

    let boxed: Box<[[u64; 64]; 64]> = between
        .into_boxed_slice()
        .try_into()
        .expect("between table has exactly 64 rows");
    boxed
}
