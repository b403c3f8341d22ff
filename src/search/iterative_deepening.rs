//! Iterative deepening negamax search with alpha-beta pruning.
//!
//! Depth-progressive search over the make/unmake engine: each iteration runs
//! a full-width negamax to its depth, seeded by transposition-table move
//! ordering from the previous one. Time is only polled between iterations, so
//! a finished depth is always a complete, trustworthy result.
//!
//! Heuristics:
//! - Main and quiescence transposition tables with root-id staleness.
//! - Killer and history ordering for quiet moves, MVV/LVA for captures.
//! - One-ply check extension at the quiescence boundary.
//! - Draw detection: fifty-move rule, threefold repetition, bare-material.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::game_state::{chess_types::*, game_state::GameState};
use crate::move_generation::check_analysis::is_king_in_check;
use crate::move_generation::legal_move_apply::{make_move_in_place, unmake_move_in_place};
use crate::move_generation::legal_move_generator::{
    generate_legal_moves, generate_quiescence_moves,
};
use crate::move_generation::move_generator::{MoveGenResult, MoveGenerationError};
use crate::moves::magic_moves::MagicTables;
use crate::moves::move_descriptions::{
    move_captured_piece, move_from, move_is_quiet, move_moved_piece, move_promotion_piece, move_to,
};
use crate::search::board_scoring::{BoardScorer, MaterialScorer, MATE_SCORE};
use crate::search::transposition_table::{Bound, TTEntry, TranspositionTable};
use crate::search::zobrist::ZobristTable;

pub const MAX_PLY: usize = 128;
const QUIESCENCE_MAX_PLY: u8 = 8;
const MATE_TT_THRESHOLD: i32 = MATE_SCORE - 1000;

/// Long-lived search state: shared attack tables, Zobrist keys, and both
/// transposition tables. One context serves a whole game; each search stamps
/// its entries with a fresh root id so leftovers from earlier roots read as
/// misses.
pub struct SearchContext {
    pub tables: Arc<MagicTables>,
    pub zobrist: Arc<ZobristTable>,
    tt: TranspositionTable,
    quiescence_tt: TranspositionTable,
    next_root_id: u32,
}

impl SearchContext {
    pub fn new(tables: Arc<MagicTables>, zobrist: Arc<ZobristTable>) -> Self {
        Self {
            tables,
            zobrist,
            tt: TranspositionTable::new(),
            quiescence_tt: TranspositionTable::new(),
            next_root_id: 0,
        }
    }

    /// Drop all cached search state, typically on `ucinewgame`.
    pub fn new_game(&mut self) {
        self.tt.clear();
        self.quiescence_tt.clear();
    }

    fn begin_root(&mut self) -> u32 {
        let id = self.next_root_id;
        self.next_root_id = self.next_root_id.wrapping_add(1);
        id
    }
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub max_depth: u8,
    pub movetime_ms: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_depth: 4,
            movetime_ms: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SearchResult {
    pub best_move: Option<u64>,
    pub best_score: i32,
    pub reached_depth: u8,
    pub nodes: u64,
    pub elapsed_ms: u64,
}

struct RootOutcome {
    best_move: Option<u64>,
    best_score: i32,
    move_count: usize,
}

pub fn iterative_deepening_search<S: BoardScorer>(
    ctx: &mut SearchContext,
    scorer: &S,
    game_state: &GameState,
    config: &SearchConfig,
) -> MoveGenResult<SearchResult> {
    let started_at = Instant::now();
    let deadline = config
        .movetime_ms
        .map(|ms| started_at + Duration::from_millis(ms.max(1)));

    let root_id = ctx.begin_root();
    let SearchContext {
        tables,
        zobrist,
        tt,
        quiescence_tt,
        ..
    } = ctx;

    let mut result = SearchResult {
        best_score: scorer.score(game_state),
        nodes: 1,
        ..SearchResult::default()
    };

    if config.max_depth == 0 {
        result.elapsed_ms = started_at.elapsed().as_millis() as u64;
        return Ok(result);
    }

    let mut root_state = game_state.clone();
    let mut heuristics = SearchHeuristics::new();
    let mut total_nodes = 0u64;

    for depth in 1..=config.max_depth {
        // A depth iteration runs to completion once started; the deadline is
        // only consulted here, between iterations.
        if let Some(limit) = deadline {
            if depth > 1 && Instant::now() >= limit {
                break;
            }
        }

        let mut nodes = 0u64;
        let outcome = search_root(
            tables,
            zobrist,
            tt,
            quiescence_tt,
            root_id,
            &mut root_state,
            scorer,
            depth,
            &mut nodes,
            &mut heuristics,
        )?;

        if outcome.move_count > 0 && outcome.best_move.is_none() {
            return Err(MoveGenerationError::InvariantViolation(format!(
                "search at depth {depth} produced no best move among {} legal moves",
                outcome.move_count
            )));
        }

        total_nodes = total_nodes.saturating_add(nodes);
        result.best_move = outcome.best_move;
        result.best_score = outcome.best_score;
        result.reached_depth = depth;
        result.nodes = total_nodes;

        // Checkmate or stalemate at the root: deeper iterations cannot
        // change the answer.
        if outcome.move_count == 0 {
            break;
        }
    }

    result.elapsed_ms = started_at.elapsed().as_millis() as u64;
    Ok(result)
}

#[allow(clippy::too_many_arguments)]
fn search_root<S: BoardScorer>(
    tables: &MagicTables,
    zobrist: &ZobristTable,
    tt: &mut TranspositionTable,
    quiescence_tt: &mut TranspositionTable,
    root_id: u32,
    game_state: &mut GameState,
    scorer: &S,
    depth: u8,
    nodes: &mut u64,
    heuristics: &mut SearchHeuristics,
) -> MoveGenResult<RootOutcome> {
    let mut moves = generate_legal_moves(tables, game_state)?;
    if moves.is_empty() {
        *nodes += 1;
        return Ok(RootOutcome {
            best_move: None,
            best_score: terminal_score(tables, game_state, 0)?,
            move_count: 0,
        });
    }
    let move_count = moves.len();

    let tt_move = tt
        .probe(game_state.zobrist_key, root_id)
        .and_then(|e| e.best_move);
    order_moves(
        &mut moves,
        tt_move,
        heuristics.killers_at(0),
        &heuristics.history,
    );

    let mut alpha = -MATE_SCORE;
    let beta = MATE_SCORE;
    let mut best_move = None;
    let mut best_score = -MATE_SCORE;

    for mv in moves {
        make_move_in_place(game_state, zobrist, mv)
            .map_err(MoveGenerationError::InvalidState)?;
        let search = negamax(
            tables,
            zobrist,
            tt,
            quiescence_tt,
            root_id,
            game_state,
            scorer,
            depth.saturating_sub(1),
            -beta,
            -alpha,
            1,
            true,
            nodes,
            heuristics,
        );
        unmake_move_in_place(game_state).map_err(MoveGenerationError::InvalidState)?;
        let score = -search?;

        if score > best_score {
            best_score = score;
            best_move = Some(mv);
        }
        if score > alpha {
            alpha = score;
        }
    }

    tt.store(TTEntry {
        key: game_state.zobrist_key,
        depth,
        score: tt_score_for_storage(best_score, 0),
        bound: Bound::Exact,
        best_move,
        root_id,
    });

    Ok(RootOutcome {
        best_move,
        best_score,
        move_count,
    })
}

#[allow(clippy::too_many_arguments)]
fn negamax<S: BoardScorer>(
    tables: &MagicTables,
    zobrist: &ZobristTable,
    tt: &mut TranspositionTable,
    quiescence_tt: &mut TranspositionTable,
    root_id: u32,
    game_state: &mut GameState,
    scorer: &S,
    depth: u8,
    mut alpha: i32,
    mut beta: i32,
    ply: u8,
    allow_check_extension: bool,
    nodes: &mut u64,
    heuristics: &mut SearchHeuristics,
) -> MoveGenResult<i32> {
    if is_draw_state(game_state) {
        return Ok(0);
    }

    let mut tt_move = None;
    if let Some(entry) = tt.probe(game_state.zobrist_key, root_id) {
        tt_move = entry.best_move;
        if entry.depth >= depth {
            let tt_score = tt_score_from_storage(entry.score, ply);
            match entry.bound {
                Bound::Exact => return Ok(tt_score),
                Bound::Lower => alpha = alpha.max(tt_score),
                Bound::Upper => beta = beta.min(tt_score),
            }
            if alpha >= beta {
                return Ok(tt_score);
            }
        }
    }

    let alpha_orig = alpha;

    *nodes += 1;

    if depth == 0 {
        let in_check = is_king_in_check(tables, game_state, game_state.side_to_move)?;
        if in_check && allow_check_extension {
            // Resolve the check with one more full-width ply before dropping
            // into quiescence; no further extension past that.
            return negamax(
                tables,
                zobrist,
                tt,
                quiescence_tt,
                root_id,
                game_state,
                scorer,
                1,
                alpha,
                beta,
                ply,
                false,
                nodes,
                heuristics,
            );
        }
        return quiescence(
            tables,
            zobrist,
            quiescence_tt,
            root_id,
            game_state,
            scorer,
            alpha,
            beta,
            ply,
            0,
            nodes,
        );
    }

    let mut moves = generate_legal_moves(tables, game_state)?;
    if moves.is_empty() {
        return terminal_score(tables, game_state, ply);
    }

    let ply_idx = usize::from(ply).min(MAX_PLY - 1);
    order_moves(
        &mut moves,
        tt_move,
        heuristics.killers_at(ply_idx),
        &heuristics.history,
    );

    let mut best = -MATE_SCORE;
    let mut best_move: Option<u64> = None;

    for mv in moves {
        make_move_in_place(game_state, zobrist, mv)
            .map_err(MoveGenerationError::InvalidState)?;
        let search = negamax(
            tables,
            zobrist,
            tt,
            quiescence_tt,
            root_id,
            game_state,
            scorer,
            depth - 1,
            -beta,
            -alpha,
            ply.saturating_add(1),
            allow_check_extension,
            nodes,
            heuristics,
        );
        unmake_move_in_place(game_state).map_err(MoveGenerationError::InvalidState)?;
        let score = -search?;

        if score > best {
            best = score;
            best_move = Some(mv);
        }
        if score > alpha {
            alpha = score;
        }
        if alpha >= beta {
            if move_is_quiet(mv) {
                heuristics.record_killer(ply_idx, mv);
                heuristics.record_history(mv, depth);
            }
            break;
        }
    }

    let bound = if best <= alpha_orig {
        Bound::Upper
    } else if best >= beta {
        Bound::Lower
    } else {
        Bound::Exact
    };

    tt.store(TTEntry {
        key: game_state.zobrist_key,
        depth,
        score: tt_score_for_storage(best, ply),
        bound,
        best_move,
        root_id,
    });

    Ok(best)
}

#[allow(clippy::too_many_arguments)]
fn quiescence<S: BoardScorer>(
    tables: &MagicTables,
    zobrist: &ZobristTable,
    quiescence_tt: &mut TranspositionTable,
    root_id: u32,
    game_state: &mut GameState,
    scorer: &S,
    mut alpha: i32,
    beta: i32,
    ply: u8,
    qply: u8,
    nodes: &mut u64,
) -> MoveGenResult<i32> {
    if is_draw_state(game_state) {
        return Ok(0);
    }

    let alpha_orig = alpha;

    if let Some(entry) = quiescence_tt.probe(game_state.zobrist_key, root_id) {
        let tt_score = tt_score_from_storage(entry.score, ply);
        match entry.bound {
            Bound::Exact => return Ok(tt_score),
            Bound::Lower if tt_score >= beta => return Ok(tt_score),
            Bound::Upper if tt_score <= alpha => return Ok(tt_score),
            _ => {}
        }
    }

    *nodes += 1;

    let in_check = is_king_in_check(tables, game_state, game_state.side_to_move)?;

    // While in check there is no stand-pat: every evasion is searched.
    let mut moves = if in_check {
        let evasions = generate_legal_moves(tables, game_state)?;
        if evasions.is_empty() {
            return Ok(-MATE_SCORE + i32::from(ply));
        }
        evasions
    } else {
        let stand_pat = scorer.score(game_state);
        if stand_pat >= beta {
            return Ok(stand_pat);
        }
        if stand_pat > alpha {
            alpha = stand_pat;
        }
        if qply >= QUIESCENCE_MAX_PLY {
            return Ok(alpha);
        }
        generate_quiescence_moves(tables, game_state)?
    };

    order_moves(&mut moves, None, [0; 2], &EMPTY_HISTORY);

    let mut best = alpha;
    let mut best_move = None;

    for mv in moves {
        make_move_in_place(game_state, zobrist, mv)
            .map_err(MoveGenerationError::InvalidState)?;
        let search = quiescence(
            tables,
            zobrist,
            quiescence_tt,
            root_id,
            game_state,
            scorer,
            -beta,
            -best,
            ply.saturating_add(1),
            qply.saturating_add(1),
            nodes,
        );
        unmake_move_in_place(game_state).map_err(MoveGenerationError::InvalidState)?;
        let score = -search?;

        if score > best {
            best = score;
            best_move = Some(mv);
        }
        if best >= beta {
            break;
        }
    }

    let bound = if best <= alpha_orig {
        Bound::Upper
    } else if best >= beta {
        Bound::Lower
    } else {
        Bound::Exact
    };
    quiescence_tt.store(TTEntry {
        key: game_state.zobrist_key,
        depth: 0,
        score: tt_score_for_storage(best, ply),
        bound,
        best_move,
        root_id,
    });

    Ok(best)
}

fn terminal_score(tables: &MagicTables, game_state: &GameState, ply: u8) -> MoveGenResult<i32> {
    if is_king_in_check(tables, game_state, game_state.side_to_move)? {
        Ok(-MATE_SCORE + i32::from(ply))
    } else {
        Ok(0)
    }
}

fn is_draw_state(game_state: &GameState) -> bool {
    if game_state.halfmove_clock >= 100 {
        return true;
    }
    if game_state
        .repetition_counts
        .get(&game_state.zobrist_key)
        .is_some_and(|&count| count >= 3)
    {
        return true;
    }
    is_insufficient_material(game_state)
}

/// King vs king, optionally with a single minor piece on either side.
fn is_insufficient_material(game_state: &GameState) -> bool {
    let mut minors = 0u32;
    for color in [Color::Light, Color::Dark] {
        let idx = color.index();
        if game_state.pieces[idx][PieceKind::Pawn.index()] != 0
            || game_state.pieces[idx][PieceKind::Rook.index()] != 0
            || game_state.pieces[idx][PieceKind::Queen.index()] != 0
        {
            return false;
        }
        minors += game_state.pieces[idx][PieceKind::Knight.index()].count_ones()
            + game_state.pieces[idx][PieceKind::Bishop.index()].count_ones();
    }
    minors <= 1
}

// Mate scores are stored relative to the storing node so a hit at a different
// ply still reads as "mate in N from here".
#[inline]
fn tt_score_for_storage(score: i32, ply: u8) -> i32 {
    if score >= MATE_TT_THRESHOLD {
        score.saturating_add(i32::from(ply))
    } else if score <= -MATE_TT_THRESHOLD {
        score.saturating_sub(i32::from(ply))
    } else {
        score
    }
}

#[inline]
fn tt_score_from_storage(score: i32, ply: u8) -> i32 {
    if score >= MATE_TT_THRESHOLD {
        score.saturating_sub(i32::from(ply))
    } else if score <= -MATE_TT_THRESHOLD {
        score.saturating_add(i32::from(ply))
    } else {
        score
    }
}

type HistoryTable = [[i32; 64]; 64];

static EMPTY_HISTORY: HistoryTable = [[0; 64]; 64];

struct SearchHeuristics {
    killers: [[u64; 2]; MAX_PLY],
    history: Box<HistoryTable>,
}

impl SearchHeuristics {
    fn new() -> Self {
        Self {
            killers: [[0; 2]; MAX_PLY],
            history: Box::new([[0; 64]; 64]),
        }
    }

    fn killers_at(&self, ply: usize) -> [u64; 2] {
        self.killers[ply]
    }

    fn record_killer(&mut self, ply: usize, mv: u64) {
        if self.killers[ply][0] == mv {
            return;
        }
        self.killers[ply][1] = self.killers[ply][0];
        self.killers[ply][0] = mv;
    }

    fn record_history(&mut self, mv: u64, depth: u8) {
        let from = move_from(mv) as usize;
        let to = move_to(mv) as usize;
        let bonus = i32::from(depth) * i32::from(depth);
        let entry = &mut self.history[from][to];
        *entry = (*entry + bonus).min(50_000);
    }
}

fn order_moves(moves: &mut [u64], tt_move: Option<u64>, killers: [u64; 2], history: &HistoryTable) {
    moves.sort_unstable_by_key(|&m| -move_order_score(m, tt_move, killers, history));
}

fn move_order_score(
    mv: u64,
    tt_move: Option<u64>,
    killers: [u64; 2],
    history: &HistoryTable,
) -> i32 {
    if Some(mv) == tt_move {
        return 1_000_000;
    }

    let mut score = 0i32;
    if let Some(victim) = move_captured_piece(mv) {
        let attacker = move_moved_piece(mv)
            .map(MaterialScorer::piece_value)
            .unwrap_or(100);
        score += 100_000 + MaterialScorer::piece_value(victim) - attacker;
    }
    if let Some(promo) = move_promotion_piece(mv) {
        score += 95_000 + MaterialScorer::piece_value(promo);
    }

    if move_is_quiet(mv) {
        if mv == killers[0] {
            score += 90_000;
        } else if mv == killers[1] {
            score += 80_000;
        }
        score += history[move_from(mv) as usize][move_to(mv) as usize];
    }

    score
}
