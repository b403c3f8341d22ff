//! Main playing engine: opening book plus iterative-deepening search.
//!
//! Early moves come from the weighted opening book when enabled; everything
//! else goes through the transposition-table-backed negamax driver with
//! time budgets resolved by the configured management strategy.

use std::sync::Arc;

use crate::engines::engine_trait::{Engine, EngineOutput, GoParams};
use crate::engines::time_management::{resolve_go_params, TimeManagementStrategy};
use crate::game_state::game_state::GameState;
use crate::moves::magic_moves::MagicTables;
use crate::search::board_scoring::StandardScorer;
use crate::search::iterative_deepening::{
    iterative_deepening_search, SearchConfig, SearchContext,
};
use crate::search::zobrist::ZobristTable;
use crate::tables::opening_book::OpeningBook;
use crate::utils::long_algebraic::move_description_to_long_algebraic;

/// Book lookups stop past this ply; the book only covers early theory.
const BOOK_MAX_PLY: u16 = 16;

pub struct IterativeEngine {
    ctx: SearchContext,
    scorer: StandardScorer,
    book: OpeningBook,
    own_book: bool,
    default_depth: u8,
    strategy: TimeManagementStrategy,
}

impl IterativeEngine {
    pub fn new(tables: Arc<MagicTables>, zobrist: Arc<ZobristTable>, default_depth: u8) -> Self {
        Self {
            ctx: SearchContext::new(tables, zobrist),
            scorer: StandardScorer,
            book: OpeningBook::load_default(),
            own_book: true,
            default_depth,
            strategy: TimeManagementStrategy::Adaptive,
        }
    }

    pub fn with_strategy(mut self, strategy: TimeManagementStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    fn try_book_move(&self, game_state: &GameState, out: &mut EngineOutput) -> bool {
        if !self.own_book || game_state.ply >= BOOK_MAX_PLY {
            return false;
        }

        let mut rng = rand::rng();
        let Some(mv) = self.book.choose_weighted_move(game_state, &mut rng) else {
            return false;
        };

        if let Ok(lan) = move_description_to_long_algebraic(mv, game_state) {
            out.info_lines.push(format!("info string book move {lan}"));
        }
        out.best_move = Some(mv);
        true
    }
}

impl Engine for IterativeEngine {
    fn name(&self) -> &str {
        "Rowan Chess"
    }

    fn author(&self) -> &str {
        "rowan_chess developers"
    }

    fn new_game(&mut self) {
        self.ctx.new_game();
    }

    fn set_option(&mut self, name: &str, value: &str) -> Result<(), String> {
        match name {
            "OwnBook" => {
                self.own_book = value.trim().eq_ignore_ascii_case("true");
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn choose_move(
        &mut self,
        game_state: &GameState,
        params: &GoParams,
    ) -> Result<EngineOutput, String> {
        let mut out = EngineOutput::default();

        if self.try_book_move(game_state, &mut out) {
            return Ok(out);
        }

        let resolved = resolve_go_params(game_state, params, self.strategy);
        let config = SearchConfig {
            max_depth: resolved.depth.unwrap_or(self.default_depth).max(1),
            movetime_ms: resolved.movetime_ms,
        };

        let result = iterative_deepening_search(&mut self.ctx, &self.scorer, game_state, &config)
            .map_err(|e| e.to_string())?;

        out.info_lines.push(format!(
            "info depth {} score cp {} nodes {} time {}",
            result.reached_depth, result.best_score, result.nodes, result.elapsed_ms
        ));
        out.best_move = result.best_move;
        Ok(out)
    }
}
