use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::PackError;
use crate::guillotine::{GuillotineBin, ScoredPlacement, SplitRule};
use crate::score::{Score, ScoreStrategy};
use crate::types::{Bin, BinResult, Placement, Rect, Solution};

/// Which opened bins an item may go into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BinPolicy {
    /// Only the most recently opened bin. Earlier bins are never revisited.
    #[default]
    Latest,
    /// Every opened bin; the best score across all of them wins, ties go to
    /// the bin opened first.
    AllOpen,
}

impl std::str::FromStr for BinPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "latest" => Ok(BinPolicy::Latest),
            "all-open" => Ok(BinPolicy::AllOpen),
            _ => Err(format!(
                "invalid bin policy '{s}', expected: latest or all-open"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackerConfig {
    pub strategy: ScoreStrategy,
    pub split_rule: SplitRule,
    pub merge: bool,
    pub allow_rotate: bool,
    pub bin_policy: BinPolicy,
}

impl Default for PackerConfig {
    fn default() -> Self {
        Self {
            strategy: ScoreStrategy::default(),
            split_rule: SplitRule::default(),
            merge: true,
            allow_rotate: true,
            bin_policy: BinPolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StrategyRun {
    pub strategy: ScoreStrategy,
    pub elapsed: Duration,
    pub outcome: Result<Solution, PackError>,
}

/// Cheapest successful run. Ties go to fewer bins, then to the earlier run.
pub fn best_run(runs: &[StrategyRun]) -> Option<&StrategyRun> {
    runs.iter()
        .filter_map(|run| run.outcome.as_ref().ok().map(|sol| (run, sol)))
        .min_by_key(|(_, sol)| (sol.total_cost, sol.bins_opened()))
        .map(|(run, _)| run)
}

pub struct Solver {
    items: Vec<Rect>,
    bins: Vec<Bin>,
    config: PackerConfig,
}

impl Solver {
    pub fn new(items: Vec<Rect>, bins: Vec<Bin>, config: PackerConfig) -> Self {
        Self {
            items,
            bins,
            config,
        }
    }

    pub fn config(&self) -> &PackerConfig {
        &self.config
    }

    pub fn solve(&self) -> Result<Solution, PackError> {
        let solution = self.solve_with(&self.config.strategy)?;
        tracing::info!(
            strategy = %self.config.strategy,
            bins = solution.bins_opened(),
            cost = solution.total_cost,
            "packed {} items",
            self.items.len()
        );
        Ok(solution)
    }

    /// Runs every scoring strategy on its own copy of the packing state.
    /// Results come back in `ScoreStrategy::ALL` order.
    pub fn compare(&self) -> Vec<StrategyRun> {
        ScoreStrategy::ALL
            .par_iter()
            .map(|&strategy| {
                let start = Instant::now();
                let outcome = self.solve_with(&strategy);
                let elapsed = start.elapsed();
                match &outcome {
                    Ok(sol) => tracing::debug!(
                        %strategy,
                        cost = sol.total_cost,
                        bins = sol.bins_opened(),
                        "strategy finished"
                    ),
                    Err(e) => tracing::debug!(%strategy, error = %e, "strategy failed"),
                }
                StrategyRun {
                    strategy,
                    elapsed,
                    outcome,
                }
            })
            .collect()
    }

    pub fn solve_with<S: Score>(&self, scorer: &S) -> Result<Solution, PackError> {
        self.validate()?;

        let mut manager = BinManager::new(&self.bins, self.bin_order(), self.config);
        manager.open_next();

        for item in self.item_order() {
            let piece = self.items[item];
            loop {
                if let Some(best) = manager.find_best(piece, scorer) {
                    let p = manager.place(best, item, piece);
                    tracing::trace!(
                        item,
                        bin = p.bin,
                        x = p.x,
                        y = p.y,
                        rotated = p.rotated,
                        "placed {}",
                        p.rect
                    );
                    break;
                }
                if !manager.open_next() {
                    return Err(PackError::ExhaustedBins { item });
                }
            }
        }

        Ok(manager.into_solution())
    }

    fn validate(&self) -> Result<(), PackError> {
        if self.items.is_empty() || self.bins.is_empty() {
            return Err(PackError::NoBinsAvailable {
                items: self.items.len(),
                bins: self.bins.len(),
            });
        }
        for (item, piece) in self.items.iter().enumerate() {
            let fits_somewhere = self
                .bins
                .iter()
                .any(|b| piece.fits_in_any(&b.rect(), self.config.allow_rotate));
            if !fits_somewhere {
                return Err(PackError::InfeasibleItem {
                    item,
                    w: piece.w,
                    h: piece.h,
                });
            }
        }
        Ok(())
    }

    /// Item indices by descending area; equal areas keep input order.
    fn item_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.items.len()).collect();
        order.sort_by(|&a, &b| self.items[b].area().cmp(&self.items[a].area()));
        order
    }

    /// Bin indices by ascending cost per area; equal ratios keep input order.
    fn bin_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.bins.len()).collect();
        order.sort_by(|&a, &b| self.bins[a].cmp_cost_per_area(&self.bins[b]));
        order
    }
}

/// Opens bins in cost order and owns the packing state of each opened one.
struct BinManager<'a> {
    bins: &'a [Bin],
    pending: std::vec::IntoIter<usize>,
    open: Vec<GuillotineBin>,
    total_cost: u64,
    config: PackerConfig,
}

impl<'a> BinManager<'a> {
    fn new(bins: &'a [Bin], order: Vec<usize>, config: PackerConfig) -> Self {
        Self {
            bins,
            pending: order.into_iter(),
            open: Vec::new(),
            total_cost: 0,
            config,
        }
    }

    /// Opens the next candidate bin and charges its cost. False once all are open.
    fn open_next(&mut self) -> bool {
        let Some(idx) = self.pending.next() else {
            return false;
        };
        let bin = self.bins[idx];
        self.total_cost += bin.cost as u64;
        self.open.push(GuillotineBin::new(
            idx,
            bin.rect(),
            self.config.split_rule,
            self.config.merge,
        ));
        tracing::debug!(bin = idx, total_cost = self.total_cost, "opened bin {bin}");
        true
    }

    fn find_best<S: Score>(&self, piece: Rect, scorer: &S) -> Option<(usize, ScoredPlacement)> {
        let allow_rotate = self.config.allow_rotate;
        match self.config.bin_policy {
            BinPolicy::Latest => {
                let last = self.open.len().checked_sub(1)?;
                self.open[last]
                    .find_best(piece, allow_rotate, scorer)
                    .map(|scored| (last, scored))
            }
            BinPolicy::AllOpen => {
                let mut best: Option<(usize, ScoredPlacement)> = None;
                for (bi, bin) in self.open.iter().enumerate() {
                    if let Some(scored) = bin.find_best(piece, allow_rotate, scorer)
                        && best.is_none_or(|(_, b)| scored.score < b.score)
                    {
                        best = Some((bi, scored));
                    }
                }
                best
            }
        }
    }

    fn place(
        &mut self,
        (bi, scored): (usize, ScoredPlacement),
        item: usize,
        piece: Rect,
    ) -> Placement {
        let bin = &mut self.open[bi];
        let placement = bin.place(scored, item, piece);
        tracing::trace!(
            bin = placement.bin,
            stock = %bin.stock(),
            free_rects = bin.free_rects.len(),
            free_area = bin.free_area(),
            "free space after placing item {item}"
        );
        placement
    }

    fn into_solution(self) -> Solution {
        let bins = self
            .open
            .into_iter()
            .map(|gb| {
                let stock = self.bins[gb.bin()];
                let waste_area = stock.area() - gb.used_area();
                BinResult {
                    bin: gb.bin(),
                    stock,
                    placements: gb.placements,
                    waste_area,
                }
            })
            .collect();

        Solution {
            bins,
            total_cost: self.total_cost,
        }
    }
}
