use crate::bar::Bar;
use crate::error::{Error, InputKind, SkippedRecord};
use crate::input::{self, RawRecord, RecordSource};
use crate::types::{
    CuttingPlan, OptimizationResult, PieceDemand, PlannerConfig, StockUnit, UnusedStock,
};

/// Greedy cutting planner for one run.
///
/// Each round simulates packing every stock length that still has bars left,
/// longest pieces first, and commits the candidate with the least residual
/// waste. Ties go to the shorter stock. The planner owns its demand and stock
/// counters and consumes itself in [`Planner::solve`].
pub struct Planner {
    pieces: Vec<PieceDemand>,
    stock: Vec<StockUnit>,
    config: PlannerConfig,
    skipped: Vec<SkippedRecord>,
}

impl Planner {
    pub fn new(pieces: Vec<PieceDemand>, mut stock: Vec<StockUnit>, config: PlannerConfig) -> Self {
        stock.sort_by_key(|s| s.length);
        Self {
            pieces,
            stock,
            config,
            skipped: Vec::new(),
        }
    }

    /// Attaches records dropped during normalization so they are reported on the result.
    pub fn with_skipped(mut self, skipped: Vec<SkippedRecord>) -> Self {
        self.skipped = skipped;
        self
    }

    pub fn solve(mut self) -> OptimizationResult {
        let order = self.longest_first();
        let mut plans: Vec<CuttingPlan> = Vec::new();
        let mut total_waste: u64 = 0;
        let mut truncated = false;

        while self.pieces.iter().any(|p| p.remaining > 0) {
            if let Some(max) = self.config.max_iterations
                && plans.len() >= max
            {
                tracing::warn!(max_iterations = max, "iteration cap reached, stopping early");
                truncated = true;
                break;
            }

            let Some((stock_idx, bar)) = self.best_candidate(&order) else {
                break;
            };
            let plan = self.commit(stock_idx, bar);
            tracing::debug!(
                stock_length = plan.stock_length,
                cuts = plan.cuts.len(),
                residual_waste = plan.residual_waste,
                "committed cutting plan"
            );
            total_waste += plan.total_waste() as u64;
            plans.push(plan);
        }

        let unassigned_pieces: Vec<PieceDemand> = self
            .pieces
            .iter()
            .filter(|p| p.remaining > 0)
            .copied()
            .collect();
        let unused_stock = self
            .stock
            .iter()
            .map(|s| UnusedStock {
                length: s.length,
                unused: s.remaining,
            })
            .collect();

        tracing::info!(
            plans = plans.len(),
            total_waste,
            unassigned = unassigned_pieces.len(),
            "planning finished"
        );

        OptimizationResult {
            plans,
            total_waste,
            unassigned_pieces,
            unused_stock,
            skipped: self.skipped,
            truncated,
        }
    }

    /// Piece indices by length, longest first.
    fn longest_first(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.pieces.len()).collect();
        order.sort_by(|&a, &b| self.pieces[b].length.cmp(&self.pieces[a].length));
        order
    }

    /// Packs one bar of `stock_length` against a copy of the remaining counts.
    fn simulate(&self, stock_length: u32, order: &[usize]) -> Bar {
        let mut left: Vec<u32> = self.pieces.iter().map(|p| p.remaining).collect();
        let mut bar = Bar::new(stock_length, self.config.blade_width);

        for &idx in order {
            let length = self.pieces[idx].length;
            while left[idx] > 0 && bar.fits(length) {
                bar.place(length, idx);
                left[idx] -= 1;
            }
        }
        bar
    }

    fn best_candidate(&self, order: &[usize]) -> Option<(usize, Bar)> {
        let mut best: Option<(usize, Bar)> = None;

        for (idx, stock) in self.stock.iter().enumerate() {
            if stock.remaining == 0 {
                continue;
            }
            let bar = self.simulate(stock.length, order);
            if bar.is_empty() {
                continue;
            }
            // Strict comparison keeps the shortest stock on equal waste
            if best
                .as_ref()
                .is_none_or(|(_, b)| bar.residual() < b.residual())
            {
                best = Some((idx, bar));
            }
        }
        best
    }

    fn commit(&mut self, stock_idx: usize, bar: Bar) -> CuttingPlan {
        self.stock[stock_idx].remaining -= 1;
        for cut in &bar.cuts {
            self.pieces[cut.source_piece_index].remaining -= 1;
        }
        bar.into_plan()
    }
}

/// Plans typed records with a given blade width.
pub fn plan(
    pieces: &[RawRecord],
    stock: &[RawRecord],
    blade_width: u32,
) -> Result<OptimizationResult, Error> {
    let config = PlannerConfig {
        blade_width,
        ..PlannerConfig::default()
    };
    plan_sources(Some(pieces), Some(stock), config)
}

/// Reads and normalizes both input sets, then runs the planner.
///
/// Both sources are required and the stock must hold at least one usable
/// record. A piece source with records none of which survive normalization
/// is an error; one that delivers no records at all is planned as empty.
pub fn plan_sources<P, S>(
    pieces: Option<P>,
    stock: Option<S>,
    config: PlannerConfig,
) -> Result<OptimizationResult, Error>
where
    P: RecordSource,
    S: RecordSource,
{
    let pieces = pieces.ok_or(Error::MissingInput {
        kind: InputKind::Pieces,
    })?;
    let stock = stock.ok_or(Error::MissingInput {
        kind: InputKind::Stock,
    })?;

    let pieces = input::normalize_pieces(pieces.read_records()?);
    let stock = input::normalize_stock(stock.read_records()?);
    pieces.ensure_usable(InputKind::Pieces)?;
    stock.ensure_usable(InputKind::Stock)?;

    let mut skipped = pieces.skipped;
    skipped.extend(stock.skipped);

    Ok(Planner::new(pieces.items, stock.items, config)
        .with_skipped(skipped)
        .solve())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::TextList;
    use std::collections::HashMap;

    fn records(pairs: &[(u32, u32)]) -> Vec<RawRecord> {
        pairs
            .iter()
            .map(|&(l, q)| RawRecord::new(l as i64, q as i64))
            .collect()
    }

    /// Checks the bookkeeping every result must satisfy:
    /// 1. Each plan's cuts, kerf loss and residual waste add up to its stock length
    /// 2. No plan is empty and kerf loss matches the cut count
    /// 3. Total waste equals the sum over all plans
    /// 4. Cut counts plus unassigned remainders give back the requested quantities
    /// 5. Consumed plus unused bars give back the available quantities
    fn assert_result_valid(
        result: &OptimizationResult,
        pieces: &[(u32, u32)],
        stock: &[(u32, u32)],
        blade_width: u32,
    ) {
        for (i, plan) in result.plans.iter().enumerate() {
            assert!(!plan.cuts.is_empty(), "plan {i} has no cuts");
            assert_eq!(
                plan.kerf_loss,
                (plan.cuts.len() as u32 - 1) * blade_width,
                "plan {i} kerf loss"
            );
            assert_eq!(
                plan.cut_length() + plan.kerf_loss + plan.residual_waste,
                plan.stock_length,
                "plan {i} does not conserve length"
            );
        }

        let waste: u64 = result.plans.iter().map(|p| p.total_waste() as u64).sum();
        assert_eq!(result.total_waste, waste);

        let mut cut_counts: HashMap<u32, u32> = HashMap::new();
        for cut in result.plans.iter().flat_map(|p| &p.cuts) {
            *cut_counts.entry(cut.length).or_default() += 1;
        }
        for &(length, quantity) in pieces {
            let unassigned: u32 = result
                .unassigned_pieces
                .iter()
                .filter(|p| p.length == length)
                .map(|p| p.remaining)
                .sum();
            assert_eq!(
                cut_counts.get(&length).copied().unwrap_or(0) + unassigned,
                quantity,
                "piece {length} not conserved"
            );
        }

        for &(length, quantity) in stock {
            let used = result
                .plans
                .iter()
                .filter(|p| p.stock_length == length)
                .count() as u32;
            let unused = result
                .unused_stock
                .iter()
                .find(|s| s.length == length)
                .map(|s| s.unused)
                .unwrap_or(0);
            assert_eq!(used + unused, quantity, "stock {length} not conserved");
        }
    }

    fn cut_lengths(plan: &CuttingPlan) -> Vec<u32> {
        plan.cuts.iter().map(|c| c.length).collect()
    }

    #[test]
    fn test_longest_first_packing_leaves_remainder() {
        let result = plan(
            &records(&[(1000, 3), (2000, 1)]),
            &records(&[(5000, 1)]),
            4,
        )
        .unwrap();
        assert_result_valid(&result, &[(1000, 3), (2000, 1)], &[(5000, 1)], 4);

        assert_eq!(result.plan_count(), 1);
        let plan = &result.plans[0];
        assert_eq!(cut_lengths(plan), vec![2000, 1000, 1000]);
        assert_eq!(plan.used_length(), 4008);
        assert_eq!(plan.residual_waste, 992);
        assert_eq!(plan.kerf_loss, 8);
        assert_eq!(result.total_waste, 1000);
        assert_eq!(
            result.unassigned_pieces,
            vec![PieceDemand {
                length: 1000,
                quantity: 3,
                remaining: 1
            }]
        );
        assert!(!result.is_complete());
    }

    #[test]
    fn test_piece_longer_than_all_stock() {
        let result = plan(&records(&[(500, 1)]), &records(&[(100, 5)]), 4).unwrap();
        assert!(result.plans.is_empty());
        assert_eq!(result.total_waste, 0);
        assert_eq!(
            result.unassigned_pieces,
            vec![PieceDemand {
                length: 500,
                quantity: 1,
                remaining: 1
            }]
        );
        assert_eq!(
            result.unused_stock,
            vec![UnusedStock {
                length: 100,
                unused: 5
            }]
        );
    }

    #[test]
    fn test_exact_fit() {
        let result = plan(&records(&[(500, 2)]), &records(&[(1004, 1)]), 4).unwrap();
        assert_result_valid(&result, &[(500, 2)], &[(1004, 1)], 4);
        assert_eq!(result.plan_count(), 1);
        assert_eq!(cut_lengths(&result.plans[0]), vec![500, 500]);
        assert_eq!(result.plans[0].kerf_loss, 4);
        assert_eq!(result.plans[0].residual_waste, 0);
        assert_eq!(result.total_waste, 4);
        assert!(result.is_complete());
    }

    #[test]
    fn test_equal_waste_prefers_shorter_stock() {
        // 900 on a 1000 bar and 1900 on a 2000 bar both leave 100
        let stock = [(2000, 1), (1000, 1)];
        let pieces = [(900, 1), (1900, 1)];
        let result = plan(&records(&pieces), &records(&stock), 4).unwrap();
        assert_result_valid(&result, &pieces, &stock, 4);

        assert_eq!(result.plan_count(), 2);
        assert_eq!(result.plans[0].stock_length, 1000);
        assert_eq!(cut_lengths(&result.plans[0]), vec![900]);
        assert_eq!(result.plans[1].stock_length, 2000);
        assert_eq!(cut_lengths(&result.plans[1]), vec![1900]);
        assert_eq!(result.total_waste, 200);
    }

    #[test]
    fn test_smallest_residual_wins_over_order() {
        // 2500 stock takes 1200+1200 with 96 left; 1300 leaves 100
        let result = plan(
            &records(&[(1200, 2)]),
            &records(&[(1300, 2), (2500, 1)]),
            4,
        )
        .unwrap();
        assert_result_valid(&result, &[(1200, 2)], &[(1300, 2), (2500, 1)], 4);
        assert_eq!(result.plan_count(), 1);
        assert_eq!(result.plans[0].stock_length, 2500);
        assert_eq!(result.plans[0].residual_waste, 96);
        assert_eq!(
            result.unused_stock,
            vec![
                UnusedStock {
                    length: 1300,
                    unused: 2
                },
                UnusedStock {
                    length: 2500,
                    unused: 0
                },
            ]
        );
    }

    #[test]
    fn test_empty_pieces_is_noop() {
        let result = plan(&[], &records(&[(6000, 3)]), 4).unwrap();
        assert!(result.plans.is_empty());
        assert_eq!(result.total_waste, 0);
        assert!(result.is_complete());
        assert_eq!(
            result.unused_stock,
            vec![UnusedStock {
                length: 6000,
                unused: 3
            }]
        );
    }

    #[test]
    fn test_runs_out_of_stock() {
        let result = plan(&records(&[(3000, 5)]), &records(&[(6100, 1)]), 4).unwrap();
        assert_result_valid(&result, &[(3000, 5)], &[(6100, 1)], 4);
        assert_eq!(result.plan_count(), 1);
        assert_eq!(cut_lengths(&result.plans[0]), vec![3000, 3000]);
        assert_eq!(result.unassigned_pieces[0].remaining, 3);
        assert_eq!(result.unused_stock[0].unused, 0);
    }

    #[test]
    fn test_zero_blade_width() {
        let result = plan(&records(&[(250, 4)]), &records(&[(1000, 1)]), 0).unwrap();
        assert_result_valid(&result, &[(250, 4)], &[(1000, 1)], 0);
        assert_eq!(result.plans[0].cuts.len(), 4);
        assert_eq!(result.total_waste, 0);
    }

    #[test]
    fn test_mixed_job() {
        let pieces = [(1200, 7), (850, 12), (2300, 4), (400, 15), (3100, 2)];
        let stock = [(6000, 6), (5000, 4), (7500, 3)];
        let result = plan(&records(&pieces), &records(&stock), 4).unwrap();
        assert_result_valid(&result, &pieces, &stock, 4);
        assert!(result.is_complete());
        assert!(!result.truncated);
    }

    #[test]
    fn test_deterministic() {
        let pieces = records(&[(1200, 7), (850, 12), (2300, 4), (400, 15)]);
        let stock = records(&[(6000, 6), (5000, 4), (7500, 3)]);
        let first = plan(&pieces, &stock, 4).unwrap();
        let second = plan(&pieces, &stock, 4).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_iteration_cap() {
        let config = PlannerConfig {
            blade_width: 4,
            max_iterations: Some(2),
        };
        let result = plan_sources(
            Some(records(&[(1000, 10)])),
            Some(records(&[(1000, 10)])),
            config,
        )
        .unwrap();
        assert_result_valid(&result, &[(1000, 10)], &[(1000, 10)], 4);
        assert_eq!(result.plan_count(), 2);
        assert!(result.truncated);
        assert_eq!(result.unassigned_pieces[0].remaining, 8);
    }

    #[test]
    fn test_missing_input() {
        let err = plan_sources(
            Some(TextList("1000,2")),
            None::<TextList>,
            PlannerConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::MissingInput {
                kind: InputKind::Stock
            }
        ));

        let err = plan_sources(None::<TextList>, None::<TextList>, PlannerConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::MissingInput {
                kind: InputKind::Pieces
            }
        ));
    }

    #[test]
    fn test_all_records_invalid() {
        let err = plan_sources(
            Some(TextList("abc; 0,3")),
            Some(TextList("6000,2")),
            PlannerConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::EmptyInput {
                kind: InputKind::Pieces,
                skipped: 2
            }
        ));
    }

    #[test]
    fn test_empty_stock_is_rejected() {
        let err = plan(&records(&[(1000, 2)]), &[], 4).unwrap_err();
        assert!(matches!(
            err,
            Error::EmptyInput {
                kind: InputKind::Stock,
                skipped: 0
            }
        ));

        let err = plan_sources(
            Some(TextList("1000,2")),
            Some(TextList("")),
            PlannerConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::EmptyInput {
                kind: InputKind::Stock,
                ..
            }
        ));
    }

    #[test]
    fn test_merged_quantity_overflow_is_reported() {
        let result = plan(&records(&[(10, u32::MAX), (10, 5)]), &records(&[(10, 1)]), 0).unwrap();
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].position, 2);
        assert_eq!(result.unassigned_pieces[0].quantity, u32::MAX);
        assert_eq!(result.unassigned_pieces[0].remaining, u32::MAX - 1);
    }

    #[test]
    fn test_skipped_records_reported() {
        let result = plan_sources(
            Some(TextList("1000,3; 2000,1; x,1")),
            Some(TextList("5000,1; 4000,0")),
            PlannerConfig::default(),
        )
        .unwrap();
        assert_eq!(result.skipped.len(), 2);
        assert_eq!(result.skipped[0].kind, InputKind::Pieces);
        assert_eq!(result.skipped[0].position, 3);
        assert_eq!(result.skipped[1].kind, InputKind::Stock);
        assert_eq!(result.unused_stock.len(), 1);
    }

    #[test]
    fn test_duplicate_piece_lengths_merge() {
        let result = plan(
            &records(&[(600, 1), (400, 1), (600, 1)]),
            &records(&[(1000, 2)]),
            0,
        )
        .unwrap();
        assert_result_valid(&result, &[(600, 2), (400, 1)], &[(1000, 2)], 0);
        assert!(result.is_complete());
        for cut in result.plans.iter().flat_map(|p| &p.cuts) {
            let expected = if cut.length == 600 { 0 } else { 1 };
            assert_eq!(cut.source_piece_index, expected);
        }
    }
}
