use serde::{Deserialize, Serialize};

use crate::error::SkippedRecord;

/// Saw blade width used when the caller does not specify one, in mm.
pub const DEFAULT_BLADE_WIDTH: u32 = 4;

/// One required finished length and how many of it are still to be cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PieceDemand {
    pub length: u32,
    pub quantity: u32,
    pub remaining: u32,
}

impl PieceDemand {
    pub fn new(length: u32, quantity: u32) -> Self {
        Self {
            length,
            quantity,
            remaining: quantity,
        }
    }
}

/// One available stock profile length and how many raw bars of it are left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StockUnit {
    pub length: u32,
    pub quantity: u32,
    pub remaining: u32,
}

impl StockUnit {
    pub fn new(length: u32, quantity: u32) -> Self {
        Self {
            length,
            quantity,
            remaining: quantity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Cut {
    pub length: u32,
    /// Index of the `PieceDemand` this cut satisfies.
    pub source_piece_index: usize,
}

/// The cuts taken from exactly one consumed stock unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CuttingPlan {
    pub stock_length: u32,
    pub cuts: Vec<Cut>,
    pub kerf_loss: u32,
    pub residual_waste: u32,
}

impl CuttingPlan {
    /// Length consumed by cut pieces and kerfs together.
    pub fn used_length(&self) -> u32 {
        self.stock_length - self.residual_waste
    }

    pub fn cut_length(&self) -> u32 {
        self.cuts.iter().map(|c| c.length).sum()
    }

    pub fn total_waste(&self) -> u32 {
        self.kerf_loss + self.residual_waste
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UnusedStock {
    pub length: u32,
    pub unused: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StockUsage {
    pub length: u32,
    pub total: u32,
    pub used: u32,
}

/// Tunables for a planning run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub blade_width: u32,
    /// Upper bound on outer iterations; `None` runs until demand or stock runs out.
    pub max_iterations: Option<usize>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            blade_width: DEFAULT_BLADE_WIDTH,
            max_iterations: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptimizationResult {
    pub plans: Vec<CuttingPlan>,
    pub total_waste: u64,
    pub unassigned_pieces: Vec<PieceDemand>,
    pub unused_stock: Vec<UnusedStock>,
    /// Input records dropped during normalization.
    pub skipped: Vec<SkippedRecord>,
    /// Set when the run stopped at `PlannerConfig::max_iterations`.
    pub truncated: bool,
}

impl OptimizationResult {
    pub fn plan_count(&self) -> usize {
        self.plans.len()
    }

    pub fn is_complete(&self) -> bool {
        self.unassigned_pieces.is_empty()
    }

    /// Per stock length, how many bars were available and how many were cut.
    pub fn stock_usage(&self) -> Vec<StockUsage> {
        self.unused_stock
            .iter()
            .map(|s| {
                let used = self
                    .plans
                    .iter()
                    .filter(|p| p.stock_length == s.length)
                    .count() as u32;
                StockUsage {
                    length: s.length,
                    total: used + s.unused,
                    used,
                }
            })
            .collect()
    }

    /// Waste as a share of all consumed stock length.
    pub fn waste_percent(&self) -> f64 {
        let consumed: u64 = self.plans.iter().map(|p| p.stock_length as u64).sum();
        if consumed == 0 {
            return 0.0;
        }
        self.total_waste as f64 / consumed as f64 * 100.0
    }
}
