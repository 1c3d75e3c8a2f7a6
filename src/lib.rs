//! One-dimensional cutting stock planner.
//!
//! Assigns required piece lengths to available stock bars, accounting for saw
//! kerf between adjacent cuts, with a greedy least-waste heuristic.

pub mod bar;
pub mod error;
pub mod input;
pub mod render;
pub mod solver;
pub mod types;

pub use error::{Error, InputKind, SkipReason, SkippedRecord};
pub use input::{CsvSource, JsonRows, RawRecord, RecordSource, TextList};
pub use solver::{Planner, plan, plan_sources};
pub use types::{
    Cut, CuttingPlan, DEFAULT_BLADE_WIDTH, OptimizationResult, PieceDemand, PlannerConfig,
    StockUnit, StockUsage, UnusedStock,
};
