use std::path::PathBuf;

use clap::Parser;
use profile_cutter::input::{CsvSource, RecordEntries, RecordSource, TextList};
use profile_cutter::render;
use profile_cutter::types::{DEFAULT_BLADE_WIDTH, PlannerConfig};
use profile_cutter::{Error, plan_sources};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "profile_cutter",
    about = "1D cutting stock planner for profile bars"
)]
struct Cli {
    /// Required pieces as length,qty separated by ';' (e.g. "1000,3; 2000,2")
    #[arg(long, conflicts_with = "pieces_file")]
    pieces: Option<String>,

    /// CSV file with Length and Quantity columns listing required pieces
    #[arg(long)]
    pieces_file: Option<PathBuf>,

    /// Stock bars as length,qty separated by ';' (e.g. "6000,4; 5000,2")
    #[arg(long, conflicts_with = "stock_file")]
    stock: Option<String>,

    /// CSV file with Length and Quantity columns listing stock bars
    #[arg(long)]
    stock_file: Option<PathBuf>,

    /// Blade kerf width in mm
    #[arg(long, default_value_t = DEFAULT_BLADE_WIDTH)]
    kerf: u32,

    /// Stop after this many stock bars have been planned
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Show an ASCII bar for each plan
    #[arg(long)]
    layout: bool,

    /// Print the full result as JSON
    #[arg(long)]
    json: bool,
}

enum Source {
    Text(String),
    Csv(PathBuf),
}

impl Source {
    fn from_args(text: Option<String>, file: Option<PathBuf>) -> Option<Self> {
        text.map(Source::Text).or(file.map(Source::Csv))
    }
}

impl RecordSource for Source {
    fn read_records(self) -> Result<RecordEntries, Error> {
        match self {
            Source::Text(text) => TextList(&text).read_records(),
            Source::Csv(path) => CsvSource::open(path)?.read_records(),
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let config = PlannerConfig {
        blade_width: cli.kerf,
        max_iterations: cli.max_iterations,
    };
    let pieces = Source::from_args(cli.pieces, cli.pieces_file);
    let stock = Source::from_args(cli.stock, cli.stock_file);

    let result = plan_sources(pieces, stock, config).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    if cli.json {
        let json = serde_json::to_string_pretty(&result).unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        });
        println!("{json}");
        return;
    }

    for (i, plan) in result.plans.iter().enumerate() {
        println!("Plan {}: stock {} mm", i + 1, plan.stock_length);
        let cuts: Vec<String> = plan.cuts.iter().map(|c| c.length.to_string()).collect();
        println!("  cuts: {} mm", cuts.join(", "));
        println!(
            "  waste: {} mm, kerf loss: {} mm",
            plan.residual_waste, plan.kerf_loss
        );
        if cli.layout {
            print!("{}", render::render_plan(plan));
        }
        println!();
    }

    if !result.is_complete() {
        println!("Unassigned pieces:");
        for p in &result.unassigned_pieces {
            println!("  {} mm x {}", p.length, p.remaining);
        }
        println!();
    }

    println!("Stock usage:");
    for s in result.stock_usage() {
        println!("  {} mm: {}/{} used", s.length, s.used, s.total);
    }
    println!();

    if result.truncated {
        println!("Stopped early after {} plans", result.plan_count());
    }
    println!(
        "Summary: {} plan{}, {} mm total waste ({:.1}%)",
        result.plan_count(),
        if result.plan_count() == 1 { "" } else { "s" },
        result.total_waste,
        result.waste_percent(),
    );
}
