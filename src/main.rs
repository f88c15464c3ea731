use std::time::Instant;

use clap::Parser;
use strip_cutter::kit::MAX_SPLIT_ROWS;
use strip_cutter::render;
use strip_cutter::{CutPositions, Kit, Rect, Solver, SolverConfig};
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "strip_cutter",
    about = "Exact guillotine strip packing of rectangular details"
)]
struct Cli {
    /// Strip width
    #[arg(long)]
    width: u32,

    /// Details as AxB or AxB:qty (e.g. 3x1:2 2x1 2x2 3x2)
    #[arg(long = "details", num_args = 1.., required = true)]
    details: Vec<String>,

    /// Vertical cut positions: item-sides or combinations
    #[arg(long, default_value = "item-sides", value_parser = parse_cut_positions)]
    cut_positions: CutPositions,

    /// Also prune horizontal splits by area
    #[arg(long)]
    horizontal_bound: bool,

    /// Give up after this many milliseconds
    #[arg(long)]
    time_limit_ms: Option<u64>,

    /// Show ASCII layout of the strip
    #[arg(long)]
    layout: bool,

    /// Log search progress
    #[arg(long, short)]
    verbose: bool,
}

fn parse_cut_positions(s: &str) -> Result<CutPositions, String> {
    match s {
        "item-sides" => Ok(CutPositions::ItemSides),
        "combinations" => Ok(CutPositions::Combinations),
        _ => Err(format!(
            "invalid cut positions '{}', expected: item-sides or combinations",
            s
        )),
    }
}

fn parse_dimensions(s: &str) -> Result<Rect, String> {
    let parts: Vec<&str> = s.split('x').collect();
    if parts.len() != 2 {
        return Err(format!("invalid dimensions '{}', expected AxB", s));
    }
    let a = parts[0]
        .parse::<u32>()
        .map_err(|_| format!("invalid side in '{}'", s))?;
    let b = parts[1]
        .parse::<u32>()
        .map_err(|_| format!("invalid side in '{}'", s))?;
    if a == 0 || b == 0 {
        return Err(format!("dimensions must be non-zero in '{}'", s));
    }
    Ok(Rect::new(a, b))
}

fn parse_detail(s: &str) -> Result<Vec<Rect>, String> {
    let Some((dims, qty)) = s.split_once(':') else {
        return Ok(vec![parse_dimensions(s)?]);
    };
    let rect = parse_dimensions(dims)?;
    let qty = qty
        .parse::<usize>()
        .map_err(|_| format!("invalid quantity in '{}'", s))?;
    if qty == 0 {
        return Err(format!("quantity must be non-zero in '{}'", s));
    }
    if qty as u64 > MAX_SPLIT_ROWS {
        return Err(format!(
            "quantity in '{}' exceeds the limit of {}",
            s, MAX_SPLIT_ROWS
        ));
    }
    Ok(rect.repeat(qty))
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    let items: Vec<Rect> = cli
        .details
        .iter()
        .map(|d| parse_detail(d))
        .collect::<Result<Vec<_>, _>>()
        .map(|groups| groups.concat())
        .unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        });

    let kit = Kit::new(&items).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });
    println!("{kit}");

    let config = SolverConfig {
        cut_positions: cli.cut_positions,
        horizontal_area_bound: cli.horizontal_bound,
        time_limit_ms: cli.time_limit_ms,
    };
    let started = Instant::now();
    let solution = Solver::new(&kit, config)
        .solve(cli.width)
        .unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        });
    let elapsed = started.elapsed();

    let Some(plan) = solution.plan.as_ref() else {
        eprintln!(
            "No guillotine packing exists at width {}: some detail is wider than the strip",
            cli.width
        );
        std::process::exit(2);
    };

    print!("{}", render::report(plan));
    if cli.layout {
        print!(
            "{}",
            render::render_strip(cli.width, solution.height, &plan.placements())
        );
    }
    println!(
        "{} details packed in {:.3} s ({} subproblems).\nTotal roll length: {}.",
        kit.detail_count(),
        elapsed.as_secs_f64(),
        solution.explored,
        solution.height,
    );
}
