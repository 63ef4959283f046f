//! Model selection CLI module
//!
//! Command-line interface for running a selection, listing grids and
//! inspecting CSV files.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::SelectionConfig;
use crate::optimizer::HyperparameterGrid;
use crate::selection::{ModelSelection, SelectionReport};
use crate::training::ModelFamily;
use crate::utils::{DataLoader, LoadingConfig};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "model-select")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Grid-search model selection with cross-validation")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Split, grid-search, validate and test on a CSV dataset
    Select {
        /// Input CSV file
        #[arg(short, long)]
        data: PathBuf,

        /// Target column name
        #[arg(short, long)]
        target: String,

        /// Columns to drop before encoding (comma separated)
        #[arg(long, value_delimiter = ',')]
        drop: Vec<String>,

        /// Categorical columns to one-hot encode (comma separated)
        #[arg(long, value_delimiter = ',')]
        one_hot: Vec<String>,

        /// Model family (random_forest, svc, all)
        #[arg(short, long, default_value = "all")]
        family: String,

        /// JSON run configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of cross-validation folds
        #[arg(long)]
        cv_folds: Option<usize>,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Worker threads
        #[arg(long)]
        n_jobs: Option<usize>,

        /// Write the full report as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the default hyperparameter grids
    Grid {
        /// Model family (random_forest, svc, all)
        #[arg(short, long, default_value = "all")]
        family: String,
    },

    /// Show data information
    Info {
        /// Input CSV file
        #[arg(short, long)]
        data: PathBuf,
    },
}

/// Families named by a CLI argument
pub fn parse_families(arg: &str) -> anyhow::Result<Vec<ModelFamily>> {
    if arg.eq_ignore_ascii_case("all") {
        return Ok(ModelFamily::all().to_vec());
    }
    arg.split(',')
        .map(|name| Ok(name.trim().parse::<ModelFamily>()?))
        .collect()
}

// ─── Commands ──────────────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
pub fn cmd_select(
    data_path: &Path,
    target: &str,
    drop: &[String],
    one_hot: &[String],
    family: &str,
    config_path: Option<&Path>,
    cv_folds: Option<usize>,
    seed: Option<u64>,
    n_jobs: Option<usize>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    section("Select");

    let mut config = match config_path {
        Some(path) => SelectionConfig::from_json_file(path)?,
        None => SelectionConfig::default(),
    };
    if let Some(folds) = cv_folds {
        config = config.with_cv_folds(folds);
    }
    if let Some(seed) = seed {
        config = config.with_random_state(seed);
    }
    if let Some(n) = n_jobs {
        config = config.with_n_jobs(n);
    }
    config.validate()?;
    let families = parse_families(family)?;

    step_run("Loading data");
    let start = Instant::now();
    let loading = LoadingConfig::new(target)
        .with_drop_columns(drop.to_vec())
        .with_one_hot_columns(one_hot.to_vec());
    let dataset = DataLoader::new(loading).load(data_path)?;
    step_done(&format!(
        "{} rows × {} features, {} classes in {:?}",
        dataset.n_samples(),
        dataset.n_features(),
        dataset.n_classes(),
        start.elapsed()
    ));

    let selection = ModelSelection::new(config);
    for &f in &families {
        let grid = selection.grid(f);
        step_ok(&format!(
            "{} grid: {} configurations × {} folds",
            f.to_string().cyan(),
            grid.len(),
            selection.config().cv_folds
        ));
    }

    step_run("Searching");
    let start = Instant::now();
    let report = selection.run(&dataset, &families)?;
    step_done(&format!("{:?}", start.elapsed()));

    print_report(&report);

    if let Some(path) = output {
        report.save_json(path)?;
        step_ok(&format!("Report written to {}", path.display()));
        println!();
    }

    Ok(())
}

fn print_report(report: &SelectionReport) {
    let [train, validation, test] = report.split_sizes;
    println!();
    println!(
        "  {:<16} {} / {} / {}",
        muted("Split"),
        train,
        validation,
        test
    );

    for family in &report.families {
        section(&format!("{}", family.family));

        println!("  {:<16} {}", muted("Best params"), family.search.best_config.to_string().white());
        println!(
            "  {:<16} {} {}",
            muted("CV score"),
            format!("{:.4}", family.search.best_score).white().bold(),
            dim(&format!("± {:.4}", family.search.best_std))
        );
        if let Some(validation) = &family.validation {
            println!(
                "  {:<16} {} {}",
                muted("Validation"),
                format!("{:.4}", validation.mean_test_score).white(),
                dim(&format!("± {:.4}", validation.std_test_score))
            );
        }
        println!(
            "  {:<16} {}",
            muted("Fits"),
            format!("{} in {:.2}s", family.search.n_fits, family.search.elapsed_secs).white()
        );
        if family.search.timed_out {
            println!("  {}", "budget exhausted, partial grid evaluated".yellow());
        }

        println!();
        for line in family.test_report.render(&report.class_names).lines() {
            println!("  {}", line);
        }
    }

    for failure in &report.failures {
        section(&format!("{}", failure.family));
        println!("  {:<16} {}", muted("No model"), failure.error.red());
    }

    if let Some(best) = report.best_family() {
        println!();
        line_box_top();
        line_box(&kv("Best family   ", &best.family.to_string()));
        line_box_sep();
        line_box(&kv("CV score      ", &format!("{:.4}", best.search.best_score)));
        line_box(&kv("Test accuracy ", &format!("{:.4}", best.test_accuracy())));
        line_box_bottom();
    }
    println!();
}

/// Print the expanded default grid of each family
pub fn cmd_grid(family: &str) -> anyhow::Result<()> {
    for f in parse_families(family)? {
        let grid = f.default_grid();
        section(&format!("{} · {} configurations", f, grid.len()));
        print_grid(&grid);
    }
    println!();
    Ok(())
}

fn print_grid(grid: &HyperparameterGrid) {
    for config in grid.iter() {
        println!("  {:>4} {}", dim(&format!("#{}", config.index)), config);
    }
}

pub fn cmd_info(data_path: &Path) -> anyhow::Result<()> {
    section("Data Info");

    let info = DataLoader::file_info(data_path)?;

    println!("  {:<12} {}", muted("File"), info.path);
    println!("  {:<12} {:.2} KB", muted("Size"), info.file_size as f64 / 1024.0);
    println!("  {:<12} {}", muted("Rows"), info.n_rows);
    println!("  {:<12} {}", muted("Incomplete"), info.n_rows_with_missing);
    println!("  {:<12} {}", muted("Columns"), info.columns.len());
    println!();

    println!("  {:<24} {:<12}", muted("Column"), muted("Type"));
    println!("  {}", dim(&"─".repeat(36)));

    for (name, dtype) in &info.columns {
        println!("  {:<24} {:<12}", name, dtype.truecolor(140, 140, 140));
    }

    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_families() {
        assert_eq!(parse_families("all").unwrap().len(), 2);
        assert_eq!(
            parse_families("svc, rf").unwrap(),
            vec![ModelFamily::SupportVector, ModelFamily::RandomForest]
        );
        assert!(parse_families("boosting").is_err());
    }

    #[test]
    fn test_cli_parses_select() {
        let cli = Cli::try_parse_from([
            "model-select",
            "select",
            "--data",
            "adult.csv",
            "--target",
            "income",
            "--drop",
            "fnlwgt,education",
            "--family",
            "rf",
        ])
        .unwrap();

        match cli.command {
            Commands::Select { drop, family, .. } => {
                assert_eq!(drop, vec!["fnlwgt", "education"]);
                assert_eq!(family, "rf");
            }
            _ => panic!("expected select"),
        }
    }

    #[test]
    fn test_grid_command() {
        assert!(cmd_grid("all").is_ok());
    }
}
