//! model-select - Main Entry Point
//!
//! Grid-search model selection from the command line.

use clap::Parser;
use model_select::cli::{cmd_grid, cmd_info, cmd_select, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "model_select=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Select {
            data,
            target,
            drop,
            one_hot,
            family,
            config,
            cv_folds,
            seed,
            n_jobs,
            output,
        } => {
            cmd_select(
                &data,
                &target,
                &drop,
                &one_hot,
                &family,
                config.as_deref(),
                cv_folds,
                seed,
                n_jobs,
                output.as_deref(),
            )?;
        }
        Commands::Grid { family } => {
            cmd_grid(&family)?;
        }
        Commands::Info { data } => {
            cmd_info(&data)?;
        }
    }

    Ok(())
}
