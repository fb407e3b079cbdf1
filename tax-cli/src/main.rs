use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tax_cli::app::{App, Outcome};
use tax_cli::logging;
use tax_cli::settings::AppSettings;
use tracing::{debug, error};

/// Thai personal income tax calculator.
///
/// Request bodies are JSON, read from `--file` or stdin. Every command prints
/// a JSON body to stdout; rejected input prints `{"error": "..."}` and exits 1.
#[derive(Parser, Debug)]
#[command(name = "tax-cli")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Settings file (defaults to ./tax-cli.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `tax_core=trace`. Overrides RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Also append log output to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Calculate tax for one JSON request
    Calculate {
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Calculate tax for every row of a CSV file
    Batch {
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Adjust stored deductions
    Admin {
        #[command(subcommand)]
        command: AdminCommand,
    },
}

#[derive(Subcommand, Debug)]
enum AdminCommand {
    /// Set the personal exemption from `{"amount": ...}`
    PersonalDeduction {
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Set the k-receipt upper limit from `{"amount": ...}`
    KReceipt {
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request file '{}'", path.display())),
        None => {
            let mut body = String::new();
            io::stdin()
                .read_to_string(&mut body)
                .context("Failed to read request from stdin")?;
            Ok(body)
        }
    }
}

fn configure_logging(
    cli: &Cli,
    settings: &AppSettings,
) -> Result<()> {
    let level = cli.log_level.clone().or_else(|| {
        if std::env::var_os("RUST_LOG").is_some() {
            None
        } else {
            settings.logging.level.clone()
        }
    });
    if let Some(level) = level {
        logging::set_log_level(&level)?;
    }

    if let Some(path) = cli.log_file.as_ref().or(settings.logging.file.as_ref()) {
        logging::enable_file_logging(path)?;
    }
    Ok(())
}

async fn run(
    app: &App,
    command: &Command,
) -> Result<Outcome> {
    match command {
        Command::Calculate { file } => app.calculate(&read_input(file.as_deref())?),
        Command::Batch { file } => app.batch(file),
        Command::Admin { command } => match command {
            AdminCommand::PersonalDeduction { file } => {
                app.update_personal_deduction(&read_input(file.as_deref())?)
                    .await
            }
            AdminCommand::KReceipt { file } => {
                app.update_k_receipt_limit(&read_input(file.as_deref())?)
                    .await
            }
        },
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    logging::init_default_logging();
    let cli = Cli::parse();

    let settings = AppSettings::load(cli.config.as_deref())?;
    configure_logging(&cli, &settings)?;
    debug!(?settings, "starting");

    let app = App::start(&settings).await?;
    let outcome = match run(&app, &cli.command).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("{e:#}");
            return Err(e);
        }
    };

    println!("{}", outcome.body());
    Ok(ExitCode::from(outcome.exit_code()))
}
