use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use alacard::{report, Alacard, Settings};
use anyhow::Context;
use clap::Parser;
use tracing::info;

#[derive(Parser)]
#[command(name = "alacard", about = "Check Euroticket à la card balance and history")]
struct Cli {
    /// The card number
    #[arg(short = 'u', long)]
    username: String,
    /// The card access code
    #[arg(short = 'p', long)]
    password: String,
    /// Display card movements
    #[arg(short = 'm', long)]
    movements: bool,
    /// Print the card as JSON instead of the text report
    #[arg(long)]
    json: bool,
    /// Settings file (TOML, YAML or JSON)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(io::stderr)
        .try_init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::load(cli.config.as_deref()).context("loading settings")?;
    info!(base_url = %settings.base_url, legacy_tls = settings.legacy_tls, "settings loaded");

    let mut alacard = Alacard::connect(settings)?;
    let card = alacard
        .fetch(&cli.username, &cli.password, cli.movements)
        .context("reading card")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if cli.json {
        report::write_json(&mut out, &card)?;
    } else {
        report::write_report(&mut out, &card)?;
    }
    out.flush()?;
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
