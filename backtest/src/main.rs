use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use dca_backtest::analyzer::{prompt, GeminiClient};
use dca_backtest::config::Config;
use dca_backtest::report;
use dca_backtest::session::{RunState, Session};
use dca_backtest::types::{find_preset, Currency, Frequency, Mode, ASSET_PRESETS};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "dcabt", about = "Search-grounded DCA backtest and contribution planner")]
struct Cli {
    /// compute (return of a fixed contribution) or backsolve (contribution for a target)
    #[arg(long, default_value = "compute")]
    mode: Mode,

    /// Asset name as it should be searched, e.g. "NVIDIA (NVDA)"
    #[arg(long, conflicts_with = "preset")]
    asset: Option<String>,

    /// Use a preset asset (nasdaq100, sp500, hstech, hsi, csi300, moutai, nvda, btc)
    #[arg(long)]
    preset: Option<String>,

    /// Contribution per period (compute mode)
    #[arg(long)]
    amount: Option<Decimal>,

    /// Target terminal value (backsolve mode)
    #[arg(long)]
    target: Option<Decimal>,

    #[arg(long)]
    currency: Option<Currency>,

    /// weekly, monthly or quarterly
    #[arg(long)]
    frequency: Option<Frequency>,

    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// End date (YYYY-MM-DD), defaults to today
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Load config from a specific .env file
    #[arg(long)]
    config_file: Option<String>,

    /// Print the run state as JSON instead of the text report
    #[arg(long)]
    json: bool,

    /// On failure, also print the retained raw model text
    #[arg(long)]
    show_raw: bool,

    /// Print the prompt and exit without calling the model
    #[arg(long)]
    print_prompt: bool,

    /// List asset presets and exit
    #[arg(long)]
    list_presets: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let cfg = Config::from_env_file(cli.config_file.as_deref())?;

    if cli.list_presets {
        for p in ASSET_PRESETS.iter() {
            println!("{:<10} {:<16} {}", p.key, p.label, p.asset);
        }
        return Ok(());
    }

    let mut scenario = cfg.default_scenario(cli.mode);
    if let Some(key) = cli.preset.as_deref() {
        let preset = find_preset(key).with_context(|| format!("Unknown preset: {key}"))?;
        scenario.asset = preset.asset.to_string();
    }
    if let Some(asset) = cli.asset {
        scenario.asset = asset;
    }
    if let Some(amount) = cli.amount {
        scenario.amount = amount;
    }
    if let Some(target) = cli.target {
        scenario.target = target;
    }
    if let Some(currency) = cli.currency {
        scenario.currency = currency;
    }
    if let Some(frequency) = cli.frequency {
        scenario.frequency = frequency;
    }
    if let Some(start) = cli.start {
        scenario.start_date = start;
    }
    if let Some(end) = cli.end {
        scenario.end_date = end;
    }
    scenario.validate().context("Invalid scenario")?;

    if cli.print_prompt {
        println!("{}", prompt::build(&scenario));
        return Ok(());
    }

    if !cfg.is_configured() {
        error!("GEMINI_API_KEY must be set");
        std::process::exit(1);
    }

    let gemini = GeminiClient::new(&cfg);
    info!("══════════════════════════════════════════════════════");
    info!("  DCA BACKTEST [{}]", scenario.mode);
    info!("  Asset: {}", scenario.asset);
    info!("  {}: {}{}", scenario.mode.amount_label(), scenario.currency_symbol(),
        if scenario.mode == Mode::Compute { scenario.amount } else { scenario.target });
    info!("  {} | {} → {}", scenario.frequency, scenario.start_date, scenario.end_date);
    info!("  Model: {} (Google Search grounding)", gemini.model());
    info!("══════════════════════════════════════════════════════");

    let session = Session::new(Arc::new(gemini));
    let state = session.run(scenario).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        println!("{}", report::render(&state, cli.show_raw));
    }

    if matches!(state, RunState::ParseFailed { .. }) {
        std::process::exit(2);
    }
    Ok(())
}
