use anyhow::Context;
use clap::{Parser, ValueEnum};
use monto_core::ingest::fixture::FixtureDataProvider;
use monto_core::ingest::{HttpJsonDataProvider, MarketDataProvider};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod report;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "monto_worker")]
struct Args {
    /// Amount to invest this month, in base currency. Defaults to the strategy's monthly target.
    #[arg(long)]
    monthly_amount: Option<f64>,

    /// Market as-of date (YYYY-MM-DD). Defaults to the latest completed session.
    #[arg(long)]
    as_of_date: Option<String>,

    /// Use the built-in deterministic market instead of DATA_PROVIDER_BASE_URL.
    #[arg(long)]
    fixture: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = monto_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let strategy = settings.load_strategy()?;
    strategy.validate().context("invalid strategy config")?;

    let as_of_date =
        monto_core::time::market_date::resolve_as_of_date(args.as_of_date.as_deref(), chrono::Utc::now())?;
    let monthly_amount = args.monthly_amount.unwrap_or(strategy.monthly_target);

    let provider: Box<dyn MarketDataProvider> = if args.fixture {
        Box::new(FixtureDataProvider::new(strategy.assets.clone(), as_of_date))
    } else {
        Box::new(HttpJsonDataProvider::from_settings(&settings)?)
    };

    tracing::info!(
        %as_of_date,
        monthly_amount,
        provider = provider.provider_name(),
        strategy_version = strategy.version,
        "recommendation run starting"
    );

    let result = monto_core::pipeline::generate_recommendation(
        provider.as_ref(),
        &strategy,
        monthly_amount,
        as_of_date,
    )
    .await;

    let recommendation = match result {
        Ok(rec) => rec,
        Err(err) => {
            let kind = err.kind();
            let err = anyhow::Error::new(err);
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(%as_of_date, ?kind, error = %err, "recommendation run failed");
            return Err(err);
        }
    };

    if recommendation.equity_sentiment.is_defaulted() || recommendation.crypto_sentiment.is_defaulted() {
        tracing::warn!(%as_of_date, "recommendation uses a defaulted sentiment reading");
    }

    tracing::info!(
        %as_of_date,
        regime = recommendation.plan.regime.label(),
        total_investment = recommendation.plan.total_investment,
        "recommendation ready"
    );

    match args.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&recommendation)
                .context("failed to serialize recommendation")?;
            println!("{json}");
        }
        OutputFormat::Text => print!("{}", report::render(&recommendation)),
    }

    Ok(())
}

fn init_sentry(settings: &monto_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
