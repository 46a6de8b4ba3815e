use std::path::PathBuf;
use std::result::Result;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::Parser;
use dotenvy::dotenv;

use sales_performance::{
    clock::{Clock, FixedClock, SystemClock},
    config::load_config,
    engine::SalesPerformanceEngine,
    error::AppError,
    models::PerformanceQuery,
    observability::init_tracing,
    repositories::JsonFileSalesRepository,
    services::SalesPerformanceService,
};

/// Ranks products by sales performance over a JSON dataset and prints the report.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Dataset with `products` and `transactions`. Defaults to `dataset.path` from config.
    #[arg(long)]
    dataset: Option<PathBuf>,

    /// best-selling, slow-moving or all
    #[arg(long)]
    performance_type: Option<String>,

    #[arg(long)]
    category_id: Option<String>,

    #[arg(long)]
    supplier_id: Option<String>,

    #[arg(long)]
    min_quantity: Option<u64>,

    /// quantity, revenue or profit
    #[arg(long)]
    sort_by: Option<String>,

    /// asc or desc
    #[arg(long)]
    sort_order: Option<String>,

    /// RFC 3339 start of the purchase window (inclusive)
    #[arg(long)]
    start_date: Option<DateTime<Utc>>,

    /// RFC 3339 end of the purchase window (inclusive)
    #[arg(long)]
    end_date: Option<DateTime<Utc>>,

    /// Pin "now" for reproducible staleness figures
    #[arg(long)]
    now: Option<DateTime<Utc>>,

    #[arg(long, default_value_t = false)]
    pretty: bool,
}

impl Cli {
    fn query(&self) -> PerformanceQuery {
        PerformanceQuery {
            performance_type: self.performance_type.clone(),
            category_id: self.category_id.clone(),
            supplier_id: self.supplier_id.clone(),
            min_quantity: self.min_quantity,
            sort_by: self.sort_by.clone(),
            sort_order: self.sort_order.clone(),
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenv().ok();

    let cli = Cli::parse();
    let config = load_config()?;

    init_tracing(config.environment.as_str(), &config.observability);

    tracing::info!(
        app_name = %config.app.name,
        version = %config.app.version,
        environment = %config.environment.as_str(),
        "Starting sales performance report"
    );

    let dataset = cli.dataset.clone().unwrap_or_else(|| config.dataset.path.clone());
    let clock: Arc<dyn Clock> = match cli.now {
        Some(now) => Arc::new(FixedClock(now)),
        None => Arc::new(SystemClock),
    };

    let service = SalesPerformanceService::new(
        Arc::new(JsonFileSalesRepository::new(dataset)),
        clock,
        SalesPerformanceEngine::new(config.analytics.thresholds()),
    );

    let report = match service.get_performance(cli.query()).await {
        Ok(report) => report,
        Err(e) => {
            let error_id = e.error_id();
            e.log_error(error_id);
            eprintln!("{}", serde_json::to_string(&e.to_report(error_id))?);
            std::process::exit(if e.is_client_error() { 2 } else { 1 });
        }
    };

    let output = if cli.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{}", output);

    Ok(())
}
