use anyhow::{Context, ensure};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use steam_reviews::config::{ConfigLoader, ExportConfig, PurchaseType, ReviewType};
use steam_reviews::{MetricsCollector, MetricsSnapshot, export_reviews};

#[derive(Parser)]
#[command(name = "steam-reviews")]
#[command(version)]
#[command(about = "Export Steam app reviews to CSV for NLP", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export every review of one app
    Export {
        #[command(flatten)]
        args: ExportArgs,

        /// Show a progress spinner (stderr)
        #[arg(short, long)]
        progress: bool,
    },
    /// Validate a configuration file
    Check {
        /// Path to the configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(Args)]
struct ExportArgs {
    /// Configuration file (JSON/YAML/TOML); flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Steam app ID (required unless set in the config file)
    #[arg(long)]
    app_id: Option<u64>,

    /// Output CSV path, `-` for stdout [default: steam_reviews.csv]
    #[arg(long)]
    out: Option<String>,

    /// Delay between requests in seconds [default: 0.25]
    #[arg(long)]
    delay: Option<f64>,

    /// Review language (e.g. "english" or "all") [default: all]
    #[arg(long)]
    language: Option<String>,

    /// Purchase type [default: all]
    #[arg(long, value_enum)]
    purchase_type: Option<PurchaseType>,

    /// Review type [default: all]
    #[arg(long, value_enum)]
    review_type: Option<ReviewType>,

    /// 1 to filter off-topic review activity, else 0 [default: 0]
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=1))]
    filter_offtopic_activity: Option<u8>,

    /// Starting cursor token ('*' means begin)
    #[arg(long)]
    cursor: Option<String>,

    /// Field delimiter [default: ,]
    #[arg(long)]
    delimiter: Option<char>,

    /// Give up after this many failed attempts on one page [default: never]
    #[arg(long)]
    max_attempts: Option<u32>,
}

impl ExportArgs {
    fn into_config(self) -> anyhow::Result<ExportConfig> {
        let mut config = match &self.config {
            Some(path) => ConfigLoader::load_unchecked(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ExportConfig::default(),
        };

        if let Some(app_id) = self.app_id {
            config.app_id = app_id;
        }
        if let Some(out) = self.out {
            config.output.path = out;
        }
        if let Some(delay) = self.delay {
            ensure!(delay >= 0.0 && delay.is_finite(), "--delay must be a non-negative number");
            config.delay_ms = (delay * 1000.0).round() as u64;
        }
        if let Some(language) = self.language {
            config.language = language;
        }
        if let Some(purchase_type) = self.purchase_type {
            config.purchase_type = purchase_type;
        }
        if let Some(review_type) = self.review_type {
            config.review_type = review_type;
        }
        if let Some(flag) = self.filter_offtopic_activity {
            config.filter_offtopic_activity = flag == 1;
        }
        if let Some(cursor) = self.cursor {
            config.start_cursor = cursor;
        }
        if let Some(delimiter) = self.delimiter {
            config.output.delimiter = delimiter;
        }
        if let Some(max_attempts) = self.max_attempts {
            config.retry.max_attempts = Some(max_attempts);
        }

        config.check()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        unsafe { std::env::set_var("RUST_LOG", "info"); }
    }
    let cli = Cli::parse();
    let logger = env_logger::Builder::from_default_env().build();
    let level = logger.filter();
    let multi = indicatif::MultiProgress::new();

    match cli.command {
        Commands::Export { args, progress } => {
            if progress {
                indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
                    .try_init()
                    .context("installing logger")?;
            } else {
                log::set_boxed_logger(Box::new(logger)).context("installing logger")?;
            }
            log::set_max_level(level);

            let config = args.into_config()?;
            let metrics = Arc::new(MetricsCollector::new());

            let mut progress_task = None;
            let progress_bar = if progress {
                let pb = multi.add(ProgressBar::new_spinner());
                pb.set_style(
                    ProgressStyle::default_spinner()
                        .template("{spinner:.green} [{elapsed_precise}] {msg}")?,
                );
                pb.enable_steady_tick(Duration::from_millis(120));

                let mut metrics_rx = metrics.watch();
                let pb_clone = pb.clone();
                progress_task = Some(tokio::spawn(async move {
                    while metrics_rx.changed().await.is_ok() {
                        let snapshot: MetricsSnapshot = metrics_rx.borrow().clone();
                        pb_clone.set_message(progress_message(&snapshot));
                    }
                }));
                Some(pb)
            } else {
                None
            };

            let outcome = tokio::select! {
                result = export_reviews(&config, Some(metrics.clone())) => Some(result),
                _ = tokio::signal::ctrl_c() => None,
            };

            if let Some(task) = progress_task {
                task.abort();
            }
            if let Some(pb) = progress_bar {
                pb.finish_with_message(progress_message(&metrics.snapshot()));
            }

            let snapshot = metrics.snapshot();
            match outcome {
                Some(result) => {
                    let summary = result?;
                    println!(
                        "Written ({}): {} | Checked (all): {}",
                        config.language, summary.written, summary.checked
                    );
                    println!(
                        "   Pages: {} | Retries: {} | Stopped: {} | Time: {:.1}s",
                        summary.pages,
                        snapshot.retries(),
                        summary.termination,
                        snapshot.elapsed_seconds
                    );
                }
                None => {
                    log::warn!("Interrupted; {} already holds every row written so far", config.output.path);
                    println!(
                        "Written ({}): {} | Checked (all): {} (interrupted)",
                        config.language, snapshot.reviews_written, snapshot.reviews_checked
                    );
                }
            }
        }
        Commands::Check { config } => match ConfigLoader::load(&config) {
            Ok(cfg) => {
                println!("✅ Config is valid:");
                println!("   App: {}", cfg.app_id);
                println!("   Output: {}", cfg.output.path);
                println!("   Language: {}", cfg.language);
                println!(
                    "   Filters: purchase_type={} review_type={} offtopic={}",
                    cfg.purchase_type.as_str(),
                    cfg.review_type.as_str(),
                    u8::from(cfg.filter_offtopic_activity)
                );
            }
            Err(e) => {
                eprintln!("❌ Config error: {}", e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}

fn progress_message(snapshot: &MetricsSnapshot) -> String {
    let total = snapshot
        .total_reviews
        .map_or(String::new(), |t| format!(" of {}", t));
    format!(
        "Written: {} | Checked: {}{} | Pages: {} | Retries: {}",
        snapshot.reviews_written,
        snapshot.reviews_checked,
        total,
        snapshot.pages_fetched,
        snapshot.retries()
    )
}
