use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::thread::JoinHandle;
use tracing::info;
use weekly_post::api::{HttpPlatform, PlatformError};
use weekly_post::config::{self, AppConfig, Credentials};
use weekly_post::content::{ContentDir, ContentSource};
use weekly_post::ledger::{JsonFileStore, Ledger};
use weekly_post::pipeline::{Pipeline, PipelineEvent, RunOutcome, Trigger};
use weekly_post::publish::PostStyle;
use weekly_post::{output, schedule, telemetry};

#[derive(Parser)]
#[command(name = "weekly-post")]
#[command(about = "Publish a weekly folder of text and images to LinkedIn")]
#[command(long_about = "\
Publish a weekly folder of text and images to LinkedIn

Each ISO week has its own folder. The text file is the post body; images
are attached in file name order. A week is posted at most once: published
weeks are recorded in the ledger and skipped afterwards.

Content structure:

  images/
  ├── week1/
  │   ├── content.txt        # Post body (required, trimmed)
  │   ├── 01-board.jpg       # Images: .jpg .jpeg .png, any case
  │   └── 02-wiring.png
  └── week2/
      └── content.txt        # No images = text-only post

Credentials are read from the environment, then from .env:
  LINKEDIN_ACCESS_TOKEN   OAuth bearer token (required)
  LINKEDIN_URN            Author, e.g. urn:li:person:abc123 (required)

Run 'weekly-post gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Config file (stock defaults when missing)
    #[arg(long, default_value = "config.toml", global = true)]
    config: PathBuf,

    /// Content directory, overrides `content_root`
    #[arg(long, global = true)]
    content_root: Option<PathBuf>,

    /// Ledger file, overrides `ledger_path`
    #[arg(long, global = true)]
    ledger: Option<PathBuf>,

    /// Dotenv file with credentials (process variables take precedence)
    #[arg(long, default_value = ".env", global = true)]
    env_file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Publish one week now (defaults to the current ISO week)
    Run {
        #[arg(long)]
        week: Option<u32>,
    },
    /// Stay running and publish on the configured cron schedule
    Schedule,
    /// Validate a week's content without publishing
    Check {
        #[arg(long, conflicts_with = "all")]
        week: Option<u32>,
        /// Validate every week directory
        #[arg(long)]
        all: bool,
    },
    /// List published weeks
    Ledger,
    /// Print the ISO week number for today or a given date
    Week {
        /// Date as YYYY-MM-DD
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

type HttpPipeline = Pipeline<HttpPlatform, ContentDir, JsonFileStore>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match cli.command {
        Command::GenConfig => AppConfig::default(),
        _ => resolve_config(&cli)?,
    };
    telemetry::init(&config.logging.level);

    match cli.command {
        Command::Run { week } => {
            let period = week.unwrap_or_else(schedule::current_period);
            let credentials = Credentials::from_env(&cli.env_file)?;
            let (tx, printer) = spawn_printer();
            let pipeline = build_pipeline(&config, &credentials)?.with_events(tx);

            let result = pipeline.run_once(period, Trigger::Manual).await;
            drop(pipeline);
            printer.join().ok();

            match result? {
                RunOutcome::Published(entry) => {
                    println!("==> Published week {}", entry.period);
                }
                RunOutcome::AlreadyPublished { period } => {
                    println!("==> Week {} was already published, nothing to do", period);
                }
            }
        }
        Command::Schedule => {
            let cron = schedule::parse_schedule(&config.schedule.cron)?;
            let credentials = Credentials::from_env(&cli.env_file)?;
            let (tx, _printer) = spawn_printer();
            let pipeline = build_pipeline(&config, &credentials)?.with_events(tx);

            println!("==> Scheduling '{}'", config.schedule.cron);
            if let Some(next) = schedule::next_fire(&cron, &Local::now()) {
                println!("==> Next run: {}", next.format("%Y-%m-%d %H:%M %Z"));
            }
            info!(ledger = %config.ledger_path, content = %config.content_root, "scheduler started");
            schedule::run_scheduled(&pipeline, &cron).await?;
        }
        Command::Check { week, all } => {
            let content = ContentDir::from_config(&config);
            let ledger = Ledger::open(JsonFileStore::new(config.ledger_path()))?;
            let periods = if all {
                println!("==> Checking {}", content.root().display());
                content.available_periods()?
            } else {
                vec![week.unwrap_or_else(schedule::current_period)]
            };

            let mut failed = 0;
            for period in &periods {
                match content.resolve(*period) {
                    Ok(bundle) => {
                        output::print_bundle(&bundle);
                        if ledger.has(*period) {
                            println!("    Already published");
                        }
                    }
                    Err(e) => {
                        failed += 1;
                        output::print_check_error(*period, &e);
                    }
                }
            }
            if failed > 0 {
                return Err(format!("{} of {} weeks failed validation", failed, periods.len()).into());
            }
            println!("==> Content is valid");
        }
        Command::Ledger => {
            let store = JsonFileStore::new(config.ledger_path());
            let path = store.path().to_path_buf();
            let ledger = Ledger::open(store)?;
            output::print_ledger(&path, ledger.entries());
        }
        Command::Week { date } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            println!("{}", schedule::iso_week_number(date));
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Config file plus command-line overrides.
fn resolve_config(cli: &Cli) -> Result<AppConfig, config::ConfigError> {
    let mut config = config::load_config(&cli.config)?;
    if let Some(root) = &cli.content_root {
        config.content_root = root.display().to_string();
    }
    if let Some(ledger) = &cli.ledger {
        config.ledger_path = ledger.display().to_string();
    }
    Ok(config)
}

fn build_pipeline(config: &AppConfig, credentials: &Credentials) -> Result<HttpPipeline, PlatformError> {
    let platform = HttpPlatform::new(&config.platform, credentials)?;
    Ok(Pipeline::new(
        platform,
        ContentDir::from_config(config),
        JsonFileStore::new(config.ledger_path()),
    )
    .with_style(PostStyle::from(&config.post)))
}

/// Print pipeline events from a background thread until the sender drops.
fn spawn_printer() -> (Sender<PipelineEvent>, JoinHandle<()>) {
    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_run_event(&event) {
                println!("{}", line);
            }
        }
    });
    (tx, printer)
}
