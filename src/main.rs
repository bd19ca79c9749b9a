use anyhow::Result;
use campaign_loader::{
    campaign::{
        template::{write_template, DEFAULT_TEMPLATE_NAME},
        valid_records,
    },
    config::Config,
    import::read_csv_file,
    submit::{CampaignClient, Session, SubmitOptions},
    table,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Import campaign rows from CSV and push them to the campaign-creation API.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write an empty import sheet with one example row
    Template {
        #[arg(short, long, default_value = DEFAULT_TEMPLATE_NAME)]
        output: PathBuf,
    },
    /// Show what a CSV imports as, without sending anything
    Preview { csv: PathBuf },
    /// Import a CSV and submit every complete row
    Run {
        csv: PathBuf,

        /// YAML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(long)]
        endpoint: Option<String>,

        #[arg(long)]
        user_id: Option<u64>,

        /// Campaigns per request
        #[arg(long)]
        batch_size: Option<usize>,

        /// Log the payloads instead of sending them
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── init logging ────────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Template { output } => write_template(&output).await,
        Command::Preview { csv } => preview(csv).await,
        Command::Run {
            csv,
            config,
            endpoint,
            user_id,
            batch_size,
            dry_run,
        } => {
            let mut cfg = Config::load(config.as_deref())?;
            if let Some(e) = endpoint {
                cfg.endpoint = e;
            }
            if let Some(u) = user_id {
                cfg.user_id = u;
            }
            if let Some(b) = batch_size {
                cfg.batch_size = b;
            }
            cfg.validate()?;
            run(csv, cfg, dry_run).await
        }
    }
}

async fn preview(csv: PathBuf) -> Result<()> {
    let sheet = read_csv_file(&csv).await?;
    print!("{}", table::render(&sheet.headers, &sheet.records));

    let missing = sheet.layout.missing_columns(&sheet.headers);
    if !missing.is_empty() {
        warn!(?missing, "sheet is missing expected columns");
    }
    println!(
        "{} rows, {} complete ({:?} layout)",
        sheet.records.len(),
        valid_records(&sheet.records).len(),
        sheet.layout
    );
    Ok(())
}

async fn run(csv: PathBuf, cfg: Config, dry_run: bool) -> Result<()> {
    let client = CampaignClient::new(&cfg)?;
    info!(endpoint = %client.endpoint(), "configured");

    let session = Session::new();
    session.load(read_csv_file(&csv).await?);
    print!("{}", table::render(&session.headers(), &session.records()));
    info!(layout = ?session.layout(), "sheet loaded");

    // ─── stream the session log to stdout ────────────────────────────
    let mut rx = session.subscribe();
    let printer = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            println!("{}", line);
        }
    });

    let opts = SubmitOptions {
        user_id: cfg.user_id,
        batch_size: cfg.batch_size,
        dry_run,
    };
    let summary = session.run(&client, &opts).await?;

    // dropping the session closes the log channel and ends the printer
    drop(session);
    if let Err(e) = printer.await {
        warn!("log printer failed: {}", e);
    }

    info!(
        submitted = summary.submitted,
        succeeded = summary.succeeded,
        failed = summary.failed,
        skipped = summary.skipped,
        dry_run = summary.dry_run,
        "done"
    );
    Ok(())
}
