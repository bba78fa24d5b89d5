use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use talos_client::{
    ClientConfig, CrawlOptions, ExtractOptions, Format, MapOptions, ScrapeOptions, TalosClient,
};
use talos_core::{JobHandle, JobKind};

#[derive(Parser)]
#[command(name = "talos", version, about = "Client for the Talos scraping API")]
struct Cli {
    /// API key (reads from TALOS_API_KEY env var if not provided)
    #[arg(long, env = "TALOS_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// API base URL
    #[arg(
        long,
        env = "TALOS_API_URL",
        default_value = talos_client::DEFAULT_API_URL,
        global = true
    )]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape a single URL and print its document
    Scrape {
        /// Target URL
        #[arg(short, long)]
        url: String,

        /// Formats to request (markdown, html, rawHtml, links, screenshot)
        #[arg(short, long, value_delimiter = ',')]
        formats: Vec<String>,
    },

    /// Crawl a site and print the aggregated documents
    Crawl {
        /// Starting URL
        #[arg(short, long)]
        url: String,

        /// Maximum number of pages
        #[arg(short, long)]
        limit: Option<u32>,

        /// Maximum link depth
        #[arg(short, long)]
        max_depth: Option<u32>,

        /// Seconds between status polls
        #[arg(long, default_value_t = 2)]
        poll_interval: u64,

        /// Print the job id and exit without waiting
        #[arg(long, default_value_t = false)]
        no_wait: bool,
    },

    /// Scrape a batch of URLs as one job
    BatchScrape {
        /// Target URLs
        #[arg(short, long, required = true, num_args = 1..)]
        urls: Vec<String>,

        /// Seconds between status polls
        #[arg(long, default_value_t = 2)]
        poll_interval: u64,
    },

    /// List the URLs of a site
    Map {
        /// Target URL
        #[arg(short, long)]
        url: String,

        /// Filter links by this search term
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Extract structured data from a set of URLs
    Extract {
        /// Source URLs
        #[arg(short, long, required = true, num_args = 1..)]
        urls: Vec<String>,

        /// Natural-language extraction instruction
        #[arg(short, long)]
        prompt: Option<String>,

        /// Path to a JSON Schema file for the extracted data
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Seconds between status polls
        #[arg(long, default_value_t = 2)]
        poll_interval: u64,
    },

    /// Show the current status of a job
    Status {
        /// Job id
        #[arg(short, long)]
        id: String,

        /// The id names a batch-scrape job rather than a crawl
        #[arg(long, default_value_t = false)]
        batch: bool,
    },

    /// List per-item errors of a job
    Errors {
        /// Job id
        #[arg(short, long)]
        id: String,

        /// The id names a batch-scrape job rather than a crawl
        #[arg(long, default_value_t = false)]
        batch: bool,
    },

    /// Cancel a crawl job
    Cancel {
        /// Job id
        #[arg(short, long)]
        id: String,
    },

    /// Stream a crawl job's progress over the event stream
    Watch {
        /// Job id
        #[arg(short, long)]
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Setup tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("talos=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let api_key = cli
        .api_key
        .context("TALOS_API_KEY not set. Pass --api-key or export it.")?;
    let config = ClientConfig::new(api_key).with_api_url(cli.api_url);
    let client = TalosClient::with_config(config).context("Failed to build client")?;

    match cli.command {
        Commands::Scrape { url, formats } => cmd_scrape(&client, &url, &formats).await?,
        Commands::Crawl {
            url,
            limit,
            max_depth,
            poll_interval,
            no_wait,
        } => cmd_crawl(&client, &url, limit, max_depth, poll_interval, no_wait).await?,
        Commands::BatchScrape {
            urls,
            poll_interval,
        } => cmd_batch_scrape(&client, &urls, poll_interval).await?,
        Commands::Map { url, search } => cmd_map(&client, &url, search).await?,
        Commands::Extract {
            urls,
            prompt,
            schema,
            poll_interval,
        } => cmd_extract(&client, urls, prompt, schema, poll_interval).await?,
        Commands::Status { id, batch } => {
            let status = client.job_status(&job_handle(id, batch)).await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Commands::Errors { id, batch } => {
            let errors = client.job_errors(&job_handle(id, batch)).await?;
            println!("{}", serde_json::to_string_pretty(&errors)?);
        }
        Commands::Cancel { id } => {
            client
                .cancel_crawl(&JobHandle::new(id, JobKind::Crawl))
                .await?;
        }
        Commands::Watch { id } => cmd_watch(&client, id).await?,
    }

    Ok(())
}

fn job_handle(id: String, batch: bool) -> JobHandle {
    let kind = if batch {
        JobKind::BatchScrape
    } else {
        JobKind::Crawl
    };
    JobHandle::new(id, kind)
}

fn parse_formats(formats: &[String]) -> Result<Option<Vec<Format>>> {
    if formats.is_empty() {
        return Ok(None);
    }
    formats
        .iter()
        .map(|s| match s.as_str() {
            "markdown" => Ok(Format::Markdown),
            "html" => Ok(Format::Html),
            "rawHtml" => Ok(Format::RawHtml),
            "links" => Ok(Format::Links),
            "screenshot" => Ok(Format::Screenshot),
            other => anyhow::bail!("unknown format '{other}'"),
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

async fn cmd_scrape(client: &TalosClient, url: &str, formats: &[String]) -> Result<()> {
    let options = ScrapeOptions {
        formats: parse_formats(formats)?,
        ..ScrapeOptions::default()
    };

    tracing::info!("Scraping {}", url);
    let document = client.scrape(url, &options).await?;

    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}

async fn cmd_crawl(
    client: &TalosClient,
    url: &str,
    limit: Option<u32>,
    max_depth: Option<u32>,
    poll_interval: u64,
    no_wait: bool,
) -> Result<()> {
    let options = CrawlOptions {
        limit,
        max_depth,
        ..CrawlOptions::default()
    };

    tracing::info!("Starting crawl of {}", url);
    let handle = client.start_crawl(url, &options).await?;
    tracing::info!(job_id = %handle.id(), "Crawl accepted");

    if no_wait {
        println!("{}", handle.id());
        return Ok(());
    }

    let status = client
        .wait_for_job(&handle, Duration::from_secs(poll_interval))
        .await?;
    tracing::info!(documents = status.data.len(), "Crawl finished");

    println!("{}", serde_json::to_string_pretty(&status.data)?);
    Ok(())
}

async fn cmd_batch_scrape(
    client: &TalosClient,
    urls: &[String],
    poll_interval: u64,
) -> Result<()> {
    tracing::info!(count = urls.len(), "Starting batch scrape");
    let status = client
        .batch_scrape(
            urls,
            &ScrapeOptions::default(),
            Duration::from_secs(poll_interval),
        )
        .await?;

    println!("{}", serde_json::to_string_pretty(&status.data)?);
    Ok(())
}

async fn cmd_map(client: &TalosClient, url: &str, search: Option<String>) -> Result<()> {
    let options = MapOptions {
        search,
        ..MapOptions::default()
    };

    let links = client.map(url, &options).await?;
    for link in &links {
        println!("{link}");
    }
    tracing::info!(count = links.len(), "Mapped site");
    Ok(())
}

async fn cmd_extract(
    client: &TalosClient,
    urls: Vec<String>,
    prompt: Option<String>,
    schema_path: Option<PathBuf>,
    poll_interval: u64,
) -> Result<()> {
    let mut options = ExtractOptions::new(urls);
    options.prompt = prompt;

    if let Some(path) = schema_path {
        let schema_str = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read schema file: {}", path.display()))?;
        options.schema =
            Some(serde_json::from_str(&schema_str).context("Invalid JSON in schema file")?);
    }

    tracing::info!("Starting extraction");
    let status = client
        .extract(&options, Duration::from_secs(poll_interval))
        .await?;

    println!(
        "{}",
        serde_json::to_string_pretty(&status.data.unwrap_or(serde_json::Value::Null))?
    );
    Ok(())
}

async fn cmd_watch(client: &TalosClient, id: String) -> Result<()> {
    let handle = JobHandle::new(id, JobKind::Crawl);
    let mut watcher = client.watcher(&handle);

    watcher.on_document(|doc| {
        if let Ok(line) = serde_json::to_string(doc) {
            println!("{line}");
        }
    });
    watcher.on_done(|documents| {
        tracing::info!(documents = documents.len(), "Stream finished");
    });
    watcher.on_error(|message| {
        tracing::error!(error = %message, "Stream failed");
    });

    watcher.connect().await?;
    tracing::info!(job_id = %watcher.job_id(), "Watching crawl");

    let close = watcher.close_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, closing stream");
            close.close();
        }
    });

    let state = watcher.wait().await;
    tracing::info!(%state, "Watch ended");

    Ok(())
}
