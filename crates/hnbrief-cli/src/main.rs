mod output;

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use hnbrief_client::hn::DEFAULT_HN_API;
use hnbrief_client::summarizer::{DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TEMPERATURE};
use hnbrief_client::{
    ClientConfig, Feed, HnApiClient, OpenAiSummarizer, ReadabilityExtractor, ReqwestFetcher,
    TextFormat, build_http_client,
};
use hnbrief_core::enrich::{DEFAULT_FETCH_CONCURRENCY, DEFAULT_FETCH_TIMEOUT};
use hnbrief_core::{
    EnrichConfig, EnrichedRecord, EnrichmentCoordinator, EnrichmentReport, ItemId,
    PromptTemplate, Summary, SummaryService, TracingEnrichReporter,
};

#[derive(Parser)]
#[command(
    name = "hnbrief",
    version,
    about = "Summarize the articles linked from Hacker News"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List stories, extract their articles and summarize each in one sentence
    Summarize {
        /// Number of stories to take from the listing
        #[arg(short = 'k', long, default_value_t = 5, value_parser = clap::value_parser!(u8).range(1..=20))]
        last_k: u8,

        /// Which listing to read (new, top, best)
        #[arg(short, long, default_value_t = Feed::New)]
        feed: Feed,

        /// LLM model to use (e.g., "gpt-5.2", "gemini-2.5-flash")
        #[arg(short, long, env = "HNBRIEF_MODEL", default_value = DEFAULT_MODEL)]
        model: String,

        /// Sampling temperature
        #[arg(short, long, default_value_t = DEFAULT_TEMPERATURE, conflicts_with = "server_temperature")]
        temperature: f32,

        /// Leave the temperature to the server (for models that reject it)
        #[arg(long, default_value_t = false)]
        server_temperature: bool,

        /// OpenAI-compatible API base URL
        #[arg(short, long, env = "HNBRIEF_BASE_URL", default_value = DEFAULT_BASE_URL)]
        base_url: String,

        /// API key (falls back to OPENAI_API_KEY)
        #[arg(short, long, env = "HNBRIEF_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Prompt template file using {{title}}, {{url}}, {{content}}... placeholders
        #[arg(long)]
        template: Option<PathBuf>,

        #[command(flatten)]
        batch: BatchArgs,
    },

    /// Run only the enrichment stage and print records and skip reasons
    Enrich {
        /// Number of stories to take from the listing
        #[arg(short = 'k', long, value_parser = clap::value_parser!(u8).range(1..=20), required_unless_present = "ids", conflicts_with = "ids")]
        last_k: Option<u8>,

        /// Explicit item ids, comma separated
        #[arg(long, value_delimiter = ',', num_args = 1..)]
        ids: Vec<ItemId>,

        /// Which listing to read with --last-k (new, top, best)
        #[arg(short, long, default_value_t = Feed::New)]
        feed: Feed,

        #[command(flatten)]
        batch: BatchArgs,
    },
}

/// Settings shared by every subcommand that runs a batch.
#[derive(Args)]
struct BatchArgs {
    /// Hacker News API base URL
    #[arg(long, env = "HNBRIEF_HN_API", default_value = DEFAULT_HN_API)]
    hn_api: String,

    /// Maximum articles fetched at once
    #[arg(short, long, default_value_t = DEFAULT_FETCH_CONCURRENCY)]
    concurrency: usize,

    /// Per-article fetch timeout in seconds
    #[arg(long, default_value_t = DEFAULT_FETCH_TIMEOUT.as_secs())]
    fetch_timeout: u64,

    /// Extract articles as Markdown instead of plain text
    #[arg(long, default_value_t = false)]
    markdown: bool,

    /// Print a JSON array instead of pretty text
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Show skipped articles, reasons and timings
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

impl BatchArgs {
    fn enrich_config(&self) -> EnrichConfig {
        EnrichConfig::default()
            .with_fetch_concurrency(self.concurrency)
            .with_fetch_timeout(Duration::from_secs(self.fetch_timeout))
    }

    fn extractor(&self) -> ReadabilityExtractor {
        let format = if self.markdown {
            TextFormat::Markdown
        } else {
            TextFormat::Plain
        };
        ReadabilityExtractor::new().with_format(format)
    }
}

/// Everything needed to enrich a batch, built around one shared HTTP client.
/// Dropping it closes the connection pool.
struct Pipeline {
    hn: HnApiClient,
    coordinator: EnrichmentCoordinator<HnApiClient, ReqwestFetcher, ReadabilityExtractor>,
    client: reqwest::Client,
}

impl Pipeline {
    fn new(batch: &BatchArgs) -> Result<Self> {
        let client =
            build_http_client(&ClientConfig::default()).context("Failed to create HTTP client")?;
        let hn = HnApiClient::new(client.clone()).with_base_url(&batch.hn_api);
        // The user controls the machine; links to local hosts are theirs to follow.
        let fetcher = ReqwestFetcher::with_client(client.clone())
            .with_timeout(Duration::from_secs(batch.fetch_timeout))
            .allow_private_urls();

        let coordinator =
            EnrichmentCoordinator::new(hn.clone(), fetcher, batch.extractor(), batch.enrich_config())
                .context("Invalid enrichment settings")?;

        Ok(Self {
            hn,
            coordinator,
            client,
        })
    }

    async fn list(&self, feed: Feed, k: u8) -> Result<Vec<ItemId>> {
        let ids = self
            .hn
            .story_ids(feed, usize::from(k))
            .await
            .with_context(|| format!("Failed to list {feed} stories"))?;
        tracing::info!(%feed, count = ids.len(), "Listed stories");
        Ok(ids)
    }

    async fn enrich(&self, ids: &[ItemId], cancel: &CancellationToken) -> EnrichmentReport {
        self.coordinator
            .enrich_with(ids, cancel, &TracingEnrichReporter)
            .await
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let verbose = match &cli.command {
        Commands::Summarize { batch, .. } | Commands::Enrich { batch, .. } => batch.verbose,
    };
    let directive = if verbose { "hnbrief=debug" } else { "hnbrief=info" };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cancel = CancellationToken::new();
    let ctrl_c = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, finishing with what is done");
                cancel.cancel();
            }
        }
    });

    let result = match cli.command {
        Commands::Summarize {
            last_k,
            feed,
            model,
            temperature,
            server_temperature,
            base_url,
            api_key,
            template,
            batch,
        } => {
            let temperature = (!server_temperature).then_some(temperature);
            let settings = SummarizeSettings {
                last_k,
                feed,
                model,
                temperature,
                base_url,
                api_key,
                template,
            };
            cmd_summarize(settings, &batch, &cancel).await
        }
        Commands::Enrich {
            last_k,
            ids,
            feed,
            batch,
        } => cmd_enrich(last_k, ids, feed, &batch, &cancel).await,
    };

    ctrl_c.abort();
    result
}

struct SummarizeSettings {
    last_k: u8,
    feed: Feed,
    model: String,
    temperature: Option<f32>,
    base_url: String,
    api_key: Option<String>,
    template: Option<PathBuf>,
}

async fn cmd_summarize(
    settings: SummarizeSettings,
    batch: &BatchArgs,
    cancel: &CancellationToken,
) -> Result<()> {
    let started = Instant::now();

    // Configuration problems surface before any network traffic.
    let api_key = match settings.api_key {
        Some(key) if !key.trim().is_empty() => key,
        _ => match std::env::var("OPENAI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => key,
            _ => bail!(
                "No API key. Pass --api-key or set HNBRIEF_API_KEY or OPENAI_API_KEY (a .env file works too)."
            ),
        },
    };
    let template = match &settings.template {
        Some(path) => PromptTemplate::from_file(path).context("Invalid prompt template")?,
        None => PromptTemplate::default(),
    };

    tracing::debug!(
        last_k = settings.last_k,
        feed = %settings.feed,
        model = %settings.model,
        temperature = ?settings.temperature,
        "Starting"
    );

    let summaries = {
        let pipeline = Pipeline::new(batch)?;
        let summarizer = OpenAiSummarizer::new(pipeline.client.clone(), &api_key, &settings.model)
            .with_base_url(&settings.base_url)
            .with_temperature(settings.temperature)
            .context("Invalid summarizer settings")?;

        let ids = pipeline.list(settings.feed, settings.last_k).await?;
        let report = pipeline.enrich(&ids, cancel).await;

        if batch.verbose {
            output::write_run_report(&mut io::stderr().lock(), &report)?;
        }

        let records = report.into_records();
        tracing::info!(records = records.len(), model = summarizer.model(), "Summarizing");
        let service = SummaryService::new(summarizer, template);
        tokio::select! {
            summaries = service.summarize_all(records.clone()) => summaries,
            () = cancel.cancelled() => unsummarized(records),
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if batch.json {
        output::write_summaries_json(&mut out, &summaries)?;
    } else {
        output::write_summaries_pretty(&mut out, &summaries)?;
    }
    out.flush()?;

    if batch.verbose {
        output::write_total(&mut io::stderr().lock(), started.elapsed())?;
    }

    Ok(())
}

/// Records printed without a summary after an interrupt.
fn unsummarized(records: Vec<EnrichedRecord>) -> Vec<Summary> {
    records
        .into_iter()
        .map(|record| Summary {
            record,
            summary: None,
            error: Some("cancelled".into()),
        })
        .collect()
}

async fn cmd_enrich(
    last_k: Option<u8>,
    ids: Vec<ItemId>,
    feed: Feed,
    batch: &BatchArgs,
    cancel: &CancellationToken,
) -> Result<()> {
    let started = Instant::now();

    let report = {
        let pipeline = Pipeline::new(batch)?;
        let ids = match last_k {
            Some(k) => pipeline.list(feed, k).await?,
            None if !ids.is_empty() => ids,
            None => bail!("Pass --last-k or --ids"),
        };
        pipeline.enrich(&ids, cancel).await
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if batch.json {
        output::write_outcomes_json(&mut out, &report.results)?;
    } else {
        output::write_outcomes_pretty(&mut out, &report.results)?;
    }
    out.flush()?;

    if batch.verbose {
        let mut err = io::stderr().lock();
        output::write_run_report(&mut err, &report)?;
        output::write_total(&mut err, started.elapsed())?;
    }

    Ok(())
}
