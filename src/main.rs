//! # brochure CLI
//!
//! Command-line front end for the brochure pipeline.
//!
//! - `generate`: scrape a company website and write a brochure
//! - `links`: print the links the model considers relevant
//!
//! Settings come from the environment and `config/.env`; flags override them.
//! Without `OPENAI_API_KEY` (or with `--offline`) the run uses fixture content
//! and a simulated model.

mod telemetry;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use brochure::brochure::{Tone, offline::fixture_content};
use brochure::compiler::ConsolidatedContent;
use brochure::config::Settings;
use brochure::export::{ExportFormat, Exporter};
use brochure::fetch::{FetchConfig, Fetcher};
use brochure::language::{detect_language, is_language_supported, language_name};
use brochure::metrics::Metrics;
use brochure::model::{ModelBackend, OfflineChatModel};
use brochure::pipeline::{Pipeline, PipelineOptions};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, instrument, warn};

#[derive(Parser)]
#[command(author, version, about = "Generate a company brochure from its website", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scrape a website and write a brochure
    Generate(GenerateArgs),

    /// Print the links selected as relevant for a brochure
    Links(LinksArgs),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Company name used in the brochure
    #[arg(short, long)]
    company: String,

    /// Landing page of the company website
    #[arg(short, long)]
    url: String,

    /// Writing style
    #[arg(short, long, value_enum, default_value_t = Tone::Formal)]
    tone: Tone,

    /// Brochure language (ISO 639-1); detected from the landing page when omitted
    #[arg(short, long)]
    language: Option<String>,

    /// Output formats; Markdown is always written
    #[arg(short, long, value_enum, num_args = 1.., default_values_t = [ExportFormat::Md])]
    format: Vec<ExportFormat>,

    /// Model used for every completion
    #[arg(short, long)]
    model: Option<String>,

    /// Serve pages from the HTML cache when fresh
    #[arg(long)]
    use_cache: bool,

    /// Use fixture content and a simulated model
    #[arg(long)]
    offline: bool,

    /// Also translate the brochure into this language
    #[arg(long, value_name = "LANG")]
    translate: Option<String>,

    /// Pause between page fetches in milliseconds
    #[arg(long, default_value = "1500")]
    delay_ms: u64,

    /// Directory for exports and the log file
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct LinksArgs {
    /// Landing page of the company website
    #[arg(short, long)]
    url: String,

    /// Model used for link selection
    #[arg(short, long)]
    model: Option<String>,

    /// Serve the landing page from the HTML cache when fresh
    #[arg(long)]
    use_cache: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::from_env().context("Failed to load settings")?;
    if let Commands::Generate(args) = &cli.command {
        if let Some(output_dir) = &args.output_dir {
            settings.output_dir = output_dir.clone();
        }
    }

    let _telemetry =
        telemetry::init_tracing_subscriber(&settings.output_dir, settings.otlp_endpoint.is_some())?;

    match cli.command {
        Commands::Generate(args) => generate_command(args, settings).await?,
        Commands::Links(args) => links_command(args, settings).await?,
    }

    Ok(())
}

fn fetcher(settings: &Settings) -> anyhow::Result<Fetcher> {
    let config = FetchConfig::builder()
        .cache_dir(settings.cache_dir.clone())
        .webdriver_url(settings.webdriver_url.clone())
        .build();
    Fetcher::new(config).context("Failed to build HTTP client")
}

fn check_language(code: &str) -> anyhow::Result<()> {
    if !is_language_supported(code) {
        bail!("Unsupported language '{}'", code);
    }
    Ok(())
}

fn spinner(message: &str) -> anyhow::Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} [{elapsed_precise}] {msg}")?);
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(120));
    Ok(spinner)
}

/// Language of the fixture text, English when too short to tell
fn content_language(content: &ConsolidatedContent) -> String {
    let text = content.values().cloned().collect::<Vec<_>>().join("\n");
    detect_language(&text)
}

#[instrument(skip(settings))]
async fn generate_command(args: GenerateArgs, mut settings: Settings) -> anyhow::Result<()> {
    if let Some(model) = &args.model {
        settings.model = model.clone();
    }
    if let Some(language) = &args.language {
        check_language(language)?;
    }
    if let Some(language) = &args.translate {
        check_language(language)?;
    }

    let metrics = Arc::new(Metrics::new());
    let offline = args.offline || settings.is_offline();
    let model = if offline {
        ModelBackend::offline(
            OfflineChatModel::new(fixture_content(args.tone)),
            metrics.clone(),
        )
    } else {
        ModelBackend::live(&settings, metrics.clone())?
    };
    let fetcher = fetcher(&settings)?;
    let exporter =
        Exporter::new(settings.output_dir.clone()).with_webdriver(settings.webdriver_url.clone());

    let options = PipelineOptions {
        model: settings.model.clone(),
        delay: Duration::from_millis(args.delay_ms),
        use_cache: args.use_cache,
        ..PipelineOptions::default()
    };
    let pipeline = Pipeline::new(&model, &fetcher, metrics.clone(), options);

    println!("Generating {} brochure for {}...", args.tone, args.company);

    let (content, detected) = if offline {
        info!("Using offline fixture content instead of scraping {}", args.url);
        let content = fixture_content(args.tone);
        let language = content_language(&content);
        (content, language)
    } else {
        let html = pipeline.download(&args.url).await?;
        let landing = pipeline.extract_links(&html);
        let selection = pipeline
            .select_links(&args.url, &landing.page.links)
            .await?;
        println!("Selected {} relevant links", selection.links.len());
        exporter.save_json(&selection, "links").await?;

        let progress = spinner("Compiling selected pages...")?;
        let compiled = pipeline.compile(&selection).await;
        progress.finish_and_clear();
        let content = compiled?;
        exporter.save_json(&content, "compiled").await?;
        (content, landing.language)
    };

    let language = args.language.clone().unwrap_or(detected);
    println!("Writing brochure in {}", language_name(&language));

    let brochure = pipeline
        .generate_brochure(&args.company, &content, args.tone, &language)
        .await?;
    let paths = exporter
        .save_brochure(&brochure, &args.company, "brochure", &args.format)
        .await?;
    for path in &paths {
        println!("Saved brochure to {}", path.display());
    }

    if let Some(target) = &args.translate {
        if *target == language {
            warn!("Brochure is already in {}, skipping translation", target);
        } else {
            let translated = pipeline.translate(&brochure, target).await?;
            let paths = exporter
                .save_brochure(
                    &translated,
                    &args.company,
                    &format!("brochure_{}", target),
                    &args.format,
                )
                .await?;
            for path in &paths {
                println!("Saved {} translation to {}", language_name(target), path.display());
            }
        }
    }

    let summary = metrics.summary();
    exporter.save_json(&summary, "metrics").await?;
    println!("{}", summary);

    Ok(())
}

#[instrument(skip(settings))]
async fn links_command(args: LinksArgs, mut settings: Settings) -> anyhow::Result<()> {
    if let Some(model) = &args.model {
        settings.model = model.clone();
    }

    let metrics = Arc::new(Metrics::new());
    let model = if settings.is_offline() {
        ModelBackend::offline(
            OfflineChatModel::new(fixture_content(Tone::Formal)),
            metrics.clone(),
        )
    } else {
        ModelBackend::live(&settings, metrics.clone())?
    };
    let fetcher = fetcher(&settings)?;

    let options = PipelineOptions {
        model: settings.model.clone(),
        use_cache: args.use_cache,
        ..PipelineOptions::default()
    };
    let pipeline = Pipeline::new(&model, &fetcher, metrics, options);

    let html = pipeline.download(&args.url).await?;
    let landing = pipeline.extract_links(&html);
    let selection = pipeline
        .select_links(&args.url, &landing.page.links)
        .await?;

    println!("{}", serde_json::to_string_pretty(&selection)?);
    Ok(())
}
