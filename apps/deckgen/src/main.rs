mod config;
mod export;
mod progress;
mod run;
mod store;

use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{validate_request, GenerationClient, ServiceApi};
use shared::{domain::Provider, protocol::ProviderStatus};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    config::{load_settings, ExportMode, Settings},
    progress::summary,
    run::{follow_run, save_received},
    store::{load_deck, SavedDeck},
};

#[derive(Parser, Debug)]
#[command(name = "deckgen", version, about = "Generate slide decks and export them as PDF")]
struct Cli {
    /// Config file; defaults to ./deckgen.toml when present.
    #[arg(long, global = true)]
    config: Option<String>,
    #[arg(long, global = true)]
    server_url: Option<String>,
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,
    #[arg(long, global = true)]
    chrome_path: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a deck for a topic, save it, and export it as PDF.
    Generate(GenerateArgs),
    /// Show the service status and which providers have a server-side key.
    Health,
    /// Validate and store a provider API key on the service.
    SaveKey {
        #[arg(long)]
        provider: Provider,
        #[arg(long)]
        api_key: String,
    },
    /// Export a previously saved deck JSON file as PDF.
    Export {
        deck: PathBuf,
        #[arg(long)]
        export_mode: Option<ExportMode>,
    },
}

#[derive(Args, Debug)]
struct GenerateArgs {
    topic: String,
    #[arg(long)]
    provider: Option<Provider>,
    #[arg(long)]
    api_key: Option<String>,
    #[arg(long)]
    export_mode: Option<ExportMode>,
    /// Stop after saving the deck JSON.
    #[arg(long)]
    no_export: bool,
    /// Write a JPEG thumbnail of each slide as it arrives.
    #[arg(long)]
    thumbnails: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(server_url) = cli.server_url {
        settings.server_url = server_url;
    }
    if let Some(output_dir) = cli.output_dir {
        settings.output_dir = output_dir;
    }
    if let Some(chrome_path) = cli.chrome_path {
        settings.chrome_path = Some(chrome_path);
    }

    match cli.command {
        Command::Generate(args) => run_generate(settings, args).await,
        Command::Health => run_health(&settings).await,
        Command::SaveKey { provider, api_key } => run_save_key(&settings, provider, &api_key).await,
        Command::Export { deck, export_mode } => {
            if let Some(mode) = export_mode {
                settings.export_mode = mode;
            }
            let deck = load_deck(&deck).await?;
            let path = export::export_deck(&settings, &deck, None).await?;
            println!("{}", path.display());
            Ok(())
        }
    }
}

async fn run_health(settings: &Settings) -> Result<()> {
    let health = ServiceApi::new(settings.server_url.clone()).health().await?;
    println!("status: {}", health.status);
    println!("qwen key on server: {}", health.providers.qwen);
    println!("gemini key on server: {}", health.providers.gemini);
    if let Some(active) = health.active_provider {
        println!("active provider: {active}");
    }
    Ok(())
}

async fn run_save_key(settings: &Settings, provider: Provider, api_key: &str) -> Result<()> {
    let api = ServiceApi::new(settings.server_url.clone());
    let response = api.save_key(provider, api_key).await?;
    if !response.success {
        bail!(
            "{} key rejected: {}",
            provider.display_name(),
            response.error.as_deref().unwrap_or("unknown error")
        );
    }
    println!("{} key saved", provider.display_name());
    Ok(())
}

async fn server_keys(api: &ServiceApi) -> ProviderStatus {
    match api.health().await {
        Ok(health) => health.providers,
        Err(err) => {
            warn!("health check failed, assuming no server-side keys: {err:#}");
            ProviderStatus::default()
        }
    }
}

async fn run_generate(mut settings: Settings, args: GenerateArgs) -> Result<()> {
    if let Some(provider) = args.provider {
        settings.provider = provider;
    }
    if let Some(api_key) = args.api_key {
        settings.api_key = api_key;
    }
    if let Some(mode) = args.export_mode {
        settings.export_mode = mode;
    }

    let api = ServiceApi::new(settings.server_url.clone());
    let request = validate_request(
        &args.topic,
        settings.provider,
        &settings.api_key,
        &server_keys(&api).await,
    )?;

    let needs_browser =
        args.thumbnails || (!args.no_export && settings.export_mode == ExportMode::Client);
    let rasterizer = if needs_browser {
        Some(export::launch_rasterizer(&settings).await?)
    } else {
        None
    };

    let client = GenerationClient::new(settings.server_url.clone());
    let thumbnails = match (&rasterizer, args.thumbnails) {
        (Some(rasterizer), true) => Some(tokio::spawn(export::capture_thumbnails(
            settings.clone(),
            Arc::clone(rasterizer),
            client.subscribe_events(),
        ))),
        _ => None,
    };

    client.start_generation(&request).await?;
    let outcome = follow_run(&client).await;
    client.shutdown().await;
    eprint!("{}", summary(&outcome.state));

    if let Some(task) = thumbnails {
        if outcome.is_complete() {
            match task.await {
                Ok(count) => info!(count, "thumbnails written"),
                Err(err) => warn!("thumbnail task failed: {err}"),
            }
        } else {
            task.abort();
        }
    }

    if let Some(path) = save_received(&settings.output_dir, &outcome.state).await? {
        println!("{}", path.display());
    }
    if let Some(reason) = outcome.failure() {
        bail!("{reason}");
    }
    if !args.no_export {
        let deck = SavedDeck::from_state(&outcome.state);
        let path = export::export_deck(&settings, &deck, rasterizer).await?;
        println!("{}", path.display());
    }
    Ok(())
}
