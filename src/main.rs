use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use estimo_core::config::{Config, ProviderKind};
use estimo_core::{Pipeline, PipelineSettings};
use estimo_gateway::GatewayServer;
use estimo_llm::AnyProvider;
use estimo_llm::ollama::OllamaProvider;
use estimo_llm::openai::OpenAiProvider;
use tokio::sync::watch;

#[derive(Debug, Parser)]
#[command(name = "estimo", version, about = "Answer project estimation questions from past estimates")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(
        long,
        global = true,
        env = "ESTIMO_CONFIG",
        default_value = "config/default.toml"
    )]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
enum Command {
    /// Build or load the index, then serve HTTP until Ctrl-C.
    Serve,
    /// Build or load the index and print a summary.
    Index,
    /// Answer a single question and print it to stdout.
    Ask { question: String },
}

type AppPipeline = Pipeline<AnyProvider, AnyProvider>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_subscriber();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;

    let pipeline = start_pipeline(&config).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config, pipeline).await,
        Command::Index => {
            print_index_summary(&config, &pipeline);
            Ok(())
        }
        Command::Ask { question } => {
            let response = pipeline.answer_query(&question).await?;
            println!("{}", response.answer);
            Ok(())
        }
    }
}

fn init_subscriber() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn create_provider(config: &Config) -> AnyProvider {
    let llm = &config.llm;
    match llm.provider {
        ProviderKind::OpenAi => {
            let api_key = config
                .secrets
                .api_key
                .as_ref()
                .map(|key| key.expose().to_owned())
                .unwrap_or_default();
            if api_key.is_empty() {
                tracing::warn!(
                    "ESTIMO_API_KEY is not set, requests to {} are unauthenticated",
                    llm.base_url
                );
            }
            AnyProvider::OpenAi(OpenAiProvider::new(
                api_key,
                llm.base_url.clone(),
                llm.generation_config(),
                Some(llm.embedding_model.clone()),
            ))
        }
        ProviderKind::Ollama => AnyProvider::Ollama(OllamaProvider::new(
            &llm.base_url,
            llm.model.clone(),
            llm.embedding_model.clone(),
        )),
    }
}

async fn start_pipeline(config: &Config) -> anyhow::Result<AppPipeline> {
    let provider = Arc::new(create_provider(config));
    tracing::info!(
        provider = config.llm.provider.as_str(),
        model = %config.llm.model,
        embedding_model = %config.llm.embedding_model,
        "starting pipeline"
    );
    let pipeline = Pipeline::start(PipelineSettings::from(config), Arc::clone(&provider), provider)
        .await
        .context("startup failed")?;
    Ok(pipeline)
}

async fn serve(config: &Config, pipeline: AppPipeline) -> anyhow::Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e}");
            return;
        }
        tracing::info!("received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    GatewayServer::new(
        &config.gateway.bind,
        config.gateway.port,
        Arc::new(pipeline),
        shutdown_rx,
    )
    .with_max_body_size(config.gateway.max_body_size)
    .with_cors_origins(config.gateway.cors_origins.clone())
    .serve()
    .await?;

    Ok(())
}

fn print_index_summary(config: &Config, pipeline: &AppPipeline) {
    let index = pipeline.index();
    println!("index:      {}", config.index.path.display());
    println!("origin:     {}", pipeline.origin().as_str());
    println!("chunks:     {}", index.len());
    println!("dimension:  {}", index.dimension());
    println!("metric:     {}", index.metric());
    println!("model:      {}", index.embedding_model());
}
