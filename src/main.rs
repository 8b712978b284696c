use anyhow::Context;
use lexsum::{
    api::{self, ApiSettings},
    archive::SummaryArchive,
    auth::BasicCredentials,
    config::{self, Config},
    extraction::{FormRecognizerClient, PollSettings},
    logging,
    pipeline::{PipelineService, PipelineSettings},
    storage::AzureBlobStore,
    summarization::{AzureOpenAiSettings, AzureOpenAiSummarizer},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_file = config::load_env_file();
    logging::init_tracing();
    if let Some(path) = env_file {
        tracing::debug!(path = %path.display(), "Loaded environment file");
    }
    let config = config::init_config().context("Failed to load config from environment")?;
    let service = build_service(config)?;
    let app = api::create_router(
        Arc::new(service),
        ApiSettings {
            credentials: BasicCredentials::new(&config.app_username, &config.app_password),
            max_upload_bytes: config.max_upload_bytes,
        },
    );

    let (listener, port) = bind_listener(config.server_port)
        .await
        .context("Failed to bind listener")?;
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

fn build_service(config: &Config) -> anyhow::Result<PipelineService> {
    let store = AzureBlobStore::new(
        &config.storage_connection_string,
        config.blob_container.clone(),
        time::Duration::minutes(config.locator_ttl_minutes),
    )
    .context("Failed to initialize blob storage client")?;
    let extractor = FormRecognizerClient::new(
        config.formrecognizer_endpoint.clone(),
        config.formrecognizer_key.clone(),
        PollSettings {
            interval: Duration::from_millis(config.extraction_poll_interval_ms),
            max_polls: config.extraction_max_polls,
        },
    )
    .context("Failed to initialize document analysis client")?;
    let summarizer = AzureOpenAiSummarizer::new(AzureOpenAiSettings {
        endpoint: config.openai_endpoint.clone(),
        api_key: config.openai_api_key.clone(),
        deployment: config.openai_deployment.clone(),
        api_version: config.openai_api_version.clone(),
    })
    .context("Failed to initialize summarization client")?;
    tracing::info!(
        container = %config.blob_container,
        deployment = %config.openai_deployment,
        "External clients initialized"
    );

    Ok(PipelineService::new(
        Box::new(store),
        Box::new(extractor),
        Box::new(summarizer),
        SummaryArchive::new(&config.summary_dir),
        PipelineSettings {
            max_attempts: config.external_max_attempts,
            run_timeout: config.request_timeout_secs.map(Duration::from_secs),
            work_dir: config.work_dir.clone(),
            ..PipelineSettings::default()
        },
    ))
}

async fn bind_listener(configured: Option<u16>) -> Result<(TcpListener, u16), std::io::Error> {
    use std::net::Ipv4Addr;

    if let Some(port) = configured {
        return TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map(|listener| (listener, port));
    }

    const PORT_RANGE: std::ops::RangeInclusive<u16> = 4100..=4199;
    for port in PORT_RANGE {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => {
                tracing::debug!(port, "Bound server port");
                return Ok((listener, port));
            }
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
                continue;
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "No available port found in range 4100-4199",
    ))
}
