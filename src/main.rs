mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use utilityhub_lib::correlation::DEFAULT_SINK_BUFFER;
use utilityhub_lib::{
    build_router, telemetry, AppState, ChromiumRenderer, Config, ConversionService,
    CorrelationTracker, HubError, LogSink, RenderEngine, ServiceInfo,
};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), HubError> {
    let args = cli::parse();

    let mut config = Config::load(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate()?;

    telemetry::init(&config.logging)?;

    let tracker = Arc::new(match &config.tracker.log_file {
        Some(path) => {
            tracing::info!(path = %path.display(), "appending tracked records to file");
            CorrelationTracker::with_sink(
                config.tracker.capacity,
                LogSink::spawn(path.clone(), DEFAULT_SINK_BUFFER),
            )
        }
        None => CorrelationTracker::new(config.tracker.capacity),
    });

    let renderer = Arc::new(ChromiumRenderer::new(config.browser_options()));
    if config.browser.warm_up {
        renderer
            .warm_up()
            .await
            .map_err(|err| HubError::Browser(err.to_string()))?;
    }
    let engine: Arc<dyn RenderEngine> = renderer;

    let service = ConversionService::new(Arc::clone(&tracker), Arc::clone(&engine));
    let state = AppState::new(service, ServiceInfo::default());
    let app = build_router(state, config.server.max_body_bytes);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(address.as_str()).await?;
    tracing::info!(%address, "UtilityHub listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    tracing::info!("shutting down");
    engine.shutdown().await;
    tracker.shutdown().await;

    served.map_err(HubError::from)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
