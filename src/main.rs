use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;

use queue_pusher::config::{AppConfig, QueueBackend};
use queue_pusher::consumer::Consumer;
use queue_pusher::forwarder::{HttpForwarder, MessageForwarder};
use queue_pusher::gate::RuntimeGate;
use queue_pusher::kvs::{InMemoryStore, KeyValueStore, RedisStore};
use queue_pusher::logging;
use queue_pusher::queue::{InMemoryQueue, QueueTransport, SqsQueue};
use queue_pusher::routes::configure_routes;
use queue_pusher::telemetry::Metrics;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    logging::init(config.log_format);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "failed to start consumer");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: AppConfig) -> Result<(), Box<dyn Error>> {
    let metrics = Arc::new(Metrics::new().with_app_name(&config.app_name));

    let queue: Arc<dyn QueueTransport> = match config.queue_backend {
        QueueBackend::Sqs => Arc::new(SqsQueue::from_env(config.sqs_config()).await?),
        QueueBackend::Memory => {
            warn!("using in-memory queue, pending messages are lost on exit");
            Arc::new(InMemoryQueue::new(config.queue_parallel)?)
        }
    };

    let store: Arc<dyn KeyValueStore> = if config.distributed {
        Arc::new(RedisStore::connect(&config.redis_url).await?)
    } else {
        warn!("distributed mode disabled, start/stop only applies to this instance");
        Arc::new(InMemoryStore::new())
    };
    let gate = Arc::new(RuntimeGate::new(&config.app_name, store));

    let forwarder: Arc<dyn MessageForwarder> = Arc::new(HttpForwarder::new(
        config.forwarder_config(),
        metrics.clone(),
    )?);

    let consumer = Consumer::new(
        config.consumer_config(),
        queue,
        forwarder,
        gate.clone(),
        metrics,
    )?;

    let token = CancellationToken::new();

    let shutdown = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown requested, waiting for in-flight messages");
                shutdown.cancel();
            }
            Err(e) => error!(error = %e, "failed to listen for shutdown signal"),
        }
    });

    let address = config.bind_address();
    let routes = configure_routes(gate);
    let server_token = token.clone();
    let server = tokio::spawn(async move {
        info!(%address, "starting admin server");
        tokio::select! {
            _ = warp::serve(routes).run(address) => {}
            _ = server_token.cancelled() => {}
        }
    });

    info!(
        app = %config.app_name,
        queue = %config.queue_name,
        endpoint = %config.target_endpoint,
        "consumer running"
    );
    consumer.start(token.clone()).await;

    token.cancel();
    if let Err(e) = server.await {
        error!(error = %e, "admin server task failed");
    }

    info!("shutdown complete");
    Ok(())
}
