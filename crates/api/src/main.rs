use api::state::AppState;
use config::{ApiConfig, LoggingConfig};
use database::{AvatarRepository, Database, JobRepository, UsageRepository};
use external_clients::{LlmClient, S3ObjectStore, VideoClient, VoiceClient};
use services::{AudioJobRunner, AvatarCache, JobDispatcher, JobScheduler, Reaper, UsageAccountant, VideoJobRunner};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    let config = ApiConfig::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {e}");
        std::process::exit(1);
    });

    init_tracing(&config.logging);
    tracing::info!("starting avatar control-plane backend");

    let config = Arc::new(config);
    let database = Arc::new(Database::from_config(&config.database).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to initialize database");
        std::process::exit(1);
    }));

    let jobs = Arc::new(JobRepository::new(database.pool().clone()));
    let avatars_repo = Arc::new(AvatarRepository::new(database.pool().clone()));
    let usage_repo = Arc::new(UsageRepository::new(database.pool().clone()));

    let voice = Arc::new(VoiceClient::new(&config.voice_service)) as Arc<dyn external_clients::VoiceClientTrait>;
    let video = Arc::new(VideoClient::new(&config.video_service)) as Arc<dyn external_clients::VideoClientTrait>;
    let llm = Arc::new(LlmClient::new(config.llm_service.rest_base_url.clone())) as Arc<dyn external_clients::LlmClientTrait>;
    let object_store =
        Arc::new(S3ObjectStore::from_config(&config.object_store).await) as Arc<dyn external_clients::ObjectStoreTrait>;

    let avatars = Arc::new(AvatarCache::new(avatars_repo));
    let usage = Arc::new(UsageAccountant::new(usage_repo));

    let audio_runner = Arc::new(AudioJobRunner::new(jobs.clone(), avatars.clone(), voice.clone(), object_store.clone(), usage.clone()));
    let video_runner = Arc::new(VideoJobRunner::new(
        jobs.clone(),
        avatars.clone(),
        voice.clone(),
        video.clone(),
        object_store.clone(),
        usage.clone(),
        config.scheduler.completion_source,
    ));
    let dispatcher = Arc::new(JobDispatcher::new(jobs.clone(), audio_runner, video_runner));

    let scheduler = Arc::new(JobScheduler::new(
        config.scheduler.max_concurrent_jobs,
        config.scheduler.queue_bound,
        jobs.clone(),
        dispatcher,
    ));

    let shutdown = CancellationToken::new();

    let reaper = Reaper::new(jobs.clone(), Duration::from_secs(60));
    let reaper_cancel = shutdown.child_token();
    tokio::spawn(reaper.run(reaper_cancel));

    let state = AppState {
        db: database,
        config: config.clone(),
        scheduler: scheduler.clone(),
        usage,
        avatars,
        object_store,
        voice,
        video,
        llm,
        shutdown: shutdown.clone(),
    };

    let app = api::build_app(state);

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_address).await.unwrap_or_else(|e| {
        tracing::error!(address = %bind_address, error = %e, "failed to bind listener");
        std::process::exit(1);
    });

    tracing::info!(address = %bind_address, "server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .unwrap();

    scheduler.drain().await;
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("shutdown signal received, draining in-flight work");
    shutdown.cancel();
}

fn init_tracing(logging_config: &LoggingConfig) {
    let mut filter = logging_config.level.clone();
    for (module, level) in &logging_config.modules {
        filter.push_str(&format!(",{module}={level}"));
    }

    match logging_config.format.as_str() {
        "json" => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        "compact" => tracing_subscriber::fmt().compact().with_env_filter(filter).init(),
        _ => tracing_subscriber::fmt().pretty().with_env_filter(filter).init(),
    }
}
