// Configuration Management
//
// This crate handles all configuration loading and management for the
// control-plane backend. It provides:
// - Configuration structs
// - Environment variable loading
// - Default configuration values
//
// This keeps configuration concerns separate from domain logic.

use std::env;
use thiserror::Error;

pub mod types;

// Re-export all configuration types
pub use types::*;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from environment: {0}")]
    EnvError(String),
}

fn env_var(key: &str) -> Result<String, String> {
    env::var(key).map_err(|_| format!("missing required environment variable {key}"))
}

fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

/// Main configuration loading interface
impl ApiConfig {
    /// Load configuration from environment variables
    ///
    /// This will attempt to load a .env file from the current directory first,
    /// then read all configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        // Try to load .env file if it exists (don't error if it doesn't)
        let _ = dotenvy::dotenv();

        ApiConfig::from_env().map_err(ConfigError::EnvError)
    }

    /// Build configuration directly from the process environment.
    pub fn from_env() -> Result<Self, String> {
        let server = ServerConfig {
            host: env_var_or("HOST", "0.0.0.0"),
            port: env_parse_or("PORT", 8080u16),
        };

        let database = DatabaseConfig {
            host: env_var_or("DATABASE_HOST", "localhost"),
            port: env_parse_or("DATABASE_PORT", 5432u16),
            database: env_var_or("DATABASE_NAME", "avatar_platform"),
            username: env_var_or("DATABASE_USER", "postgres"),
            password: env::var("DATABASE_PASSWORD").unwrap_or_default(),
            max_connections: env_parse_or("DATABASE_MAX_CONNECTIONS", 10u32),
            mock: env_bool("DATABASE_MOCK", false),
        };

        let object_store = ObjectStoreConfig {
            bucket: env_var_or("OBJECT_STORE_BUCKET", "avatar-media"),
            region: env_var_or("OBJECT_STORE_REGION", "us-east-1"),
            endpoint: env::var("OBJECT_STORE_ENDPOINT").ok(),
            access_key_id: env::var("OBJECT_STORE_ACCESS_KEY_ID").ok(),
            secret_access_key: env::var("OBJECT_STORE_SECRET_ACCESS_KEY").ok(),
        };

        let voice_service = VoiceServiceConfig {
            rest_base_url: env_var("COQUI_XTTS_BASE_URL")?,
            ws_url: env_var("VOICE_SERVICE_WS_URL")?,
            secret_key: env_var("VOICE_SERVICE_SECRET_KEY")?,
        };

        let video_service = VideoServiceConfig {
            rest_base_url: env_var("VIDEO_SERVICE_URL")?,
            ws_url: env_var("VIDEO_SERVICE_WS_URL")?,
            api_key: env_var("VIDEO_SERVICE_API_KEY")?,
        };

        let llm_service = LlmServiceConfig {
            rest_base_url: env_var("LLM_SERVICE_URL")?,
        };

        let worker_callback = WorkerCallbackConfig {
            token: env_var("WORKER_CALLBACK_TOKEN")?,
        };

        let completion_source = match env_var_or("VIDEO_COMPLETION_SOURCE", "poll").as_str() {
            "callback" => VideoCompletionSource::Callback,
            _ => VideoCompletionSource::Poll,
        };

        let scheduler = SchedulerConfig {
            max_concurrent_jobs: env_parse_or("MAX_CONCURRENT_JOBS", 1usize),
            queue_bound: env_parse_or("JOB_QUEUE_BOUND", 256usize),
            completion_source,
        };

        let frontend_url = env_var_or("FRONTEND_URL", "http://localhost:3000");

        Ok(ApiConfig {
            server,
            database,
            object_store,
            voice_service,
            video_service,
            llm_service,
            worker_callback,
            scheduler,
            logging: LoggingConfig::default(),
            frontend_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn set_required_env() {
        std::env::set_var("COQUI_XTTS_BASE_URL", "http://voice.local");
        std::env::set_var("VOICE_SERVICE_WS_URL", "ws://voice.local/ws");
        std::env::set_var("VOICE_SERVICE_SECRET_KEY", "secret");
        std::env::set_var("VIDEO_SERVICE_URL", "http://video.local");
        std::env::set_var("VIDEO_SERVICE_WS_URL", "ws://video.local/ws");
        std::env::set_var("VIDEO_SERVICE_API_KEY", "video-key");
        std::env::set_var("LLM_SERVICE_URL", "http://llm.local");
        std::env::set_var("WORKER_CALLBACK_TOKEN", "worker-token");
    }

    #[test]
    fn from_env_fills_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        set_required_env();
        std::env::remove_var("MAX_CONCURRENT_JOBS");

        let config = ApiConfig::from_env().expect("config should load");
        assert_eq!(config.scheduler.max_concurrent_jobs, 1);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn from_env_rejects_missing_required_var() {
        let _guard = ENV_LOCK.lock().unwrap();
        set_required_env();
        std::env::remove_var("COQUI_XTTS_BASE_URL");

        let err = ApiConfig::from_env().unwrap_err();
        assert!(err.contains("COQUI_XTTS_BASE_URL"));

        std::env::set_var("COQUI_XTTS_BASE_URL", "http://voice.local");
    }
}
