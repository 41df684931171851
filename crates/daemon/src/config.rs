use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::warn;

/// Runtime configuration, read from the environment once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub google_api_key: String,
    pub storage_dir: PathBuf,
    pub db_path: PathBuf,
    pub bind_addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Self {
        let google_api_key = std::env::var("GOOGLE_API_KEY").unwrap_or_default();
        if google_api_key.is_empty() {
            warn!("GOOGLE_API_KEY not set; script/visual generation will fail");
        }

        let storage_dir = std::env::var("STORAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("storage"));

        let db_path = std::env::var("DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| storage_dir.join("projects.db"));

        let bind_addr = std::env::var("BIND_ADDR")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 7777)));

        Config {
            google_api_key,
            storage_dir,
            db_path,
            bind_addr,
        }
    }
}
