use std::path::PathBuf;

/// File name of the SeetaFace frontal model shipped with `rustface`.
const DEFAULT_MODEL_FILE: &str = "seeta_fd_frontal_v1.0.bin";

/// CLI configuration, loaded from environment variables.
#[derive(Debug)]
pub struct Config {
    /// SeetaFace model used for detection.
    pub model_path: PathBuf,
    /// Face worker threads; 0 runs faces on rayon's global pool.
    pub workers: usize,
    /// Optional TOML style profile.
    pub style_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from `FACEMASK_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let model_path = std::env::var("FACEMASK_MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir().join(DEFAULT_MODEL_FILE));

        Self {
            model_path,
            workers: env_usize("FACEMASK_WORKERS", 0),
            style_file: std::env::var("FACEMASK_STYLE_FILE").ok().map(PathBuf::from),
        }
    }
}

fn data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("facemask")
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
