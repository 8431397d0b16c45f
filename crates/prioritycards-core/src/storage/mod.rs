mod config;

pub use config::{
    AuthConfig, BackendConfig, BackendSettings, Config, DisplayConfig, ENV_ANON_KEY, ENV_URL,
};

use std::path::PathBuf;

/// Returns `~/.config/prioritycards[-dev]/` based on PRIORITYCARDS_ENV.
///
/// Set PRIORITYCARDS_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("PRIORITYCARDS_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("prioritycards-dev")
    } else {
        base_dir.join("prioritycards")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
