use std::path::PathBuf;

use directories::ProjectDirs;

/// Environment variable that overrides the data directory.
pub const ASSET_DIR_ENV: &str = "WORKFLOWS_ASSET_DIR";

const PROJECT_ROOT: &str = env!("CARGO_MANIFEST_DIR");

pub fn asset_dir() -> PathBuf {
    let path = if let Ok(dir) = std::env::var(ASSET_DIR_ENV) {
        PathBuf::from(dir)
    } else if cfg!(debug_assertions) {
        PathBuf::from(PROJECT_ROOT).join("../../dev_assets")
    } else {
        ProjectDirs::from("app", "workflows", "workflows-backend")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| std::env::temp_dir().join("workflows-backend"))
    };

    if !path.exists()
        && let Err(e) = std::fs::create_dir_all(&path)
    {
        tracing::warn!("Failed to create asset directory {}: {}", path.display(), e);
    }

    path
}

pub fn config_path() -> PathBuf {
    asset_dir().join("config.json")
}

pub fn database_path() -> PathBuf {
    asset_dir().join("db.sqlite")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_and_database_live_in_asset_dir() {
        let dir = asset_dir();
        assert_eq!(config_path().parent(), Some(dir.as_path()));
        assert_eq!(database_path().file_name().unwrap(), "db.sqlite");
    }
}
