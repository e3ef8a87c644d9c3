//! Locations of the config file, local state and logs.
//!
//! The config and data directories can be redirected with environment
//! variables.

use std::path::PathBuf;

fn home_or_cwd() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Directory holding `config.toml` (`SERVIO_CONFIG_DIR` overrides).
pub fn get_config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("SERVIO_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs::config_dir().unwrap_or_else(home_or_cwd).join("servio")
}

pub fn get_config_path() -> PathBuf {
    get_config_dir().join("config.toml")
}

/// Directory holding persisted session state (`SERVIO_DATA_DIR` overrides).
pub fn get_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("SERVIO_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::data_dir().unwrap_or_else(home_or_cwd).join("servio")
}

pub fn get_state_path() -> PathBuf {
    get_data_dir().join("state.json")
}

pub fn get_log_dir() -> PathBuf {
    dirs::cache_dir().unwrap_or_else(home_or_cwd).join("servio")
}

/// Expand a leading `~` so users can type home-relative paths in the file prompts.
pub fn expand_path(path: &str) -> PathBuf {
    let trimmed = path.trim();
    if trimmed == "~" {
        return home_or_cwd();
    }
    if let Some(rest) = trimmed.strip_prefix("~/") {
        return home_or_cwd().join(rest);
    }
    PathBuf::from(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_path_resolves_home_prefix() {
        let expanded = expand_path("~/Pictures/logo.png");
        assert!(expanded.ends_with("Pictures/logo.png"));
        assert!(!expanded.to_string_lossy().starts_with('~'));
    }

    #[test]
    fn expand_path_keeps_absolute_paths() {
        assert_eq!(expand_path(" /tmp/cac.pdf "), PathBuf::from("/tmp/cac.pdf"));
    }

    #[test]
    fn config_path_is_inside_config_dir() {
        assert!(get_config_path().starts_with(get_config_dir()));
        assert!(get_state_path().ends_with("state.json"));
    }
}
