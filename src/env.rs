//! Environment constants and path utilities for reachout.
//!
//! This module centralizes hardcoded names, endpoints and file locations so
//! they are easy to find and change.

use std::path::{Path, PathBuf};

/// Application directory name (hidden directory like .git)
pub const APP_DIR_NAME: &str = ".reachout";

/// Configuration file name inside the application directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration file name accepted directly in the working directory
pub const LOCAL_CONFIG_FILE_NAME: &str = "reachout.toml";

/// Default credentials file name inside the application directory
pub const CREDENTIALS_FILE_NAME: &str = "api_keys.json";

/// Default tracing filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "reachout=info";

/// Credential entry names
pub mod credentials {
    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
    pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";
}

/// Upstream provider defaults
pub mod providers {
    pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
    pub const OPENAI_DEFAULT_MODEL: &str = "gpt-3.5-turbo-1106";

    pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
    pub const GEMINI_DEFAULT_MODEL: &str = "gemini-pro";

    pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
}

/// Outreach scheduling defaults
pub mod outreach {
    /// Records sharing the same send minute before the stagger advances
    pub const RECORDS_PER_MINUTE_SLOT: usize = 5;

    /// Number of distinct minute offsets before the stagger wraps around
    pub const MINUTE_SLOTS: usize = 10;
}

/// Build the application directory path under a root
pub fn app_dir_path(root: &Path) -> PathBuf {
    root.join(APP_DIR_NAME)
}

/// Build config file path in user's home directory
pub fn user_config_file_path(home_dir: &Path) -> PathBuf {
    app_dir_path(home_dir).join(CONFIG_FILE_NAME)
}

/// Build local config file path in current directory
pub fn local_config_file_path(current_dir: &Path) -> PathBuf {
    app_dir_path(current_dir).join(CONFIG_FILE_NAME)
}

/// Build default credentials file path in user's home directory
pub fn user_credentials_file_path(home_dir: &Path) -> PathBuf {
    app_dir_path(home_dir).join(CREDENTIALS_FILE_NAME)
}
