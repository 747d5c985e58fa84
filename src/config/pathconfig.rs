use std::{env, path::PathBuf};

use directories::ProjectDirs;
use lazy_static::lazy_static;

lazy_static! {
    pub static ref PROJECT_NAME: String = env!("CARGO_CRATE_NAME").to_uppercase().to_string();
    pub static ref DATA_FOLDER: Option<PathBuf> =
        env::var(format!("{}_DATA", PROJECT_NAME.clone()))
            .ok()
            .map(PathBuf::from);
    pub static ref CONFIG_FOLDER: Option<PathBuf> =
        env::var(format!("{}_CONFIG", PROJECT_NAME.clone()))
            .ok()
            .map(PathBuf::from);
}

/// `None` means the directory is not used at all (--no-config, --no-data).
#[derive(Debug, Clone, PartialEq)]
pub struct PathConfig {
    pub data: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

/// Path priority:
/// 1. Path specified via --data or --config
/// 2. Environment variable set via MPVPRESENCE_DATA or MPVPRESENCE_CONFIG
/// 3. XDG paths
/// 4. ./.data and ./.config
impl PathConfig {
    pub fn get_data_dir() -> PathBuf {
        if let Some(s) = DATA_FOLDER.clone() {
            s
        } else if let Some(proj_dirs) = Self::project_directory() {
            proj_dirs.data_local_dir().to_path_buf()
        } else {
            PathBuf::from(".").join(".data")
        }
    }

    pub fn get_config_dir() -> PathBuf {
        if let Some(s) = CONFIG_FOLDER.clone() {
            s
        } else if let Some(proj_dirs) = Self::project_directory() {
            proj_dirs.config_local_dir().to_path_buf()
        } else {
            PathBuf::from(".").join(".config")
        }
    }

    fn project_directory() -> Option<ProjectDirs> {
        ProjectDirs::from("io", "mpv", env!("CARGO_PKG_NAME"))
    }

    pub fn new(
        data_str: Option<String>,
        no_data: bool,
        config_str: Option<String>,
        no_config: bool,
    ) -> Self {
        let data = match (data_str, no_data) {
            (_, true) => None,
            (Some(p), false) => Some(PathBuf::from(p)),
            (None, false) => Some(Self::get_data_dir()),
        };
        let config = match (config_str, no_config) {
            (_, true) => None,
            (Some(p), false) => Some(PathBuf::from(p)),
            (None, false) => Some(Self::get_config_dir()),
        };
        Self { data, config }
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            data: Some(Self::get_data_dir()),
            config: Some(Self::get_config_dir()),
        }
    }
}
