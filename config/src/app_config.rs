use directories::ProjectDirs;
use serde::Deserialize;
use std::{
    env,
    path::PathBuf,
};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub config_dir: PathBuf,
}

lazy_static::lazy_static! {
    pub(crate) static ref PROJECT_NAME: String = "ch7465lg-exporter".to_string();
    static ref CONFIG_FOLDER: Option<PathBuf> = env::var("CH7465LG_EXPORTER_CONFIG")
        .ok()
        .map(PathBuf::from);
}

/// Directory searched for `config.yaml`. `CH7465LG_EXPORTER_CONFIG` overrides
/// the platform default.
pub fn get_config_dir() -> PathBuf {
    if let Some(dir) = CONFIG_FOLDER.clone() {
        dir
    } else if let Some(proj_dirs) = ProjectDirs::from("", "", &PROJECT_NAME) {
        proj_dirs.config_local_dir().to_path_buf()
    } else {
        PathBuf::from(".").join(".config")
    }
}
