//! Default location of the store file.
//!
//! `$XDG_CONFIG_HOME/tsk/tsk.db` when `XDG_CONFIG_HOME` is set to an absolute
//! path, otherwise `$HOME/.config/tsk/tsk.db`.

use std::path::PathBuf;

const APP_DIR: &str = "tsk";
const DB_FILE: &str = "tsk.db";

/// Resolve the default store path from the environment.
pub fn default_db_path() -> Option<PathBuf> {
    let xdg = std::env::var("XDG_CONFIG_HOME").ok();
    let home = std::env::var("HOME").ok();
    db_path_from(xdg.as_deref(), home.as_deref())
}

/// Resolve the store path from explicit `XDG_CONFIG_HOME` and `HOME` values.
pub fn db_path_from(xdg_config_home: Option<&str>, home: Option<&str>) -> Option<PathBuf> {
    let config_dir = match xdg_config_home {
        Some(dir) if dir.starts_with('/') => PathBuf::from(dir),
        _ => PathBuf::from(home.filter(|h| !h.is_empty())?).join(".config"),
    };
    Some(config_dir.join(APP_DIR).join(DB_FILE))
}
