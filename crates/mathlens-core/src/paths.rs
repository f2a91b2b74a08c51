// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// XDG-style directory resolution for configuration and output files.

use std::path::PathBuf;

/// Name of the per-user subdirectory used under the config and data roots.
pub const APP_DIR_NAME: &str = "mathlens";

/// File name of the reconstruction pattern resource.
pub const PATTERNS_FILE_NAME: &str = "patterns.yaml";

/// File name of the tool-server configuration.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Return the Mathlens configuration directory. Does not create it.
///
/// `$XDG_CONFIG_HOME/mathlens`, falling back to `~/.config/mathlens`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join(APP_DIR_NAME);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".config").join(APP_DIR_NAME);
    }
    PathBuf::from(APP_DIR_NAME)
}

/// Return the application data directory, creating it if needed.
pub fn data_dir() -> PathBuf {
    let dir = data_root().join(APP_DIR_NAME);
    std::fs::create_dir_all(&dir).ok();
    dir
}

/// Return a subdirectory inside the data dir (e.g. "crops").
pub fn data_subdir(name: &str) -> PathBuf {
    let dir = data_dir().join(name);
    std::fs::create_dir_all(&dir).ok();
    dir
}

fn data_root() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    std::env::temp_dir()
}

/// Where `ocrs-cli` caches its models: `$XDG_CACHE_HOME/ocrs`, falling
/// back to `~/.cache/ocrs`.
pub fn ocr_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        return PathBuf::from(xdg).join("ocrs");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".cache").join("ocrs");
    }
    PathBuf::from("ocrs-models")
}

/// The user-editable pattern file inside [`config_dir`].
pub fn user_patterns_path() -> PathBuf {
    config_dir().join(PATTERNS_FILE_NAME)
}

/// A pattern file shipped next to the running executable, if the executable
/// location can be determined.
pub fn bundled_patterns_path() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    Some(exe.parent()?.join(PATTERNS_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_patterns_path_ends_with_file_name() {
        let path = user_patterns_path();
        assert!(path.ends_with(format!("{APP_DIR_NAME}/{PATTERNS_FILE_NAME}")));
    }

    #[test]
    fn ocr_models_live_in_an_ocrs_dir() {
        assert!(ocr_model_dir().ends_with("ocrs") || ocr_model_dir().ends_with("ocrs-models"));
    }
}
