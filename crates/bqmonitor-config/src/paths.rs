// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Where the configuration file lives.

use std::path::{Path, PathBuf};

use crate::ConfigError;

/// Directory, relative to the executable, holding the config file.
pub const CONFIG_DIR_NAME: &str = "config";

/// Config file name inside [`CONFIG_DIR_NAME`].
pub const CONFIG_FILE_NAME: &str = "bqmonitor.conf";

/// `<dir>/config/bqmonitor.conf`.
pub fn config_path_in(dir: &Path) -> PathBuf {
	dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)
}

/// The config file next to the running executable.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
	let exe = std::env::current_exe().map_err(ConfigError::ExecutableNotFound)?;
	let dir = exe.parent().unwrap_or_else(|| Path::new("."));
	let path = config_path_in(dir);
	tracing::debug!(path = %path.display(), "resolved default config path");
	Ok(path)
}

/// An explicit path wins; otherwise fall back to [`default_config_path`].
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
	match explicit {
		Some(path) => Ok(path.to_path_buf()),
		None => default_config_path(),
	}
}

/// Resolve `path` against `base` unless it is already absolute.
pub fn resolve_relative(base: &Path, path: &Path) -> PathBuf {
	if path.is_absolute() {
		path.to_path_buf()
	} else {
		base.join(path)
	}
}
