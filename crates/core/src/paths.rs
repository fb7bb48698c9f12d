//! Runtime file locations for ephemeral artifacts (artwork cache, debug
//! logs). All of them live under one runtime directory that can be moved
//! with `JAMDECK_RUNTIME_DIR`, defaulting to the OS temp directory.

use std::path::PathBuf;

/// Environment override for the runtime directory.
pub const RUNTIME_DIR_ENV: &str = "JAMDECK_RUNTIME_DIR";

/// Environment override for the static asset root served by the worker.
pub const ASSETS_DIR_ENV: &str = "JAMDECK_ASSETS_DIR";

/// File name of the single last-extracted artwork image.
pub const ARTWORK_FILE_NAME: &str = "jamdeck_cover.jpg";

/// File name of the worker's debug log.
pub const DEBUG_LOG_FILE_NAME: &str = "jamdeck-server.log";

/// Directory for ephemeral runtime files.
pub fn runtime_dir() -> PathBuf {
    match std::env::var_os(RUNTIME_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => std::env::temp_dir(),
    }
}

/// Well-known location of the artwork file, overwritten wholesale on each
/// successful thumbnail extraction.
pub fn artwork_path() -> PathBuf {
    runtime_dir().join(ARTWORK_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artwork_path_lives_in_runtime_dir() {
        let path = artwork_path();
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some(ARTWORK_FILE_NAME)
        );
        assert!(path.starts_with(runtime_dir()));
    }
}
