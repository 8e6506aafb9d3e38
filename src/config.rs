//! Runtime configuration. Every setting resolves through the chain:
//! CLI flag > environment variable > default.

use std::path::{Path, PathBuf};

use crate::error::AppError;

pub const HOME_ENV: &str = "MANDALART_HOME";
pub const LOG_ENV: &str = "MANDALART_LOG";
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Data directory holding the database, its lock and the rendered board.
pub fn resolve_home(flag: Option<&Path>) -> Result<PathBuf, AppError> {
    resolve_home_from(flag, std::env::var_os(HOME_ENV), std::env::var_os("HOME"))
}

fn resolve_home_from(
    flag: Option<&Path>,
    env_home: Option<std::ffi::OsString>,
    user_home: Option<std::ffi::OsString>,
) -> Result<PathBuf, AppError> {
    if let Some(path) = flag {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = env_home.filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    if let Some(home) = user_home.filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(home).join(".mandalart"));
    }
    Err(AppError::InvalidInput(format!(
        "unable to resolve data directory; pass --home or set {HOME_ENV}"
    )))
}

/// Filter directive for the log subscriber.
pub fn log_filter() -> String {
    std::env::var(LOG_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    #[test]
    fn flag_wins_over_environment() {
        let home = resolve_home_from(
            Some(Path::new("/tmp/flag")),
            Some(OsString::from("/tmp/env")),
            Some(OsString::from("/home/me")),
        )
        .expect("resolve");
        assert_eq!(home, PathBuf::from("/tmp/flag"));
    }

    #[test]
    fn environment_wins_over_default() {
        let home = resolve_home_from(
            None,
            Some(OsString::from("/tmp/env")),
            Some(OsString::from("/home/me")),
        )
        .expect("resolve");
        assert_eq!(home, PathBuf::from("/tmp/env"));
    }

    #[test]
    fn falls_back_to_user_home() {
        let home = resolve_home_from(None, Some(OsString::new()), Some(OsString::from("/home/me")))
            .expect("resolve");
        assert_eq!(home, PathBuf::from("/home/me/.mandalart"));

        let err = resolve_home_from(None, None, None).unwrap_err();
        assert!(err.to_string().contains(HOME_ENV));
    }
}
