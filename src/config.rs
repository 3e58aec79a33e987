//! Environment-backed configuration.
//!
//! Values come from the process environment, optionally seeded from a `.env`
//! file. CLI flags always win over anything resolved here.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::AppError;

/// Default data file path.
pub const DATA_ENV: &str = "SALES_DATA";
/// Dataset cache lifetime in seconds for the interactive dashboard.
pub const CACHE_TTL_ENV: &str = "SALES_CACHE_TTL_SECS";
/// File picked up from the working directory when nothing else is configured.
pub const DEFAULT_DATA_FILE: &str = "data.csv";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSettings {
    pub data_path: Option<PathBuf>,
    pub cache_ttl: Option<Duration>,
}

impl EnvSettings {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let data_path = get(DATA_ENV)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        let cache_ttl = match get(CACHE_TTL_ENV).map(|s| s.trim().to_string()) {
            Some(s) if !s.is_empty() => {
                let secs = s.parse::<u64>().map_err(|_| {
                    AppError::new(2, format!("Invalid {CACHE_TTL_ENV} '{s}' (expected whole seconds)."))
                })?;
                Some(Duration::from_secs(secs))
            }
            _ => None,
        };

        Ok(Self { data_path, cache_ttl })
    }
}

/// Pick the data file: `--file`, then `SALES_DATA`, then `./data.csv`, then
/// the interactive CSV picker.
pub fn resolve_data_path(cli: Option<&Path>, env: &EnvSettings) -> Result<PathBuf, AppError> {
    if let Some(path) = cli {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = &env.data_path {
        return Ok(path.clone());
    }
    let default = PathBuf::from(DEFAULT_DATA_FILE);
    if default.is_file() {
        return Ok(default);
    }
    crate::cli::picker::prompt_for_csv_path()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<EnvSettings, AppError> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        EnvSettings::from_vars(|k| map.get(k).cloned())
    }

    #[test]
    fn reads_path_and_ttl() {
        let s = settings(&[(DATA_ENV, "sales/2024.csv"), (CACHE_TTL_ENV, "90")]).unwrap();
        assert_eq!(s.data_path, Some(PathBuf::from("sales/2024.csv")));
        assert_eq!(s.cache_ttl, Some(Duration::from_secs(90)));
    }

    #[test]
    fn blank_values_are_unset() {
        let s = settings(&[(DATA_ENV, "  "), (CACHE_TTL_ENV, "")]).unwrap();
        assert_eq!(s, EnvSettings::default());
    }

    #[test]
    fn bad_ttl_is_an_error() {
        let err = settings(&[(CACHE_TTL_ENV, "soon")]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn cli_path_wins() {
        let env = EnvSettings {
            data_path: Some(PathBuf::from("env.csv")),
            cache_ttl: None,
        };
        let p = resolve_data_path(Some(Path::new("cli.csv")), &env).unwrap();
        assert_eq!(p, PathBuf::from("cli.csv"));
        let p = resolve_data_path(None, &env).unwrap();
        assert_eq!(p, PathBuf::from("env.csv"));
    }
}
