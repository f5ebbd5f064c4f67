//! Read fit configuration JSON and render values as JSON.
//!
//! Config files may name any subset of `FitConfig` fields; the rest keep
//! their defaults.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Serialize;

use crate::domain::FitConfig;
use crate::error::AppError;

/// Read and validate a config JSON file.
pub fn read_config_json(path: &Path) -> Result<FitConfig, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::config(format!("Failed to open config JSON '{}': {e}", path.display())))?;
    let config: FitConfig = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::config(format!("Invalid config JSON '{}': {e}", path.display())))?;
    config.validate()?;
    Ok(config)
}

/// Config from `path`, or the defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<FitConfig, AppError> {
    match path {
        Some(p) => {
            log::info!("loading fit config from {}", p.display());
            read_config_json(p)
        }
        None => Ok(FitConfig::default()),
    }
}

/// Pretty-printed JSON for any serializable output.
pub fn to_json_pretty<T: Serialize>(value: &T) -> Result<String, AppError> {
    serde_json::to_string_pretty(value).map_err(|e| AppError::config(format!("Failed to serialize JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::domain::LossScope;
    use crate::error::ErrorKind;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("odmr-fit-{}-{name}", std::process::id()))
    }

    #[test]
    fn reads_partial_config_over_defaults() {
        let path = temp_path("partial.json");
        let mut f = File::create(&path).unwrap();
        write!(f, r#"{{ "epochs": 250, "loss_scope": "batch" }}"#).unwrap();
        drop(f);

        let config = load_config(Some(path.as_path())).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.epochs, 250);
        assert_eq!(config.loss_scope, LossScope::Batch);
        assert_eq!(config.tail, FitConfig::default().tail);
    }

    #[test]
    fn invalid_values_are_rejected_after_parsing() {
        let path = temp_path("invalid.json");
        std::fs::write(&path, r#"{ "batch_size": 0 }"#).unwrap();
        let err = read_config_json(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn missing_or_malformed_files_are_config_errors() {
        let missing = temp_path("does-not-exist.json");
        assert_eq!(read_config_json(&missing).unwrap_err().kind(), ErrorKind::Config);

        let path = temp_path("malformed.json");
        std::fs::write(&path, "{ epochs: ").unwrap();
        let err = read_config_json(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn no_path_means_defaults() {
        assert_eq!(load_config(None).unwrap(), FitConfig::default());
    }

    #[test]
    fn default_config_round_trips_through_json() {
        let json = to_json_pretty(&FitConfig::default()).unwrap();
        let back: FitConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, FitConfig::default());
    }
}
