pub mod types;

pub use types::{Allocations, Config};

use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = ".kube-hygiene.toml";

/// Get the global config file path (~/.kube-hygiene.toml)
pub fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(CONFIG_FILE_NAME))
}

/// Get the local config file path (./.kube-hygiene.toml)
pub fn local_config_path() -> PathBuf {
    PathBuf::from(CONFIG_FILE_NAME)
}

/// Load configuration, validated.
///
/// An explicit path must exist. Otherwise the local config is tried first,
/// then the global one, then defaults. A config file that exists but does not
/// parse or validate is an error.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let candidate = match path {
        Some(p) => Some(p.to_path_buf()),
        None => {
            let local = local_config_path();
            if local.exists() {
                Some(local)
            } else {
                global_config_path().filter(|g| g.exists())
            }
        }
    };

    let config = match candidate {
        Some(file) => {
            log::debug!("Loading configuration from {}", file.display());
            let content = fs::read_to_string(&file)?;
            toml::from_str::<Config>(&content)?
        }
        None => {
            log::debug!("No configuration file found, using defaults");
            Config::default()
        }
    };

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HygieneError;
    use std::io::Write;

    #[test]
    fn test_load_explicit_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[allocations.memory]\nunderPercUtilization = 150\noverPercUtilization = 10"
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.allocations.memory.under_perc, 150.0);
        assert_eq!(config.allocations.memory.over_perc, 10.0);
    }

    #[test]
    fn test_load_missing_explicit_config_fails() {
        let err = load_config(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, HygieneError::Io(_)));
    }

    #[test]
    fn test_load_invalid_config_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[pod.limits]\ncpu = 150.0").unwrap();

        assert!(matches!(
            load_config(Some(file.path())),
            Err(HygieneError::Config(_))
        ));
    }
}
