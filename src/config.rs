use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

const DEFAULT_CONFIG_FILE: &str = "cazy-pipe.json";

/// Optional project config supplying default paths; every field can be
/// overridden on the command line.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub genomes_dir: Option<String>,
    #[serde(default)]
    pub summary_dir: Option<String>,
    #[serde(default)]
    pub metadata: Option<String>,
    #[serde(default)]
    pub database_dir: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ResolvedConfig {
    pub genomes_dir: Option<Utf8PathBuf>,
    pub summary_dir: Option<Utf8PathBuf>,
    pub metadata: Option<Utf8PathBuf>,
    pub database_dir: Option<Utf8PathBuf>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or `cazy-pipe.json` in the working directory when no
    /// path is given. An absent default file resolves to an empty config;
    /// an absent explicit file is an error.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, PipelineError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(ResolvedConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| PipelineError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| PipelineError::ConfigParse(err.to_string()))?;

        Ok(Self::resolve_config(config))
    }

    pub fn resolve_config(config: Config) -> ResolvedConfig {
        ResolvedConfig {
            genomes_dir: config.genomes_dir.map(Utf8PathBuf::from),
            summary_dir: config.summary_dir.map(Utf8PathBuf::from),
            metadata: config.metadata.map(Utf8PathBuf::from),
            database_dir: config.database_dir.map(Utf8PathBuf::from),
        }
    }
}
