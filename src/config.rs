//! Configuration file support.
//!
//! ```toml
//! [generate]
//! policy = "variant-fallback"   # or "strict"
//!
//! [format]
//! enabled = true
//! dialect = "mssql"             # mssql | generic | postgres
//! keyword_case = "upper"        # upper | lower
//! ```
//!
//! Every key is optional. Files are looked up at an explicit path, then
//! `./tracesql.toml`, then `<config dir>/tracesql/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{TraceError, TraceResult};
use crate::format::{Dialect, FormatOptions, KeywordCase, SqlParserFormatter};
use crate::generator::{DeclarePolicy, Generator};

/// Name of the config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "tracesql.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub generate: GenerateConfig,
    pub format: FormatConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerateConfig {
    pub policy: DeclarePolicy,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormatConfig {
    pub enabled: bool,
    pub dialect: Dialect,
    pub keyword_case: KeywordCase,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dialect: Dialect::default(),
            keyword_case: KeywordCase::default(),
        }
    }
}

impl FormatConfig {
    pub fn options(&self) -> FormatOptions {
        FormatOptions {
            dialect: self.dialect,
            keyword_case: self.keyword_case,
        }
    }
}

impl Config {
    /// Parse config from TOML text.
    pub fn from_toml(content: &str) -> TraceResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load the config file at `path`, which must exist.
    pub fn from_file(path: &Path) -> TraceResult<Self> {
        if !path.exists() {
            return Err(TraceError::ConfigNotFound(path.to_path_buf()));
        }
        if !path.is_file() {
            return Err(TraceError::config(format!(
                "{} is not a file",
                path.display()
            )));
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load from `explicit` if given, otherwise from the first default
    /// location that exists, otherwise defaults.
    pub fn load(explicit: Option<&Path>) -> TraceResult<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match default_locations().into_iter().find(|p| p.is_file()) {
            Some(path) => {
                tracing::debug!("loading config from {}", path.display());
                Self::from_file(&path)
            }
            None => Ok(Self::default()),
        }
    }

    /// A [`Generator`] set up from this config.
    pub fn generator(&self) -> Generator {
        let generator = Generator::new()
            .policy(self.generate.policy)
            .format_options(self.format.options());
        if self.format.enabled {
            generator.formatter(SqlParserFormatter)
        } else {
            generator
        }
    }
}

fn default_locations() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("tracesql").join("config.toml"));
    }
    paths
}
