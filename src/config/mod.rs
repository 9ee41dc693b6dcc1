//! Configuration management for the dynamic module loader
//!
//! Candidates can be declared in a TOML or JSON file instead of code:
//!
//! ```toml
//! features = ["new-runtime"]
//! search_dirs = ["plugins"]
//!
//! [diagnostics]
//! mode = "tracing"
//!
//! [[candidates]]
//! label = "new-runtime"
//! identifier = "new_runtime"
//! path = "plugins/libnew_runtime.so"
//! when = { all = [{ os = "linux" }, { feature = "new-runtime" }] }
//!
//! [[candidates]]
//! label = "old-runtime"
//! path = "plugins/libold_runtime.so"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::module::candidate::CandidateDescriptor;
use crate::module::condition::{Condition, EvaluationContext};
use crate::module::loader::DiagnosticsConfig;
use crate::module::traits::LoadError;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "dynamic_module_loader=trace")
    /// If not set, uses RUST_LOG environment variable or defaults to "info"
    #[serde(default)]
    pub filter: Option<String>,

    /// Enable JSON logging format (for log aggregation systems)
    #[serde(default)]
    pub json_format: bool,
}

/// One declared candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateConfig {
    /// Name used in diagnostics
    #[serde(default)]
    pub label: Option<String>,

    /// Logical module name tried before `path`
    #[serde(default)]
    pub identifier: Option<String>,

    /// Module file location
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Eligibility condition (defaults to always)
    #[serde(default)]
    pub when: Condition,
}

impl CandidateConfig {
    pub fn to_descriptor(&self, ctx: &EvaluationContext) -> Result<CandidateDescriptor, LoadError> {
        let descriptor = CandidateDescriptor::from_predicate(
            self.when.clone().into_predicate(ctx.clone()),
            self.identifier.clone(),
            self.path.clone(),
        )?;
        Ok(match &self.label {
            Some(label) => descriptor.labeled(label),
            None => descriptor,
        })
    }
}

/// Loader configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Feature flags visible to `feature` conditions
    #[serde(default)]
    pub features: Vec<String>,

    /// Directories searched for identifier lookups by the native host
    #[serde(default)]
    pub search_dirs: Vec<PathBuf>,

    /// Extra directories the primary-load resolver searches for dependencies
    #[serde(default)]
    pub dependency_dirs: Vec<PathBuf>,

    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,

    #[serde(default)]
    pub logging: Option<LoggingConfig>,

    /// Candidates in evaluation order
    #[serde(default)]
    pub candidates: Vec<CandidateConfig>,
}

impl LoaderConfig {
    /// Load configuration from file (TOML for `.toml`, JSON otherwise)
    ///
    /// Relative paths in the file are resolved against the file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;

        let mut config = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            Self::from_toml_str(&content)?
        } else {
            Self::from_json_str(&content)?
        };

        if let Some(base) = path.parent() {
            config.resolve_relative_paths(base);
        }
        debug!(
            "Loaded loader config from {:?} with {} candidates",
            path,
            config.candidates.len()
        );
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: LoaderConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: LoaderConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every candidate has an identifier or a path
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (index, candidate) in self.candidates.iter().enumerate() {
            let has_identifier = candidate
                .identifier
                .as_deref()
                .is_some_and(|id| !id.trim().is_empty());
            let has_path = candidate
                .path
                .as_ref()
                .is_some_and(|p| !p.as_os_str().is_empty());
            if !has_identifier && !has_path {
                return Err(ConfigError::Invalid(format!(
                    "candidate #{} ({}) needs an identifier or a path",
                    index,
                    candidate.label.as_deref().unwrap_or("unlabeled")
                )));
            }
        }
        Ok(())
    }

    /// Make relative paths absolute against `base`
    pub fn resolve_relative_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() && !p.as_os_str().is_empty() {
                *p = base.join(&*p);
            }
        };
        self.search_dirs.iter_mut().for_each(resolve);
        self.dependency_dirs.iter_mut().for_each(resolve);
        self.candidates
            .iter_mut()
            .filter_map(|c| c.path.as_mut())
            .for_each(resolve);
    }

    pub fn evaluation_context(&self) -> EvaluationContext {
        EvaluationContext::new(self.features.iter().cloned())
    }

    /// Build candidate descriptors in declaration order
    pub fn candidate_descriptors(&self) -> Result<Vec<CandidateDescriptor>, LoadError> {
        let ctx = self.evaluation_context();
        self.candidates
            .iter()
            .map(|candidate| candidate.to_descriptor(&ctx))
            .collect()
    }
}
