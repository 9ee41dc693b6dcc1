//! Diagnostic sinks
//!
//! Purely observational: sinks never influence what the loader does.

use std::fmt;
use std::io::Write;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Single-string message consumer
pub type Sink = Arc<dyn Fn(&str) + Send + Sync>;

/// Where loader diagnostics go
///
/// Defaults to stdout for informational messages and stderr for errors.
/// Either sink may be replaced or disabled independently.
#[derive(Clone)]
pub struct Diagnostics {
    pub info: Option<Sink>,
    pub error: Option<Sink>,
}

impl Diagnostics {
    pub fn new(info: Option<Sink>, error: Option<Sink>) -> Self {
        Self { info, error }
    }

    /// Process standard streams
    pub fn stdio() -> Self {
        Self {
            info: Some(Arc::new(|msg: &str| {
                let _ = writeln!(std::io::stdout(), "{}", msg);
            })),
            error: Some(Arc::new(|msg: &str| {
                let _ = writeln!(std::io::stderr(), "{}", msg);
            })),
        }
    }

    /// Forward to `tracing` events
    pub fn tracing() -> Self {
        Self {
            info: Some(Arc::new(|msg: &str| {
                tracing::info!(target: "dynamic_module_loader::diagnostics", "{}", msg)
            })),
            error: Some(Arc::new(|msg: &str| {
                tracing::warn!(target: "dynamic_module_loader::diagnostics", "{}", msg)
            })),
        }
    }

    /// Both sinks disabled
    pub fn silent() -> Self {
        Self {
            info: None,
            error: None,
        }
    }

    pub fn with_info(mut self, sink: Option<Sink>) -> Self {
        self.info = sink;
        self
    }

    pub fn with_error(mut self, sink: Option<Sink>) -> Self {
        self.error = sink;
        self
    }

    pub fn info(&self, msg: &str) {
        if let Some(sink) = &self.info {
            sink(msg);
        }
    }

    pub fn error(&self, msg: &str) {
        if let Some(sink) = &self.error {
            sink(msg);
        }
    }

    pub fn from_config(config: &DiagnosticsConfig) -> Self {
        let base = match config.mode {
            DiagnosticsMode::Stdio => Self::stdio(),
            DiagnosticsMode::Tracing => Self::tracing(),
            DiagnosticsMode::Silent => Self::silent(),
        };
        Self {
            info: base.info.filter(|_| config.info),
            error: base.error.filter(|_| config.error),
        }
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::stdio()
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("info", &self.info.is_some())
            .field("error", &self.error.is_some())
            .finish()
    }
}

/// Diagnostic sink selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticsMode {
    /// stdout / stderr
    #[default]
    Stdio,
    /// `tracing` events
    Tracing,
    /// Discard everything
    Silent,
}

/// Diagnostics section of the loader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    #[serde(default)]
    pub mode: DiagnosticsMode,

    /// Emit informational messages
    #[serde(default = "default_true")]
    pub info: bool,

    /// Emit error messages
    #[serde(default = "default_true")]
    pub error: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            mode: DiagnosticsMode::Stdio,
            info: true,
            error: true,
        }
    }
}
