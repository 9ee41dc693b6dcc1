//! Module system traits and error types
//!
//! Defines the contracts shared by the loader, hosts, resolvers and the
//! modules themselves.

use std::path::PathBuf;
use thiserror::Error;

use crate::module::handle::ModuleHandle;

/// Boxed error used by caller-supplied hooks and entry factories
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The contract an entry instance must satisfy
///
/// Implemented by the caller on a marker type. A module declares which
/// capability each of its entry types provides by `NAME`; the loader picks
/// the first declaration whose capability matches and expects its factory to
/// produce a `Box<Self::Instance>`.
///
/// ```rust
/// use dynamic_module_loader::EntryCapability;
///
/// pub trait Storage {
///     fn backend_name(&self) -> &str;
/// }
///
/// pub struct StorageCapability;
///
/// impl EntryCapability for StorageCapability {
///     type Instance = dyn Storage;
///     const NAME: &'static str = "storage";
/// }
/// ```
pub trait EntryCapability: 'static {
    /// Instance type produced by a conforming entry (usually a trait object)
    type Instance: ?Sized + 'static;

    /// Capability identifier that module declarations are matched against
    const NAME: &'static str;
}

/// Resolves a dependent module by name when the host's default lookup fails
///
/// Returning `None` means "cannot help"; the host then reports the dependency
/// as unresolved. An expected miss must never panic.
pub trait ModuleResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Option<ModuleHandle>;
}

impl<F> ModuleResolver for F
where
    F: Fn(&str) -> Option<ModuleHandle> + Send + Sync,
{
    fn resolve(&self, name: &str) -> Option<ModuleHandle> {
        self(name)
    }
}

/// Errors raised by a module host while locating or opening a module
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Module not found: {0}")]
    NotFound(String),

    #[error("Failed to open module library: {0}")]
    Library(#[from] libloading::Error),

    #[error("Module {path:?} does not export {symbol}")]
    MissingExports { path: PathBuf, symbol: String },

    #[error("Module {module} depends on {dependency}, which could not be resolved")]
    DependencyUnresolved { module: String, dependency: String },

    #[error("Module rejected by host: {0}")]
    Rejected(String),
}

/// Failure reasons for a single `try_load` call
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Invalid candidate: {0}")]
    InvalidCandidate(String),

    #[error("No eligible candidate among {candidates} evaluated")]
    NoEligibleCandidate { candidates: usize },

    #[error("Failed to load module by identifier {identifier}: {source}")]
    IdentifierLoadFailed {
        identifier: String,
        #[source]
        source: HostError,
    },

    #[error("Failed to load module from {path:?}: {source}")]
    PathLoadFailed {
        path: PathBuf,
        #[source]
        source: HostError,
    },

    #[error("Module {module} declares no entry conforming to capability {capability}")]
    EntryTypeNotFound { module: String, capability: String },

    #[error("Failed to instantiate entry type {type_name}: {reason}")]
    InstantiationFailed { type_name: String, reason: String },

    #[error("Post-load hook failed: {0}")]
    PostLoadHookFailed(#[source] BoxError),
}

impl LoadError {
    /// Whether this error drives fallback instead of aborting the load
    pub fn is_soft(&self) -> bool {
        matches!(self, LoadError::IdentifierLoadFailed { .. })
    }
}
