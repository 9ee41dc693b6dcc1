//! Loaded module handles
//!
//! A `ModuleHandle` is the opaque, cheaply clonable reference to a module a
//! host has loaded. It keeps the module's code alive for as long as any clone
//! exists.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::module::exports::ModuleExports;

/// How a module was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleOrigin {
    /// Located by logical identifier
    Identifier(String),
    /// Opened from a file location
    Path(PathBuf),
    /// Compiled into the host process
    Static,
}

struct ModuleInner {
    name: String,
    origin: ModuleOrigin,
    // Declared before `library`: exports may hold code from the library and
    // must be dropped first.
    exports: ModuleExports,
    dependencies: Vec<ModuleHandle>,
    library: Option<libloading::Library>,
}

/// Opaque reference to a loaded module
#[derive(Clone)]
pub struct ModuleHandle {
    inner: Arc<ModuleInner>,
}

impl ModuleHandle {
    /// Create a handle for a module that lives in the host process
    pub fn new_static(exports: ModuleExports, dependencies: Vec<ModuleHandle>) -> Self {
        Self::build(ModuleOrigin::Static, exports, dependencies, None)
    }

    pub(crate) fn build(
        origin: ModuleOrigin,
        exports: ModuleExports,
        dependencies: Vec<ModuleHandle>,
        library: Option<libloading::Library>,
    ) -> Self {
        Self {
            inner: Arc::new(ModuleInner {
                name: exports.name().to_string(),
                origin,
                exports,
                dependencies,
                library,
            }),
        }
    }

    /// Module name as declared by its exports
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn origin(&self) -> &ModuleOrigin {
        &self.inner.origin
    }

    /// File the module was opened from, if any
    pub fn path(&self) -> Option<&Path> {
        match &self.inner.origin {
            ModuleOrigin::Path(path) => Some(path),
            _ => None,
        }
    }

    pub fn exports(&self) -> &ModuleExports {
        &self.inner.exports
    }

    /// Dependencies resolved while this module was loaded
    pub fn dependencies(&self) -> &[ModuleHandle] {
        &self.inner.dependencies
    }

    /// Whether the module is backed by a native library
    pub fn is_native(&self) -> bool {
        self.inner.library.is_some()
    }

    /// Whether two handles refer to the same loaded module
    pub fn same_module(&self, other: &ModuleHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for ModuleHandle {
    fn eq(&self, other: &Self) -> bool {
        self.same_module(other)
    }
}

impl Eq for ModuleHandle {}

impl fmt::Debug for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleHandle")
            .field("name", &self.inner.name)
            .field("origin", &self.inner.origin)
            .field("native", &self.is_native())
            .field(
                "dependencies",
                &self
                    .inner
                    .dependencies
                    .iter()
                    .map(|d| d.name())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Modules already resident in a host, in load order
#[derive(Debug, Clone, Default)]
pub struct ResidentModules {
    modules: Arc<Mutex<Vec<ModuleHandle>>>,
}

impl ResidentModules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a module as resident (no-op if already recorded)
    pub fn record(&self, module: &ModuleHandle) {
        let mut modules = self.modules.lock().unwrap_or_else(PoisonError::into_inner);
        if !modules.iter().any(|m| m.same_module(module)) {
            modules.push(module.clone());
        }
    }

    /// Find the first resident module with the given name
    pub fn find(&self, name: &str) -> Option<ModuleHandle> {
        let modules = self.modules.lock().unwrap_or_else(PoisonError::into_inner);
        modules.iter().find(|m| m.name() == name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let modules = self.modules.lock().unwrap_or_else(PoisonError::into_inner);
        modules.iter().map(|m| m.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.modules
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
