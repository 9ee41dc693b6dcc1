//! Host for modules compiled into the process
//!
//! Modules are registered under an identifier and/or a path alias together
//! with a function producing their exports. Useful for backends that are
//! linked statically but still selected at runtime.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::module::exports::ModuleExports;
use crate::module::handle::{ModuleHandle, ModuleOrigin, ResidentModules};
use crate::module::host::{link, ModuleHost};
use crate::module::resolution::ResolutionRegistry;
use crate::module::traits::HostError;

type ExportsBuilder = Arc<dyn Fn() -> ModuleExports + Send + Sync>;

#[derive(Clone)]
enum Registration {
    Available(ExportsBuilder),
    Rejected(String),
}

/// Host serving modules registered in-process
#[derive(Default)]
pub struct StaticHost {
    identifiers: HashMap<String, Registration>,
    paths: HashMap<PathBuf, Registration>,
    /// Identifiers currently being linked, to stop dependency cycles
    linking: RefCell<Vec<String>>,
    resolution: ResolutionRegistry,
    resident: ResidentModules,
}

impl StaticHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module reachable by identifier
    pub fn register<F>(&mut self, identifier: impl Into<String>, exports: F) -> &mut Self
    where
        F: Fn() -> ModuleExports + Send + Sync + 'static,
    {
        self.identifiers
            .insert(identifier.into(), Registration::Available(Arc::new(exports)));
        self
    }

    /// Register a module reachable by path
    pub fn register_path<F>(&mut self, path: impl Into<PathBuf>, exports: F) -> &mut Self
    where
        F: Fn() -> ModuleExports + Send + Sync + 'static,
    {
        self.paths
            .insert(path.into(), Registration::Available(Arc::new(exports)));
        self
    }

    /// Make identifier loads of `identifier` fail, modelling a module that is
    /// present but unusable in this environment
    pub fn reject(
        &mut self,
        identifier: impl Into<String>,
        reason: impl Into<String>,
    ) -> &mut Self {
        self.identifiers
            .insert(identifier.into(), Registration::Rejected(reason.into()));
        self
    }

    /// Path counterpart of [`StaticHost::reject`]
    pub fn reject_path(
        &mut self,
        path: impl Into<PathBuf>,
        reason: impl Into<String>,
    ) -> &mut Self {
        self.paths
            .insert(path.into(), Registration::Rejected(reason.into()));
        self
    }

    fn instantiate(
        &self,
        registration: Option<&Registration>,
        key: &str,
        origin: ModuleOrigin,
    ) -> Result<ModuleHandle, HostError> {
        match registration {
            Some(Registration::Available(builder)) => {
                debug!("Linking static module {}", key);
                let _linking = LinkingGuard::enter(&self.linking, key);
                link(self, origin, builder(), None)
            }
            Some(Registration::Rejected(reason)) => Err(HostError::Rejected(reason.clone())),
            None => Err(HostError::NotFound(key.to_string())),
        }
    }
}

impl ModuleHost for StaticHost {
    fn load_by_identifier(&self, identifier: &str) -> Result<ModuleHandle, HostError> {
        self.instantiate(
            self.identifiers.get(identifier),
            identifier,
            ModuleOrigin::Identifier(identifier.to_string()),
        )
    }

    fn load_from_path(&self, path: &Path) -> Result<ModuleHandle, HostError> {
        self.instantiate(
            self.paths.get(path),
            &path.display().to_string(),
            ModuleOrigin::Path(path.to_path_buf()),
        )
    }

    fn locate(&self, name: &str) -> Option<ModuleHandle> {
        if self.linking.borrow().iter().any(|k| k == name) {
            debug!("Dependency cycle through {}", name);
            return None;
        }
        if let Some(module) = self.resident.find(name) {
            return Some(module);
        }
        self.load_by_identifier(name).ok()
    }

    fn resolution(&self) -> &ResolutionRegistry {
        &self.resolution
    }

    fn resident(&self) -> &ResidentModules {
        &self.resident
    }
}

/// Marks a key as being linked until dropped, including on unwind
struct LinkingGuard<'a> {
    linking: &'a RefCell<Vec<String>>,
    key: String,
}

impl<'a> LinkingGuard<'a> {
    fn enter(linking: &'a RefCell<Vec<String>>, key: &str) -> Self {
        linking.borrow_mut().push(key.to_string());
        Self {
            linking,
            key: key.to_string(),
        }
    }
}

impl Drop for LinkingGuard<'_> {
    fn drop(&mut self) {
        let mut linking = self.linking.borrow_mut();
        if let Some(pos) = linking.iter().rposition(|k| *k == self.key) {
            linking.remove(pos);
        }
    }
}

impl fmt::Debug for StaticHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticHost")
            .field("identifiers", &self.identifiers.keys().collect::<Vec<_>>())
            .field("paths", &self.paths.keys().collect::<Vec<_>>())
            .field("resolution", &self.resolution)
            .field("resident", &self.resident.names())
            .finish()
    }
}
