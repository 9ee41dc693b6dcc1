//! Module hosts
//!
//! A host is the environment modules are loaded into: it knows how to find a
//! module by identifier or path, how to look dependencies up by default, and
//! it owns the resolution state phase hooks are installed into.

pub mod native;
pub mod static_host;

use std::path::Path;
use tracing::debug;

use crate::module::exports::ModuleExports;
use crate::module::handle::{ModuleHandle, ModuleOrigin, ResidentModules};
use crate::module::resolution::ResolutionRegistry;
use crate::module::traits::HostError;

pub use native::NativeHost;
pub use static_host::StaticHost;

/// Environment that candidate modules are loaded into
pub trait ModuleHost {
    /// Environment-native lookup of a module by logical name
    fn load_by_identifier(&self, identifier: &str) -> Result<ModuleHandle, HostError>;

    /// Load the module at `path`
    fn load_from_path(&self, path: &Path) -> Result<ModuleHandle, HostError>;

    /// Default lookup for a dependent module, before any hook is consulted
    fn locate(&self, name: &str) -> Option<ModuleHandle>;

    /// Resolution state phase hooks are installed into
    fn resolution(&self) -> &ResolutionRegistry;

    /// Modules this host has loaded so far
    fn resident(&self) -> &ResidentModules;

    /// Resolve a module `requester` depends on
    ///
    /// Tries the default lookup first, then whichever resolver is installed
    /// for the current phase.
    fn resolve_dependency(&self, requester: &str, name: &str) -> Result<ModuleHandle, HostError> {
        let module = match self.locate(name) {
            Some(module) => module,
            None => {
                let phase = self.resolution().active_phase();
                let module = self.resolution().resolve(name).ok_or_else(|| {
                    HostError::DependencyUnresolved {
                        module: requester.to_string(),
                        dependency: name.to_string(),
                    }
                })?;
                debug!("Dependency {} of {} resolved by {:?} hook", name, requester, phase);
                module
            }
        };
        self.resident().record(&module);
        Ok(module)
    }
}

/// Resolve the load-time dependencies of a freshly opened module and record
/// it as resident
pub(crate) fn link<H: ModuleHost + ?Sized>(
    host: &H,
    origin: ModuleOrigin,
    exports: ModuleExports,
    library: Option<libloading::Library>,
) -> Result<ModuleHandle, HostError> {
    let requester = exports.name().to_string();
    let names = exports.dependencies().to_vec();
    let mut dependencies = Vec::with_capacity(names.len());
    for dependency in &names {
        match host.resolve_dependency(&requester, dependency) {
            Ok(module) => dependencies.push(module),
            Err(e) => {
                // Exports may reference code inside the library.
                drop(exports);
                drop(library);
                return Err(e);
            }
        }
    }

    let module = ModuleHandle::build(origin, exports, dependencies, library);
    host.resident().record(&module);
    Ok(module)
}
