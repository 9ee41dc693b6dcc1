//! Result of a successful load

use std::fmt;

use crate::module::handle::ModuleHandle;
use crate::module::traits::EntryCapability;

/// A loaded module together with its constructed entry instance
///
/// Only the loader creates these, and only after the post-load hook has
/// succeeded.
pub struct LoadedModule<C: EntryCapability> {
    // Field order is drop order: the entry's code lives in the module, so the
    // entry goes first.
    entry: Box<C::Instance>,
    construction_dependencies: Vec<ModuleHandle>,
    module: ModuleHandle,
}

impl<C: EntryCapability> LoadedModule<C> {
    pub(crate) fn new(
        module: ModuleHandle,
        entry: Box<C::Instance>,
        construction_dependencies: Vec<ModuleHandle>,
    ) -> Self {
        Self {
            entry,
            construction_dependencies,
            module,
        }
    }

    /// Handle of the loaded module, for diagnostics and introspection
    pub fn module_handle(&self) -> &ModuleHandle {
        &self.module
    }

    pub fn entry(&self) -> &C::Instance {
        &self.entry
    }

    pub fn entry_mut(&mut self) -> &mut C::Instance {
        &mut self.entry
    }

    /// Modules resolved while the entry was constructed
    pub fn construction_dependencies(&self) -> &[ModuleHandle] {
        &self.construction_dependencies
    }
}

impl<C: EntryCapability> fmt::Debug for LoadedModule<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModule")
            .field("capability", &C::NAME)
            .field("module", &self.module)
            .field("construction_dependencies", &self.construction_dependencies)
            .finish_non_exhaustive()
    }
}
