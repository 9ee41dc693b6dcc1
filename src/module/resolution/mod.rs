//! Dependency resolution during loading
//!
//! Two independent resolver slots exist: one consulted while the primary
//! module is loaded, one while its entry instance is constructed.

pub mod registry;
pub mod resolvers;

use std::sync::Arc;

use crate::module::traits::ModuleResolver;

pub use registry::{PhaseGuard, ResolutionPhase, ResolutionRegistry};
pub use resolvers::{ResidentModuleResolver, SiblingDirectoryResolver};

/// The two resolution hooks a loader installs around its phases
///
/// `entry_construction` defaults to scanning the host's resident modules and
/// is therefore filled in per host when left unset.
#[derive(Clone)]
pub struct ResolutionHooks {
    pub primary_load: Arc<dyn ModuleResolver>,
    pub entry_construction: Option<Arc<dyn ModuleResolver>>,
}

impl ResolutionHooks {
    pub fn new(
        primary_load: Arc<dyn ModuleResolver>,
        entry_construction: Option<Arc<dyn ModuleResolver>>,
    ) -> Self {
        Self {
            primary_load,
            entry_construction,
        }
    }
}

impl Default for ResolutionHooks {
    fn default() -> Self {
        Self {
            primary_load: Arc::new(SiblingDirectoryResolver::default()),
            entry_construction: None,
        }
    }
}

impl std::fmt::Debug for ResolutionHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionHooks")
            .field("entry_construction_overridden", &self.entry_construction.is_some())
            .finish_non_exhaustive()
    }
}
