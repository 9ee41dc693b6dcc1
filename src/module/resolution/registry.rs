//! Phase-scoped resolution state
//!
//! Each host owns one `ResolutionRegistry`. The loader installs a resolver
//! for the duration of a phase and the returned guard removes it again when
//! dropped, on success and failure alike.

use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

use crate::module::handle::ModuleHandle;
use crate::module::traits::ModuleResolver;

/// Phase of a load attempt a resolver is installed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionPhase {
    /// Opening the primary module and linking its dependencies
    PrimaryLoad,
    /// Constructing the entry instance
    EntryConstruction,
}

type Installed = (ResolutionPhase, Arc<dyn ModuleResolver>);

/// Resolution state of a host
///
/// Uses single-threaded interior mutability, so a host holding one is not
/// `Sync` and loads against it are serialized by construction.
#[derive(Default)]
pub struct ResolutionRegistry {
    active: RefCell<Option<Installed>>,
}

impl ResolutionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `resolver` for `phase` until the returned guard is dropped
    ///
    /// A resolver that was already installed is restored when the guard
    /// drops.
    #[must_use = "the resolver is removed as soon as the guard is dropped"]
    pub fn install(
        &self,
        phase: ResolutionPhase,
        resolver: Arc<dyn ModuleResolver>,
    ) -> PhaseGuard<'_> {
        trace!("Installing {:?} resolver", phase);
        let previous = self.active.replace(Some((phase, resolver)));
        PhaseGuard {
            registry: self,
            phase,
            previous,
        }
    }

    /// Phase of the currently installed resolver
    pub fn active_phase(&self) -> Option<ResolutionPhase> {
        self.active.borrow().as_ref().map(|(phase, _)| *phase)
    }

    pub fn is_empty(&self) -> bool {
        self.active.borrow().is_none()
    }

    /// Ask the installed resolver, if any, for `name`
    pub fn resolve(&self, name: &str) -> Option<ModuleHandle> {
        // Clone out first so a resolver may consult this registry itself.
        let resolver = self
            .active
            .borrow()
            .as_ref()
            .map(|(_, r)| Arc::clone(r))?;
        resolver.resolve(name)
    }
}

impl fmt::Debug for ResolutionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionRegistry")
            .field("active_phase", &self.active_phase())
            .finish()
    }
}

/// Keeps a resolver installed; removes it on drop
pub struct PhaseGuard<'a> {
    registry: &'a ResolutionRegistry,
    phase: ResolutionPhase,
    previous: Option<Installed>,
}

impl PhaseGuard<'_> {
    pub fn phase(&self) -> ResolutionPhase {
        self.phase
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        trace!("Removing {:?} resolver", self.phase);
        *self.registry.active.borrow_mut() = self.previous.take();
    }
}
