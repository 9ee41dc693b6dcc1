//! Dynamic module loader
//!
//! Selects the first eligible candidate, loads it into a host and constructs
//! its entry instance. A call either returns a fully initialised
//! `LoadedModule` or a single `LoadError`; nothing is cached between calls.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::LoaderConfig;
use crate::module::candidate::{select_candidate, CandidateDescriptor};
use crate::module::handle::ModuleHandle;
use crate::module::host::ModuleHost;
use crate::module::loader::diagnostics::Diagnostics;
use crate::module::loader::loaded::LoadedModule;
use crate::module::resolution::{
    ResidentModuleResolver, ResolutionHooks, ResolutionPhase, SiblingDirectoryResolver,
};
use crate::module::traits::{BoxError, EntryCapability, LoadError, ModuleResolver};

/// Post-load hook, called once per successful load with the new entry
pub type OnLoaded<C> =
    Box<dyn FnMut(&mut <C as EntryCapability>::Instance) -> Result<(), BoxError> + Send>;

/// Loader for modules providing capability `C`
pub struct DynamicModuleLoader<C: EntryCapability> {
    candidates: Vec<CandidateDescriptor>,
    diagnostics: Diagnostics,
    hooks: ResolutionHooks,
    on_loaded: OnLoaded<C>,
}

impl<C: EntryCapability> DynamicModuleLoader<C> {
    /// Create a loader with no candidates, default hooks and stdio diagnostics
    pub fn new<F>(on_loaded: F) -> Self
    where
        F: FnMut(&mut C::Instance) -> Result<(), BoxError> + Send + 'static,
    {
        Self {
            candidates: Vec::new(),
            diagnostics: Diagnostics::default(),
            hooks: ResolutionHooks::default(),
            on_loaded: Box::new(on_loaded),
        }
    }

    /// Create a loader from configuration
    ///
    /// Candidates, diagnostics and extra dependency directories all come from
    /// `config`.
    pub fn from_config<F>(config: &LoaderConfig, on_loaded: F) -> Result<Self, LoadError>
    where
        F: FnMut(&mut C::Instance) -> Result<(), BoxError> + Send + 'static,
    {
        let mut resolver = SiblingDirectoryResolver::default();
        for dir in &config.dependency_dirs {
            resolver = resolver.with_dir(dir);
        }

        Ok(Self::new(on_loaded)
            .with_candidates(config.candidate_descriptors()?)
            .with_diagnostics(Diagnostics::from_config(&config.diagnostics))
            .with_hooks(ResolutionHooks::new(Arc::new(resolver), None)))
    }

    pub fn with_candidates(mut self, candidates: Vec<CandidateDescriptor>) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Replace both resolution hooks
    pub fn with_hooks(mut self, hooks: ResolutionHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Replace the resolver consulted while the primary module loads
    pub fn with_primary_load_resolver(mut self, resolver: Arc<dyn ModuleResolver>) -> Self {
        self.hooks.primary_load = resolver;
        self
    }

    /// Replace the resolver consulted while the entry is constructed
    pub fn with_entry_construction_resolver(mut self, resolver: Arc<dyn ModuleResolver>) -> Self {
        self.hooks.entry_construction = Some(resolver);
        self
    }

    /// Append a candidate; insertion order is evaluation order
    pub fn push_candidate(&mut self, candidate: CandidateDescriptor) -> &mut Self {
        self.candidates.push(candidate);
        self
    }

    pub fn candidates(&self) -> &[CandidateDescriptor] {
        &self.candidates
    }

    pub fn candidates_mut(&mut self) -> &mut Vec<CandidateDescriptor> {
        &mut self.candidates
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn set_diagnostics(&mut self, diagnostics: Diagnostics) {
        self.diagnostics = diagnostics;
    }

    pub fn hooks(&self) -> &ResolutionHooks {
        &self.hooks
    }

    /// Evaluate conditions without loading anything
    pub fn select(&self) -> Option<(usize, &CandidateDescriptor)> {
        select_candidate(&self.candidates)
    }

    /// Load the first eligible candidate into `host`
    pub fn try_load<H>(&mut self, host: &H) -> Result<LoadedModule<C>, LoadError>
    where
        H: ModuleHost + ?Sized,
    {
        debug!(
            "Selecting {} module among {} candidates",
            C::NAME,
            self.candidates.len()
        );

        let (index, candidate) = match select_candidate(&self.candidates) {
            Some((index, candidate)) => (index, candidate.clone()),
            None => {
                let err = LoadError::NoEligibleCandidate {
                    candidates: self.candidates.len(),
                };
                warn!("{}", err);
                self.diagnostics.error(&err.to_string());
                return Err(err);
            }
        };
        self.diagnostics.info(&format!(
            "Selected candidate #{} ({}) for {}",
            index,
            candidate.display_name(),
            C::NAME
        ));

        let module = self.load_module(host, &candidate)?;
        let (mut entry, construction_dependencies) = self.construct_entry(host, &module)?;

        if let Err(e) = (self.on_loaded)(&mut *entry) {
            let err = LoadError::PostLoadHookFailed(e);
            warn!("{}", err);
            self.diagnostics.error(&err.to_string());
            return Err(err);
        }

        info!("Loaded {} module {}", C::NAME, module.name());
        self.diagnostics
            .info(&format!("Loaded module {} for {}", module.name(), C::NAME));
        Ok(LoadedModule::new(module, entry, construction_dependencies))
    }

    /// Load phase: identifier first (soft), then path (hard)
    fn load_module<H>(
        &self,
        host: &H,
        candidate: &CandidateDescriptor,
    ) -> Result<ModuleHandle, LoadError>
    where
        H: ModuleHost + ?Sized,
    {
        let _guard = host.resolution().install(
            ResolutionPhase::PrimaryLoad,
            Arc::clone(&self.hooks.primary_load),
        );

        let mut identifier_error = None;
        if let Some(identifier) = candidate.identifier() {
            debug!("Loading {} by identifier", identifier);
            match host.load_by_identifier(identifier) {
                Ok(module) => {
                    self.diagnostics
                        .info(&format!("Loaded {} by identifier", identifier));
                    return Ok(module);
                }
                Err(source) => {
                    let err = LoadError::IdentifierLoadFailed {
                        identifier: identifier.to_string(),
                        source,
                    };
                    warn!("{}", err);
                    self.diagnostics.error(&err.to_string());
                    identifier_error = Some(err);
                }
            }
        }

        let Some(path) = candidate.path() else {
            return Err(identifier_error.unwrap_or_else(|| {
                LoadError::InvalidCandidate("candidate has neither identifier nor path".to_string())
            }));
        };
        self.load_from_path(host, path)
    }

    fn load_from_path<H>(&self, host: &H, path: &Path) -> Result<ModuleHandle, LoadError>
    where
        H: ModuleHost + ?Sized,
    {
        debug!("Loading module from {:?}", path);
        match host.load_from_path(path) {
            Ok(module) => {
                self.diagnostics
                    .info(&format!("Loaded {} from {}", module.name(), path.display()));
                Ok(module)
            }
            Err(source) => {
                let err = LoadError::PathLoadFailed {
                    path: path.to_path_buf(),
                    source,
                };
                warn!("{}", err);
                self.diagnostics.error(&err.to_string());
                Err(err)
            }
        }
    }

    /// Entry-construction phase
    fn construct_entry<H>(
        &self,
        host: &H,
        module: &ModuleHandle,
    ) -> Result<(Box<C::Instance>, Vec<ModuleHandle>), LoadError>
    where
        H: ModuleHost + ?Sized,
    {
        let resolver: Arc<dyn ModuleResolver> = match &self.hooks.entry_construction {
            Some(resolver) => Arc::clone(resolver),
            None => Arc::new(ResidentModuleResolver::new(host.resident().clone())),
        };
        let _guard = host
            .resolution()
            .install(ResolutionPhase::EntryConstruction, resolver);

        let exports = module.exports();
        let Some(declaration) = exports.find_entry::<C>() else {
            let err = LoadError::EntryTypeNotFound {
                module: module.name().to_string(),
                capability: C::NAME.to_string(),
            };
            warn!("{}", err);
            self.diagnostics.error(&err.to_string());
            return Err(err);
        };

        let conforming = exports
            .entries()
            .iter()
            .filter(|e| e.conforms_to::<C>())
            .count();
        if conforming > 1 {
            self.diagnostics.info(&format!(
                "Module {} declares {} entries for {}; using first declared ({})",
                module.name(),
                conforming,
                C::NAME,
                declaration.type_name()
            ));
        }

        let instantiation_failed = |reason: String| {
            let err = LoadError::InstantiationFailed {
                type_name: declaration.type_name().to_string(),
                reason,
            };
            warn!("{}", err);
            self.diagnostics.error(&err.to_string());
            err
        };

        let mut dependencies = Vec::with_capacity(declaration.required_modules().len());
        for name in declaration.required_modules() {
            let dependency = host
                .resolve_dependency(module.name(), name)
                .map_err(|e| instantiation_failed(e.to_string()))?;
            dependencies.push(dependency);
        }

        debug!("Constructing entry {}", declaration.type_name());
        let entry = declaration
            .construct::<C>()
            .map_err(|e| instantiation_failed(e.to_string()))?;
        Ok((entry, dependencies))
    }
}

impl<C: EntryCapability> fmt::Debug for DynamicModuleLoader<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicModuleLoader")
            .field("capability", &C::NAME)
            .field("candidates", &self.candidates)
            .field("diagnostics", &self.diagnostics)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}
