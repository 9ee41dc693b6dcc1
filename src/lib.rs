//! Dynamic Module Loader - runtime selection of one implementation module
//!
//! A program that ships several implementations of the same contract (an
//! "old-runtime" and a "new-runtime" backend, say) registers them as ordered
//! candidates. At the moment of use the loader evaluates their conditions,
//! loads the first eligible module, constructs its entry instance and hands
//! back something implementing the contract. Consuming code never branches on
//! which implementation is active.
//!
//! ## Design Principles
//!
//! 1. **Single-shot commitment**: only the first eligible candidate is tried
//! 2. **Soft identifier, hard path**: a failed identifier lookup falls back to
//!    the path, a failed path load aborts
//! 3. **Scoped resolution hooks**: installed per phase, always removed
//! 4. **No partial results**: the post-load hook runs before success is reported
//!
//! ## Example
//!
//! ```rust
//! use dynamic_module_loader::{
//!     CandidateDescriptor, Diagnostics, DynamicModuleLoader, EntryCapability,
//!     EntryDeclaration, ModuleExports, StaticHost,
//! };
//!
//! pub trait Runtime {
//!     fn name(&self) -> &'static str;
//! }
//!
//! struct NewRuntime;
//! impl Runtime for NewRuntime {
//!     fn name(&self) -> &'static str {
//!         "new"
//!     }
//! }
//!
//! struct RuntimeCapability;
//! impl EntryCapability for RuntimeCapability {
//!     type Instance = dyn Runtime;
//!     const NAME: &'static str = "runtime";
//! }
//!
//! let mut host = StaticHost::new();
//! host.register("NewImpl", || {
//!     ModuleExports::new("NewImpl").entry(EntryDeclaration::new::<RuntimeCapability, _>(
//!         "NewRuntime",
//!         || Ok(Box::new(NewRuntime) as Box<dyn Runtime>),
//!     ))
//! });
//!
//! let mut loader = DynamicModuleLoader::<RuntimeCapability>::new(|_entry| Ok(()))
//!     .with_diagnostics(Diagnostics::silent());
//! loader.push_candidate(CandidateDescriptor::at_path(|| false, "old").unwrap());
//! loader.push_candidate(CandidateDescriptor::with_identifier(|| true, "NewImpl", "new").unwrap());
//!
//! let loaded = loader.try_load(&host).unwrap();
//! assert_eq!(loaded.entry().name(), "new");
//! ```

pub mod config;
pub mod module;
pub mod utils;

pub use config::{CandidateConfig, ConfigError, LoaderConfig, LoggingConfig};
pub use module::{
    select_candidate, BoxError, CandidateDescriptor, Condition, Diagnostics, DynamicModuleLoader,
    EntryCapability, EntryDeclaration, EvaluationContext, HostError, LoadError, LoadedModule,
    ModuleExports, ModuleHandle, ModuleHost, ModuleOrigin, ModuleResolver, NativeHost,
    ResidentModules, ResolutionHooks, ResolutionPhase, ResolutionRegistry, StaticHost,
};
