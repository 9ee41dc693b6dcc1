//! Module system
//!
//! Lets a program ship several mutually-exclusive implementations of one
//! interface and pick among them at runtime:
//!
//! - **Candidates**: ordered (condition, module reference) pairs; the first
//!   candidate whose condition holds is the only one tried
//! - **Hosts**: where modules come from (native shared libraries, or modules
//!   compiled into the process)
//! - **Exports**: every module declares its entry types explicitly; there is
//!   no type scanning
//! - **Two-phase resolution**: dependencies are resolved through a hook
//!   installed only while the module loads, then through another installed
//!   only while its entry is constructed
//! - **All-or-nothing**: a load returns a fully initialised module or one error

pub mod candidate;
pub mod condition;
pub mod exports;
pub mod handle;
pub mod host;
pub mod loader;
pub mod resolution;
pub mod traits;

pub use candidate::{select_candidate, CandidateDescriptor, Predicate};
pub use condition::{Condition, EvaluationContext};
pub use exports::{EntryDeclaration, ModuleExports, MODULE_EXPORTS_SYMBOL};
pub use handle::{ModuleHandle, ModuleOrigin, ResidentModules};
pub use host::{ModuleHost, NativeHost, StaticHost};
pub use loader::{Diagnostics, DynamicModuleLoader, LoadedModule};
pub use resolution::{ResolutionHooks, ResolutionPhase, ResolutionRegistry};
pub use traits::{BoxError, EntryCapability, HostError, LoadError, ModuleResolver};
