//! Module loading system
//!
//! Candidate selection, the two-phase load and the result type.

pub mod diagnostics;
pub mod loaded;
pub mod loader;

pub use diagnostics::{Diagnostics, DiagnosticsConfig, DiagnosticsMode, Sink};
pub use loaded::LoadedModule;
pub use loader::{DynamicModuleLoader, OnLoaded};
