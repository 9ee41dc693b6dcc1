//! Module exports: the contract every candidate module fulfils
//!
//! A module does not get scanned for types. Instead it hands the host an
//! explicit `ModuleExports` value listing its load-time dependencies and its
//! entry declarations, in the order the author declared them. The loader picks
//! the first declaration whose capability matches the one it was configured
//! with.
//!
//! Native modules export the value through a Rust-ABI function named
//! [`MODULE_EXPORTS_SYMBOL`], normally generated by [`export_module!`]. Native
//! modules must be built with the same compiler and the same version of this
//! crate as the host.
//!
//! [`export_module!`]: crate::export_module

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::module::traits::{BoxError, EntryCapability};

/// Symbol a native module exports its `ModuleExports` under
pub const MODULE_EXPORTS_SYMBOL: &str = "dynamic_module_exports";

/// Signature of the exported function behind [`MODULE_EXPORTS_SYMBOL`]
pub type ModuleExportsFn = fn() -> ModuleExports;

type ErasedFactory = Arc<dyn Fn() -> Result<Box<dyn Any>, BoxError> + Send + Sync>;

/// One entry type a module offers
///
/// The factory may be code inside a native library, so a declaration never
/// leaves the module it was declared in: it is not `Clone` and only the
/// loader runs it, with the owning `ModuleHandle` alive.
///
/// ```compile_fail
/// fn clonable<T: Clone>() {}
/// clonable::<dynamic_module_loader::EntryDeclaration>();
/// ```
///
/// ```compile_fail
/// use dynamic_module_loader::{EntryCapability, ModuleHandle};
///
/// fn detach<C: EntryCapability>(module: &ModuleHandle) {
///     let _ = module.exports().entries()[0].construct::<C>();
/// }
/// ```
pub struct EntryDeclaration {
    type_name: String,
    capability: &'static str,
    requires: Vec<String>,
    factory: ErasedFactory,
}

impl EntryDeclaration {
    /// Declare an entry type providing capability `C`
    ///
    /// `factory` is the parameterless construction path of the entry type.
    pub fn new<C, F>(type_name: impl Into<String>, factory: F) -> Self
    where
        C: EntryCapability,
        F: Fn() -> Result<Box<C::Instance>, BoxError> + Send + Sync + 'static,
    {
        let factory: ErasedFactory = Arc::new(move || {
            let instance = factory()?;
            Ok(Box::new(instance) as Box<dyn Any>)
        });
        Self {
            type_name: type_name.into(),
            capability: C::NAME,
            requires: Vec::new(),
            factory,
        }
    }

    /// Modules that must be resolvable before the entry is constructed
    pub fn requires<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn capability(&self) -> &str {
        self.capability
    }

    pub fn required_modules(&self) -> &[String] {
        &self.requires
    }

    pub fn conforms_to<C: EntryCapability>(&self) -> bool {
        self.capability == C::NAME
    }

    /// Run the factory and recover the capability's instance type
    pub(crate) fn construct<C: EntryCapability>(&self) -> Result<Box<C::Instance>, BoxError> {
        let erased = (self.factory)()?;
        erased
            .downcast::<Box<C::Instance>>()
            .map(|boxed| *boxed)
            .map_err(|_| {
                format!(
                    "entry type {} declared capability {} but produced a different instance type",
                    self.type_name,
                    C::NAME
                )
                .into()
            })
    }
}

impl fmt::Debug for EntryDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryDeclaration")
            .field("type_name", &self.type_name)
            .field("capability", &self.capability)
            .field("requires", &self.requires)
            .finish_non_exhaustive()
    }
}

/// Everything a module exposes to the host
///
/// ```compile_fail
/// fn clonable<T: Clone>() {}
/// clonable::<dynamic_module_loader::ModuleExports>();
/// ```
#[derive(Debug)]
pub struct ModuleExports {
    name: String,
    dependencies: Vec<String>,
    entries: Vec<EntryDeclaration>,
}

impl ModuleExports {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            entries: Vec::new(),
        }
    }

    /// Add a module that must be resolvable while this one is loaded
    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push(name.into());
        self
    }

    /// Append an entry declaration; declaration order is preserved
    pub fn entry(mut self, declaration: EntryDeclaration) -> Self {
        self.entries.push(declaration);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn entries(&self) -> &[EntryDeclaration] {
        &self.entries
    }

    /// First entry conforming to `C`, in declaration order
    pub fn find_entry<C: EntryCapability>(&self) -> Option<&EntryDeclaration> {
        self.entries.iter().find(|e| e.conforms_to::<C>())
    }
}

/// Export a module's `ModuleExports` from a native library
///
/// ```rust,ignore
/// dynamic_module_loader::export_module!(
///     ModuleExports::new("NewImpl")
///         .entry(EntryDeclaration::new::<StorageCapability, _>("NewEntry", || {
///             Ok(Box::new(NewEntry::default()) as Box<dyn Storage>)
///         }))
/// );
/// ```
#[macro_export]
macro_rules! export_module {
    ($exports:expr) => {
        #[no_mangle]
        pub fn dynamic_module_exports() -> $crate::ModuleExports {
            $exports
        }
    };
}
