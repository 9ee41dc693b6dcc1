//! Native module exporting one "greeting" entry
//!
//! The entry instance is a plain `String` so the host can name the same
//! instance type without sharing a crate with this module.

use dynamic_module_loader::{EntryCapability, EntryDeclaration, ModuleExports};

pub struct GreetingCapability;

impl EntryCapability for GreetingCapability {
    type Instance = String;
    const NAME: &'static str = "greeting";
}

dynamic_module_loader::export_module!(ModuleExports::new("greeting_module").entry(
    EntryDeclaration::new::<GreetingCapability, _>("Greeting", || {
        Ok(Box::new("hello from greeting_module".to_string()))
    })
));
