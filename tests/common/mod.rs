//! Shared fixtures for loader integration tests
#![allow(dead_code)]

use std::cell::RefCell;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use dynamic_module_loader::module::loader::Sink;
use dynamic_module_loader::{
    CandidateDescriptor, Diagnostics, EntryCapability, EntryDeclaration, HostError,
    ModuleExports, ModuleHandle, ModuleHost, ModuleResolver, ResidentModules, ResolutionPhase,
    ResolutionRegistry, StaticHost,
};

/// Capability under test
pub trait Runtime: Send {
    fn kind(&self) -> &'static str;
    fn initialised(&self) -> bool;
    fn initialise(&mut self);
}

pub struct RuntimeCapability;

impl EntryCapability for RuntimeCapability {
    type Instance = dyn Runtime;
    const NAME: &'static str = "runtime";
}

macro_rules! runtime_entry {
    ($name:ident, $kind:expr) => {
        #[derive(Default)]
        pub struct $name {
            initialised: bool,
        }

        impl Runtime for $name {
            fn kind(&self) -> &'static str {
                $kind
            }
            fn initialised(&self) -> bool {
                self.initialised
            }
            fn initialise(&mut self) {
                self.initialised = true;
            }
        }
    };
}

runtime_entry!(OldEntry, "old");
runtime_entry!(NewEntry, "new");
runtime_entry!(AltEntry, "alt");

/// Unrelated capability, to check conformance filtering
pub struct TelemetryCapability;

impl EntryCapability for TelemetryCapability {
    type Instance = String;
    const NAME: &'static str = "telemetry";
}

pub fn old_entry() -> EntryDeclaration {
    EntryDeclaration::new::<RuntimeCapability, _>("OldEntry", || {
        Ok(Box::new(OldEntry::default()) as Box<dyn Runtime>)
    })
}

pub fn new_entry() -> EntryDeclaration {
    EntryDeclaration::new::<RuntimeCapability, _>("NewEntry", || {
        Ok(Box::new(NewEntry::default()) as Box<dyn Runtime>)
    })
}

pub fn alt_entry() -> EntryDeclaration {
    EntryDeclaration::new::<RuntimeCapability, _>("AltEntry", || {
        Ok(Box::new(AltEntry::default()) as Box<dyn Runtime>)
    })
}

pub fn telemetry_entry() -> EntryDeclaration {
    EntryDeclaration::new::<TelemetryCapability, _>("Telemetry", || {
        Ok(Box::new("telemetry".to_string()))
    })
}

/// Host with "OldImpl" at path "old" and "NewImpl" by identifier and at
/// path "new"
pub fn standard_host() -> StaticHost {
    let mut host = StaticHost::new();
    host.register_path("old", || ModuleExports::new("OldImpl").entry(old_entry()))
        .register("NewImpl", || ModuleExports::new("NewImpl").entry(new_entry()))
        .register_path("new", || ModuleExports::new("NewImplFromPath").entry(new_entry()));
    host
}

/// Predicate that counts how often it is evaluated
pub fn counted(result: bool) -> (impl Fn() -> bool + Send + Sync + 'static, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    (
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            result
        },
        calls,
    )
}

pub fn at_path(result: bool, path: &str) -> CandidateDescriptor {
    CandidateDescriptor::at_path(move || result, path).unwrap()
}

/// Diagnostics that record every message
#[derive(Clone, Default)]
pub struct Recorded {
    pub info: Arc<Mutex<Vec<String>>>,
    pub error: Arc<Mutex<Vec<String>>>,
}

impl Recorded {
    pub fn diagnostics(&self) -> Diagnostics {
        let info = Arc::clone(&self.info);
        let error = Arc::clone(&self.error);
        Diagnostics::new(
            Some(Arc::new(move |msg: &str| info.lock().unwrap().push(msg.to_string())) as Sink),
            Some(Arc::new(move |msg: &str| error.lock().unwrap().push(msg.to_string())) as Sink),
        )
    }

    pub fn errors(&self) -> Vec<String> {
        self.error.lock().unwrap().clone()
    }

    pub fn infos(&self) -> Vec<String> {
        self.info.lock().unwrap().clone()
    }
}

/// Host wrapper counting load attempts and recording the installed phase at
/// each call
pub struct CountingHost<H> {
    pub inner: H,
    pub identifier_loads: RefCell<Vec<String>>,
    pub path_loads: RefCell<Vec<String>>,
    pub phases_seen: RefCell<Vec<Option<ResolutionPhase>>>,
}

impl<H: ModuleHost> CountingHost<H> {
    pub fn new(inner: H) -> Self {
        Self {
            inner,
            identifier_loads: RefCell::new(Vec::new()),
            path_loads: RefCell::new(Vec::new()),
            phases_seen: RefCell::new(Vec::new()),
        }
    }
}

impl<H: ModuleHost> ModuleHost for CountingHost<H> {
    fn load_by_identifier(&self, identifier: &str) -> Result<ModuleHandle, HostError> {
        self.identifier_loads.borrow_mut().push(identifier.to_string());
        self.phases_seen
            .borrow_mut()
            .push(self.inner.resolution().active_phase());
        self.inner.load_by_identifier(identifier)
    }

    fn load_from_path(&self, path: &Path) -> Result<ModuleHandle, HostError> {
        self.path_loads.borrow_mut().push(path.display().to_string());
        self.phases_seen
            .borrow_mut()
            .push(self.inner.resolution().active_phase());
        self.inner.load_from_path(path)
    }

    fn locate(&self, name: &str) -> Option<ModuleHandle> {
        self.inner.locate(name)
    }

    fn resolution(&self) -> &ResolutionRegistry {
        self.inner.resolution()
    }

    fn resident(&self) -> &ResidentModules {
        self.inner.resident()
    }
}

/// Resolver serving one module under `name`, counting calls
pub fn serving(name: &'static str) -> (Arc<dyn ModuleResolver>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let resolver: Arc<dyn ModuleResolver> = Arc::new(move |requested: &str| {
        counter.fetch_add(1, Ordering::SeqCst);
        (requested == name).then(|| ModuleHandle::new_static(ModuleExports::new(name), Vec::new()))
    });
    (resolver, calls)
}
