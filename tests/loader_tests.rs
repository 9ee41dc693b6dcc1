//! Loader tests
//!
//! Candidate selection, identifier/path fallback, failure surfacing and the
//! post-load hook.

mod common;

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use common::*;
use dynamic_module_loader::{
    CandidateDescriptor, Diagnostics, DynamicModuleLoader, EntryDeclaration, HostError, LoadError,
    ModuleExports, ModuleHost, ModuleOrigin, StaticHost,
};

fn loader() -> DynamicModuleLoader<RuntimeCapability> {
    DynamicModuleLoader::new(|_| Ok(())).with_diagnostics(Diagnostics::silent())
}

#[test]
fn test_selects_first_eligible_and_short_circuits() {
    let (a, a_calls) = counted(false);
    let (b, b_calls) = counted(true);
    let (c, c_calls) = counted(true);

    let mut loader = loader();
    loader
        .push_candidate(CandidateDescriptor::at_path(a, "old").unwrap())
        .push_candidate(CandidateDescriptor::at_path(b, "new").unwrap())
        .push_candidate(CandidateDescriptor::at_path(c, "old").unwrap());

    let loaded = loader.try_load(&standard_host()).unwrap();

    assert_eq!(loaded.module_handle().name(), "NewImplFromPath");
    assert_eq!(a_calls.load(Ordering::SeqCst), 1);
    assert_eq!(b_calls.load(Ordering::SeqCst), 1);
    assert_eq!(c_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_empty_candidates_yield_no_eligible_candidate() {
    let mut loader = loader();
    let err = loader.try_load(&standard_host()).unwrap_err();
    assert!(matches!(err, LoadError::NoEligibleCandidate { candidates: 0 }));
}

#[test]
fn test_no_eligible_candidate_never_loads() {
    let called = Arc::new(Mutex::new(0));
    let hook_calls = Arc::clone(&called);
    let mut loader = DynamicModuleLoader::<RuntimeCapability>::new(move |_| {
        *hook_calls.lock().unwrap() += 1;
        Ok(())
    })
    .with_diagnostics(Diagnostics::silent())
    .with_candidates(vec![at_path(false, "old"), at_path(false, "new")]);

    let host = CountingHost::new(standard_host());
    let err = loader.try_load(&host).unwrap_err();

    assert!(matches!(err, LoadError::NoEligibleCandidate { candidates: 2 }));
    assert!(host.identifier_loads.borrow().is_empty());
    assert!(host.path_loads.borrow().is_empty());
    assert_eq!(*called.lock().unwrap(), 0);
}

#[test]
fn test_new_runtime_scenario() {
    let hooked: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&hooked);
    let mut loader = DynamicModuleLoader::<RuntimeCapability>::new(move |entry| {
        seen.lock().unwrap().push(entry.kind());
        entry.initialise();
        Ok(())
    })
    .with_diagnostics(Diagnostics::silent());
    loader.push_candidate(CandidateDescriptor::at_path(|| false, "old").unwrap());
    loader.push_candidate(
        CandidateDescriptor::with_identifier(|| true, "NewImpl", "new").unwrap(),
    );

    let host = CountingHost::new(standard_host());
    let loaded = loader.try_load(&host).unwrap();

    assert_eq!(loaded.entry().kind(), "new");
    assert!(loaded.entry().initialised());
    assert_eq!(*hooked.lock().unwrap(), vec!["new"]);
    assert_eq!(loaded.module_handle().name(), "NewImpl");
    assert_eq!(
        loaded.module_handle().origin(),
        &ModuleOrigin::Identifier("NewImpl".to_string())
    );
    // Identifier succeeded, so the path was never touched.
    assert!(host.path_loads.borrow().is_empty());
}

#[test]
fn test_identifier_failure_falls_back_to_path_once() {
    let recorded = Recorded::default();
    let mut loader = loader().with_diagnostics(recorded.diagnostics());
    loader.push_candidate(
        CandidateDescriptor::with_identifier(|| true, "MissingImpl", "new").unwrap(),
    );

    let host = CountingHost::new(standard_host());
    let loaded = loader.try_load(&host).unwrap();

    assert_eq!(loaded.module_handle().name(), "NewImplFromPath");
    assert_eq!(*host.identifier_loads.borrow(), vec!["MissingImpl"]);
    assert_eq!(*host.path_loads.borrow(), vec!["new"]);
    assert!(recorded.errors().iter().any(|e| e.contains("MissingImpl")));
}

#[test]
fn test_rejected_identifier_falls_back_to_path() {
    let mut inner = standard_host();
    inner.reject("NewImpl", "incompatible runtime");
    let host = CountingHost::new(inner);

    let mut loader = loader();
    loader.push_candidate(
        CandidateDescriptor::with_identifier(|| true, "NewImpl", "new").unwrap(),
    );

    let loaded = loader.try_load(&host).unwrap();
    assert_eq!(loaded.module_handle().path(), Some(std::path::Path::new("new")));
    assert_eq!(host.path_loads.borrow().len(), 1);
}

#[test]
fn test_both_loads_fail_surfaces_path_error() {
    let hook_calls = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&hook_calls);
    let mut loader = DynamicModuleLoader::<RuntimeCapability>::new(move |_| {
        *counter.lock().unwrap() += 1;
        Ok(())
    })
    .with_diagnostics(Diagnostics::silent());
    loader.push_candidate(
        CandidateDescriptor::with_identifier(|| true, "MissingImpl", "missing").unwrap(),
    );
    // A later eligible candidate must not be tried.
    loader.push_candidate(at_path(true, "old"));

    let host = CountingHost::new(standard_host());
    let err = loader.try_load(&host).unwrap_err();

    match err {
        LoadError::PathLoadFailed { path, source } => {
            assert_eq!(path, PathBuf::from("missing"));
            assert!(matches!(source, HostError::NotFound(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(*host.path_loads.borrow(), vec!["missing"]);
    assert_eq!(*hook_calls.lock().unwrap(), 0);
}

#[test]
fn test_identifier_only_candidate_surfaces_identifier_error() {
    let mut loader = loader();
    loader.push_candidate(
        CandidateDescriptor::new(|| true, Some("MissingImpl".to_string()), None).unwrap(),
    );

    let err = loader.try_load(&standard_host()).unwrap_err();
    assert!(matches!(
        err,
        LoadError::IdentifierLoadFailed { ref identifier, .. } if identifier == "MissingImpl"
    ));
}

#[test]
fn test_entry_type_not_found() {
    let mut host = StaticHost::new();
    host.register_path("telemetry-only", || {
        ModuleExports::new("TelemetryImpl").entry(telemetry_entry())
    });

    let mut loader = loader();
    loader.push_candidate(at_path(true, "telemetry-only"));

    let err = loader.try_load(&host).unwrap_err();
    match err {
        LoadError::EntryTypeNotFound { module, capability } => {
            assert_eq!(module, "TelemetryImpl");
            assert_eq!(capability, "runtime");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_non_conforming_entries_are_skipped() {
    let mut host = StaticHost::new();
    host.register_path("mixed", || {
        ModuleExports::new("Mixed")
            .entry(telemetry_entry())
            .entry(alt_entry())
    });

    let mut loader = loader();
    loader.push_candidate(at_path(true, "mixed"));

    let loaded = loader.try_load(&host).unwrap();
    assert_eq!(loaded.entry().kind(), "alt");
}

#[test]
fn test_multiple_conforming_entries_choice_is_stable() {
    let mut host = StaticHost::new();
    host.register_path("two", || {
        ModuleExports::new("TwoEntries")
            .entry(alt_entry())
            .entry(new_entry())
    });

    let recorded = Recorded::default();
    let mut loader = loader().with_diagnostics(recorded.diagnostics());
    loader.push_candidate(at_path(true, "two"));

    let kinds: Vec<&'static str> = (0..5)
        .map(|_| loader.try_load(&host).unwrap().entry().kind())
        .collect();

    assert!(kinds.iter().all(|k| *k == kinds[0]));
    assert!(recorded.infos().iter().any(|m| m.contains("declares 2 entries")));
}

#[test]
fn test_instantiation_failure() {
    let mut host = StaticHost::new();
    host.register_path("broken", || {
        ModuleExports::new("Broken").entry(
            EntryDeclaration::new::<RuntimeCapability, _>(
                "BrokenEntry",
                || Err("device missing".into()),
            ),
        )
    });

    let mut loader = loader();
    loader.push_candidate(at_path(true, "broken"));

    let err = loader.try_load(&host).unwrap_err();
    match err {
        LoadError::InstantiationFailed { type_name, reason } => {
            assert_eq!(type_name, "BrokenEntry");
            assert_eq!(reason, "device missing");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_post_load_hook_failure() {
    let mut loader = DynamicModuleLoader::<RuntimeCapability>::new(|entry| {
        Err(format!("{} runtime refused to start", entry.kind()).into())
    })
    .with_diagnostics(Diagnostics::silent());
    loader.push_candidate(at_path(true, "old"));

    let host = standard_host();
    let err = loader.try_load(&host).unwrap_err();

    assert!(matches!(
        err,
        LoadError::PostLoadHookFailed(ref e) if e.to_string() == "old runtime refused to start"
    ));
    // The module was loaded before the hook ran.
    assert_eq!(host.resident().names(), vec!["OldImpl"]);
}

#[test]
fn test_each_call_is_independent() {
    let hook_calls = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&hook_calls);
    let mut loader = DynamicModuleLoader::<RuntimeCapability>::new(move |_| {
        *counter.lock().unwrap() += 1;
        Ok(())
    })
    .with_diagnostics(Diagnostics::silent());
    loader.push_candidate(at_path(true, "old"));

    let host = standard_host();
    let first = loader.try_load(&host).unwrap();
    let second = loader.try_load(&host).unwrap();

    assert_ne!(first.module_handle(), second.module_handle());
    assert_eq!(*hook_calls.lock().unwrap(), 2);

    // Candidates may be edited between calls.
    loader.candidates_mut().insert(0, at_path(true, "new"));
    let third = loader.try_load(&host).unwrap();
    assert_eq!(third.entry().kind(), "new");
    assert_eq!(*hook_calls.lock().unwrap(), 3);
}

#[test]
fn test_disabled_sinks_do_not_change_outcome() {
    let run = |diagnostics: Diagnostics| {
        let mut loader = loader().with_diagnostics(diagnostics);
        loader.push_candidate(
            CandidateDescriptor::with_identifier(|| true, "MissingImpl", "new").unwrap(),
        );
        loader
            .try_load(&standard_host())
            .map(|loaded| loaded.entry().kind())
            .map_err(|e| e.to_string())
    };

    assert_eq!(run(Diagnostics::silent()), run(Recorded::default().diagnostics()));
    assert_eq!(run(Diagnostics::silent()), Ok("new"));
}

#[test]
fn test_select_is_a_dry_run() {
    let (a, a_calls) = counted(true);
    let mut loader = loader();
    loader.push_candidate(CandidateDescriptor::at_path(a, "old").unwrap().labeled("legacy"));

    let (index, candidate) = loader.select().unwrap();
    assert_eq!(index, 0);
    assert_eq!(candidate.label(), Some("legacy"));
    assert_eq!(a_calls.load(Ordering::SeqCst), 1);
}
