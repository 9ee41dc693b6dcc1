//! Declarative candidate conditions
//!
//! Conditions describe the environment a candidate is meant for (OS, CPU
//! architecture, feature flags, installed libraries, OS version) and are
//! evaluated at the moment a load is attempted, not when they are parsed.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::module::candidate::Predicate;
use crate::utils::env::{env_bool, env_opt};

/// Environment variable holding extra comma-separated feature flags
pub const FEATURES_ENV: &str = "MODULE_FEATURES";

/// Environment predicate attached to a candidate
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    #[default]
    Always,
    Never,
    /// `std::env::consts::OS`, e.g. "linux"
    Os(String),
    /// `std::env::consts::FAMILY`, e.g. "unix"
    Family(String),
    /// `std::env::consts::ARCH`, e.g. "x86_64"
    Arch(String),
    /// Environment variable is set
    EnvSet(String),
    EnvEquals { var: String, value: String },
    /// Environment variable is truthy ("1", "true", "yes", "on")
    EnvFlag(String),
    /// Feature flag enabled in configuration or `MODULE_FEATURES`
    Feature(String),
    PathExists(PathBuf),
    /// Shared library can be opened by the dynamic linker
    LibraryAvailable(String),
    /// Running OS version is at least this dotted version
    MinOsVersion(String),
    /// Running kernel version is at least this dotted version
    MinKernelVersion(String),
    All(Vec<Condition>),
    Any(Vec<Condition>),
    Not(Box<Condition>),
}

/// Inputs conditions are evaluated against besides the process environment
#[derive(Debug, Clone, Default)]
pub struct EvaluationContext {
    features: Arc<BTreeSet<String>>,
}

impl EvaluationContext {
    pub fn new<I, S>(features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            features: Arc::new(features.into_iter().map(Into::into).collect()),
        }
    }

    /// Whether `feature` is enabled, consulting `MODULE_FEATURES` each call
    pub fn has_feature(&self, feature: &str) -> bool {
        if self.features.contains(feature) {
            return true;
        }
        env_opt(FEATURES_ENV)
            .map(|list| list.split(',').any(|f| f.trim() == feature))
            .unwrap_or(false)
    }
}

impl Condition {
    pub fn evaluate(&self, ctx: &EvaluationContext) -> bool {
        let result = match self {
            Condition::Always => true,
            Condition::Never => false,
            Condition::Os(os) => std::env::consts::OS.eq_ignore_ascii_case(os),
            Condition::Family(family) => std::env::consts::FAMILY.eq_ignore_ascii_case(family),
            Condition::Arch(arch) => std::env::consts::ARCH.eq_ignore_ascii_case(arch),
            Condition::EnvSet(var) => env_opt(var).is_some(),
            Condition::EnvEquals { var, value } => env_opt(var).as_deref() == Some(value.as_str()),
            Condition::EnvFlag(var) => env_bool(var),
            Condition::Feature(feature) => ctx.has_feature(feature),
            Condition::PathExists(path) => path.exists(),
            Condition::LibraryAvailable(name) => library_available(name),
            Condition::MinOsVersion(min) => {
                running_os_version().is_some_and(|v| version_at_least(&v, min))
            }
            Condition::MinKernelVersion(min) => {
                running_kernel_version().is_some_and(|v| version_at_least(&v, min))
            }
            Condition::All(all) => all.iter().all(|c| c.evaluate(ctx)),
            Condition::Any(any) => any.iter().any(|c| c.evaluate(ctx)),
            Condition::Not(inner) => !inner.evaluate(ctx),
        };
        trace!("Condition {:?} evaluated to {}", self, result);
        result
    }

    /// Turn the condition into a candidate predicate bound to `ctx`
    pub fn into_predicate(self, ctx: EvaluationContext) -> Predicate {
        Arc::new(move || self.evaluate(&ctx))
    }
}

fn library_available(name: &str) -> bool {
    // SAFETY: probing runs the library's initialisers, the same code that
    // would run if the candidate depending on it were loaded.
    unsafe { libloading::Library::new(libloading::library_filename(name)) }.is_ok()
}

#[cfg(feature = "sysinfo")]
fn running_os_version() -> Option<String> {
    sysinfo::System::os_version()
}

#[cfg(not(feature = "sysinfo"))]
fn running_os_version() -> Option<String> {
    None
}

#[cfg(feature = "sysinfo")]
fn running_kernel_version() -> Option<String> {
    sysinfo::System::kernel_version()
}

#[cfg(not(feature = "sysinfo"))]
fn running_kernel_version() -> Option<String> {
    None
}

/// Numeric components of a dotted version; stops at the first non-numeric
/// component ("6.1.0-13-amd64" gives [6, 1, 0])
fn version_components(version: &str) -> Vec<u64> {
    let mut components = Vec::new();
    for part in version.trim().split('.') {
        let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
        match digits.parse() {
            Ok(n) => components.push(n),
            Err(_) => break,
        }
        if digits.len() != part.len() {
            break;
        }
    }
    components
}

/// Compare dotted versions, missing components counting as zero
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let a = version_components(a);
    let b = version_components(b);
    let len = a.len().max(b.len());
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

fn version_at_least(running: &str, min: &str) -> bool {
    !version_components(running).is_empty() && compare_versions(running, min) != Ordering::Less
}
