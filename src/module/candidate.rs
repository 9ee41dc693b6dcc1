//! Candidate descriptors and candidate selection

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::module::traits::LoadError;

/// Zero-argument predicate deciding whether a candidate is eligible
pub type Predicate = Arc<dyn Fn() -> bool + Send + Sync>;

/// One candidate module: a condition plus where to find the module
///
/// Immutable after construction. At least one of `identifier` and `path` is
/// always present; empty strings and empty paths count as absent.
#[derive(Clone)]
pub struct CandidateDescriptor {
    condition: Predicate,
    identifier: Option<String>,
    path: Option<PathBuf>,
    label: Option<String>,
}

impl CandidateDescriptor {
    pub fn new<F>(
        condition: F,
        identifier: Option<String>,
        path: Option<PathBuf>,
    ) -> Result<Self, LoadError>
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Self::from_predicate(Arc::new(condition), identifier, path)
    }

    /// Same as [`CandidateDescriptor::new`] for an already shared predicate
    pub fn from_predicate(
        condition: Predicate,
        identifier: Option<String>,
        path: Option<PathBuf>,
    ) -> Result<Self, LoadError> {
        let identifier = identifier.filter(|id| !id.trim().is_empty());
        let path = path.filter(|p| !p.as_os_str().is_empty());

        if identifier.is_none() && path.is_none() {
            return Err(LoadError::InvalidCandidate(
                "candidate needs an identifier or a path".to_string(),
            ));
        }

        Ok(Self {
            condition,
            identifier,
            path,
            label: None,
        })
    }

    /// Candidate located only by file path
    pub fn at_path<F>(condition: F, path: impl Into<PathBuf>) -> Result<Self, LoadError>
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Self::new(condition, None, Some(path.into()))
    }

    /// Candidate located by identifier first, falling back to `path`
    pub fn with_identifier<F>(
        condition: F,
        identifier: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Result<Self, LoadError>
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Self::new(condition, Some(identifier.into()), Some(path.into()))
    }

    /// Attach a human-readable label used in diagnostics
    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Evaluate the candidate's condition
    pub fn is_eligible(&self) -> bool {
        (self.condition)()
    }

    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Label, identifier or path, whichever is available first
    pub fn display_name(&self) -> String {
        if let Some(label) = &self.label {
            return label.clone();
        }
        if let Some(identifier) = &self.identifier {
            return identifier.clone();
        }
        self.path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    }
}

impl fmt::Debug for CandidateDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CandidateDescriptor")
            .field("label", &self.label)
            .field("identifier", &self.identifier)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Pick the first candidate whose condition holds
///
/// Conditions are evaluated in list order and evaluation stops at the first
/// one returning true; later conditions are never called.
pub fn select_candidate(
    candidates: &[CandidateDescriptor],
) -> Option<(usize, &CandidateDescriptor)> {
    candidates
        .iter()
        .enumerate()
        .find(|(_, candidate)| candidate.is_eligible())
}
