//! Default resolver strategies

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::module::handle::{ModuleHandle, ResidentModules};
use crate::module::host::native;
use crate::module::traits::ModuleResolver;

/// Searches directories for a library file named after the requested module
///
/// The default instance searches the directory containing the running
/// executable, i.e. the directory the loader itself is hosted from.
#[derive(Debug, Clone)]
pub struct SiblingDirectoryResolver {
    dirs: Vec<PathBuf>,
}

impl SiblingDirectoryResolver {
    pub fn new<I, P>(dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        Self {
            dirs: dirs.into_iter().map(|d| d.as_ref().to_path_buf()).collect(),
        }
    }

    /// Directory containing the current executable, if it can be determined
    pub fn host_dir() -> Option<PathBuf> {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
    }

    /// Add a directory searched after the existing ones
    pub fn with_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.dirs.push(dir.as_ref().to_path_buf());
        self
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// First existing library file for `name` in the search directories
    pub fn candidate_file(&self, name: &str) -> Option<PathBuf> {
        let file_name = libloading::library_filename(name);
        self.dirs
            .iter()
            .map(|dir| dir.join(&file_name))
            .find(|path| path.is_file())
    }
}

impl Default for SiblingDirectoryResolver {
    fn default() -> Self {
        Self::new(Self::host_dir())
    }
}

impl ModuleResolver for SiblingDirectoryResolver {
    fn resolve(&self, name: &str) -> Option<ModuleHandle> {
        let path = self.candidate_file(name)?;
        match native::open_dependency(&path, name) {
            Ok(module) => {
                debug!("Resolved {} from {:?}", name, path);
                Some(module)
            }
            Err(e) => {
                debug!("Found {:?} for {} but could not open it: {}", path, name, e);
                None
            }
        }
    }
}

/// Matches the requested name against modules already resident in a host
#[derive(Debug, Clone)]
pub struct ResidentModuleResolver {
    resident: ResidentModules,
}

impl ResidentModuleResolver {
    pub fn new(resident: ResidentModules) -> Self {
        Self { resident }
    }
}

impl ModuleResolver for ResidentModuleResolver {
    fn resolve(&self, name: &str) -> Option<ModuleHandle> {
        let found = self.resident.find(name);
        if found.is_some() {
            debug!("Resolved {} from resident modules", name);
        }
        found
    }
}
