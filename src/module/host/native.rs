//! Native module host
//!
//! Loads candidate modules from shared libraries via `libloading`. A native
//! candidate module exports a `ModuleExports` value under
//! [`MODULE_EXPORTS_SYMBOL`]. Dependencies may be plain shared libraries
//! without exports.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use libloading::Library;

use crate::config::LoaderConfig;
use crate::module::exports::{ModuleExports, ModuleExportsFn, MODULE_EXPORTS_SYMBOL};
use crate::module::handle::{ModuleHandle, ModuleOrigin, ResidentModules};
use crate::module::host::{link, ModuleHost};
use crate::module::resolution::ResolutionRegistry;
use crate::module::traits::HostError;

/// Host backed by the platform dynamic linker
#[derive(Debug, Default)]
pub struct NativeHost {
    /// Directories searched for identifier lookups before the linker's own
    /// search path
    search_dirs: Vec<PathBuf>,
    resolution: ResolutionRegistry,
    resident: ResidentModules,
}

impl NativeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search_dirs<I, P>(dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        Self {
            search_dirs: dirs.into_iter().map(|d| d.as_ref().to_path_buf()).collect(),
            ..Self::default()
        }
    }

    pub fn from_config(config: &LoaderConfig) -> Self {
        Self::with_search_dirs(&config.search_dirs)
    }

    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    /// Locations tried for `name`, in order
    ///
    /// Existing files in the search directories come first; the bare
    /// platform file name last, which leaves the search to the dynamic
    /// linker.
    pub fn library_candidates(&self, name: &str) -> Vec<PathBuf> {
        let file_name = libloading::library_filename(name);
        let mut candidates: Vec<PathBuf> = self
            .search_dirs
            .iter()
            .map(|dir| dir.join(&file_name))
            .filter(|path| path.is_file())
            .collect();
        candidates.push(PathBuf::from(file_name));
        candidates
    }
}

impl ModuleHost for NativeHost {
    fn load_by_identifier(&self, identifier: &str) -> Result<ModuleHandle, HostError> {
        let mut last_error = None;
        for candidate in self.library_candidates(identifier) {
            debug!("Trying {:?} for identifier {}", candidate, identifier);
            match open_raw(&candidate) {
                Ok((library, exports)) => {
                    info!("Opened module {} for identifier {}", exports.name(), identifier);
                    return link(
                        self,
                        ModuleOrigin::Identifier(identifier.to_string()),
                        exports,
                        Some(library),
                    );
                }
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error.unwrap_or_else(|| HostError::NotFound(identifier.to_string())))
    }

    fn load_from_path(&self, path: &Path) -> Result<ModuleHandle, HostError> {
        if !path.exists() {
            return Err(HostError::NotFound(path.display().to_string()));
        }
        let (library, exports) = open_raw(path)?;
        info!("Opened module {} from {:?}", exports.name(), path);
        link(
            self,
            ModuleOrigin::Path(path.to_path_buf()),
            exports,
            Some(library),
        )
    }

    fn locate(&self, name: &str) -> Option<ModuleHandle> {
        if let Some(module) = self.resident.find(name) {
            return Some(module);
        }
        self.library_candidates(name)
            .into_iter()
            .find_map(|candidate| open_dependency(&candidate, name).ok())
    }

    fn resolution(&self) -> &ResolutionRegistry {
        &self.resolution
    }

    fn resident(&self) -> &ResidentModules {
        &self.resident
    }
}

/// Open a library that a module depends on
///
/// Plain shared libraries without exports are accepted and named `name`.
pub fn open_dependency(path: &Path, name: &str) -> Result<ModuleHandle, HostError> {
    let library = load_library(path)?;
    let exports = read_exports(&library, path).unwrap_or_else(|_| ModuleExports::new(name));
    Ok(ModuleHandle::build(
        ModuleOrigin::Path(path.to_path_buf()),
        exports,
        Vec::new(),
        Some(library),
    ))
}

fn load_library(path: &Path) -> Result<Library, HostError> {
    // SAFETY: opening a library runs its initialisers. Candidate modules and
    // their dependencies are trusted code selected by the caller.
    let library = unsafe { Library::new(path) }?;
    Ok(library)
}

fn open_raw(path: &Path) -> Result<(Library, ModuleExports), HostError> {
    let library = load_library(path)?;
    let exports = read_exports(&library, path)?;
    Ok((library, exports))
}

fn read_exports(library: &Library, path: &Path) -> Result<ModuleExports, HostError> {
    // SAFETY: the symbol is generated by `export_module!`, whose signature
    // matches `ModuleExportsFn` when built against this crate.
    let exports_fn = unsafe { library.get::<ModuleExportsFn>(MODULE_EXPORTS_SYMBOL.as_bytes()) }
        .map_err(|_| HostError::MissingExports {
            path: path.to_path_buf(),
            symbol: MODULE_EXPORTS_SYMBOL.to_string(),
        })?;
    Ok(exports_fn())
}
