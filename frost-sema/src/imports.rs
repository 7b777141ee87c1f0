// Import path resolution and the per-unit module cache. The driver
// resolves `package::a::b` to a file, mints stable module UUIDs, and
// tracks in-progress compilations so cycles surface as diagnostics
// instead of recursion.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::frontend::Frontend;
use frost_ir::ModuleId;

/// Fixed extension of frost source files.
pub const SOURCE_EXTENSION: &str = "fr";

/// Package name that resolves against the built-in runtime root.
pub const STD_PACKAGE: &str = "std";
/// Package name that resolves against the current package path.
pub const CURRENT_PACKAGE: &str = "$";

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("module '{0}' not found")]
    NotFound(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportState {
    /// The module's transformation has started but not finished; seeing
    /// this during resolution means an import cycle.
    InProgress,
    Done(ModuleId),
}

#[derive(Debug)]
pub struct ImportDriver {
    std_root: PathBuf,
    deps_root: PathBuf,
    /// Innermost entry is the package path relative imports resolve from
    package_path_stack: Vec<PathBuf>,
    states: HashMap<PathBuf, ImportState>,
}

impl ImportDriver {
    pub fn new(std_root: PathBuf, package_root: PathBuf, deps_root: PathBuf) -> Self {
        Self {
            std_root,
            deps_root,
            package_path_stack: vec![package_root],
            states: HashMap::new(),
        }
    }

    pub fn current_package_path(&self) -> &Path {
        self.package_path_stack
            .last()
            .map(PathBuf::as_path)
            .unwrap_or_else(|| Path::new("."))
    }

    pub fn push_package_path(&mut self, path: PathBuf) {
        self.package_path_stack.push(path);
    }

    pub fn pop_package_path(&mut self) {
        if self.package_path_stack.len() > 1 {
            self.package_path_stack.pop();
        }
    }

    /// Resolve `package` + path components to a module file. Roots, in
    /// order: `std` -> runtime root, `$` -> current package path,
    /// anything else -> the external packages directory. A `..` segment
    /// ascends one package level.
    pub fn resolve(
        &self,
        package: &str,
        path: &[String],
        frontend: &dyn Frontend,
    ) -> Result<PathBuf, ResolveError> {
        let mut resolved = match package {
            STD_PACKAGE => self.std_root.clone(),
            CURRENT_PACKAGE => self.current_package_path().to_path_buf(),
            external => self.deps_root.join(external),
        };

        for segment in path {
            if segment == ".." {
                resolved.pop();
            } else {
                resolved.push(segment);
            }
        }

        let file = resolved.with_extension(SOURCE_EXTENSION);
        if frontend.exists(&file) {
            return Ok(file);
        }
        let dir_module = resolved.join(format!("mod.{}", SOURCE_EXTENSION));
        if frontend.exists(&dir_module) {
            return Ok(dir_module);
        }

        Err(ResolveError::NotFound(format!(
            "{}::{}",
            package,
            path.join("::")
        )))
    }

    /// Stable module UUID derived from the resolved path.
    pub fn module_uuid(&self, path: &Path) -> String {
        let mut hasher = Sha256::new();
        hasher.update(path.to_string_lossy().as_bytes());
        let digest = hasher.finalize();
        let hex: String = digest.iter().take(6).map(|b| format!("{:02x}", b)).collect();
        format!("pkg${}", hex)
    }

    /// Name the imported module binds to: the last path component unless
    /// overridden by the user.
    pub fn export_name(path: &[String], user_override: Option<&str>) -> String {
        if let Some(name) = user_override {
            return name.to_string();
        }
        path.iter()
            .rev()
            .find(|s| *s != "..")
            .cloned()
            .unwrap_or_default()
    }

    pub fn state(&self, path: &Path) -> Option<ImportState> {
        self.states.get(path).copied()
    }

    pub fn mark_in_progress(&mut self, path: &Path) {
        self.states.insert(path.to_path_buf(), ImportState::InProgress);
    }

    pub fn finish(&mut self, path: &Path, module: ModuleId) {
        self.states
            .insert(path.to_path_buf(), ImportState::Done(module));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::MapFrontend;

    fn driver() -> ImportDriver {
        ImportDriver::new(
            PathBuf::from("/frost/std"),
            PathBuf::from("/work/project"),
            PathBuf::from("/work/.frost/deps"),
        )
    }

    #[test]
    fn test_resolution_roots() {
        let mut frontend = MapFrontend::new();
        frontend.insert("/frost/std/io.fr", Vec::new());
        frontend.insert("/work/project/util.fr", Vec::new());
        frontend.insert("/work/.frost/deps/json/mod.fr", Vec::new());

        let d = driver();
        assert_eq!(
            d.resolve("std", &["io".to_string()], &frontend).unwrap(),
            PathBuf::from("/frost/std/io.fr")
        );
        assert_eq!(
            d.resolve("$", &["util".to_string()], &frontend).unwrap(),
            PathBuf::from("/work/project/util.fr")
        );
        assert_eq!(
            d.resolve("json", &[], &frontend).unwrap(),
            PathBuf::from("/work/.frost/deps/json/mod.fr")
        );
    }

    #[test]
    fn test_dotdot_ascends_one_package_level() {
        let mut frontend = MapFrontend::new();
        frontend.insert("/work/shared.fr", Vec::new());
        let d = driver();
        let path = vec!["..".to_string(), "shared".to_string()];
        assert_eq!(
            d.resolve("$", &path, &frontend).unwrap(),
            PathBuf::from("/work/shared.fr")
        );
    }

    #[test]
    fn test_module_uuid_is_stable() {
        let d = driver();
        let p = Path::new("/work/project/util.fr");
        assert_eq!(d.module_uuid(p), d.module_uuid(p));
        assert_ne!(d.module_uuid(p), d.module_uuid(Path::new("/other.fr")));
    }

    #[test]
    fn test_export_name() {
        let path = vec!["net".to_string(), "http".to_string()];
        assert_eq!(ImportDriver::export_name(&path, None), "http");
        assert_eq!(ImportDriver::export_name(&path, Some("web")), "web");
    }

    #[test]
    fn test_missing_module_is_an_error() {
        let frontend = MapFrontend::new();
        let d = driver();
        assert!(d.resolve("std", &["nope".to_string()], &frontend).is_err());
    }
}
