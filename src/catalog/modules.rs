/// Module catalog: the operations a task can invoke.
///
/// Modules are discovered by walking the module search paths.  The module
/// name is the file stem, and the first file found for a name wins, so
/// earlier search paths shadow later ones.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use tracing::{debug, warn};

use crate::types::ModuleDescriptor;

/// Extensions of files that are never modules.
const BLACKLIST_EXTS: &[&str] = &[".pyc", ".pyo", ".swp", ".bak", "~", ".rpm", ".md", ".txt", ".rst"];

/// Files that are never modules.
const IGNORE_FILES: &[&str] = &[
    "COPYING",
    "CONTRIBUTING",
    "LICENSE",
    "README",
    "VERSION",
    "GUIDELINES",
];

#[derive(Debug, Clone, Default)]
pub struct ModuleCatalog {
    modules: BTreeMap<String, ModuleDescriptor>,
}

impl ModuleCatalog {
    /// Scan `paths` in order.  Paths that do not exist are skipped.
    pub fn scan(paths: &[PathBuf]) -> Self {
        let mut catalog = Self::default();
        for path in paths {
            if !path.is_dir() {
                warn!(path = %path.display(), "Module path is not a directory, skipping");
                continue;
            }
            let before = catalog.len();
            catalog.scan_dir(path);
            debug!(
                path = %path.display(),
                found = catalog.len() - before,
                "Scanned module path"
            );
        }
        catalog
    }

    fn scan_dir(&mut self, root: &Path) {
        // Plain filesystem walk: no gitignore rules, but hidden entries are
        // skipped (including whole hidden directories).
        let walker = WalkBuilder::new(root)
            .standard_filters(false)
            .hidden(true)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, "Error while walking module path");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let Some(file_name) = entry.file_name().to_str() else {
                continue;
            };
            let Some(name) = module_name(file_name) else {
                continue;
            };
            self.modules
                .entry(name.to_string())
                .or_insert_with(|| ModuleDescriptor {
                    name: name.to_string(),
                    path: Some(entry.path().to_path_buf()),
                });
        }
    }

    /// Build a catalog from bare names, without source files.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let modules = names
            .into_iter()
            .map(|name| {
                let module = ModuleDescriptor::named(name);
                (module.name.clone(), module)
            })
            .collect();
        Self { modules }
    }

    pub fn insert(&mut self, module: ModuleDescriptor) {
        self.modules.entry(module.name.clone()).or_insert(module);
    }

    pub fn get(&self, name: &str) -> Option<&ModuleDescriptor> {
        self.modules.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        self.modules.values()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// The module a file provides, or `None` if the file is not a module.
fn module_name(file_name: &str) -> Option<&str> {
    if file_name.starts_with('_') {
        // `__init__.py` and friends are private, `_name.py` is deprecated.
        return None;
    }
    if BLACKLIST_EXTS.iter().any(|ext| file_name.ends_with(ext)) {
        return None;
    }
    if IGNORE_FILES.contains(&file_name) {
        return None;
    }
    let stem = Path::new(file_name).file_stem()?.to_str()?;
    (!stem.is_empty()).then_some(stem)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_names_follow_file_stems() {
        assert_eq!(module_name("yum.py"), Some("yum"));
        assert_eq!(module_name("win_shell.ps1"), Some("win_shell"));
        assert_eq!(module_name("setup"), Some("setup"));
    }

    #[test]
    fn non_module_files_are_rejected() {
        for file in [
            "__init__.py",
            "_deprecated.py",
            "yum.pyc",
            "notes.md",
            "yum.py~",
            "README",
            "LICENSE",
        ] {
            assert_eq!(module_name(file), None, "{file} should not be a module");
        }
    }

    #[test]
    fn first_occurrence_wins() {
        let mut catalog = ModuleCatalog::from_names(["copy"]);
        catalog.insert(ModuleDescriptor {
            name: "copy".to_string(),
            path: Some(PathBuf::from("/elsewhere/copy.py")),
        });
        assert_eq!(catalog.get("copy").and_then(|m| m.path.as_ref()), None);
        assert_eq!(catalog.len(), 1);
    }
}
