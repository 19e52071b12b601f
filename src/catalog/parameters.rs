/// Parameter catalogs: the argument names a module accepts.
///
/// Two sources exist.  [`StaticParameters`] serves a table given in the
/// configuration, and [`DocumentationParameters`] reads the `DOCUMENTATION`
/// block embedded in a module's source file and lists its `options`.
/// [`ParameterSources`] asks each source in turn.
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use memchr::memmem;
use parking_lot::Mutex;

use super::CatalogError;
use crate::parser;
use crate::types::{Cursor, Key, ModuleDescriptor, Value};

pub type ParameterNames = Arc<BTreeSet<String>>;

pub trait ParameterCatalog: Send + Sync {
    /// Parameter names of `module`, or `None` if this source knows nothing
    /// about it.
    fn parameters(&self, module: &ModuleDescriptor) -> Result<Option<ParameterNames>, CatalogError>;
}

// ─── Static table ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct StaticParameters {
    by_module: HashMap<String, ParameterNames>,
}

impl StaticParameters {
    pub fn new<I, N, P>(entries: I) -> Self
    where
        I: IntoIterator<Item = (N, P)>,
        N: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        let by_module = entries
            .into_iter()
            .map(|(module, names)| {
                let names: BTreeSet<String> = names.into_iter().map(Into::into).collect();
                (module.into(), Arc::new(names))
            })
            .collect();
        Self { by_module }
    }

    pub fn is_empty(&self) -> bool {
        self.by_module.is_empty()
    }
}

impl ParameterCatalog for StaticParameters {
    fn parameters(&self, module: &ModuleDescriptor) -> Result<Option<ParameterNames>, CatalogError> {
        Ok(self.by_module.get(&module.name).cloned())
    }
}

// ─── Module documentation ───────────────────────────────────────────────────

/// Reads parameter names out of module source files on first use and keeps
/// them for later requests.
#[derive(Default)]
pub struct DocumentationParameters {
    cache: Mutex<HashMap<PathBuf, Option<ParameterNames>>>,
}

impl DocumentationParameters {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(path: &Path) -> Result<Option<ParameterNames>, CatalogError> {
        let source = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let Some(documentation) = documentation_block(&source) else {
            return Ok(None);
        };

        let far_away = Cursor::new(usize::MAX, usize::MAX);
        let document = parser::parse_document(documentation, far_away).map_err(|source| {
            CatalogError::Documentation {
                path: path.to_path_buf(),
                source,
            }
        })?;

        let names = document
            .root
            .as_map()
            .and_then(|doc| doc.get(&Key::from("options")))
            .and_then(Value::as_map)
            .map(|options| {
                options
                    .keys()
                    .filter_map(|key| key.as_str().map(str::to_string))
                    .collect::<BTreeSet<_>>()
            })
            .unwrap_or_default();
        Ok(Some(Arc::new(names)))
    }
}

impl ParameterCatalog for DocumentationParameters {
    fn parameters(&self, module: &ModuleDescriptor) -> Result<Option<ParameterNames>, CatalogError> {
        let Some(path) = &module.path else {
            return Ok(None);
        };
        if let Some(cached) = self.cache.lock().get(path) {
            return Ok(cached.clone());
        }
        // Read outside the lock; a racing reader just does the same work.
        let names = Self::read(path)?;
        self.cache.lock().insert(path.clone(), names.clone());
        Ok(names)
    }
}

/// The contents of the string literal assigned to `DOCUMENTATION`.
///
/// Handles single, double and triple quotes with an optional `r` prefix.
/// Escapes are left as written.
fn documentation_block(source: &str) -> Option<&str> {
    // Earlier mentions (comments, imports) are not followed by `=`.
    let rest = memmem::find_iter(source.as_bytes(), b"DOCUMENTATION").find_map(|start| {
        let rest = source[start + "DOCUMENTATION".len()..].trim_start();
        rest.strip_prefix('=')
            .filter(|value| !value.starts_with('='))
            .map(str::trim_start)
    })?;
    let rest = rest
        .strip_prefix('r')
        .or_else(|| rest.strip_prefix('R'))
        .unwrap_or(rest);

    for quote in ["'''", "\"\"\"", "'", "\""] {
        if let Some(body) = rest.strip_prefix(quote) {
            let end = memmem::find(body.as_bytes(), quote.as_bytes())?;
            return Some(&body[..end]);
        }
    }
    None
}

// ─── Chained sources ────────────────────────────────────────────────────────

/// Several sources asked in order; the first one that knows the module
/// answers.
#[derive(Default)]
pub struct ParameterSources {
    sources: Vec<Box<dyn ParameterCatalog>>,
}

impl ParameterSources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: impl ParameterCatalog + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }
}

impl ParameterCatalog for ParameterSources {
    fn parameters(&self, module: &ModuleDescriptor) -> Result<Option<ParameterNames>, CatalogError> {
        for source in &self.sources {
            if let Some(names) = source.parameters(module)? {
                return Ok(Some(names));
            }
        }
        Ok(None)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const YUM: &str = r#"#!/usr/bin/python
# -*- coding: utf-8 -*-

DOCUMENTATION = '''
---
module: yum
short_description: Manages packages with the I(yum) package manager
options:
  name:
    description:
      - "Package name"
    required: true
  state:
    choices: [ "present", "absent", "latest" ]
  enablerepo:
    default: null
'''

EXAMPLES = '''
- yum: name=httpd state=latest
'''
"#;

    #[test]
    fn finds_triple_quoted_documentation() {
        let block = documentation_block(YUM).unwrap();
        assert!(block.starts_with("\n---\nmodule: yum"));
        assert!(!block.contains("EXAMPLES"));
    }

    #[test]
    fn handles_raw_double_quoted_documentation() {
        let source = "DOCUMENTATION = r\"\"\"\noptions:\n  src: {}\n\"\"\"\n";
        assert_eq!(documentation_block(source), Some("\noptions:\n  src: {}\n"));
    }

    #[test]
    fn skips_mentions_before_the_assignment() {
        let source = "# DOCUMENTATION lives below\nfrom x import DOCUMENTATION_FRAGMENT\nif DOCUMENTATION == 1: pass\nDOCUMENTATION = '''\noptions:\n  dest: {}\n'''\n";
        assert_eq!(documentation_block(source), Some("\noptions:\n  dest: {}\n"));
    }

    #[test]
    fn missing_documentation_is_none() {
        assert_eq!(documentation_block("print('hello')\n"), None);
        assert_eq!(documentation_block("DOCUMENTATION\n"), None);
    }

    #[test]
    fn reads_options_from_module_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("yum.py");
        std::fs::write(&path, YUM).unwrap();

        let catalog = DocumentationParameters::new();
        let module = ModuleDescriptor {
            name: "yum".to_string(),
            path: Some(path),
        };
        let names = catalog.parameters(&module).unwrap().unwrap();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        assert_eq!(names, vec!["enablerepo", "name", "state"]);

        // Second lookup is served from the cache.
        assert!(catalog.parameters(&module).unwrap().is_some());
    }

    #[test]
    fn static_table_then_documentation() {
        let sources = ParameterSources::new()
            .with(StaticParameters::new([("debug", ["msg", "var"])]))
            .with(DocumentationParameters::new());

        let debug = sources
            .parameters(&ModuleDescriptor::named("debug"))
            .unwrap()
            .unwrap();
        assert!(debug.contains("msg"));
        assert_eq!(
            sources.parameters(&ModuleDescriptor::named("ping")).unwrap(),
            None
        );
    }
}
