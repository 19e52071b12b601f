/// Directive catalog: which keys each playbook entity accepts.
///
/// The built-in table is embedded from `data/directives.toml`.  A
/// replacement table in the same format can be named in the configuration.
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Deserialize;

use super::CatalogError;
use crate::types::{Directive, EntityKind};

const BUILTIN: &str = include_str!("../../data/directives.toml");

#[derive(Debug, Deserialize)]
struct DirectiveTable {
    #[serde(default)]
    group: Vec<DirectiveGroup>,
}

#[derive(Debug, Deserialize)]
struct DirectiveGroup {
    kinds: Vec<EntityKind>,
    names: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DirectiveCatalog {
    directives: BTreeMap<String, Directive>,
}

impl DirectiveCatalog {
    /// The table shipped with the server.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_toml(BUILTIN, Path::new("<builtin>"))
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text, path)
    }

    /// Parse a table; `origin` is only used in error messages.
    pub fn from_toml(text: &str, origin: &Path) -> Result<Self, CatalogError> {
        let table: DirectiveTable =
            toml::from_str(text).map_err(|source| CatalogError::Directives {
                path: origin.to_path_buf(),
                source,
            })?;

        let mut kinds_by_name: BTreeMap<String, BTreeSet<EntityKind>> = BTreeMap::new();
        for group in table.group {
            for name in group.names {
                kinds_by_name
                    .entry(name)
                    .or_default()
                    .extend(group.kinds.iter().copied());
            }
        }

        Ok(Self::from_entries(kinds_by_name))
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (String, BTreeSet<EntityKind>)>) -> Self {
        let directives = entries
            .into_iter()
            .map(|(name, kinds)| (name.clone(), Directive { name, kinds }))
            .collect();
        Self { directives }
    }

    pub fn get(&self, name: &str) -> Option<&Directive> {
        self.directives.get(name)
    }

    /// Whether `kind` accepts the key `name`.  Unknown names are accepted by
    /// nobody.
    pub fn accepts(&self, kind: EntityKind, name: &str) -> bool {
        self.get(name).is_some_and(|d| d.kinds.contains(&kind))
    }

    /// Directives accepted by `kind`, in name order.
    pub fn for_kind(&self, kind: EntityKind) -> impl Iterator<Item = &Directive> {
        self.directives
            .values()
            .filter(move |d| d.kinds.contains(&kind))
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_parses() {
        let catalog = DirectiveCatalog::builtin().unwrap();
        assert!(catalog.accepts(EntityKind::Play, "hosts"));
        assert!(!catalog.accepts(EntityKind::Task, "hosts"));
        assert!(catalog.accepts(EntityKind::Block, "rescue"));
        assert!(catalog.accepts(EntityKind::Task, "local_action"));
        for kind in EntityKind::ALL {
            assert!(catalog.accepts(kind, "name"), "{kind} should accept name");
        }
        assert!(!catalog.accepts(EntityKind::Play, "when"));
    }

    #[test]
    fn groups_merge_kinds() {
        let text = r#"
            [[group]]
            kinds = ["play"]
            names = ["x"]

            [[group]]
            kinds = ["task"]
            names = ["x", "y"]
        "#;
        let catalog = DirectiveCatalog::from_toml(text, Path::new("test.toml")).unwrap();
        let x = catalog.get("x").unwrap();
        assert_eq!(
            x.kinds,
            BTreeSet::from([EntityKind::Play, EntityKind::Task])
        );
        assert_eq!(catalog.for_kind(EntityKind::Task).count(), 2);
        assert_eq!(catalog.for_kind(EntityKind::Role).count(), 0);
    }

    #[test]
    fn unknown_kind_is_an_error() {
        let text = "[[group]]\nkinds = [\"playbook\"]\nnames = [\"x\"]\n";
        let err = DirectiveCatalog::from_toml(text, Path::new("bad.toml")).unwrap_err();
        assert!(err.to_string().contains("bad.toml"), "got: {err}");
    }
}
