/// External catalogs consulted by completion.
///
/// - [`directives`]: keys accepted by plays, roles, blocks and tasks
/// - [`modules`]: operations found on the module search paths
/// - [`parameters`]: argument names of a module
///
/// All three are built once by [`Catalogs::initialize`] before any request
/// is served and are read-only afterwards.
pub mod directives;
pub mod modules;
pub mod parameters;

use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

pub use directives::DirectiveCatalog;
pub use modules::ModuleCatalog;
pub use parameters::{
    DocumentationParameters, ParameterCatalog, ParameterNames, ParameterSources, StaticParameters,
};

use crate::config::Config;
use crate::parser::SyntaxError;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid directive table {path}: {source}")]
    Directives {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid module documentation in {path}:\n{source}")]
    Documentation {
        path: PathBuf,
        #[source]
        source: SyntaxError,
    },
}

pub struct Catalogs {
    pub directives: DirectiveCatalog,
    pub modules: ModuleCatalog,
    pub parameters: Box<dyn ParameterCatalog>,
}

impl Catalogs {
    pub fn new(
        directives: DirectiveCatalog,
        modules: ModuleCatalog,
        parameters: impl ParameterCatalog + 'static,
    ) -> Self {
        Self {
            directives,
            modules,
            parameters: Box::new(parameters),
        }
    }

    /// Build every catalog from the configuration.
    ///
    /// Parameters come from the configured static table first and from the
    /// module's own documentation otherwise.
    pub fn initialize(config: &Config) -> Result<Self, CatalogError> {
        let directives = match &config.directives_file {
            Some(path) => DirectiveCatalog::load(path)?,
            None => DirectiveCatalog::builtin()?,
        };

        let search_paths = config.module_search_paths();
        let modules = ModuleCatalog::scan(&search_paths);

        let parameters = ParameterSources::new()
            .with(StaticParameters::new(config.parameters.clone()))
            .with(DocumentationParameters::new());

        info!(
            directives = directives.len(),
            modules = modules.len(),
            search_paths = search_paths.len(),
            "Catalogs initialized"
        );
        Ok(Self::new(directives, modules, parameters))
    }
}

impl std::fmt::Debug for Catalogs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalogs")
            .field("directives", &self.directives.len())
            .field("modules", &self.modules.len())
            .finish_non_exhaustive()
    }
}
