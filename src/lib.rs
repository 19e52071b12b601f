//! Context-aware completion for automation playbooks.
//!
//! The crate answers one question: given the text of a playbook and a
//! cursor position, what is the author about to type, and which catalog
//! entries should be offered?
//!
//! - [`parser`] loads the text into a value tree plus the trail of values
//!   under the cursor, repairing half-typed input along the way
//! - [`completion`] classifies the cursor position and collects candidates
//! - [`catalog`] holds the directive, module and parameter catalogs
//! - [`server`] exposes all of it as a language server
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tower_lsp::Client;

pub mod catalog;
pub mod completion;
pub mod config;
pub mod logging;
pub mod parser;
mod server;
pub mod types;
pub mod util;

pub use catalog::Catalogs;
pub use completion::CompletionRequest;
pub use config::Config;
pub use parser::{Document, LoadError, SyntaxError};
pub use types::{Candidate, CompletionContext, Cursor};

pub struct Backend {
    name: String,
    version: String,
    open_files: Arc<Mutex<HashMap<String, String>>>,
    catalogs: Arc<Catalogs>,
    max_heal_attempts: usize,
    completion_timeout: Duration,
    client: Option<Client>,
}

impl Backend {
    pub fn new(client: Client, catalogs: Arc<Catalogs>, config: &Config) -> Self {
        Self {
            client: Some(client),
            ..Self::detached(catalogs, config)
        }
    }

    /// A backend without a client, for the CLI and for tests.
    pub fn detached(catalogs: Arc<Catalogs>, config: &Config) -> Self {
        Self {
            name: "playbook-lsp".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            open_files: Arc::new(Mutex::new(HashMap::new())),
            catalogs,
            max_heal_attempts: config.max_heal_attempts,
            completion_timeout: config.completion_timeout(),
            client: None,
        }
    }

    pub fn new_test() -> Self {
        let directives = catalog::DirectiveCatalog::builtin().unwrap_or_default();
        let catalogs = Catalogs::new(
            directives,
            catalog::ModuleCatalog::default(),
            catalog::StaticParameters::default(),
        );
        Self::new_test_with_catalogs(catalogs)
    }

    pub fn new_test_with_catalogs(catalogs: Catalogs) -> Self {
        Self::detached(Arc::new(catalogs), &Config::default())
    }

    pub fn catalogs(&self) -> &Catalogs {
        &self.catalogs
    }

    /// Text of an open document, if the server has it.
    pub fn open_file(&self, uri: &str) -> Option<String> {
        self.open_files.lock().get(uri).cloned()
    }
}
