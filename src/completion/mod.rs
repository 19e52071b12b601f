/// Completion-related modules.
///
/// - **context**: classifying the cursor position from the trail
/// - **builder**: querying the catalogs and building LSP `CompletionItem`s
/// - **handler**: running a request end to end
pub mod builder;
pub mod context;
pub mod handler;

pub use builder::{CompletionKind, collect_candidates};
pub use context::classify;
pub use handler::{Completion, CompletionRequest, run_completion};
