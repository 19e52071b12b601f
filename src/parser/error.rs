//! Diagnostics raised while loading a playbook.
//!
//! Every stage of the front end reports failures as a [`SyntaxError`] that
//! carries the stage that failed, an optional context (what was being read
//! and where it started) and the problem itself.  The healing loop matches
//! on these fields, so their wording is kept stable.

use std::fmt;

use thiserror::Error;

use crate::types::Mark;

/// The front-end stage a diagnostic came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Scanner,
    Parser,
    Composer,
    Constructor,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Scanner => "scanner",
            Stage::Parser => "parser",
            Stage::Composer => "composer",
            Stage::Constructor => "constructor",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub stage: Stage,
    pub context: Option<String>,
    pub context_mark: Option<Mark>,
    pub problem: String,
    pub problem_mark: Mark,
}

impl SyntaxError {
    pub(crate) fn new(stage: Stage, problem: impl Into<String>, problem_mark: Mark) -> Self {
        Self {
            stage,
            context: None,
            context_mark: None,
            problem: problem.into(),
            problem_mark,
        }
    }

    pub(crate) fn with_context(mut self, context: impl Into<String>, mark: Mark) -> Self {
        self.context = Some(context.into());
        self.context_mark = Some(mark);
        self
    }
}

fn write_mark(f: &mut fmt::Formatter<'_>, mark: Mark) -> fmt::Result {
    write!(f, "  in line {}, column {}", mark.line + 1, mark.column + 1)
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        let mut sep = |f: &mut fmt::Formatter<'_>| -> fmt::Result {
            if !std::mem::replace(&mut first, false) {
                f.write_str("\n")?;
            }
            Ok(())
        };

        if let Some(context) = &self.context {
            sep(f)?;
            f.write_str(context)?;
        }
        // Only repeat the context mark when it points somewhere else.
        if let Some(mark) = self.context_mark
            && (mark.line != self.problem_mark.line || mark.column != self.problem_mark.column)
        {
            sep(f)?;
            write_mark(f, mark)?;
        }
        sep(f)?;
        f.write_str(&self.problem)?;
        sep(f)?;
        write_mark(f, self.problem_mark)
    }
}

impl std::error::Error for SyntaxError {}

/// Failure of a full load, including the healing loop.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("gave up repairing the document after {attempts} attempts\n{last}")]
    HealLimitExceeded { attempts: usize, last: SyntaxError },

    #[error("ran out of time repairing the document after {attempts} attempts\n{last}")]
    DeadlineExceeded { attempts: usize, last: SyntaxError },
}

impl LoadError {
    /// The diagnostic that ended the load.
    pub fn syntax(&self) -> &SyntaxError {
        match self {
            LoadError::Syntax(err) => err,
            LoadError::HealLimitExceeded { last, .. } | LoadError::DeadlineExceeded { last, .. } => {
                last
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mark(index: usize, line: usize, column: usize) -> Mark {
        Mark {
            index,
            line,
            column,
        }
    }

    #[test]
    fn display_lists_context_then_problem() {
        let err = SyntaxError::new(Stage::Scanner, "could not find expected ':'", mark(12, 2, 0))
            .with_context("while scanning a simple key", mark(8, 1, 0));
        assert_eq!(
            err.to_string(),
            "while scanning a simple key\n  in line 2, column 1\ncould not find expected ':'\n  in line 3, column 1"
        );
    }

    #[test]
    fn display_without_context() {
        let err = SyntaxError::new(
            Stage::Scanner,
            "mapping values are not allowed here",
            mark(3, 0, 3),
        );
        assert_eq!(
            err.to_string(),
            "mapping values are not allowed here\n  in line 1, column 4"
        );
    }
}
