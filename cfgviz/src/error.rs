use std::path::PathBuf;

use thiserror::Error;

use crate::template::error::RuleError;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by the extraction engine. None of them are transient.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("cannot read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("schema has {} invalid template(s)", .0.len())]
    SchemaCompile(Vec<RuleError>),

    #[error("scan budget exceeded: more than {limit} {what}")]
    BudgetExceeded { what: &'static str, limit: usize },
}
