//! The SQL dialect the memory backend understands: enough of the document
//! store's query language to run everything the compiler emits.

mod ast;
mod eval;
mod lexer;
mod parser;

use bson::Document;

use crate::error::StoreError;
use crate::store::Parameter;

#[derive(Debug, thiserror::Error)]
pub(crate) enum SqlError {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("parameter {0} was not supplied")]
    MissingParam(String),

    #[error("identifier '{0}' could not be resolved")]
    UnknownIdentifier(String),

    #[error("invalid regular expression: {0}")]
    Regex(#[from] regex::Error),
}

impl From<SqlError> for StoreError {
    fn from(e: SqlError) -> Self {
        StoreError::BadRequest(e.to_string())
    }
}

/// Parse and run `query` against a snapshot of a container's items.
pub(crate) fn run(
    query: &str,
    items: &[Document],
    params: &[Parameter],
) -> Result<Vec<Document>, SqlError> {
    let stmt = parser::parse(query)?;
    eval::execute(&stmt, items, params)
}
