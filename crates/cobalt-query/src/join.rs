use serde::{Deserialize, Serialize};

use crate::filter::WhereNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinKind {
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
    Cross,
}

impl JoinKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER",
            JoinKind::LeftOuter => "LEFT OUTER",
            JoinKind::RightOuter => "RIGHT OUTER",
            JoinKind::FullOuter => "FULL OUTER",
            JoinKind::Cross => "CROSS",
        }
    }
}

/// Joins `table` onto the already-present `parent` table.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub table: String,
    pub parent: String,
    pub alias: Option<String>,
    pub kind: JoinKind,
    /// `(parent column, joined column)` pairs.
    pub columns: Vec<(String, String)>,
    /// Extra condition attached to the join itself.
    pub restriction: Option<WhereNode>,
}

impl Join {
    pub fn inner(table: impl Into<String>, parent: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            parent: parent.into(),
            alias: None,
            kind: JoinKind::Inner,
            columns: Vec::new(),
            restriction: None,
        }
    }

    pub fn on(mut self, parent_column: impl Into<String>, column: impl Into<String>) -> Self {
        self.columns.push((parent_column.into(), column.into()));
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Name the joined table is addressed by in the rest of the query.
    pub fn binding(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.table)
    }
}
