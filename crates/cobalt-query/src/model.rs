use serde::{Deserialize, Serialize};

/// The slice of model metadata the schema editor needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMeta {
    pub db_table: String,
    pub pk_column: String,
    #[serde(default)]
    pub many_to_many: Vec<ManyToMany>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManyToMany {
    pub through: ModelMeta,
    /// True when the join model was generated rather than declared by the user.
    pub auto_created: bool,
}

impl ModelMeta {
    pub fn new(db_table: impl Into<String>, pk_column: impl Into<String>) -> Self {
        Self {
            db_table: db_table.into(),
            pk_column: pk_column.into(),
            many_to_many: Vec::new(),
        }
    }
}
