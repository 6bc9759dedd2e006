use serde::{Deserialize, Serialize};

use super::category::ModuleCategory;

/// A `(kind, value)` pair as declared by a module. The kind keeps the casing
/// the module used; lookups go through [`ModuleReference::normalized_kind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleReference {
    pub kind: String,
    pub value: String,
}

impl ModuleReference {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }

    pub fn normalized_kind(&self) -> String {
        self.kind.to_uppercase()
    }

    /// Display form used in report rows, `{kind}-{value}` with the kind as written.
    pub fn label(&self) -> String {
        format!("{}-{}", self.kind, self.value)
    }
}

/// One module as yielded by a module registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub full_name: String,
    pub category: ModuleCategory,
    pub references: Vec<ModuleReference>,
}

impl Module {
    pub fn new(full_name: impl Into<String>, category: ModuleCategory) -> Self {
        Self {
            full_name: full_name.into(),
            category,
            references: Vec::new(),
        }
    }

    pub fn with_reference(mut self, kind: impl Into<String>, value: impl Into<String>) -> Self {
        self.references.push(ModuleReference::new(kind, value));
        self
    }
}
