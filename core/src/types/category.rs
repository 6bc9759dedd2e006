use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::AuditError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash, Ord, PartialOrd)]
#[serde(rename_all = "lowercase")]
pub enum ModuleCategory {
    Exploit,
    Payload,
    Post,
    Nop,
    Encoder,
    Auxiliary,
}

impl ModuleCategory {
    pub const ALL: [ModuleCategory; 6] = [
        ModuleCategory::Exploit,
        ModuleCategory::Payload,
        ModuleCategory::Post,
        ModuleCategory::Nop,
        ModuleCategory::Encoder,
        ModuleCategory::Auxiliary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleCategory::Exploit => "exploit",
            ModuleCategory::Payload => "payload",
            ModuleCategory::Post => "post",
            ModuleCategory::Nop => "nop",
            ModuleCategory::Encoder => "encoder",
            ModuleCategory::Auxiliary => "auxiliary",
        }
    }

    fn supported() -> String {
        let mut names = vec!["all"];
        names.extend(Self::ALL.iter().map(|c| c.as_str()));
        names.join(", ")
    }
}

impl std::fmt::Display for ModuleCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ModuleCategory {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == lowered)
            .ok_or_else(|| AuditError::UnknownCategory {
                category: s.to_string(),
                supported: Self::supported(),
            })
    }
}

/// Coarse pre-filter handed to the module registry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Vec<ModuleCategory>),
}

impl CategoryFilter {
    /// Parses user supplied filters. `all` anywhere in the list wins.
    pub fn parse<S: AsRef<str>>(values: &[S]) -> crate::Result<Self> {
        let mut selected = Vec::new();
        for value in values {
            if value.as_ref().trim().eq_ignore_ascii_case("all") {
                return Ok(CategoryFilter::All);
            }
            let category: ModuleCategory = value.as_ref().parse()?;
            if !selected.contains(&category) {
                selected.push(category);
            }
        }

        if selected.is_empty() {
            Ok(CategoryFilter::All)
        } else {
            Ok(CategoryFilter::Only(selected))
        }
    }

    pub fn categories(&self) -> Vec<ModuleCategory> {
        match self {
            CategoryFilter::All => ModuleCategory::ALL.to_vec(),
            CategoryFilter::Only(categories) => categories.clone(),
        }
    }

    pub fn allows(&self, category: ModuleCategory) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(categories) => categories.contains(&category),
        }
    }
}

impl std::fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CategoryFilter::All => write!(f, "ALL"),
            CategoryFilter::Only(categories) => {
                let names: Vec<String> = categories
                    .iter()
                    .map(|c| c.as_str().to_uppercase())
                    .collect();
                write!(f, "{}", names.join(","))
            }
        }
    }
}
