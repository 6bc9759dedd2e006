use crate::collector::{AuditOptions, AuditRequest, DEFAULT_CONCURRENCY};
use crate::error::{AuditError, Result};
use crate::http::DEFAULT_TIMEOUT;
use crate::reference_types::{KindFilter, ReferenceTypeRegistry};
use crate::report::SortMode;
use crate::types::CategoryFilter;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "refwatch.yml";
pub const DEFAULT_CATALOG_DIR: &str = "modules";

/// Settings file, every field optional. Command line flags are applied on top.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub catalog: PathBuf,
    pub categories: Vec<String>,
    pub kind: Option<String>,
    #[serde(rename = "match")]
    pub name_match: Option<String>,
    pub sort: SortMode,
    pub check: bool,
    pub timeout_secs: u64,
    pub concurrency: usize,
    pub output: Option<PathBuf>,
    /// Extra or overriding kinds, `KIND: "https://host/path/#VAL#"`.
    pub reference_types: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog: PathBuf::from(DEFAULT_CATALOG_DIR),
            categories: Vec::new(),
            kind: None,
            name_match: None,
            sort: SortMode::None,
            check: false,
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            concurrency: DEFAULT_CONCURRENCY,
            output: None,
            reference_types: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AuditError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config = Self::from_yaml(path, &content)?;
        config.validate(path)?;
        Ok(config)
    }

    /// Loads `explicit` when given, else `refwatch.yml` in `dir` if present, else defaults.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let implicit = dir.join(DEFAULT_CONFIG_FILE);
        if implicit.is_file() {
            Self::load(&implicit)
        } else {
            Ok(Self::default())
        }
    }

    fn from_yaml(path: &Path, content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(content).map_err(|e| {
            let (line, column) = e
                .location()
                .map(|l| (l.line(), l.column()))
                .unwrap_or((0, 0));
            AuditError::YamlSyntaxError {
                file: path.to_path_buf(),
                line,
                column,
                message: e.to_string(),
            }
        })
    }

    /// Reports every problem at once rather than stopping at the first.
    pub fn validate(&self, file: &Path) -> Result<()> {
        let mut errors = Vec::new();

        if self.concurrency == 0 {
            errors.push("concurrency must be at least 1".to_string());
        }
        if self.timeout_secs == 0 {
            errors.push("timeout_secs must be at least 1".to_string());
        }
        if let Err(e) = CategoryFilter::parse(&self.categories) {
            errors.push(e.to_string());
        }
        if let Some(pattern) = &self.name_match {
            if let Err(e) = Regex::new(pattern) {
                errors.push(format!("match: {}", e));
            }
        }

        match self.reference_types() {
            Ok(types) => {
                if let Some(kind) = &self.kind {
                    if let Err(e) = KindFilter::parse(kind, &types) {
                        errors.push(e.to_string());
                    }
                }
            }
            Err(e) => errors.push(e.to_string()),
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AuditError::Validation {
                file: file.to_path_buf(),
                errors,
            })
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Built-in kinds plus the ones declared in the config.
    pub fn reference_types(&self) -> Result<ReferenceTypeRegistry> {
        let mut types = ReferenceTypeRegistry::builtin();
        for (kind, template) in &self.reference_types {
            types = types.with_entry(kind, template)?;
        }
        Ok(types)
    }

    pub fn to_request(&self, types: &ReferenceTypeRegistry) -> Result<AuditRequest> {
        let categories = CategoryFilter::parse(&self.categories)?;

        let kind_filter = match &self.kind {
            Some(kind) => KindFilter::parse(kind, types)?,
            None => KindFilter::All,
        };

        let name_filter = match &self.name_match {
            Some(pattern) => Some(Regex::new(pattern).map_err(|e| AuditError::InvalidPattern {
                pattern: pattern.clone(),
                source: e,
            })?),
            None => None,
        };

        if self.concurrency == 0 {
            return Err(AuditError::Config {
                message: "concurrency must be at least 1".to_string(),
            });
        }

        Ok(AuditRequest {
            categories,
            options: AuditOptions {
                name_filter,
                kind_filter,
                check: self.check,
                concurrency: self.concurrency,
            },
            sort: self.sort,
        })
    }
}
