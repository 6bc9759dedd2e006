use std::collections::BTreeMap;

use crate::error::{AuditError, Result};

/// Token in a URL template that is replaced with the reference value.
pub const PLACEHOLDER: &str = "#VAL#";

/// Reserved kind meaning "no kind filter". It has no template and is never probed.
pub const WILDCARD_KIND: &str = "ALL";

const BUILTIN_TYPES: &[(&str, &str)] = &[
    ("ALL", ""),
    ("OSVDB", "http://www.osvdb.org/#VAL#"),
    ("CVE", "http://cvedetails.com/cve/#VAL#/"),
    ("CWE", "http://cwe.mitre.org/data/definitions/#VAL#.html"),
    ("BID", "http://www.securityfocus.com/bid/#VAL#"),
    ("MSB", "http://technet.microsoft.com/en-us/security/bulletin/#VAL#"),
    ("EDB", "http://www.exploit-db.com/exploits/#VAL#"),
    ("US-CERT-VU", "http://www.kb.cert.org/vuls/id/#VAL#"),
    ("ZDI", "http://www.zerodayinitiative.com/advisories/ZDI-#VAL#"),
    ("WPVDB", "https://wpvulndb.com/vulnerabilities/#VAL#"),
    ("URL", "#VAL#"),
];

/// Mapping from reference kind to URL template.
///
/// Built once at startup and only read afterwards; the collector and resolver
/// borrow it immutably.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceTypeRegistry {
    entries: BTreeMap<String, String>,
}

impl Default for ReferenceTypeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ReferenceTypeRegistry {
    /// The kinds known to the module framework.
    pub fn builtin() -> Self {
        let entries = BUILTIN_TYPES
            .iter()
            .map(|(kind, template)| (kind.to_string(), template.to_string()))
            .collect();
        Self { entries }
    }

    /// A registry that only knows the wildcard kind.
    pub fn empty() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(WILDCARD_KIND.to_string(), String::new());
        Self { entries }
    }

    /// Adds or replaces a kind. The template must contain exactly one placeholder.
    pub fn with_entry(mut self, kind: &str, template: &str) -> Result<Self> {
        let kind = kind.trim().to_uppercase();

        if kind.is_empty() {
            return Err(AuditError::InvalidTemplate {
                kind,
                reason: "reference kind must not be empty".to_string(),
            });
        }
        if kind == WILDCARD_KIND {
            return Err(AuditError::InvalidTemplate {
                kind,
                reason: format!("'{}' is reserved for the kind filter", WILDCARD_KIND),
            });
        }

        let placeholders = template.matches(PLACEHOLDER).count();
        if placeholders != 1 {
            return Err(AuditError::InvalidTemplate {
                kind,
                reason: format!(
                    "expected exactly one '{}' placeholder, found {}",
                    PLACEHOLDER, placeholders
                ),
            });
        }

        self.entries.insert(kind, template.to_string());
        Ok(self)
    }

    /// Template for a normalized kind. The wildcard never resolves.
    pub fn lookup(&self, kind: &str) -> Option<&str> {
        if kind == WILDCARD_KIND {
            return None;
        }
        self.entries.get(kind).map(String::as_str)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.entries.contains_key(kind)
    }

    /// Every key, wildcard included, in sorted order.
    pub fn kinds(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Which reference kinds end up in the report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum KindFilter {
    #[default]
    All,
    Only(String),
}

impl KindFilter {
    /// Upper-cases `value` and checks it against the registry.
    pub fn parse(value: &str, types: &ReferenceTypeRegistry) -> Result<Self> {
        let kind = value.trim().to_uppercase();

        if kind.is_empty() || kind == WILDCARD_KIND {
            return Ok(KindFilter::All);
        }

        if !types.contains(&kind) {
            return Err(AuditError::UnknownReferenceKind {
                kind: value.to_string(),
                supported: types.kinds().join(", "),
            });
        }

        Ok(KindFilter::Only(kind))
    }

    pub fn matches(&self, normalized_kind: &str) -> bool {
        match self {
            KindFilter::All => true,
            KindFilter::Only(kind) => kind == normalized_kind,
        }
    }
}

impl std::fmt::Display for KindFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KindFilter::All => write!(f, "{}", WILDCARD_KIND),
            KindFilter::Only(kind) => write!(f, "{}", kind),
        }
    }
}
