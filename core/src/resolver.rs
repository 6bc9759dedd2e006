use crate::reference_types::{ReferenceTypeRegistry, PLACEHOLDER};

/// Where a reference points to, or the fact that we can't tell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Url(String),
    Unsupported,
}

/// Expands `(kind, value)` pairs into URLs.
///
/// Substitution is purely textual: the value is inserted verbatim, without
/// escaping. A value that produces an unparsable URL is caught by the prober.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    types: &'a ReferenceTypeRegistry,
}

impl<'a> Resolver<'a> {
    pub fn new(types: &'a ReferenceTypeRegistry) -> Self {
        Self { types }
    }

    pub fn resolve(&self, kind: &str, value: &str) -> Locator {
        let kind = kind.to_uppercase();

        match self.types.lookup(&kind) {
            Some(template) => Locator::Url(template.replacen(PLACEHOLDER, value, 1)),
            None => Locator::Unsupported,
        }
    }
}
