use crate::error::Result;
use crate::types::{CategoryFilter, Module, ProbeOutcome};
use async_trait::async_trait;

/// Source of modules and their references.
///
/// Implementations yield modules lazily, in a stable order, restricted to the
/// requested categories. They never need to persist anything.
pub trait ModuleRegistry: Send + Sync {
    fn name(&self) -> &'static str;

    fn modules<'a>(
        &'a self,
        filter: &CategoryFilter,
    ) -> Result<Box<dyn Iterator<Item = Module> + 'a>>;
}

/// Checks whether a URL still serves live content.
///
/// Must be total: every failure maps to [`ProbeOutcome::Down`], never to an
/// error or a panic. Only `Alive` and `Down` are valid results.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, url: &str) -> ProbeOutcome;
}

/// Registry over an in-memory module list, mostly useful for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegistry {
    modules: Vec<Module>,
}

impl InMemoryRegistry {
    pub fn new(modules: Vec<Module>) -> Self {
        Self { modules }
    }
}

impl ModuleRegistry for InMemoryRegistry {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn modules<'a>(
        &'a self,
        filter: &CategoryFilter,
    ) -> Result<Box<dyn Iterator<Item = Module> + 'a>> {
        let filter = filter.clone();
        Ok(Box::new(
            self.modules
                .iter()
                .filter(move |m| filter.allows(m.category))
                .cloned(),
        ))
    }
}
