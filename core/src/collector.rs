use crate::error::Result;
use crate::plugin::{ModuleRegistry, Prober};
use crate::reference_types::{KindFilter, ReferenceTypeRegistry};
use crate::report::{AuditReport, ReportRow, SortMode};
use crate::resolver::{Locator, Resolver};
use crate::types::{CategoryFilter, Module, ProbeOutcome};
use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use regex::Regex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

pub const DEFAULT_CONCURRENCY: usize = 8;

/// Shared flag that stops new probes from being issued.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct AuditOptions {
    pub name_filter: Option<Regex>,
    pub kind_filter: KindFilter,
    pub check: bool,
    pub concurrency: usize,
}

impl Default for AuditOptions {
    fn default() -> Self {
        Self {
            name_filter: None,
            kind_filter: KindFilter::All,
            check: false,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Everything needed to run one audit.
#[derive(Debug, Clone, Default)]
pub struct AuditRequest {
    pub categories: CategoryFilter,
    pub options: AuditOptions,
    pub sort: SortMode,
}

/// Rows in discovery order plus the running bad reference count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collection {
    pub rows: Vec<ReportRow>,
    pub bad_reference_count: usize,
    /// Rows dropped because their probe was never issued.
    pub skipped: usize,
}

/// A row waiting for a probe, keyed by its position in the row list.
struct ProbeJob {
    index: usize,
    url: String,
}

pub struct Collector<'a> {
    types: &'a ReferenceTypeRegistry,
    prober: &'a dyn Prober,
    cancel: CancelToken,
}

impl<'a> Collector<'a> {
    pub fn new(types: &'a ReferenceTypeRegistry, prober: &'a dyn Prober) -> Self {
        Self {
            types,
            prober,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn collect<I>(&self, modules: I, options: &AuditOptions) -> Collection
    where
        I: IntoIterator<Item = Module>,
    {
        let resolver = Resolver::new(self.types);
        let mut rows = Vec::new();
        let mut jobs = Vec::new();
        let mut bad_reference_count = 0;
        let mut module_count = 0;

        for module in modules {
            if let Some(pattern) = &options.name_filter {
                if !pattern.is_match(&module.full_name) {
                    debug!("Skipping {}: name does not match {}", module.full_name, pattern);
                    continue;
                }
            }
            module_count += 1;

            for reference in &module.references {
                if !options.kind_filter.matches(&reference.normalized_kind()) {
                    continue;
                }

                let mut row = ReportRow::new(module.full_name.clone(), reference.label());

                if options.check {
                    match resolver.resolve(&reference.kind, &reference.value) {
                        Locator::Url(url) => jobs.push(ProbeJob {
                            index: rows.len(),
                            url,
                        }),
                        Locator::Unsupported => {
                            debug!(
                                "{}: {} is not a supported reference type",
                                module.full_name, reference.kind
                            );
                            row.status = Some(ProbeOutcome::Unsupported);
                            bad_reference_count += 1;
                        }
                    }
                }

                rows.push(row);
            }
        }

        info!("Collected {} references from {} modules", rows.len(), module_count);

        let mut skipped = 0;
        if !jobs.is_empty() {
            info!("Probing {} references ({} at a time)", jobs.len(), options.concurrency.max(1));
            let (bad, unprobed) = self.probe_all(&mut rows, jobs, options.concurrency).await;
            bad_reference_count += bad;
            skipped = unprobed;
        }

        if skipped > 0 {
            warn!("Interrupted, {} references were not checked", skipped);
            rows.retain(|row| row.status.is_some());
        }

        Collection {
            rows,
            bad_reference_count,
            skipped,
        }
    }

    /// Runs the probes on a bounded pool and writes outcomes back by row index,
    /// so completion order never leaks into row order.
    async fn probe_all(
        &self,
        rows: &mut [ReportRow],
        jobs: Vec<ProbeJob>,
        concurrency: usize,
    ) -> (usize, usize) {
        let prober = self.prober;
        let cancel = &self.cancel;

        let mut outcomes = stream::iter(jobs)
            .map(|job| async move {
                if cancel.is_cancelled() {
                    return (job.index, None);
                }
                let outcome = prober.probe(&job.url).await;
                debug!("{} -> {}", job.url, outcome);
                (job.index, Some(outcome))
            })
            .buffer_unordered(concurrency.max(1));

        let mut bad = 0;
        let mut skipped = 0;
        while let Some((index, outcome)) = outcomes.next().await {
            match (outcome, rows.get_mut(index)) {
                (Some(outcome), Some(row)) => {
                    if outcome.is_bad() {
                        bad += 1;
                    }
                    row.status = Some(outcome);
                }
                _ => skipped += 1,
            }
        }

        (bad, skipped)
    }
}

/// Enumerates the registry, collects rows and produces the finished report.
pub async fn run_audit(
    registry: &dyn ModuleRegistry,
    types: &ReferenceTypeRegistry,
    prober: &dyn Prober,
    request: &AuditRequest,
    cancel: CancelToken,
) -> Result<AuditReport> {
    let start = Instant::now();

    info!("Enumerating modules from {} registry ({})", registry.name(), request.categories);
    let modules = registry.modules(&request.categories)?;

    let collection = Collector::new(types, prober)
        .with_cancel(cancel)
        .collect(modules, &request.options)
        .await;

    let mut report = AuditReport::finalize(
        collection,
        request.options.check,
        &request.options.kind_filter,
        request.sort,
    );
    report.elapsed = start.elapsed().as_millis() as u64;

    Ok(report)
}
