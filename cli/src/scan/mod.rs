use anyhow::Result;
use refwatch_core::{
    AuditReport, AuditRequest, CancelToken, HttpProber, ModuleRegistry, ReferenceTypeRegistry,
};
use std::path::Path;
use std::time::Duration;
use tokio::task::JoinHandle;

#[cfg(feature = "catalog")]
use refwatch_plugin_catalog::DirectoryCatalog;

pub fn open_registry(catalog: &Path) -> Result<Box<dyn ModuleRegistry>> {
    #[cfg(feature = "catalog")]
    {
        Ok(Box::new(DirectoryCatalog::new(catalog)?))
    }

    #[cfg(not(feature = "catalog"))]
    {
        anyhow::bail!(
            "No module registry available for {} (built without the catalog feature)",
            catalog.display()
        )
    }
}

/// Exit status after a second Ctrl-C, as for a shell killed by SIGINT.
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Runs the audit. While checking, the first Ctrl-C stops new checks and keeps
/// what finished, a second one exits at once. Without checking the default
/// signal handling is left alone.
pub async fn run_audit(
    registry: &dyn ModuleRegistry,
    types: &ReferenceTypeRegistry,
    request: &AuditRequest,
    timeout: Duration,
) -> Result<AuditReport> {
    let prober = HttpProber::with_timeout(timeout)?;
    let cancel = CancelToken::new();

    let watcher = spawn_interrupt_watcher(request, &cancel);

    let report = refwatch_core::run_audit(registry, types, &prober, request, cancel).await;
    if let Some(watcher) = watcher {
        watcher.abort();
    }

    Ok(report?)
}

fn spawn_interrupt_watcher(request: &AuditRequest, cancel: &CancelToken) -> Option<JoinHandle<()>> {
    request
        .options
        .check
        .then(|| tokio::spawn(watch_interrupts(cancel.clone())))
}

async fn watch_interrupts(cancel: CancelToken) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    eprintln!("\nInterrupted, waiting for running checks to finish (Ctrl-C again to quit)...");
    cancel.cancel();

    if tokio::signal::ctrl_c().await.is_ok() {
        std::process::exit(INTERRUPTED_EXIT_CODE);
    }
}
