use crate::host::SymbolProvider;
use crate::model::FileId;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
pub struct ReadinessPolicy {
    pub retries: u32,
    pub delay: Duration,
    pub sample: usize,
}

/// Poll the symbol provider with a few of `files` until one yields a
/// non-empty outline. Returns false (after a warning) when it never does.
pub async fn wait_until_ready(
    provider: &dyn SymbolProvider,
    files: &[FileId],
    policy: ReadinessPolicy,
) -> bool {
    if files.is_empty() {
        return true;
    }
    let sample = &files[..policy.sample.clamp(1, files.len())];
    for attempt in 1..=policy.retries {
        for file in sample {
            match provider.document_symbols(file).await {
                Ok(symbols) if !symbols.is_empty() => {
                    debug!(attempt, file = %file, "symbol provider ready");
                    return true;
                }
                Ok(_) => {}
                Err(err) => debug!(attempt, file = %file, "readiness probe failed: {err}"),
            }
        }
        if attempt < policy.retries && !policy.delay.is_zero() {
            tokio::time::sleep(policy.delay).await;
        }
    }
    warn!(
        retries = policy.retries,
        "symbol provider not ready, indexing anyway"
    );
    false
}
