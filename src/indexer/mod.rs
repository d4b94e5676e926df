use crate::cache::CallCache;
use crate::config::Config;
use crate::model::{FileId, IndexingReport};
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub mod readiness;

pub use readiness::{ReadinessPolicy, wait_until_ready};

#[derive(Debug, Clone)]
pub struct IndexerOptions {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub batch_size: usize,
    pub batch_pause: Duration,
    pub readiness: ReadinessPolicy,
}

impl IndexerOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            include: config.include_globs(),
            exclude: config.exclude.clone(),
            batch_size: config.batch_size.max(1),
            batch_pause: config.batch_pause(),
            readiness: ReadinessPolicy {
                retries: config.ready_retries,
                delay: config.ready_delay(),
                sample: config.ready_sample,
            },
        }
    }
}

/// Workspace-wide indexing runs. At most one run is active at a time; a
/// caller arriving during a run waits for it and shares its result.
pub struct Indexer {
    cache: Arc<CallCache>,
    options: IndexerOptions,
    last_run: Mutex<Option<IndexingReport>>,
    in_progress: Arc<AtomicBool>,
}

/// Clears the in-progress flag when a run ends, however it ends.
struct RunGuard(Arc<AtomicBool>);

impl RunGuard {
    fn start(flag: &Arc<AtomicBool>) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag.clone())
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Indexer {
    pub fn new(cache: Arc<CallCache>, options: IndexerOptions) -> Self {
        Self {
            cache,
            options,
            last_run: Mutex::new(None),
            in_progress: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn in_progress(&self) -> bool {
        self.in_progress.load(Ordering::SeqCst)
    }

    /// Index the workspace unless a previous run already did.
    pub async fn ensure_indexed(&self) -> IndexingReport {
        let mut last_run = self.last_run.lock().await;
        if let Some(report) = last_run.as_ref() {
            return report.clone();
        }
        let report = self.run().await;
        *last_run = Some(report.clone());
        report
    }

    /// Re-index every file. Files that disappeared since the last run are
    /// dropped from the cache.
    pub async fn reindex_all(&self) -> IndexingReport {
        let mut last_run = self.last_run.lock().await;
        let report = self.run().await;
        *last_run = Some(report.clone());
        report
    }

    /// Clear the cache, then index from scratch.
    pub async fn force_reindex_all(&self) -> IndexingReport {
        let mut last_run = self.last_run.lock().await;
        self.cache.clear();
        let report = self.run().await;
        *last_run = Some(report.clone());
        report
    }

    /// Forget the completed run so the next `ensure_indexed` starts over.
    pub async fn reset(&self) {
        *self.last_run.lock().await = None;
    }

    async fn run(&self) -> IndexingReport {
        let _guard = RunGuard::start(&self.in_progress);
        let started = Instant::now();
        let host = self.cache.host();

        let files = match host
            .files
            .find_files(&self.options.include, &self.options.exclude)
            .await
        {
            Ok(files) => files,
            Err(err) => {
                warn!("file enumeration failed: {err}");
                host.progress
                    .summary(&format!("Indexing failed: cannot list files ({err})"), true);
                return IndexingReport {
                    duration_ms: started.elapsed().as_millis() as u64,
                    ..IndexingReport::default()
                };
            }
        };
        info!(files = files.len(), "indexing workspace");

        readiness::wait_until_ready(host.symbols.as_ref(), &files, self.options.readiness).await;
        self.drop_vanished(&files);

        let total = files.len();
        let mut report = IndexingReport {
            total,
            ..IndexingReport::default()
        };
        let mut done = 0;
        for batch in files.chunks(self.options.batch_size) {
            let fetched = join_all(batch.iter().map(|file| self.cache.fetch(file))).await;
            for (file, result) in batch.iter().zip(fetched) {
                match result {
                    Ok(fetched) => {
                        self.cache.apply(fetched);
                        report.indexed += 1;
                    }
                    Err(err) => {
                        debug!(file = %file, "not indexed: {err}");
                        self.cache.invalidate(file);
                        report.failed += 1;
                    }
                }
            }
            done += batch.len();
            host.progress
                .progress(done, total, &format!("Indexed {done}/{total} files"));
            if done < total && !self.options.batch_pause.is_zero() {
                tokio::time::sleep(self.options.batch_pause).await;
            }
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        if total > 0 && report.indexed == 0 {
            host.progress.summary(
                &format!(
                    "No files could be indexed ({total} found); is language support available?"
                ),
                true,
            );
        } else {
            let stats = self.cache.statistics();
            host.progress.summary(
                &format!(
                    "Indexed {} of {} files: {} methods, {} call sites in {} ms",
                    report.indexed,
                    total,
                    stats.total_method_definitions,
                    stats.total_references,
                    report.duration_ms
                ),
                false,
            );
        }
        report
    }

    fn drop_vanished(&self, files: &[FileId]) {
        let current: HashSet<&FileId> = files.iter().collect();
        for file in self.cache.indexed_files() {
            if !current.contains(&file) {
                debug!(file = %file, "dropping vanished file");
                self.cache.invalidate(&file);
            }
        }
    }
}
