use crate::model::FileId;
use crate::session::Session;
use crate::workspace::scan;
use anyhow::{Context, Result};
use ignore::{
    Match as IgnoreMatch,
    gitignore::{Gitignore, GitignoreBuilder},
};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const DEFAULT_DEBOUNCE_MS: u64 = 300;
const DEFAULT_MAX_BATCH: usize = 500;

#[derive(Clone, Copy, Debug)]
pub struct WatchConfig {
    /// Quiet period before queued changes are applied.
    pub debounce: Duration,
    /// Queue size at which a full re-index replaces per-file updates.
    pub max_batch: usize,
}

impl WatchConfig {
    pub fn new(debounce_ms: u64, max_batch: usize) -> Self {
        Self {
            debounce: Duration::from_millis(debounce_ms.max(1)),
            max_batch: max_batch.max(1),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_MS, DEFAULT_MAX_BATCH)
    }
}

/// Changes collected during one debounce window.
#[derive(Debug, Default)]
pub struct PendingChanges {
    pub files: BTreeSet<FileId>,
    pub rescan: bool,
}

impl PendingChanges {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && !self.rescan
    }

    fn take(&mut self) -> PendingChanges {
        std::mem::take(self)
    }
}

pub struct WatchHandle {
    _watcher: RecommendedWatcher,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl WatchHandle {
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Err(err) = (&mut self.task).await {
            warn!("watch task ended abnormally: {err}");
        }
    }

    /// Resolves when the watch loop exits on its own.
    pub async fn finished(&mut self) {
        let _ = (&mut self.task).await;
    }
}

/// Watch `root` and keep `session` in step with file edits.
pub fn start(session: Arc<Session>, root: &Path, config: WatchConfig) -> Result<WatchHandle> {
    let root = std::fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |res| {
        let _ = event_tx.send(res);
    })
    .context("create file watcher")?;
    watcher
        .watch(&root, RecursiveMode::Recursive)
        .with_context(|| format!("watch {}", root.display()))?;
    info!(root = %root.display(), "watching for changes");

    let filter = PathFilter::new(&root, &session.config().extensions);
    let (stop_tx, stop_rx) = oneshot::channel();
    let task = tokio::spawn(run_loop(session, root, config, filter, event_rx, stop_rx));
    Ok(WatchHandle {
        _watcher: watcher,
        stop: Some(stop_tx),
        task,
    })
}

async fn run_loop(
    session: Arc<Session>,
    root: PathBuf,
    config: WatchConfig,
    mut filter: PathFilter,
    mut events: mpsc::UnboundedReceiver<notify::Result<Event>>,
    mut stop: oneshot::Receiver<()>,
) {
    let mut pending = PendingChanges::default();
    loop {
        tokio::select! {
            _ = &mut stop => return,
            event = events.recv() => match event {
                None => return,
                Some(Ok(event)) => {
                    if event.need_rescan() {
                        pending.rescan = true;
                    } else if !is_noise_event(&event) {
                        pending.files.extend(event.paths.iter().filter_map(|path| filter.classify(path)));
                    }
                }
                Some(Err(err)) => warn!("watch error: {err}"),
            },
            _ = tokio::time::sleep(config.debounce), if !pending.is_empty() => {
                apply_changes(&session, &root, pending.take(), config.max_batch).await;
            }
        }
    }
}

/// Apply one window of changes: re-read files that exist, invalidate files
/// that are gone, or re-index everything for rescans and large bursts.
pub async fn apply_changes(session: &Session, root: &Path, changes: PendingChanges, max_batch: usize) {
    if changes.rescan || changes.files.len() >= max_batch {
        info!(files = changes.files.len(), rescan = changes.rescan, "re-indexing after change burst");
        session.reindex_all().await;
        return;
    }
    for file in changes.files {
        let exists = tokio::fs::metadata(root.join(file.path()))
            .await
            .is_ok_and(|meta| meta.is_file());
        if exists {
            if !session.update_file(&file).await {
                debug!(file = %file, "changed file could not be indexed");
            }
        } else {
            session.invalidate_file(&file);
        }
    }
}

fn is_noise_event(event: &Event) -> bool {
    matches!(event.kind, EventKind::Access(_))
}

/// Maps watcher paths to indexable workspace files, honoring ignore files.
pub struct PathFilter {
    root: PathBuf,
    extensions: HashSet<String>,
    gitignores: HashMap<PathBuf, Gitignore>,
    git_exclude: Gitignore,
}

impl PathFilter {
    pub fn new(root: &Path, extensions: &[String]) -> Self {
        Self {
            root: root.to_path_buf(),
            extensions: extensions.iter().map(|ext| ext.to_ascii_lowercase()).collect(),
            gitignores: HashMap::new(),
            git_exclude: build_gitignore(root, root.join(".git/info/exclude")),
        }
    }

    pub fn classify(&mut self, path: &Path) -> Option<FileId> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let first = rel.components().next()?;
        if first.as_os_str() == ".git" || scan::in_excluded_dir(rel) {
            return None;
        }
        let ext = rel.extension()?.to_str()?.to_ascii_lowercase();
        if !self.extensions.contains(&ext) || scan::language_for_path(rel).is_none() {
            return None;
        }
        if self.is_ignored(path) {
            return None;
        }
        Some(FileId::from_path(rel))
    }

    fn is_ignored(&mut self, path: &Path) -> bool {
        let is_dir = path.is_dir();
        let mut decision = None;
        apply_match(
            &mut decision,
            self.git_exclude.matched_path_or_any_parents(path, is_dir),
        );
        for dir in self.ancestor_dirs(path) {
            let matcher = self.gitignore_for(&dir);
            apply_match(&mut decision, matcher.matched_path_or_any_parents(path, is_dir));
        }
        decision.unwrap_or(false)
    }

    fn ancestor_dirs(&self, path: &Path) -> Vec<PathBuf> {
        let mut out: Vec<PathBuf> = path
            .ancestors()
            .skip(1)
            .take_while(|dir| dir.starts_with(&self.root))
            .map(Path::to_path_buf)
            .collect();
        out.reverse();
        out
    }

    fn gitignore_for(&mut self, dir: &Path) -> &Gitignore {
        self.gitignores
            .entry(dir.to_path_buf())
            .or_insert_with(|| build_gitignore(dir, dir.join(".gitignore")))
    }
}

fn apply_match<T>(decision: &mut Option<bool>, matched: IgnoreMatch<T>) {
    match matched {
        IgnoreMatch::Ignore(_) => *decision = Some(true),
        IgnoreMatch::Whitelist(_) => *decision = Some(false),
        IgnoreMatch::None => {}
    }
}

fn build_gitignore(root: &Path, path: PathBuf) -> Gitignore {
    if !path.is_file() {
        return Gitignore::empty();
    }
    let mut builder = GitignoreBuilder::new(root);
    if let Some(err) = builder.add(path) {
        warn!("watch: ignore parse error: {err}");
    }
    builder.build().unwrap_or_else(|err| {
        warn!("watch: ignore build error: {err}");
        Gitignore::empty()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extensions() -> Vec<String> {
        vec!["rs".to_string(), "py".to_string()]
    }

    #[test]
    fn classify_keeps_source_files_only() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let mut filter = PathFilter::new(root, &extensions());

        assert_eq!(
            filter.classify(&root.join("src/lib.rs")),
            Some(FileId::new("src/lib.rs"))
        );
        assert_eq!(filter.classify(&root.join("README.md")), None);
        assert_eq!(filter.classify(&root.join("app.go")), None);
        assert_eq!(filter.classify(&root.join("node_modules/pkg/x.rs")), None);
        assert_eq!(filter.classify(&root.join(".git/HEAD")), None);
        assert_eq!(filter.classify(Path::new("/elsewhere/lib.rs")), None);
    }

    #[test]
    fn classify_honors_gitignore() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::write(root.join(".gitignore"), "generated/\n").unwrap();
        std::fs::create_dir_all(root.join("generated")).unwrap();
        let mut filter = PathFilter::new(root, &extensions());

        assert_eq!(filter.classify(&root.join("generated/out.py")), None);
        assert_eq!(
            filter.classify(&root.join("pkg/main.py")),
            Some(FileId::new("pkg/main.py"))
        );
    }

    #[test]
    fn pending_take_resets() {
        let mut pending = PendingChanges::default();
        assert!(pending.is_empty());
        pending.files.insert(FileId::new("a.rs"));
        pending.rescan = true;
        let taken = pending.take();
        assert!(pending.is_empty());
        assert_eq!(taken.files.len(), 1);
        assert!(taken.rescan);
    }

    #[test]
    fn watch_config_clamps() {
        let config = WatchConfig::new(0, 0);
        assert_eq!(config.debounce, Duration::from_millis(1));
        assert_eq!(config.max_batch, 1);
    }
}
