mod common;

use calltrace::Session;
use calltrace::model::FileId;
use common::*;
use std::sync::Arc;
use std::sync::atomic::Ordering;

#[tokio::test]
async fn indexes_all_files_in_batches() {
    let files: Vec<(String, String)> = (0..5)
        .map(|i| (format!("mod{i}.py"), format!("def func{i}():\n    func{}()\n", (i + 1) % 5)))
        .collect();
    let refs: Vec<(&str, &str)> = files.iter().map(|(p, t)| (p.as_str(), t.as_str())).collect();
    let workspace = MemoryWorkspace::new(&refs);
    let progress = Arc::new(RecordingProgress::default());
    let config = calltrace::Config {
        batch_size: 2,
        ..fast_config()
    };
    let session = Session::new(host(&workspace).with_progress(progress.clone()), config);

    let report = session.ensure_indexed().await;

    assert_eq!(report.total, 5);
    assert_eq!(report.indexed, 5);
    assert_eq!(report.failed, 0);
    assert_eq!(*progress.updates.lock(), vec![(2, 5), (4, 5), (5, 5)]);
    let summaries = progress.summaries.lock();
    assert_eq!(summaries.len(), 1);
    assert!(!summaries[0].1);

    let stats = session.cache_statistics();
    assert_eq!(stats.total_files, 5);
    assert_eq!(stats.total_method_definitions, 5);
    assert_eq!(stats.unique_method_names, 5);
    assert!(!stats.indexing_in_progress);
    assert_eq!(session.cache().find_references("func0").len(), 2);
}

#[tokio::test]
async fn concurrent_callers_share_one_run() {
    let workspace = MemoryWorkspace::new(&[("door.py", DOOR_PY)]);
    let session = session(&workspace);

    let (a, b) = tokio::join!(session.ensure_indexed(), session.ensure_indexed());

    assert_eq!(a, b);
    assert_eq!(workspace.enumerations.load(Ordering::SeqCst), 1);
    session.ensure_indexed().await;
    assert_eq!(workspace.enumerations.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failing_files_are_counted_not_fatal() {
    let workspace = MemoryWorkspace::new(&[
        ("door.py", DOOR_PY),
        ("empty.py", "# nothing here\n"),
        ("notes.txt", "plain text"),
    ]);
    let session = session(&workspace);

    let report = session.ensure_indexed().await;

    assert_eq!(report.total, 3);
    assert_eq!(report.indexed, 1);
    assert_eq!(report.failed, 2);
    let cache = session.cache();
    assert!(cache.is_indexed(&FileId::new("door.py")));
    assert!(!cache.is_indexed(&FileId::new("empty.py")));
    assert!(!cache.is_indexed(&FileId::new("notes.txt")));
}

#[tokio::test]
async fn warns_when_nothing_could_be_indexed() {
    let workspace = MemoryWorkspace::new(&[("a.py", "def a_fn():\n    pass\n")]);
    workspace.set_warmup(usize::MAX);
    let progress = Arc::new(RecordingProgress::default());
    let session = Session::new(host(&workspace).with_progress(progress.clone()), fast_config());

    let report = session.ensure_indexed().await;

    assert_eq!(report.indexed, 0);
    assert_eq!(report.failed, 1);
    let summaries = progress.summaries.lock();
    assert!(summaries.last().unwrap().1, "expected a warning summary");
}

#[tokio::test]
async fn waits_for_symbol_provider_readiness() {
    let workspace = MemoryWorkspace::new(&[("door.py", DOOR_PY)]);
    workspace.set_warmup(2);
    let config = calltrace::Config {
        ready_retries: 5,
        ..fast_config()
    };
    let session = Session::new(host(&workspace), config);

    let report = session.ensure_indexed().await;

    assert_eq!(report.indexed, 1);
    // Two empty probes, one successful probe, one indexing fetch.
    assert_eq!(workspace.symbol_calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn invalidation_round_trip() {
    let workspace = MemoryWorkspace::new(&[
        ("door.py", DOOR_PY),
        ("app.py", "def boot():\n    quickStart()\n"),
    ]);
    let session = session(&workspace);
    session.ensure_indexed().await;
    let door = FileId::new("door.py");
    let cache = session.cache();
    assert_eq!(cache.find_definitions("openNow").len(), 1);
    assert_eq!(cache.find_references("openNow").len(), 2);

    session.invalidate_file(&door);
    assert!(cache.find_definitions("openNow").is_empty());
    assert!(cache.find_references("openNow").is_empty());
    assert_eq!(cache.find_references("quickStart").len(), 1, "app.py keeps its call site");

    assert!(session.update_file(&door).await);
    assert_eq!(cache.find_definitions("openNow").len(), 1);
    assert_eq!(cache.find_references("openNow").len(), 2);
}

#[tokio::test]
async fn edited_file_is_reoutlined_on_next_lookup() {
    let workspace = MemoryWorkspace::new(&[("door.py", DOOR_PY)]);
    let session = session(&workspace);
    session.ensure_indexed().await;
    let door = FileId::new("door.py");

    workspace.set("door.py", "def close():\n    return 0\n");
    let symbols = session.symbols(&door).await;

    let names: Vec<_> = symbols.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["close"]);
    assert!(session.cache().find_definitions("open").is_empty());
    assert_eq!(session.cache().find_definitions("close").len(), 1);
}

#[tokio::test]
async fn edit_during_outline_is_not_cached_as_fresh() {
    let workspace = MemoryWorkspace::new(&[("door.py", DOOR_PY)]);
    let session = session(&workspace);
    session.ensure_indexed().await;
    let door = FileId::new("door.py");

    workspace.edit_after_next_outline("door.py", "def close():\n    return 0\n");
    assert!(session.update_file(&door).await);
    let symbols = session.symbols(&door).await;

    let names: Vec<_> = symbols.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["close"]);
}

#[tokio::test]
async fn reindex_drops_deleted_files() {
    let workspace = MemoryWorkspace::new(&[
        ("door.py", DOOR_PY),
        ("extra.py", "def extra_fn():\n    open()\n"),
    ]);
    let session = session(&workspace);
    session.ensure_indexed().await;
    assert_eq!(session.cache_statistics().total_files, 2);

    workspace.remove("extra.py");
    let report = session.reindex_all().await;

    assert_eq!(report.total, 1);
    assert_eq!(session.cache_statistics().total_files, 1);
    assert!(session.cache().find_definitions("extra_fn").is_empty());
}

#[tokio::test]
async fn force_reindex_and_teardown_reset_state() {
    let workspace = MemoryWorkspace::new(&[("door.py", DOOR_PY)]);
    let session = session(&workspace);
    session.ensure_indexed().await;

    let report = session.force_reindex_all().await;
    assert_eq!(report.indexed, 1);
    assert_eq!(workspace.enumerations.load(Ordering::SeqCst), 2);

    session.teardown().await;
    assert_eq!(session.cache_statistics().total_files, 0);
    session.ensure_indexed().await;
    assert_eq!(workspace.enumerations.load(Ordering::SeqCst), 3);
    assert_eq!(session.cache_statistics().total_files, 1);
}

#[tokio::test]
async fn helper_resolution_prefers_context_file() {
    let workspace = MemoryWorkspace::new(&[
        ("x/helper.py", "def helper():\n    return 'x'\n"),
        ("y/helper.py", "def helper():\n    return 'y'\n"),
        ("z/main.py", "def main_fn():\n    helper()\n"),
    ]);
    let session = session(&workspace);
    session.ensure_indexed().await;
    let cache = session.cache();

    let from_x = cache
        .resolve_definition("helper", Some(&FileId::new("x/helper.py")))
        .unwrap();
    assert_eq!(from_x.file_id.as_str(), "x/helper.py");
    let from_y = cache
        .resolve_definition("helper", Some(&FileId::new("y/helper.py")))
        .unwrap();
    assert_eq!(from_y.file_id.as_str(), "y/helper.py");
    let from_z = cache
        .resolve_definition("helper", Some(&FileId::new("z/main.py")))
        .unwrap();
    assert_eq!(from_z.file_id.as_str(), "x/helper.py");
}
