//! Script manager (§4.J): enumerates script records from watched
//! directories, and invokes scripts synchronously or asynchronously,
//! capturing a single result value. The scripting runtime itself (actually
//! executing JS/QML) is out of scope — [`ScriptRuntime`] is the seam an
//! embedder plugs a real interpreter into.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::sync::{Arc, Mutex};
use std::thread;

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRecord {
    pub name: String,
    pub path: PathBuf,
    pub description: String,
}

#[derive(Debug, Clone)]
pub enum ScriptEvent {
    Added(ScriptRecord),
    Removed(PathBuf),
    Finished { path: PathBuf, result: Value },
}

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("script {0:?} not found")]
    NotFound(PathBuf),
    #[error("script runtime failed: {0}")]
    Runtime(String),
}

/// The actual script-execution seam. A real embedder wires in a JS/QML
/// interpreter; [`NoopRuntime`] is the default used until one exists.
pub trait ScriptRuntime: Send + Sync {
    fn run(&self, path: &Path, data: Option<Value>) -> Result<Value, ScriptError>;
}

/// Returns `Value::Null` and logs that execution was requested — the
/// scripting runtime (JS/QML) is out of scope for this core.
pub struct NoopRuntime;

impl ScriptRuntime for NoopRuntime {
    fn run(&self, path: &Path, _data: Option<Value>) -> Result<Value, ScriptError> {
        tracing::info!(target: "script", path = %path.display(), "script runtime not wired in; returning null");
        Ok(Value::Null)
    }
}

const SCRIPT_EXTENSIONS: [&str; 2] = ["js", "qml"];

fn is_script_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()).map(|e| SCRIPT_EXTENSIONS.contains(&e.to_lowercase().as_str())).unwrap_or(false)
}

fn description_for(path: &Path) -> String {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|text| text.lines().find(|l| l.trim_start().starts_with("//")).map(|l| l.trim_start_matches('/').trim().to_string()))
        .unwrap_or_default()
}

fn scan_directory(dir: &Path) -> Vec<ScriptRecord> {
    let Ok(entries) = std::fs::read_dir(dir) else { return Vec::new() };
    entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| is_script_file(p))
        .map(|path| ScriptRecord {
            name: path.file_stem().and_then(|s| s.to_str()).unwrap_or_default().to_string(),
            description: description_for(&path),
            path,
        })
        .collect()
}

struct Shared {
    scripts: Mutex<HashMap<PathBuf, ScriptRecord>>,
    listeners: Mutex<Vec<Box<dyn Fn(&ScriptEvent) + Send + Sync>>>,
    runtime: Box<dyn ScriptRuntime>,
}

impl Shared {
    fn emit(&self, event: ScriptEvent) {
        tracing::debug!(target: "script", ?event, "script event");
        for listener in self.listeners.lock().unwrap().iter() {
            listener(&event);
        }
    }

    /// Re-scans every registered directory, diffing against the current
    /// set and emitting `Added`/`Removed` for the difference.
    fn rescan(&self, directories: &[PathBuf]) {
        let found: HashMap<PathBuf, ScriptRecord> = directories.iter().flat_map(|d| scan_directory(d)).map(|r| (r.path.clone(), r)).collect();

        let mut current = self.scripts.lock().unwrap();
        let removed: Vec<PathBuf> = current.keys().filter(|p| !found.contains_key(*p)).cloned().collect();
        let added: Vec<ScriptRecord> = found.values().filter(|r| !current.contains_key(&r.path)).cloned().collect();

        for path in &removed {
            current.remove(path);
        }
        for record in &added {
            current.insert(record.path.clone(), record.clone());
        }
        drop(current);

        for path in removed {
            self.emit(ScriptEvent::Removed(path));
        }
        for record in added {
            self.emit(ScriptEvent::Added(record));
        }
    }
}

/// §4.J Script Manager: owns the registered script directories, the
/// enumerated records, and an optional file-system watcher that triggers
/// re-enumeration on directory change.
pub struct ScriptManager {
    directories: Vec<PathBuf>,
    shared: Arc<Shared>,
    _watcher: Option<RecommendedWatcher>,
}

impl ScriptManager {
    pub fn new(directories: Vec<PathBuf>, runtime: Box<dyn ScriptRuntime>) -> Self {
        let shared = Arc::new(Shared { scripts: Mutex::new(HashMap::new()), listeners: Mutex::new(Vec::new()), runtime });
        shared.rescan(&directories);
        Self { directories, shared, _watcher: None }
    }

    pub fn with_noop_runtime(directories: Vec<PathBuf>) -> Self {
        Self::new(directories, Box::new(NoopRuntime))
    }

    pub fn scripts(&self) -> Vec<ScriptRecord> {
        let mut records: Vec<ScriptRecord> = self.shared.scripts.lock().unwrap().values().cloned().collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        records
    }

    pub fn on_event(&self, listener: impl Fn(&ScriptEvent) + Send + Sync + 'static) {
        self.shared.listeners.lock().unwrap().push(Box::new(listener));
    }

    /// Starts watching every registered directory (non-recursively); any
    /// create/remove/rename event triggers a full re-scan. Logs and leaves
    /// watching disabled if the watcher can't be constructed.
    pub fn watch(&mut self) {
        let shared = self.shared.clone();
        let directories = self.directories.clone();
        let (tx, rx): (_, Receiver<notify::Result<Event>>) = channel();
        let mut watcher = match notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        }) {
            Ok(w) => w,
            Err(err) => {
                tracing::warn!(target: "script", %err, "failed to create directory watcher");
                return;
            }
        };
        for dir in &directories {
            if let Err(err) = watcher.watch(dir, RecursiveMode::NonRecursive) {
                tracing::warn!(target: "script", %err, dir = %dir.display(), "failed to watch script directory");
            }
        }
        thread::spawn(move || {
            for res in rx {
                if res.is_ok() {
                    shared.rescan(&directories);
                }
            }
        });
        self._watcher = Some(watcher);
    }

    /// §4.J `run_script(path, data, async, log)`. Synchronous by default;
    /// with `async_ = true`, runs on a background thread and emits
    /// `Finished` via a registered listener instead of returning the result
    /// directly (the returned value is then always `Value::Null`).
    pub fn run_script(&self, path: &Path, data: Option<Value>, async_: bool, log: bool) -> Result<Value, ScriptError> {
        if !self.shared.scripts.lock().unwrap().contains_key(path) {
            return Err(ScriptError::NotFound(path.to_path_buf()));
        }
        if log {
            tracing::info!(target: "script", path = %path.display(), async_, "running script");
        }

        if async_ {
            let shared = self.shared.clone();
            let path = path.to_path_buf();
            thread::spawn(move || match shared.runtime.run(&path, data) {
                Ok(result) => shared.emit(ScriptEvent::Finished { path, result }),
                Err(err) => tracing::warn!(target: "script", %err, path = %path.display(), "async script failed"),
            });
            return Ok(Value::Null);
        }

        let result = self.shared.runtime.run(path, data)?;
        self.shared.emit(ScriptEvent::Finished { path: path.to_path_buf(), result: result.clone() });
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn write_script(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn enumerates_js_and_qml_scripts_with_description() {
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "rename_base.js", "// Renames a base class\nfunction main() {}\n");
        write_script(dir.path(), "layout.qml", "// QML layout helper\nItem {}\n");
        write_script(dir.path(), "notes.txt", "not a script\n");

        let manager = ScriptManager::with_noop_runtime(vec![dir.path().to_path_buf()]);
        let scripts = manager.scripts();
        assert_eq!(scripts.len(), 2);
        assert!(scripts.iter().any(|s| s.name == "rename_base" && s.description == "Renames a base class"));
    }

    #[test]
    fn run_script_emits_finished_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_script(dir.path(), "a.js", "// test\n");
        let manager = ScriptManager::with_noop_runtime(vec![dir.path().to_path_buf()]);

        let finished = Arc::new(AtomicUsize::new(0));
        let finished2 = finished.clone();
        manager.on_event(move |event| {
            if let ScriptEvent::Finished { .. } = event {
                finished2.fetch_add(1, Ordering::SeqCst);
            }
        });
        manager.run_script(&path, None, false, false).unwrap();
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn run_script_errors_for_unknown_path() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ScriptManager::with_noop_runtime(vec![dir.path().to_path_buf()]);
        let err = manager.run_script(Path::new("missing.js"), None, false, false).unwrap_err();
        assert!(matches!(err, ScriptError::NotFound(_)));
    }

    #[test]
    fn async_run_script_completes_eventually() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_script(dir.path(), "b.js", "// async test\n");
        let manager = ScriptManager::with_noop_runtime(vec![dir.path().to_path_buf()]);

        let finished = Arc::new(AtomicUsize::new(0));
        let finished2 = finished.clone();
        manager.on_event(move |event| {
            if let ScriptEvent::Finished { .. } = event {
                finished2.fetch_add(1, Ordering::SeqCst);
            }
        });
        manager.run_script(&path, None, true, false).unwrap();
        for _ in 0..50 {
            if finished.load(Ordering::SeqCst) == 1 {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }
}
