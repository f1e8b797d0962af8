//! Layered JSON settings (§4.L): three `serde_json::Value` layers —
//! `built_in`, `user` (`~/knut.json`), `project` (`<root>/knut.json`) —
//! merged in that order with RFC 7386 JSON Merge Patch semantics (so later
//! layers only override the keys they set), addressed by JSON-Pointer paths.
//! Mirrors the donor config crate's `discover()`/`load_from()` shape, adapted
//! from a single TOML file to knut's three-layer JSON model.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde_json::{json, Value};
use thiserror::Error;

pub const SETTINGS_FILE_NAME: &str = "knut.json";

/// Gates LSP enablement (§4.L): only `Test` and `Gui` may start LSP clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Test,
    Cli,
    Gui,
}

impl Mode {
    pub fn lsp_allowed(self) -> bool {
        matches!(self, Mode::Test | Mode::Gui)
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: std::io::Error },
    #[error("invalid JSON in {path}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
    #[error("JSON-Pointer path {0:?} does not address an object that can be set")]
    BadPath(String),
}

/// The built-in defaults for every key named in §6 "Settings files".
fn built_in_defaults() -> Value {
    json!({
        "lsp": { "enabled": false, "servers": [] },
        "mime_types": {
            "h": "Cpp", "hpp": "Cpp", "cpp": "Cpp", "cc": "Cpp", "cxx": "Cpp",
            "c": "Cpp", "rc": "Rc", "ui": "Ui", "ts": "Ts", "json": "Json",
            "qml": "Qml", "rs": "Rust", "cs": "CSharp", "dart": "Dart",
        },
        "rc": {
            "dialog_flags": 0,
            "dialog_scalex": 1.5,
            "dialog_scaley": 1.65,
            "asset_flags": 0,
            "asset_transparent_colors": 0,
            "language_map": {},
        },
        "script_paths": [],
        "text_editor": { "tab": { "insertSpaces": true, "tabSize": 4 } },
        "toggle_section": { "tag": "KNUT_DEBUG", "debug": "qDebug() << %1;", "return_values": {} },
        "logs": { "saveToFile": true },
    })
}

fn normalize_pointer(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

pub struct Settings {
    built_in: Value,
    user: Value,
    project: Value,
    merged: Value,
    mode: Mode,
    project_root: Option<PathBuf>,
    save_generation: AtomicU64,
    pending: Mutex<Option<u64>>,
    change_listeners: Mutex<Vec<Box<dyn Fn(&str) + Send + Sync>>>,
}

impl Settings {
    /// Loads the three layers. User settings are skipped entirely when
    /// `mode == Mode::Test`, matching `Settings::isTesting()` in the original
    /// implementation — tests must not pick up a developer's real
    /// `~/knut.json`.
    pub fn load(project_root: Option<PathBuf>, mode: Mode) -> Self {
        let built_in = built_in_defaults();
        let user = if mode == Mode::Test {
            Value::Object(Default::default())
        } else {
            read_layer(&user_file_path()).unwrap_or_else(|e| {
                tracing::warn!(target: "settings", error = %e, "failed to load user settings, using empty layer");
                Value::Object(Default::default())
            })
        };
        let project = match &project_root {
            Some(root) => read_layer(&project_file_path(root)).unwrap_or_else(|e| {
                tracing::warn!(target: "settings", error = %e, "failed to load project settings, using empty layer");
                Value::Object(Default::default())
            }),
            None => Value::Object(Default::default()),
        };
        let mut settings = Self {
            built_in,
            user,
            project,
            merged: Value::Null,
            mode,
            project_root,
            save_generation: AtomicU64::new(0),
            pending: Mutex::new(None),
            change_listeners: Mutex::new(Vec::new()),
        };
        settings.recompute();
        settings
    }

    fn recompute(&mut self) {
        let mut merged = self.built_in.clone();
        json_patch::merge(&mut merged, &self.user);
        json_patch::merge(&mut merged, &self.project);
        self.merged = merged;
    }

    pub fn is_user(&self) -> bool {
        self.project_root.is_none()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn merged(&self) -> &Value {
        &self.merged
    }

    pub fn value(&self, path: &str) -> Option<&Value> {
        self.merged.pointer(&normalize_pointer(path))
    }

    pub fn value_or<T: serde::de::DeserializeOwned>(&self, path: &str, default: T) -> T {
        self.value(path).and_then(|v| serde_json::from_value(v.clone()).ok()).unwrap_or(default)
    }

    /// Writes into the project layer if a project is loaded, else the user
    /// layer (§4.L), recomputes the merged view, notifies listeners, and
    /// schedules a coalesced async save.
    pub fn set_value(&mut self, path: &str, value: Value) -> Result<(), SettingsError> {
        let pointer = normalize_pointer(path);
        let target = if self.is_user() { &mut self.user } else { &mut self.project };
        set_at_pointer(target, &pointer, value)?;
        self.recompute();
        tracing::info!(target: "settings", path = %pointer, "value changed");
        for listener in self.change_listeners.lock().unwrap().iter() {
            listener(&pointer);
        }
        self.schedule_save();
        Ok(())
    }

    pub fn on_change(&self, listener: impl Fn(&str) + Send + Sync + 'static) {
        self.change_listeners.lock().unwrap().push(Box::new(listener));
    }

    /// Coalesces rapid writes: a save that hasn't happened yet when another
    /// `set_value` arrives is simply superseded (the generation counter lets
    /// `flush_pending_save` recognize it is stale and skip).
    fn schedule_save(&self) {
        let generation = self.save_generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.pending.lock().unwrap() = Some(generation);
    }

    /// Flushes any pending save. The CLI's event loop calls this on a short
    /// interval in lieu of the original single-shot `QTimer`.
    pub fn flush_pending_save(&mut self) -> Result<(), SettingsError> {
        let mut pending = self.pending.lock().unwrap();
        let Some(generation) = *pending else { return Ok(()) };
        if generation != self.save_generation.load(Ordering::SeqCst) {
            return Ok(());
        }
        *pending = None;
        drop(pending);
        self.save()
    }

    pub fn save(&self) -> Result<(), SettingsError> {
        if self.is_user() {
            write_layer(&user_file_path(), &self.user)
        } else if let Some(root) = &self.project_root {
            write_layer(&project_file_path(root), &self.project)
        } else {
            Ok(())
        }
    }

    pub fn log_file_path(&self) -> PathBuf {
        app_data_dir().join("knut.log")
    }
}

fn set_at_pointer(root: &mut Value, pointer: &str, value: Value) -> Result<(), SettingsError> {
    if pointer == "/" || pointer.is_empty() {
        *root = value;
        return Ok(());
    }
    let segments: Vec<&str> = pointer.trim_start_matches('/').split('/').collect();
    let mut cursor = root;
    for seg in &segments[..segments.len() - 1] {
        if !cursor.is_object() {
            *cursor = json!({});
        }
        cursor = cursor.as_object_mut().unwrap().entry(seg.to_string()).or_insert_with(|| json!({}));
    }
    if !cursor.is_object() {
        return Err(SettingsError::BadPath(pointer.to_string()));
    }
    cursor.as_object_mut().unwrap().insert(segments[segments.len() - 1].to_string(), value);
    Ok(())
}

fn read_layer(path: &Path) -> Result<Value, SettingsError> {
    if !path.exists() {
        return Ok(Value::Object(Default::default()));
    }
    let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Read { path: path.to_path_buf(), source })?;
    serde_json::from_str(&text).map_err(|source| SettingsError::Parse { path: path.to_path_buf(), source })
}

fn write_layer(path: &Path, value: &Value) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let text = serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string());
    std::fs::write(path, text).map_err(|source| SettingsError::Write { path: path.to_path_buf(), source })
}

pub fn user_file_path() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(SETTINGS_FILE_NAME)
}

pub fn project_file_path(root: &Path) -> PathBuf {
    root.join(SETTINGS_FILE_NAME)
}

pub fn app_data_dir() -> PathBuf {
    dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join("knut")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn built_in_values_are_reachable_by_pointer() {
        let settings = Settings::load(None, Mode::Test);
        assert_eq!(settings.value("/rc/dialog_scalex").unwrap(), &json!(1.5));
        assert_eq!(settings.value("rc/dialog_scaley").unwrap(), &json!(1.65));
    }

    #[test]
    fn project_layer_overrides_built_in() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("knut.json"), r#"{"rc":{"dialog_scalex":2.0}}"#).unwrap();
        let settings = Settings::load(Some(dir.path().to_path_buf()), Mode::Test);
        assert_eq!(settings.value("/rc/dialog_scalex").unwrap(), &json!(2.0));
        assert_eq!(settings.value("/rc/dialog_scaley").unwrap(), &json!(1.65));
    }

    #[test]
    fn set_value_writes_project_layer_when_project_loaded() {
        let dir = tempdir().unwrap();
        let mut settings = Settings::load(Some(dir.path().to_path_buf()), Mode::Test);
        settings.set_value("/lsp/enabled", json!(true)).unwrap();
        assert_eq!(settings.value("/lsp/enabled").unwrap(), &json!(true));
        assert!(!settings.is_user());
    }

    #[test]
    fn mode_gates_lsp() {
        assert!(Mode::Gui.lsp_allowed());
        assert!(Mode::Test.lsp_allowed());
        assert!(!Mode::Cli.lsp_allowed());
    }

    #[test]
    fn change_listener_fires_with_pointer() {
        let mut settings = Settings::load(None, Mode::Test);
        let seen = std::sync::Arc::new(Mutex::new(None));
        let seen2 = seen.clone();
        settings.on_change(move |path| *seen2.lock().unwrap() = Some(path.to_string()));
        settings.set_value("rc/dialog_flags", json!(7)).unwrap();
        assert_eq!(seen.lock().unwrap().as_deref(), Some("/rc/dialog_flags"));
    }
}
