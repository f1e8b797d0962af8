//! Operation log / history (§4.K), grounded directly on the original
//! implementation's `Logger`/`HistoryModel`: every public API call pushes a
//! `{name, params[], return?}` record; only the *outermost* call is recorded
//! (an RAII guard tracks call depth, so a refactoring that internally calls
//! other logged APIs produces exactly one record); `LOG_AND_MERGE` calls fold
//! into the previous record when consecutive and same-named; and
//! `create_script` replays a contiguous slice of history as a small script.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

/// A tagged argument/return value (§9 "Argument types are carried as tagged
/// values").
#[derive(Clone, Debug, PartialEq)]
pub enum LogValue {
    Int(i64),
    Double(f64),
    Bool(bool),
    Str(String),
    StringList(Vec<String>),
    Enum(String),
    None,
}

impl LogValue {
    fn format(&self) -> String {
        match self {
            LogValue::Int(v) => v.to_string(),
            LogValue::Double(v) => v.to_string(),
            LogValue::Bool(v) => v.to_string(),
            LogValue::Str(v) => format!("\"{v}\""),
            LogValue::StringList(items) => format!("{{{}}}", items.iter().map(|s| format!("\"{s}\"")).collect::<Vec<_>>().join(", ")),
            LogValue::Enum(v) => v.clone(),
            LogValue::None => "undefined".to_string(),
        }
    }

    /// §4.K merge rules by declared argument type.
    fn merge(&self, other: &LogValue) -> LogValue {
        match (self, other) {
            (LogValue::Int(a), LogValue::Int(b)) => LogValue::Int(a + b),
            (LogValue::Str(a), LogValue::Str(b)) => LogValue::Str(format!("{a}{b}")),
            (LogValue::StringList(a), LogValue::StringList(b)) => {
                let mut out = a.clone();
                for item in b {
                    if !out.contains(item) {
                        out.push(item.clone());
                    }
                }
                LogValue::StringList(out)
            }
            _ => other.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CallRecord {
    /// `"ClassName::method"` as logged; `create_script` rewrites this.
    pub name: String,
    pub args: Vec<(String, LogValue)>,
    pub ret: Option<(String, LogValue)>,
    /// True when this call should be rendered as a property assignment
    /// (`receiver.prop = value;`) rather than a method call in synthesized
    /// scripts.
    pub is_property: bool,
}

struct Inner {
    records: Vec<CallRecord>,
    ret_counter: u32,
}

/// Per-call-call-tree nesting tracker: only depth-1 (outermost) calls are
/// recorded, mirroring `LoggerObject`'s static `m_canLog`/`m_firstLogger`.
pub struct History {
    inner: Mutex<Inner>,
    depth: AtomicU32,
    muted: AtomicBool,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        Self { inner: Mutex::new(Inner { records: Vec::new(), ret_counter: 0 }), depth: AtomicU32::new(0), muted: AtomicBool::new(false) }
    }

    pub fn records(&self) -> Vec<CallRecord> {
        self.inner.lock().unwrap().records.clone()
    }

    /// Enters a logged call. Holds the returned guard for the call's
    /// duration; nested `enter()` calls increment depth without recording.
    pub fn enter(&self) -> CallScope<'_> {
        self.depth.fetch_add(1, Ordering::SeqCst);
        CallScope { history: self }
    }

    fn is_outermost(&self) -> bool {
        self.depth.load(Ordering::SeqCst) == 1
    }

    /// Records a call. No-op when not the outermost call on the stack, or
    /// while a [`LoggerDisabler`] is active.
    pub fn log(&self, name: impl Into<String>, args: Vec<(&str, LogValue)>, ret: Option<LogValue>, merge: bool, is_property: bool) {
        if self.muted.load(Ordering::SeqCst) || !self.is_outermost() {
            return;
        }
        let name = name.into();
        let args: Vec<(String, LogValue)> = args.into_iter().map(|(n, v)| (n.to_string(), v)).collect();
        let mut inner = self.inner.lock().unwrap();
        if merge {
            if let Some(last) = inner.records.last_mut() {
                if last.name == name {
                    for ((_, existing), (_, incoming)) in last.args.iter_mut().zip(args.iter()) {
                        *existing = existing.merge(incoming);
                    }
                    if let (Some((_, existing_ret)), Some(incoming_ret)) = (&mut last.ret, &ret) {
                        *existing_ret = existing_ret.merge(incoming_ret);
                    }
                    tracing::trace!(target: "history", name = %name, "merged into previous record");
                    return;
                }
            }
        }
        let ret_binding = ret.map(|v| {
            inner.ret_counter += 1;
            (format!("ret{}", inner.ret_counter), v)
        });
        tracing::debug!(target: "history", name = %name, "recorded call");
        inner.records.push(CallRecord { name, args, ret: ret_binding, is_property });
    }

    /// §4.K `create_script(start, end)`.
    pub fn create_script(&self, start: usize, end: usize) -> String {
        let records = self.inner.lock().unwrap().records.clone();
        let end = end.min(records.len());
        let mut out = String::new();
        let mut document_bound = false;
        let mut bindings: Vec<(LogValue, String)> = Vec::new();
        for rec in &records[start.min(end)..end] {
            let (class, method) = split_class_method(&rec.name);
            let receiver = if class.eq_ignore_ascii_case("document") {
                if !document_bound {
                    out.push_str("var document = Project.currentDocument;\n");
                    document_bound = true;
                }
                "document".to_string()
            } else {
                lowercase_first(&class)
            };
            let rendered_args: Vec<String> = rec
                .args
                .iter()
                .map(|(_, v)| bindings.iter().find(|(bv, _)| bv == v).map(|(_, n)| n.clone()).unwrap_or_else(|| v.format()))
                .collect();
            let call = if rec.is_property && rendered_args.len() == 1 {
                format!("{receiver}.{method} = {};", rendered_args[0])
            } else {
                format!("{receiver}.{method}({});", rendered_args.join(", "))
            };
            if let Some((ret_name, ret_val)) = &rec.ret {
                out.push_str(&format!("var {ret_name} = {}\n", call.trim_end_matches(';').to_string() + ";"));
                bindings.push((ret_val.clone(), ret_name.clone()));
            } else {
                out.push_str(&call);
                out.push('\n');
            }
        }
        out
    }
}

fn split_class_method(name: &str) -> (String, String) {
    match name.split_once("::") {
        Some((class, method)) => (class.to_string(), method.to_string()),
        None => (String::new(), name.to_string()),
    }
}

fn lowercase_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_lowercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

pub struct CallScope<'a> {
    history: &'a History,
}

impl Drop for CallScope<'_> {
    fn drop(&mut self) {
        self.history.depth.fetch_sub(1, Ordering::SeqCst);
    }
}

/// RAII guard suppressing all logging for its lifetime, including nested
/// outermost calls — used around bulk/test operations that should not
/// pollute history (`LoggerDisabler` in the original implementation).
pub struct LoggerDisabler<'a> {
    history: &'a History,
}

impl<'a> LoggerDisabler<'a> {
    pub fn new(history: &'a History) -> Self {
        history.muted.store(true, Ordering::SeqCst);
        Self { history }
    }
}

impl Drop for LoggerDisabler<'_> {
    fn drop(&mut self) {
        self.history.muted.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_calls_log_only_the_outermost() {
        let history = History::new();
        {
            let _outer = history.enter();
            history.log("Document::insertInclude", vec![("name", LogValue::Str("a.h".into()))], None, false, false);
            {
                let _inner = history.enter();
                history.log("TextDocument::insert", vec![], None, false, false);
            }
        }
        assert_eq!(history.records().len(), 1);
        assert_eq!(history.records()[0].name, "Document::insertInclude");
    }

    #[test]
    fn merge_sums_ints_and_concatenates_strings() {
        let history = History::new();
        for n in [1, 2, 3] {
            let _s = history.enter();
            history.log("Document::moveCursor", vec![("count", LogValue::Int(n))], None, true, false);
        }
        let recs = history.records();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].args[0].1, LogValue::Int(6));
    }

    #[test]
    fn logger_disabler_suppresses_nested_logging() {
        let history = History::new();
        {
            let _mute = LoggerDisabler::new(&history);
            let _scope = history.enter();
            history.log("Document::save", vec![], None, false, false);
        }
        assert!(history.records().is_empty());
    }

    #[test]
    fn create_script_binds_document_once_and_reuses_returns() {
        let history = History::new();
        {
            let _s = history.enter();
            history.log("Document::insertInclude", vec![("name", LogValue::Str("a.h".into()))], None, false, false);
        }
        {
            let _s = history.enter();
            history.log("Document::text", vec![], Some(LogValue::Str("hello".into())), false, false);
        }
        let script = history.create_script(0, 2);
        assert!(script.contains("var document = Project.currentDocument;"));
        assert!(script.contains("document.insertInclude(\"a.h\");"));
        assert!(script.contains("var ret1 = document.text();"));
    }
}
