//! The RC data model produced by the parser (§4.B "Data model produced").

use std::collections::BTreeMap;

pub const DEFAULT_LANGUAGE: &str = "[default]";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub file: String,
    pub line: usize,
    pub exists: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StringEntry {
    pub line: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AcceleratorEntry {
    pub id: String,
    pub shortcut: String,
    pub line: usize,
}

impl AcceleratorEntry {
    /// `is_unknown()` holds if shortcut contains `VK_`.
    pub fn is_unknown(&self) -> bool {
        self.shortcut.contains("VK_")
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MenuItem {
    pub id: String,
    pub text: String,
    pub shortcut: String,
    pub flags: Vec<String>,
    pub children: Vec<MenuItem>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ToolBar {
    pub id: String,
    pub width: i32,
    pub height: i32,
    pub children: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Control {
    pub control_type: String,
    pub text: String,
    pub id: String,
    pub class_name: String,
    pub geometry: Geometry,
    pub styles: Vec<String>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dialog {
    pub id: String,
    pub geometry: Geometry,
    pub caption: String,
    pub menu: String,
    pub styles: Vec<String>,
    pub controls: Vec<Control>,
    pub line: usize,
}

/// Per-`LANGUAGE` id contents (§4.B).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RcData {
    pub includes: Vec<String>,
    pub icons: BTreeMap<String, Asset>,
    pub assets: BTreeMap<String, Asset>,
    pub strings: BTreeMap<String, StringEntry>,
    pub accelerator_tables: Vec<Vec<AcceleratorEntry>>,
    pub menus: Vec<MenuItem>,
    pub toolbars: Vec<ToolBar>,
    pub dialogs: Vec<Dialog>,
    /// Set iff parsing reached EOF without a fatal tokenization error.
    pub is_valid: bool,
}

/// `RcFile`: a mapping `language -> RcData`, a `current_language`.
#[derive(Debug, Clone, Default)]
pub struct RcFile {
    pub languages: BTreeMap<String, RcData>,
    pub current_language: String,
}

impl RcFile {
    pub fn new() -> Self {
        let mut languages = BTreeMap::new();
        languages.insert(DEFAULT_LANGUAGE.to_string(), RcData::default());
        Self { languages, current_language: DEFAULT_LANGUAGE.to_string() }
    }

    pub fn current(&self) -> &RcData {
        self.languages.get(&self.current_language).expect("current_language always has an entry")
    }

    pub fn current_mut(&mut self) -> &mut RcData {
        self.languages.entry(self.current_language.clone()).or_default()
    }

    pub fn set_language(&mut self, language: &str) {
        self.current_language = language.to_string();
        self.languages.entry(language.to_string()).or_default();
    }

    pub fn languages_list(&self) -> Vec<String> {
        self.languages.keys().cloned().collect()
    }

    /// Merges every other language's data into `current_language`, later
    /// language ids losing to entries already present.
    pub fn merge_all_languages(&mut self) {
        let target_lang = self.current_language.clone();
        let others: Vec<String> = self.languages.keys().filter(|k| **k != target_lang).cloned().collect();
        for lang in others {
            if let Some(data) = self.languages.get(&lang).cloned() {
                self.merge_into_current(&data);
            }
        }
    }

    pub fn merge_languages(&mut self, from: &str) {
        if let Some(data) = self.languages.get(from).cloned() {
            self.merge_into_current(&data);
        }
    }

    fn merge_into_current(&mut self, data: &RcData) {
        let target = self.current_mut();
        for inc in &data.includes {
            if !target.includes.contains(inc) {
                target.includes.push(inc.clone());
            }
        }
        for (k, v) in &data.strings {
            target.strings.entry(k.clone()).or_insert_with(|| v.clone());
        }
        for (k, v) in &data.assets {
            target.assets.entry(k.clone()).or_insert_with(|| v.clone());
        }
        for (k, v) in &data.icons {
            target.icons.entry(k.clone()).or_insert_with(|| v.clone());
        }
        if target.dialogs.is_empty() {
            target.dialogs = data.dialogs.clone();
        }
        if target.menus.is_empty() {
            target.menus = data.menus.clone();
        }
        if target.toolbars.is_empty() {
            target.toolbars = data.toolbars.clone();
        }
    }
}
