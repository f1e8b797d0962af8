//! `UiDocument` (§4.G): a [`TextDocument`] over a Qt Designer `.ui` XML file.
//! Parsing is on demand rather than cached, since `roxmltree::Document`
//! borrows from the source text it parses and this document's text can
//! change underneath it on every edit — the same tradeoff `RcDocument`
//! avoids by eagerly owning its parsed model, made the other way here
//! because nothing in this engine mutates `.ui` structure the way it
//! mutates C++ or `.rc` source.

use std::ops::{Deref, DerefMut};

use crate::document::Document;
use crate::error::DocumentError;
use crate::text_document::TextDocument;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiWidget {
    pub class: String,
    pub name: String,
    pub children: Vec<UiWidget>,
}

pub struct UiDocument {
    text: TextDocument,
}

impl Deref for UiDocument {
    type Target = TextDocument;
    fn deref(&self) -> &TextDocument {
        &self.text
    }
}

impl DerefMut for UiDocument {
    fn deref_mut(&mut self) -> &mut TextDocument {
        &mut self.text
    }
}

impl UiDocument {
    pub fn new(document: Document) -> Self {
        Self { text: TextDocument::new(document) }
    }

    fn parse(&self) -> Result<roxmltree::Document<'_>, DocumentError> {
        roxmltree::Document::parse(self.text.buffer().text())
            .map_err(|source| DocumentError::XmlParse { path: self.text.path.clone(), source })
    }

    /// The root `<widget>` element's class/name/children, the Qt Designer
    /// equivalent of an RC dialog's control tree.
    pub fn root_widget(&self) -> Result<UiWidget, DocumentError> {
        let doc = self.parse()?;
        let root = find_widget_node(doc.root_element()).ok_or_else(|| DocumentError::PointerNotFound("root widget".to_string()))?;
        Ok(widget_from_node(root))
    }

    /// Depth-first search for a `<widget name="...">` by name.
    pub fn find_widget(&self, name: &str) -> Result<Option<UiWidget>, DocumentError> {
        let doc = self.parse()?;
        Ok(doc
            .descendants()
            .filter(|n| n.has_tag_name("widget"))
            .find(|n| n.attribute("name") == Some(name))
            .map(widget_from_node))
    }
}

fn find_widget_node(node: roxmltree::Node<'_, '_>) -> Option<roxmltree::Node<'_, '_>> {
    if node.has_tag_name("widget") {
        return Some(node);
    }
    node.children().find_map(find_widget_node)
}

fn widget_from_node(node: roxmltree::Node<'_, '_>) -> UiWidget {
    let class = node.attribute("class").unwrap_or_default().to_string();
    let name = node.attribute("name").unwrap_or_default().to_string();
    let children = node.children().filter(|n| n.has_tag_name("widget")).map(widget_from_node).collect();
    UiWidget { class, name, children }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;

    fn write_temp(contents: &[u8]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("form.ui");
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(contents).unwrap();
        (dir, path)
    }

    const SAMPLE: &[u8] = br#"<ui version="4.0">
 <widget class="QDialog" name="AboutDialog">
  <widget class="QPushButton" name="okButton"/>
 </widget>
</ui>"#;

    #[test]
    fn root_widget_reports_class_and_child() {
        let (_dir, path) = write_temp(SAMPLE);
        let doc = Document::load(&path).unwrap();
        let ui = UiDocument::new(doc);
        let root = ui.root_widget().unwrap();
        assert_eq!(root.class, "QDialog");
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].name, "okButton");
    }

    #[test]
    fn find_widget_locates_nested_element() {
        let (_dir, path) = write_temp(SAMPLE);
        let doc = Document::load(&path).unwrap();
        let ui = UiDocument::new(doc);
        let found = ui.find_widget("okButton").unwrap().unwrap();
        assert_eq!(found.class, "QPushButton");
        assert!(ui.find_widget("missing").unwrap().is_none());
    }
}
