//! `QtTsDocument` (§4.G): a [`TextDocument`] over a Qt Linguist `.ts`
//! translation-source XML file — read-only context/message access, parsed
//! on demand the same way [`crate::ui_document::UiDocument`] is.

use std::ops::{Deref, DerefMut};

use crate::document::Document;
use crate::error::DocumentError;
use crate::text_document::TextDocument;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsMessage {
    pub source: String,
    pub translation: String,
    pub unfinished: bool,
}

pub struct QtTsDocument {
    text: TextDocument,
}

impl Deref for QtTsDocument {
    type Target = TextDocument;
    fn deref(&self) -> &TextDocument {
        &self.text
    }
}

impl DerefMut for QtTsDocument {
    fn deref_mut(&mut self) -> &mut TextDocument {
        &mut self.text
    }
}

impl QtTsDocument {
    pub fn new(document: Document) -> Self {
        Self { text: TextDocument::new(document) }
    }

    fn parse(&self) -> Result<roxmltree::Document<'_>, DocumentError> {
        roxmltree::Document::parse(self.text.buffer().text())
            .map_err(|source| DocumentError::XmlParse { path: self.text.path.clone(), source })
    }

    pub fn context_names(&self) -> Result<Vec<String>, DocumentError> {
        let doc = self.parse()?;
        Ok(doc
            .descendants()
            .filter(|n| n.has_tag_name("context"))
            .filter_map(|n| n.children().find(|c| c.has_tag_name("name")))
            .filter_map(|n| n.text().map(str::to_string))
            .collect())
    }

    pub fn messages(&self, context: &str) -> Result<Vec<TsMessage>, DocumentError> {
        let doc = self.parse()?;
        let Some(ctx) = doc.descendants().filter(|n| n.has_tag_name("context")).find(|n| {
            n.children().find(|c| c.has_tag_name("name")).and_then(|c| c.text()) == Some(context)
        }) else {
            return Ok(Vec::new());
        };
        Ok(ctx
            .children()
            .filter(|n| n.has_tag_name("message"))
            .map(|msg| {
                let source = msg.children().find(|c| c.has_tag_name("source")).and_then(|c| c.text()).unwrap_or_default().to_string();
                let translation_node = msg.children().find(|c| c.has_tag_name("translation"));
                let translation = translation_node.and_then(|c| c.text()).unwrap_or_default().to_string();
                let unfinished = translation_node.and_then(|c| c.attribute("type")) == Some("unfinished");
                TsMessage { source, translation, unfinished }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;

    fn write_temp(contents: &[u8]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.ts");
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(contents).unwrap();
        (dir, path)
    }

    const SAMPLE: &[u8] = br#"<TS version="2.1">
 <context>
  <name>MainWindow</name>
  <message>
   <source>Open</source>
   <translation type="unfinished"></translation>
  </message>
  <message>
   <source>Close</source>
   <translation>Fermer</translation>
  </message>
 </context>
</TS>"#;

    #[test]
    fn lists_contexts_and_messages() {
        let (_dir, path) = write_temp(SAMPLE);
        let doc = Document::load(&path).unwrap();
        let ts = QtTsDocument::new(doc);
        assert_eq!(ts.context_names().unwrap(), vec!["MainWindow".to_string()]);
        let messages = ts.messages("MainWindow").unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].unfinished);
        assert_eq!(messages[1].translation, "Fermer");
    }
}
