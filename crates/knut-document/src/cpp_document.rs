//! `CppDocument` (§4.H): the C++-refactoring surface a script actually
//! calls — include manipulation, member/method insertion, method deletion,
//! base-class rename, MFC DDX/`MESSAGE_MAP` extraction, comment-section
//! toggling, and block navigation. Every mutating method is a thin wrapper
//! that runs the corresponding `knut_refactor` function through
//! [`CodeDocument::edit`], so the §5 ordering guarantee and the undo/history
//! bookkeeping apply uniformly without each operation having to know about
//! either.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

use knut_history::LogValue;
use knut_refactor::{
    add_member_declaration, add_method_definition, change_base_class_in_header, change_base_class_in_source, delete_method, extract_ddx,
    extract_message_maps, go_to_block_end, go_to_block_start, insert_include, parse_includes, remove_include, rewrite_constructor_initializers,
    select_block_end, select_block_start, select_block_up, toggle_section, Access, DdxEntry, IncludeLine, IncludeScope, MessageMapEntry,
    ToggleSection, MESSAGE_MAP_QUERY,
};
use knut_syntax::symbol::extract_symbols;
use knut_syntax::tree::SourceLanguage;
use tree_sitter::Query;

use crate::code_document::CodeDocument;
use crate::document::Document;
use crate::error::DocumentError;

/// Matches free functions, methods and constructors/destructors — enough to
/// drive `delete_method`'s name+signature lookup.
const CPP_SYMBOL_QUERY: &str = r#"
(function_definition declarator: (function_declarator declarator: (identifier) @name)) @definition
(function_definition declarator: (function_declarator declarator: (field_identifier) @name)) @definition
(function_definition declarator: (function_declarator declarator: (qualified_identifier name: (identifier) @name))) @definition
(function_definition declarator: (function_declarator declarator: (destructor_name) @name)) @definition
"#;

pub struct CppDocument {
    code: CodeDocument,
}

impl Deref for CppDocument {
    type Target = CodeDocument;
    fn deref(&self) -> &CodeDocument {
        &self.code
    }
}

impl DerefMut for CppDocument {
    fn deref_mut(&mut self) -> &mut CodeDocument {
        &mut self.code
    }
}

impl CppDocument {
    pub fn new(document: Document) -> Self {
        Self { code: CodeDocument::new(document, SourceLanguage::Cpp) }
    }

    pub fn from_code_document(code: CodeDocument) -> Self {
        Self { code }
    }

    fn symbol_query(&self) -> Query {
        Query::new(&SourceLanguage::Cpp.grammar(), CPP_SYMBOL_QUERY).expect("CPP_SYMBOL_QUERY is valid tree-sitter query syntax")
    }

    /// §4.H "Insert include".
    pub fn insert_include(&mut self, name: &str, scope: IncludeScope, new_group: bool) {
        self.code.edit(
            "CppDocument::insertInclude",
            vec![("name", LogValue::Str(name.to_string())), ("newGroup", LogValue::Bool(new_group))],
            false,
            |buffer| insert_include(buffer, name, scope, new_group),
        );
    }

    /// §4.H "Remove include".
    pub fn remove_include(&mut self, name: &str, scope: IncludeScope) -> Result<(), DocumentError> {
        self.code.edit("CppDocument::removeInclude", vec![("name", LogValue::Str(name.to_string()))], false, |buffer| {
            remove_include(buffer, name, scope)
        })?;
        Ok(())
    }

    /// Read-only: the currently parsed `#include` lines, in source order.
    pub fn includes(&self) -> Vec<IncludeLine> {
        parse_includes(self.code.buffer())
    }

    /// §4.H "Delete method". Returns the number of bytes removed.
    pub fn delete_method(&mut self, name: &str, signature: Option<&str>) -> usize {
        let query = self.symbol_query();
        let symbols = extract_symbols(self.code.tree(), &query);
        self.code.edit("CppDocument::deleteMethod", vec![("name", LogValue::Str(name.to_string()))], false, |buffer| {
            delete_method(buffer, &symbols, name, signature)
        })
    }

    /// §4.H "Add member declaration".
    pub fn add_member_declaration(&mut self, class_name: &str, access: Access, member: &str) -> Result<(), DocumentError> {
        self.code.edit(
            "CppDocument::addMemberDeclaration",
            vec![("className", LogValue::Str(class_name.to_string())), ("member", LogValue::Str(member.to_string()))],
            false,
            |buffer| add_member_declaration(buffer, class_name, access, member),
        )?;
        Ok(())
    }

    /// §4.H "Add method definition".
    pub fn add_method_definition(&mut self, class_name: &str, signature: &str, body: &str) -> Result<(), DocumentError> {
        self.code.edit(
            "CppDocument::addMethodDefinition",
            vec![("className", LogValue::Str(class_name.to_string())), ("signature", LogValue::Str(signature.to_string()))],
            false,
            |buffer| add_method_definition(buffer, class_name, signature, body),
        )?;
        Ok(())
    }

    /// §4.H "Change base class" (header side: class declaration + method
    /// declarations).
    pub fn change_base_class_in_header(&mut self, class_name: &str, old_base: &str, new_base: &str) -> Result<(), DocumentError> {
        self.code.edit(
            "CppDocument::changeBaseClass",
            vec![("oldBase", LogValue::Str(old_base.to_string())), ("newBase", LogValue::Str(new_base.to_string()))],
            false,
            |buffer| change_base_class_in_header(buffer, class_name, old_base, new_base),
        )?;
        Ok(())
    }

    /// §4.H "Change base class" (source side: constructor initializer
    /// lists and qualified method definitions).
    pub fn change_base_class_in_source(&mut self, old_base: &str, new_base: &str) -> Result<(), DocumentError> {
        self.code.edit(
            "CppDocument::changeBaseClass",
            vec![("oldBase", LogValue::Str(old_base.to_string())), ("newBase", LogValue::Str(new_base.to_string()))],
            false,
            |buffer| change_base_class_in_source(buffer, old_base, new_base),
        )?;
        Ok(())
    }

    pub fn rewrite_constructor_initializers(&mut self, class_name: &str, old_base: &str, new_base: &str) -> Result<(), DocumentError> {
        self.code.edit(
            "CppDocument::rewriteConstructorInitializers",
            vec![("className", LogValue::Str(class_name.to_string()))],
            false,
            |buffer| rewrite_constructor_initializers(buffer, class_name, old_base, new_base),
        )?;
        Ok(())
    }

    /// §4.H "Toggle comment section" at the function enclosing `offset`.
    pub fn toggle_section(&mut self, offset: usize, opts: &ToggleSection<'_>) -> Result<(), DocumentError> {
        self.code.edit("CppDocument::toggleSection", vec![("offset", LogValue::Int(offset as i64))], false, |buffer| {
            toggle_section(buffer, offset, opts)
        })?;
        Ok(())
    }

    /// Read-only: DDX/DDV calls inside `DoDataExchange`.
    pub fn extract_ddx(&self) -> Vec<DdxEntry> {
        self.code.record_call("CppDocument::extractDdx", vec![], None);
        extract_ddx(self.code.buffer().text())
    }

    /// Read-only: `MESSAGE_MAP` macro-call sequences.
    pub fn extract_message_maps(&self) -> Vec<MessageMapEntry> {
        self.code.record_call("CppDocument::extractMessageMaps", vec![], None);
        let query = Query::new(&SourceLanguage::Cpp.grammar(), MESSAGE_MAP_QUERY).expect("MESSAGE_MAP_QUERY is valid tree-sitter query syntax");
        extract_message_maps(self.code.buffer().text(), &query)
    }

    /// §4.H block navigation: returns the byte offset of the enclosing
    /// block's opening bracket.
    pub fn go_to_block_start(&self, offset: usize) -> Option<usize> {
        go_to_block_start(self.code.buffer().text(), offset)
    }

    pub fn go_to_block_end(&self, offset: usize) -> Option<usize> {
        go_to_block_end(self.code.buffer().text(), offset)
    }

    pub fn select_block_up(&self, offset: usize) -> Option<(usize, usize)> {
        select_block_up(self.code.buffer().text(), offset)
    }

    pub fn select_block_start(&self, offset: usize) -> Option<(usize, usize)> {
        select_block_start(self.code.buffer().text(), offset)
    }

    pub fn select_block_end(&self, offset: usize) -> Option<(usize, usize)> {
        select_block_end(self.code.buffer().text(), offset)
    }

    /// A convenience `ToggleSection` builder around the standard
    /// `#ifdef TAG` comment-toggle shape — `return_values` is empty, so
    /// every function falls back to `default_return_for` in `knut_refactor`.
    pub fn default_toggle_section<'a>(tag: &'a str, debug_format: &'a str, return_values: &'a HashMap<String, String>) -> ToggleSection<'a> {
        ToggleSection { tag, debug_format, return_values }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;

    fn write_temp(contents: &[u8]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("widget.cpp");
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(contents).unwrap();
        (dir, path)
    }

    #[test]
    fn insert_and_remove_include_round_trip() {
        let (_dir, path) = write_temp(b"#include <string>\n\nint main() {}\n");
        let doc = Document::load(&path).unwrap();
        let mut cpp = CppDocument::new(doc);
        cpp.insert_include("vector", IncludeScope::Angle, false);
        assert!(cpp.buffer().text().contains("#include <vector>"));
        cpp.remove_include("vector", IncludeScope::Angle).unwrap();
        assert!(!cpp.buffer().text().contains("#include <vector>"));
        assert_eq!(cpp.undo_depth(), 2);
    }

    #[test]
    fn delete_method_removes_function_and_bumps_revision() {
        let (_dir, path) = write_temp(b"void paint() {}\nvoid resize() {}\n");
        let doc = Document::load(&path).unwrap();
        let mut cpp = CppDocument::new(doc);
        let removed = cpp.delete_method("paint", None);
        assert!(removed > 0);
        assert!(!cpp.buffer().text().contains("paint"));
        assert_eq!(cpp.revision(), 1);
    }

    #[test]
    fn block_navigation_is_read_only_and_does_not_touch_undo() {
        let (_dir, path) = write_temp(b"void f() { int x; }\n");
        let doc = Document::load(&path).unwrap();
        let cpp = CppDocument::new(doc);
        let start = cpp.go_to_block_start(14).unwrap();
        assert_eq!(cpp.buffer().text().as_bytes()[start] as char, '{');
    }
}
