//! Recursive-descent RC parser (§4.B) consuming the flat [`crate::lexer::Spanned`]
//! stream and populating an [`crate::model::RcFile`].
//!
//! Unrecognized top-level statements are skipped up to the next `BEGIN`/`END`
//! block (if the statement opens one) or to the next statement boundary,
//! rather than aborting the parse.

use crate::lexer::{Spanned, Token};
use crate::model::{AcceleratorEntry, Asset, Control, Dialog, Geometry, MenuItem, RcData, RcFile, StringEntry, ToolBar};

pub struct Parser<'a> {
    toks: &'a [Spanned],
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(toks: &'a [Spanned]) -> Self {
        Self { toks, pos: 0 }
    }

    pub fn parse(toks: &'a [Spanned]) -> RcFile {
        let mut parser = Parser::new(toks);
        let mut file = RcFile::new();
        parser.parse_into(file.current_mut());
        file.current_mut().is_valid = true;
        file
    }

    fn parse_into(&mut self, data: &mut RcData) {
        while !self.at_eof() {
            if !self.parse_top_level_statement(data) {
                self.skip_unknown_statement();
            }
        }
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek_token(), Token::Eof)
    }

    fn peek_token(&self) -> &Token {
        self.toks.get(self.pos).map(|s| &s.token).unwrap_or(&Token::Eof)
    }

    fn peek_line(&self) -> usize {
        self.toks.get(self.pos).map(|s| s.line).unwrap_or(0)
    }

    fn bump(&mut self) -> Token {
        let t = self.toks.get(self.pos).map(|s| s.token.clone()).unwrap_or(Token::Eof);
        if !self.at_eof() {
            self.pos += 1;
        }
        t
    }

    fn is_keyword(&self, kw: &str) -> bool {
        matches!(self.peek_token(), Token::Keyword(k) if k == kw)
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        if self.is_keyword(kw) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn eat_operator(&mut self, op: char) -> bool {
        if matches!(self.peek_token(), Token::Operator(c) if *c == op) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn word(&mut self) -> Option<String> {
        match self.peek_token().clone() {
            Token::Word(w) => {
                self.bump();
                Some(w)
            }
            Token::Keyword(w) => {
                self.bump();
                Some(w)
            }
            _ => None,
        }
    }

    fn string_lit(&mut self) -> Option<String> {
        match self.peek_token().clone() {
            Token::String(s) => {
                self.bump();
                Some(s)
            }
            _ => None,
        }
    }

    fn integer(&mut self) -> Option<i64> {
        match self.peek_token().clone() {
            Token::Integer(v) => {
                self.bump();
                Some(v)
            }
            _ => None,
        }
    }

    /// A resource identifier: a bare word or an integer literal.
    fn resource_id(&mut self) -> Option<String> {
        if let Some(w) = self.word() {
            return Some(w);
        }
        self.integer().map(|v| v.to_string())
    }

    fn parse_top_level_statement(&mut self, data: &mut RcData) -> bool {
        if let Token::Directive(text) = self.peek_token().clone() {
            self.bump();
            self.parse_directive(&text, data);
            return true;
        }

        // Resource statements are `ID KEYWORD ...`.
        let checkpoint = self.pos;
        let Some(id) = self.resource_id() else {
            return false;
        };
        let line = self.peek_line();

        if self.eat_keyword("ICON") || self.eat_keyword("CURSOR") {
            if let Some(file) = self.string_lit() {
                data.icons.insert(id, Asset { file, line, exists: true });
                return true;
            }
        } else if self.eat_keyword("BITMAP") {
            if let Some(file) = self.string_lit() {
                data.assets.insert(id, Asset { file, line, exists: true });
                return true;
            }
        } else if self.eat_keyword("ACCELERATORS") {
            data.accelerator_tables.push(self.parse_accelerators());
            return true;
        } else if self.eat_keyword("MENU") || self.eat_keyword("MENUEX") {
            self.skip_discardable_params();
            if self.eat_keyword("BEGIN") {
                let children = self.parse_menu_items();
                data.menus.push(MenuItem { id, children, ..Default::default() });
            }
            return true;
        } else if self.eat_keyword("TOOLBAR") || self.eat_keyword("TOOLBARNEW") {
            let width = self.integer().unwrap_or(0) as i32;
            self.eat_operator(',');
            let height = self.integer().unwrap_or(0) as i32;
            let mut children = Vec::new();
            if self.eat_keyword("BEGIN") {
                while !self.is_keyword("END") && !self.at_eof() {
                    if let Some(w) = self.word() {
                        if w.eq_ignore_ascii_case("BUTTON") {
                            if let Some(btn_id) = self.resource_id() {
                                children.push(btn_id);
                            }
                            continue;
                        }
                        children.push(w);
                    } else {
                        self.bump();
                    }
                }
                self.eat_keyword("END");
            }
            data.toolbars.push(ToolBar { id, width, height, children });
            return true;
        } else if self.eat_keyword("STRINGTABLE") {
            self.skip_discardable_params();
            if self.eat_keyword("BEGIN") {
                while !self.is_keyword("END") && !self.at_eof() {
                    let Some(sid) = self.resource_id() else {
                        self.bump();
                        continue;
                    };
                    let sline = self.peek_line();
                    if let Some(text) = self.string_lit() {
                        data.strings.insert(sid, StringEntry { line: sline, text });
                    }
                }
                self.eat_keyword("END");
            }
            return true;
        } else if self.eat_keyword("DIALOG") || self.eat_keyword("DIALOGEX") {
            data.dialogs.push(self.parse_dialog(id, line));
            return true;
        }

        self.pos = checkpoint;
        false
    }

    fn parse_directive(&mut self, text: &str, data: &mut RcData) {
        let text = text.trim();
        if let Some(rest) = text.strip_prefix("include") {
            let rest = rest.trim();
            if let Some(inner) = rest.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
                data.includes.push(inner.to_string());
            } else if let Some(inner) = rest.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
                data.includes.push(inner.to_string());
            }
        }
    }

    /// Consumes trailing geometry/style params on statements we don't model
    /// in detail (MENU/MENUEX param lists before `BEGIN`, STRINGTABLE's rare
    /// language overrides), up to `BEGIN` or end of statement.
    fn skip_discardable_params(&mut self) {
        while !self.is_keyword("BEGIN") && !self.at_eof() {
            match self.peek_token() {
                Token::Keyword(k) if k != "BEGIN" && matches!(k.as_str(), "STYLE" | "CAPTION" | "FONT" | "EXSTYLE" | "CLASS") => {
                    self.bump();
                    self.skip_to_next_line_or_keyword();
                }
                _ => break,
            }
        }
    }

    fn skip_to_next_line_or_keyword(&mut self) {
        let start_line = if self.pos > 0 { self.toks[self.pos - 1].line } else { 0 };
        while !self.at_eof() && self.peek_line() == start_line {
            self.bump();
        }
    }

    fn parse_accelerators(&mut self) -> Vec<AcceleratorEntry> {
        let mut entries = Vec::new();
        if !self.eat_keyword("BEGIN") {
            return entries;
        }
        while !self.is_keyword("END") && !self.at_eof() {
            let line = self.peek_line();
            let event = self.string_lit().or_else(|| self.integer().map(|v| v.to_string())).unwrap_or_default();
            self.eat_operator(',');
            let id = self.resource_id().unwrap_or_default();
            let mut flags = Vec::new();
            while self.eat_operator(',') {
                if let Some(f) = self.word() {
                    flags.push(f);
                } else if self.integer().is_some() {
                    // numeric flag, ignored for shortcut text
                } else {
                    break;
                }
            }
            let shortcut = if flags.is_empty() { event } else { format!("{event}+{}", flags.join("+")) };
            entries.push(AcceleratorEntry { id, shortcut, line });
        }
        self.eat_keyword("END");
        entries
    }

    fn parse_menu_items(&mut self) -> Vec<MenuItem> {
        let mut items = Vec::new();
        while !self.is_keyword("END") && !self.at_eof() {
            if self.eat_keyword("POPUP") {
                let text = self.string_lit().unwrap_or_default();
                self.skip_discardable_params();
                let children = if self.eat_keyword("BEGIN") { self.parse_menu_items() } else { Vec::new() };
                items.push(MenuItem { text, children, ..Default::default() });
            } else if self.eat_keyword("MENUITEM") {
                if self.eat_keyword("SEPARATOR") {
                    items.push(MenuItem { text: String::new(), flags: vec!["SEPARATOR".to_string()], ..Default::default() });
                    continue;
                }
                let text = self.string_lit().unwrap_or_default();
                self.eat_operator(',');
                let id = self.resource_id().unwrap_or_default();
                let mut flags = Vec::new();
                while self.eat_operator(',') {
                    if let Some(f) = self.word() {
                        flags.push(f);
                    } else {
                        break;
                    }
                }
                let (label, shortcut) = split_menu_shortcut(&text);
                items.push(MenuItem { id, text: label, shortcut, flags, children: Vec::new() });
            } else {
                self.bump();
            }
        }
        self.eat_keyword("END");
        items
    }

    fn parse_dialog(&mut self, id: String, line: usize) -> Dialog {
        let geometry = self.parse_geometry();
        let mut dialog = Dialog { id, geometry, line, ..Default::default() };
        loop {
            if self.eat_keyword("CAPTION") {
                dialog.caption = self.string_lit().unwrap_or_default();
            } else if self.eat_keyword("STYLE") || self.eat_keyword("EXSTYLE") {
                dialog.styles.extend(self.parse_style_flags());
            } else if self.eat_keyword("MENU") {
                dialog.menu = self.resource_id().unwrap_or_default();
            } else if self.eat_keyword("FONT") {
                self.skip_to_next_line_or_keyword();
            } else if self.eat_keyword("CLASS") {
                let _ = self.resource_id();
            } else if self.is_keyword("BEGIN") {
                break;
            } else if self.at_eof() {
                return dialog;
            } else {
                self.bump();
            }
        }
        self.eat_keyword("BEGIN");
        while !self.is_keyword("END") && !self.at_eof() {
            dialog.controls.push(self.parse_control());
        }
        self.eat_keyword("END");
        dialog
    }

    fn parse_geometry(&mut self) -> Geometry {
        let x = self.integer().unwrap_or(0) as i32;
        self.eat_operator(',');
        let y = self.integer().unwrap_or(0) as i32;
        self.eat_operator(',');
        let w = self.integer().unwrap_or(0) as i32;
        self.eat_operator(',');
        let h = self.integer().unwrap_or(0) as i32;
        Geometry { x, y, w, h }
    }

    fn parse_style_flags(&mut self) -> Vec<String> {
        let mut flags = Vec::new();
        loop {
            if let Some(w) = self.word() {
                flags.push(w);
            } else if self.integer().is_some() {
                // bare numeric style value, not modeled symbolically
            } else {
                break;
            }
            if !self.eat_operator('|') {
                break;
            }
        }
        flags
    }

    fn parse_control(&mut self) -> Control {
        let line = self.peek_line();
        let Some(control_type) = self.word() else {
            self.bump();
            return Control { line, ..Default::default() };
        };

        if control_type.eq_ignore_ascii_case("CONTROL") {
            let text = self.string_lit().unwrap_or_default();
            self.eat_operator(',');
            let id = self.resource_id().unwrap_or_default();
            self.eat_operator(',');
            let class_name = self.string_lit().unwrap_or_default();
            self.eat_operator(',');
            let styles = self.parse_style_flags();
            self.eat_operator(',');
            let geometry = self.parse_geometry();
            return Control { control_type, text, id, class_name, geometry, styles, line };
        }

        // Standard `TYPE "text", ID, x, y, w, h [, styles]` form.
        let text = self.string_lit().unwrap_or_default();
        self.eat_operator(',');
        let id = self.resource_id().unwrap_or_default();
        self.eat_operator(',');
        let geometry = self.parse_geometry();
        let mut styles = Vec::new();
        while self.eat_operator(',') {
            styles.extend(self.parse_style_flags());
        }
        Control { control_type, text, id, geometry, styles, ..Default::default() }
            .with_line(line)
    }

    /// On an unrecognized top-level statement: if it opens a `BEGIN ... END`
    /// block, skip to the matching `END`; otherwise skip to the next token
    /// on a later line.
    fn skip_unknown_statement(&mut self) {
        if self.at_eof() {
            return;
        }
        let start_line = self.peek_line();
        let mut depth = 0usize;
        loop {
            if self.at_eof() {
                return;
            }
            if self.is_keyword("BEGIN") {
                depth += 1;
                self.bump();
                continue;
            }
            if self.is_keyword("END") {
                self.bump();
                if depth > 0 {
                    depth -= 1;
                    continue;
                }
                return;
            }
            if depth == 0 && self.peek_line() != start_line {
                return;
            }
            self.bump();
        }
    }
}

impl Control {
    fn with_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }
}

/// MFC bakes an accelerator shortcut like `"Ctrl+N"` into the menu text after
/// a literal `\t` escape (the RC lexer never interprets backslash escapes
/// inside string literals, so it survives as two characters, not a tab byte).
fn split_menu_shortcut(text: &str) -> (String, String) {
    match text.split_once("\\t") {
        Some((label, shortcut)) => (label.to_string(), shortcut.to_string()),
        None => (text.to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(src: &str) -> RcData {
        let toks = Lexer::new(src).tokenize();
        Parser::parse(&toks).current().clone()
    }

    #[test]
    fn parses_include_directive() {
        let data = parse("#include \"resource.h\"\n");
        assert_eq!(data.includes, vec!["resource.h".to_string()]);
    }

    #[test]
    fn parses_icon_and_bitmap_assets() {
        let data = parse("IDI_APP ICON \"app.ico\"\nIDB_LOGO BITMAP \"logo.bmp\"\n");
        assert_eq!(data.icons["IDI_APP"].file, "app.ico");
        assert_eq!(data.assets["IDB_LOGO"].file, "logo.bmp");
    }

    #[test]
    fn parses_stringtable() {
        let data = parse("STRINGTABLE\nBEGIN\n    IDS_HELLO \"Hello\"\nEND\n");
        assert_eq!(data.strings["IDS_HELLO"].text, "Hello");
    }

    #[test]
    fn parses_accelerator_table_with_virtual_key() {
        let data = parse("IDR_MAIN ACCELERATORS\nBEGIN\n    VK_F1, ID_HELP, VIRTKEY\nEND\n");
        let table = &data.accelerator_tables[0];
        assert_eq!(table[0].id, "ID_HELP");
        assert!(table[0].is_unknown());
    }

    #[test]
    fn parses_dialog_with_pushbutton() {
        let data = parse("IDD_ABOUT DIALOGEX 0, 0, 200, 100\nCAPTION \"About\"\nBEGIN\n    PUSHBUTTON \"OK\", IDOK, 50, 70, 50, 14\nEND\n");
        let dialog = &data.dialogs[0];
        assert_eq!(dialog.id, "IDD_ABOUT");
        assert_eq!(dialog.caption, "About");
        assert_eq!(dialog.controls[0].control_type, "PUSHBUTTON");
        assert_eq!(dialog.controls[0].id, "IDOK");
        assert_eq!(dialog.controls[0].geometry, Geometry { x: 50, y: 70, w: 50, h: 14 });
    }

    #[test]
    fn skips_unknown_top_level_block() {
        let data = parse("SOMETHING_WEIRD 1 2 3\nBEGIN\n    1 2 3\nEND\nIDI_APP ICON \"app.ico\"\n");
        assert_eq!(data.icons["IDI_APP"].file, "app.ico");
    }

    #[test]
    fn parses_menu_with_popup_and_items() {
        let data = parse("IDR_MAIN MENU\nBEGIN\n    POPUP \"&File\"\n    BEGIN\n        MENUITEM \"E&xit\\tAlt+F4\", ID_EXIT\n    END\nEND\n");
        let menu = &data.menus[0];
        assert_eq!(menu.children[0].text, "&File");
        assert_eq!(menu.children[0].children[0].id, "ID_EXIT");
        assert_eq!(menu.children[0].children[0].shortcut, "Alt+F4");
    }
}
