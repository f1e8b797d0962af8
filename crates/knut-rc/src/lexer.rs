//! RC lexer (§4.B). Input is a byte stream; output a flat token list with a
//! line number on every token so later records can carry it for
//! highlighting.

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Operator(char),
    Directive(String),
    String(String),
    Integer(i64),
    Keyword(String),
    Word(String),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub line: usize,
}

/// Closed set of RC block/control keywords the parser dispatches on.
const KEYWORDS: &[&str] = &[
    "ACCELERATORS", "DIALOG", "DIALOGEX", "MENU", "MENUEX", "STRINGTABLE", "TOOLBAR", "TOOLBARNEW",
    "BITMAP", "ICON", "CURSOR", "BEGIN", "END", "POPUP", "MENUITEM", "SEPARATOR", "CAPTION", "STYLE",
    "EXSTYLE", "FONT", "CLASS", "CONTROL", "PUSHBUTTON", "DEFPUSHBUTTON", "PUSHBOX", "LTEXT", "CTEXT",
    "RTEXT", "EDITTEXT", "COMBOBOX", "LISTBOX", "SCROLLBAR", "GROUPBOX", "CHECKBOX", "AUTOCHECKBOX",
    "AUTO3STATE", "STATE3", "AUTORADIOBUTTON", "RADIOBUTTON", "VALUE",
];

pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src: src.as_bytes(), pos: 0, line: 1 }
    }

    pub fn tokenize(mut self) -> Vec<Spanned> {
        let mut out = Vec::new();
        loop {
            self.skip_space();
            let line = self.line;
            let Some(c) = self.peek() else {
                out.push(Spanned { token: Token::Eof, line });
                break;
            };
            let token = match c {
                ',' | '|' => {
                    self.advance();
                    Token::Operator(c)
                }
                '#' => self.lex_directive(),
                '"' => self.lex_string(),
                '0'..='9' => self.lex_number(),
                '-' if self.src.get(self.pos + 1).is_some_and(|b| b.is_ascii_digit()) => self.lex_number(),
                _ if is_word_start(c) => self.lex_word(),
                _ => {
                    self.advance();
                    continue;
                }
            };
            out.push(Spanned { token, line });
        }
        out
    }

    fn peek(&self) -> Option<char> {
        self.src.get(self.pos).map(|b| *b as char)
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    /// `skipSpace`: whitespace plus `//...\n` line comments.
    fn skip_space(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.src.get(self.pos + 1) == Some(&b'/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn lex_directive(&mut self) -> Token {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
        Token::Directive(String::from_utf8_lossy(&self.src[start..self.pos]).trim().to_string())
    }

    /// Double-quoted string with `""` escaping for an embedded quote.
    fn lex_string(&mut self) -> Token {
        self.advance(); // opening quote
        let mut s = String::new();
        loop {
            match self.peek() {
                Some('"') => {
                    self.advance();
                    if self.peek() == Some('"') {
                        s.push('"');
                        self.advance();
                    } else {
                        break;
                    }
                }
                Some(c) => {
                    s.push(c);
                    self.advance();
                }
                None => break,
            }
        }
        Token::String(s)
    }

    fn lex_number(&mut self) -> Token {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.advance();
        }
        if self.peek() == Some('0') && matches!(self.src.get(self.pos + 1), Some(b'x') | Some(b'X')) {
            self.advance();
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.advance();
            }
            let text = std::str::from_utf8(&self.src[start + 2..self.pos]).unwrap_or("0");
            return Token::Integer(i64::from_str_radix(text.trim_start_matches("0x").trim_start_matches("0X"), 16).unwrap_or(0));
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap_or("0");
        Token::Integer(text.parse().unwrap_or(0))
    }

    fn lex_word(&mut self) -> Token {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if is_word_continue(c) {
                self.advance();
            } else {
                break;
            }
        }
        let text = String::from_utf8_lossy(&self.src[start..self.pos]).to_string();
        let upper = text.to_uppercase();
        if KEYWORDS.contains(&upper.as_str()) {
            Token::Keyword(upper)
        } else {
            Token::Word(text)
        }
    }
}

fn is_word_start(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.' || c == '\\' || c == '/'
}

fn is_word_continue(c: char) -> bool {
    is_word_start(c) || c == '+' || c == '-'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_simple_dialog_header() {
        let toks = Lexer::new("IDD_ABOUT DIALOGEX 0, 0, 200, 100").tokenize();
        assert_eq!(
            toks.iter().map(|s| s.token.clone()).collect::<Vec<_>>(),
            vec![
                Token::Word("IDD_ABOUT".into()),
                Token::Keyword("DIALOGEX".into()),
                Token::Integer(0),
                Token::Operator(','),
                Token::Integer(0),
                Token::Operator(','),
                Token::Integer(200),
                Token::Operator(','),
                Token::Integer(100),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn handles_quoted_strings_with_escaped_quote() {
        let toks = Lexer::new(r#""say ""hi""""#).tokenize();
        assert_eq!(toks[0].token, Token::String("say \"hi\"".to_string()));
    }

    #[test]
    fn skips_line_comments() {
        let toks = Lexer::new("// comment\nPUSHBUTTON").tokenize();
        assert_eq!(toks[0].token, Token::Keyword("PUSHBUTTON".into()));
        assert_eq!(toks[0].line, 2);
    }
}
