//! RC (MFC resource script) lexer, parser and RC→Widget converter (§4.B, §4.C).

pub mod convert;
pub mod lexer;
pub mod model;
pub mod parser;

use thiserror::Error;

pub use convert::{convert_dialog, ConversionFlag, Scale, Widget};
pub use lexer::{Lexer, Spanned, Token};
pub use model::{AcceleratorEntry, Asset, Control, Dialog, Geometry, MenuItem, RcData, RcFile, StringEntry, ToolBar};
pub use parser::Parser;

#[derive(Debug, Error)]
pub enum RcError {
    #[error("dialog id {0:?} not found in resource file")]
    DialogNotFound(String),
}

/// Parses a whole `.rc` source string into its data model (§4.B).
pub fn parse_rc(source: &str) -> RcFile {
    let tokens = Lexer::new(source).tokenize();
    Parser::parse(&tokens)
}

/// Finds a dialog by resource id within the current language and converts it
/// (§4.C). `None` target converts the first dialog declared.
pub fn convert_dialog_by_id(file: &RcFile, id: Option<&str>, flags: ConversionFlag, scale: Scale) -> Result<Widget, RcError> {
    let data = file.current();
    let dialog = match id {
        Some(id) => data.dialogs.iter().find(|d| d.id == id).ok_or_else(|| RcError::DialogNotFound(id.to_string()))?,
        None => data.dialogs.first().ok_or_else(|| RcError::DialogNotFound("<none>".to_string()))?,
    };
    Ok(convert_dialog(dialog, flags, scale))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_converts_about_dialog() {
        let source = "IDD_ABOUT DIALOGEX 0, 0, 200, 100\nCAPTION \"About\"\nBEGIN\n    PUSHBUTTON \"OK\", IDOK, 50, 70, 50, 14\nEND\n";
        let file = parse_rc(source);
        let widget = convert_dialog_by_id(&file, Some("IDD_ABOUT"), ConversionFlag::UPDATE_GEOMETRY, Scale::default()).unwrap();
        assert_eq!(widget.class, "QDialog");
        assert_eq!(widget.children[0].name, "IDOK");
    }

    #[test]
    fn unknown_dialog_id_is_an_error() {
        let file = parse_rc("");
        assert!(convert_dialog_by_id(&file, Some("IDD_MISSING"), ConversionFlag::empty(), Scale::default()).is_err());
    }
}
