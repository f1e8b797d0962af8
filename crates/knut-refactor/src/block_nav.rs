//! Block navigation (§4.H): matched-bracket walks over raw text, not the
//! syntax tree, so they keep working on code that doesn't currently parse.

const OPEN: [char; 3] = ['{', '(', '['];
const CLOSE: [char; 3] = ['}', ')', ']'];

fn matching_close(open: char) -> char {
    match open {
        '{' => '}',
        '(' => ')',
        '[' => ']',
        _ => unreachable!(),
    }
}

/// Scans backward from `offset` for the nearest unmatched opening bracket
/// enclosing it.
pub fn go_to_block_start(text: &str, offset: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth: [i32; 3] = [0; 3];
    let mut i = offset;
    while i > 0 {
        i -= 1;
        let c = bytes[i] as char;
        if let Some(k) = CLOSE.iter().position(|&x| x == c) {
            depth[k] += 1;
        } else if let Some(k) = OPEN.iter().position(|&x| x == c) {
            if depth[k] == 0 {
                return Some(i);
            }
            depth[k] -= 1;
        }
    }
    None
}

/// Scans forward from `offset` for the matching close of the block that
/// `go_to_block_start` would find, or the next unmatched close if `offset`
/// is already inside one.
pub fn go_to_block_end(text: &str, offset: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth: [i32; 3] = [0; 3];
    let mut i = offset;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if let Some(k) = OPEN.iter().position(|&x| x == c) {
            depth[k] += 1;
        } else if let Some(k) = CLOSE.iter().position(|&x| x == c) {
            if depth[k] == 0 {
                return Some(i);
            }
            depth[k] -= 1;
        }
        i += 1;
    }
    None
}

/// Selects the full enclosing block: from the unmatched opening bracket
/// through its matching close, inclusive.
pub fn select_block_up(text: &str, offset: usize) -> Option<(usize, usize)> {
    let start = go_to_block_start(text, offset)?;
    let open_char = text.as_bytes()[start] as char;
    let close_char = matching_close(open_char);
    let end = find_matching_close_from(text, start, open_char, close_char)?;
    Some((start, end + 1))
}

/// Selects from the enclosing opening bracket to just before its matching
/// close (the block's interior start marker through the close, matching
/// `select_block_up` minus the trailing bracket).
pub fn select_block_start(text: &str, offset: usize) -> Option<(usize, usize)> {
    let start = go_to_block_start(text, offset)?;
    Some((start, start + 1))
}

pub fn select_block_end(text: &str, offset: usize) -> Option<(usize, usize)> {
    let start = go_to_block_start(text, offset)?;
    let open_char = text.as_bytes()[start] as char;
    let close_char = matching_close(open_char);
    let end = find_matching_close_from(text, start, open_char, close_char)?;
    Some((end, end + 1))
}

fn find_matching_close_from(text: &str, open_offset: usize, open_char: char, close_char: char) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0;
    for (i, &b) in bytes.iter().enumerate().skip(open_offset + 1) {
        let c = b as char;
        if c == open_char {
            depth += 1;
        } else if c == close_char {
            if depth == 0 {
                return Some(i);
            }
            depth -= 1;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_enclosing_brace_block() {
        let text = "void f() {\n    if (x) {\n        y();\n    }\n}\n";
        let inner_offset = text.find("y();").unwrap();
        let start = go_to_block_start(text, inner_offset).unwrap();
        assert_eq!(text.as_bytes()[start] as char, '{');
        assert_eq!(&text[start..start + 9], "{\n       ");
    }

    #[test]
    fn select_block_up_spans_matching_braces() {
        let text = "f() {\n    g();\n}\n";
        let offset = text.find("g();").unwrap();
        let (start, end) = select_block_up(text, offset).unwrap();
        assert_eq!(&text[start..end], "{\n    g();\n}");
    }

    #[test]
    fn block_end_finds_matching_close_ignoring_nested() {
        let text = "{ { } }";
        let end = go_to_block_end(text, 1).unwrap();
        assert_eq!(end, 6);
    }
}
