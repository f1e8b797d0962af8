//! IncludeHelper (§4.H "Insert include" / "Remove include"): parses the
//! ordered `#include` lines of a C/C++ source file into groups (maximal runs
//! of consecutive include lines) and inserts or removes entries while
//! keeping the existing grouping.

use knut_text::TextBuffer;
use regex::Regex;
use std::sync::OnceLock;

use crate::error::RefactorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeScope {
    Angle,
    Quote,
}

#[derive(Debug, Clone)]
pub struct IncludeLine {
    pub line: usize,
    pub name: String,
    pub scope: IncludeScope,
}

fn include_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^\s*#include\s*(<([^>]+)>|"([^"]+)")"#).unwrap())
}

fn pragma_once_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*#pragma\s+once\b").unwrap())
}

fn ifndef_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*#ifndef\b").unwrap())
}

fn define_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*#define\b").unwrap())
}

pub fn parse_includes(buffer: &TextBuffer) -> Vec<IncludeLine> {
    let mut out = Vec::new();
    for line in 0..buffer.line_count() {
        let text = buffer.line_text(line);
        if let Some(caps) = include_regex().captures(text) {
            let (name, scope) = if let Some(m) = caps.get(2) {
                (m.as_str().to_string(), IncludeScope::Angle)
            } else {
                (caps.get(3).map(|m| m.as_str()).unwrap_or_default().to_string(), IncludeScope::Quote)
            };
            out.push(IncludeLine { line, name, scope });
        }
    }
    out
}

/// Maximal runs of consecutive include lines.
pub fn group_includes(includes: &[IncludeLine]) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for (i, inc) in includes.iter().enumerate() {
        if i > 0 && inc.line == includes[i - 1].line + 1 {
            groups.last_mut().unwrap().push(i);
        } else {
            groups.push(vec![i]);
        }
    }
    groups
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count()
}

/// §4.H "Insert include". `new_group` forces a fresh, blank-line-separated
/// group at the end regardless of existing groups.
pub fn insert_include(buffer: &mut TextBuffer, name: &str, scope: IncludeScope, new_group: bool) {
    let includes = parse_includes(buffer);
    let entry = match scope {
        IncludeScope::Angle => format!("#include <{name}>\n"),
        IncludeScope::Quote => format!("#include \"{name}\"\n"),
    };

    if includes.is_empty() {
        let position = header_guard_end(buffer).map(|l| l + 1).unwrap_or(0);
        buffer.insert_at_line(position, &entry);
        return;
    }

    if new_group {
        let last_line = includes.last().unwrap().line;
        buffer.insert_at_line(last_line + 1, &format!("\n{entry}"));
        return;
    }

    let groups = group_includes(&includes);
    let mut best: Option<(usize, usize)> = None; // (group_index, prefix_len)
    for (gi, group) in groups.iter().enumerate() {
        for &idx in group {
            let inc = &includes[idx];
            if inc.scope != scope {
                continue;
            }
            let prefix = common_prefix_len(&inc.name, name);
            if best.is_none_or(|(_, best_len)| prefix > best_len) {
                best = Some((gi, prefix));
            }
        }
    }

    let insert_after_line = match best {
        Some((gi, _)) => groups[gi].iter().map(|&idx| includes[idx].line).max().unwrap_or(includes.last().unwrap().line),
        None => includes.last().unwrap().line,
    };
    buffer.insert_at_line(insert_after_line + 1, &entry);
}

/// Finds the line after `#pragma once`, or after the `#define` of an
/// `#ifndef`/`#define` header guard.
fn header_guard_end(buffer: &TextBuffer) -> Option<usize> {
    let mut saw_ifndef = false;
    for line in 0..buffer.line_count().min(10) {
        let text = buffer.line_text(line);
        if pragma_once_regex().is_match(text) {
            return Some(line);
        }
        if ifndef_regex().is_match(text) {
            saw_ifndef = true;
            continue;
        }
        if saw_ifndef && define_regex().is_match(text) {
            return Some(line);
        }
    }
    None
}

/// §4.H "Remove include". No-op if `name` is absent.
pub fn remove_include(buffer: &mut TextBuffer, name: &str, scope: IncludeScope) -> Result<(), RefactorError> {
    if name.trim().is_empty() {
        return Err(RefactorError::MalformedInclude(name.to_string()));
    }
    let includes = parse_includes(buffer);
    if let Some(inc) = includes.iter().find(|inc| inc.name == name && inc.scope == scope) {
        let start = buffer.line_start(inc.line);
        let end = buffer.line_start(inc.line + 1);
        buffer.delete_range(start, end);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserts_into_matching_group_by_longest_prefix() {
        let mut buffer = TextBuffer::from_str("#include <string>\n#include <vector>\n\nint main() {}\n");
        insert_include(&mut buffer, "vector_view", IncludeScope::Angle, false);
        assert_eq!(buffer.text(), "#include <string>\n#include <vector>\n#include <vector_view>\n\nint main() {}\n");
    }

    #[test]
    fn inserts_after_header_guard_when_no_includes_exist() {
        let mut buffer = TextBuffer::from_str("#ifndef FOO_H\n#define FOO_H\n\nclass Foo {};\n");
        insert_include(&mut buffer, "string", IncludeScope::Angle, false);
        assert_eq!(buffer.text(), "#ifndef FOO_H\n#define FOO_H\n#include <string>\n\nclass Foo {};\n");
    }

    #[test]
    fn remove_include_is_noop_when_absent() {
        let mut buffer = TextBuffer::from_str("#include <vector>\n");
        remove_include(&mut buffer, "string", IncludeScope::Angle).unwrap();
        assert_eq!(buffer.text(), "#include <vector>\n");
    }

    #[test]
    fn remove_include_deletes_matching_line() {
        let mut buffer = TextBuffer::from_str("#include <string>\n#include <vector>\n");
        remove_include(&mut buffer, "string", IncludeScope::Angle).unwrap();
        assert_eq!(buffer.text(), "#include <vector>\n");
    }
}
