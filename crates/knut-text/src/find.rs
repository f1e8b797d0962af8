//! Find & replace (§4.A Find semantics): plain/whole-word/case-sensitive/
//! regex search, `PreserveCase` replacement, and backward search starting one
//! character before the cursor.

use crate::{Position, TextBuffer};
use regex::{Regex, RegexBuilder};

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct FindOptions: u8 {
        const FIND_BACKWARD           = 0b0000_0001;
        const FIND_CASE_SENSITIVELY   = 0b0000_0010;
        const FIND_WHOLE_WORDS        = 0b0000_0100;
        const FIND_REGEXP             = 0b0000_1000;
        const PRESERVE_CASE           = 0b0001_0000;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreserveCase {
    Upper,
    Lower,
    Capitalized,
    Exact,
}

impl PreserveCase {
    /// Classifies `matched` per §4.A PreserveCase rules.
    pub fn classify(matched: &str) -> Self {
        let letters: Vec<char> = matched.chars().filter(|c| c.is_alphabetic()).collect();
        if letters.is_empty() {
            return PreserveCase::Exact;
        }
        if letters.iter().all(|c| c.is_uppercase()) {
            PreserveCase::Upper
        } else if letters.iter().all(|c| c.is_lowercase()) {
            PreserveCase::Lower
        } else if letters[0].is_uppercase() && letters[1..].iter().all(|c| c.is_lowercase()) {
            PreserveCase::Capitalized
        } else {
            PreserveCase::Exact
        }
    }

    pub fn apply(self, replacement: &str, matched: &str) -> String {
        match self {
            PreserveCase::Upper => replacement.to_uppercase(),
            PreserveCase::Lower => replacement.to_lowercase(),
            PreserveCase::Capitalized => capitalize(replacement),
            PreserveCase::Exact => preserve_affix_case(replacement, matched),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

/// Exact match: still preserve a common leading/trailing casing run shared by
/// `matched`, since `PreserveCase` only special-cases fully-uniform or
/// capitalized matches.
fn preserve_affix_case(replacement: &str, matched: &str) -> String {
    let matched_chars: Vec<char> = matched.chars().collect();
    let mut out = String::new();
    for (i, c) in replacement.chars().enumerate() {
        if let Some(mc) = matched_chars.get(i) {
            if mc.is_uppercase() {
                out.extend(c.to_uppercase());
                continue;
            } else if mc.is_lowercase() {
                out.extend(c.to_lowercase());
                continue;
            }
        }
        out.push(c);
    }
    out
}

fn build_plain_pattern(needle: &str, opts: FindOptions) -> String {
    let escaped = regex::escape(needle);
    if opts.contains(FindOptions::FIND_WHOLE_WORDS) {
        format!(r"\b{escaped}\b")
    } else {
        escaped
    }
}

fn build_regex(pattern: &str, opts: FindOptions) -> crate::Result<Regex> {
    let source = if opts.contains(FindOptions::FIND_REGEXP) {
        if opts.contains(FindOptions::FIND_WHOLE_WORDS) {
            format!(r"\b(?:{pattern})\b")
        } else {
            pattern.to_string()
        }
    } else {
        build_plain_pattern(pattern, opts)
    };
    RegexBuilder::new(&source)
        .case_insensitive(!opts.contains(FindOptions::FIND_CASE_SENSITIVELY))
        .build()
        .map_err(|e| crate::TextError::BadRegex(e.to_string()))
}

/// Expands `\1`..`\9` and `$1`..`$9` backreferences in `replacement` using
/// `caps` (only meaningful when `FIND_REGEXP` is set).
fn expand_backreferences(replacement: &str, caps: &regex::Captures) -> String {
    let mut out = String::new();
    let bytes = replacement.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if (b == b'\\' || b == b'$') && i + 1 < bytes.len() && bytes[i + 1].is_ascii_digit() {
            let idx = (bytes[i + 1] - b'0') as usize;
            if let Some(m) = caps.get(idx) {
                out.push_str(m.as_str());
            }
            i += 2;
        } else {
            out.push(b as char);
            i += 1;
        }
    }
    out
}

impl TextBuffer {
    /// Scans line-by-line (per §4.A "scans block-by-block ... to allow early
    /// termination") for `needle` starting at `from`, honoring
    /// `FIND_BACKWARD` (search starts one char before `from`).
    pub fn find(&self, needle: &str, from: Position, opts: FindOptions) -> crate::Result<Option<(Position, Position)>> {
        self.find_regexp(&regex::escape(needle), from, opts & !FindOptions::FIND_REGEXP)
    }

    pub fn find_regexp(&self, pattern: &str, from: Position, opts: FindOptions) -> crate::Result<Option<(Position, Position)>> {
        let re = build_regex(pattern, opts)?;
        let text = self.text();
        if opts.contains(FindOptions::FIND_BACKWARD) {
            let search_end = self.previous_char(from, 1).0;
            let mut last = None;
            for line in 0..self.line_count() {
                let ls = self.line_start(line).0;
                if ls > search_end {
                    break;
                }
                let le = self.line_end(line).0.min(search_end);
                if le < ls {
                    continue;
                }
                for m in re.find_iter(&text[ls..le]) {
                    last = Some((Position(ls + m.start()), Position(ls + m.end())));
                }
            }
            Ok(last)
        } else {
            for line in self.line_at(from)..self.line_count() {
                let ls = self.line_start(line).0.max(from.0);
                let le = self.line_end(line).0.max(ls);
                if let Some(m) = re.find(&text[ls..le]) {
                    return Ok(Some((Position(ls + m.start()), Position(ls + m.end()))));
                }
            }
            Ok(None)
        }
    }

    pub fn replace_one(&mut self, find: &str, replace: &str, from: Position, opts: FindOptions) -> crate::Result<bool> {
        let Some((s, e)) = self.find(find, from, opts)? else {
            return Ok(false);
        };
        let matched = self.text()[s.0..e.0].to_string();
        let replacement = if opts.contains(FindOptions::PRESERVE_CASE) {
            PreserveCase::classify(&matched).apply(replace, &matched)
        } else {
            replace.to_string()
        };
        self.replace_range(s, e, &replacement);
        Ok(true)
    }

    pub fn replace_all(&mut self, find: &str, replace: &str, opts: FindOptions) -> crate::Result<usize> {
        self.replace_all_in_range(find, replace, self.start_of_document(), self.end_of_document(), opts)
    }

    pub fn replace_all_in_range(
        &mut self,
        find: &str,
        replace: &str,
        start: Position,
        end: Position,
        opts: FindOptions,
    ) -> crate::Result<usize> {
        let pattern = if opts.contains(FindOptions::FIND_REGEXP) { find.to_string() } else { regex::escape(find) };
        self.replace_all_regexp_in_range(&pattern, replace, start, end, opts)
    }

    pub fn replace_all_regexp(&mut self, pattern: &str, replace: &str, opts: FindOptions) -> crate::Result<usize> {
        self.replace_all_regexp_in_range(pattern, replace, self.start_of_document(), self.end_of_document(), opts)
    }

    fn replace_all_regexp_in_range(
        &mut self,
        pattern: &str,
        replace: &str,
        start: Position,
        end: Position,
        opts: FindOptions,
    ) -> crate::Result<usize> {
        let re = build_regex(pattern, opts | FindOptions::FIND_REGEXP)?;
        let mut count = 0usize;
        let mut search_from = start.0;
        let mut end_pos = end.0;
        loop {
            if search_from > end_pos {
                break;
            }
            let hay = self.text()[search_from..end_pos].to_string();
            let Some(caps) = re.captures(&hay) else { break };
            let m = caps.get(0).unwrap();
            let match_start = search_from + m.start();
            let match_end = search_from + m.end();
            let matched = m.as_str().to_string();
            let mut replacement = if opts.contains(FindOptions::FIND_REGEXP) {
                expand_backreferences(replace, &caps)
            } else {
                replace.to_string()
            };
            if opts.contains(FindOptions::PRESERVE_CASE) {
                replacement = PreserveCase::classify(&matched).apply(&replacement, &matched);
            }
            let delta = replacement.len() as isize - (match_end - match_start) as isize;
            self.replace_range(Position(match_start), Position(match_end), &replacement);
            count += 1;
            end_pos = (end_pos as isize + delta).max(0) as usize;
            search_from = match_start + replacement.len();
            if matched.is_empty() {
                search_from += 1;
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserve_case_classification() {
        assert_eq!(PreserveCase::classify("FOO"), PreserveCase::Upper);
        assert_eq!(PreserveCase::classify("foo"), PreserveCase::Lower);
        assert_eq!(PreserveCase::classify("Foo"), PreserveCase::Capitalized);
        assert_eq!(PreserveCase::classify("fOo"), PreserveCase::Exact);
    }

    #[test]
    fn replace_all_restores_on_round_trip() {
        let mut buf = TextBuffer::from_str("cat sat cat");
        let n = buf.replace_all("cat", "XYZQ", FindOptions::empty()).unwrap();
        assert_eq!(n, 2);
        assert_eq!(buf.text(), "XYZQ sat XYZQ");
        buf.replace_all("XYZQ", "cat", FindOptions::empty()).unwrap();
        assert_eq!(buf.text(), "cat sat cat");
    }

    #[test]
    fn preserve_case_replacement() {
        let mut buf = TextBuffer::from_str("Cat CAT cat");
        buf.replace_all("cat", "dog", FindOptions::PRESERVE_CASE).unwrap();
        assert_eq!(buf.text(), "Dog DOG dog");
    }

    #[test]
    fn whole_word_avoids_partial_matches() {
        let buf = TextBuffer::from_str("catalog cat");
        let found = buf.find("cat", Position(0), FindOptions::FIND_WHOLE_WORDS).unwrap();
        assert_eq!(found, Some((Position(8), Position(11))));
    }

    #[test]
    fn backward_search_starts_before_cursor() {
        let buf = TextBuffer::from_str("aXbXc");
        let found = buf.find("X", Position(3), FindOptions::FIND_BACKWARD).unwrap();
        assert_eq!(found, Some((Position(1), Position(2))));
    }

    #[test]
    fn regexp_replace_expands_backreferences() {
        let mut buf = TextBuffer::from_str("John Smith");
        buf.replace_all_regexp(r"(\w+) (\w+)", r"$2 $1", FindOptions::FIND_REGEXP).unwrap();
        assert_eq!(buf.text(), "Smith John");
    }
}
