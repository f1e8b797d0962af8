//! Line-ending detection and normalization to an internal LF-only
//! representation, adapted from the donor editor's buffer-loading pass: the
//! same majority-vote-with-tie-precedence (CRLF > LF > CR) rule applies when
//! loading a source file for transformation instead of for display.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    Cr,
    Crlf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::Cr => "\r",
            LineEnding::Crlf => "\r\n",
        }
    }
}

pub struct NormalizedText {
    pub normalized: String,
    pub original: LineEnding,
    pub had_trailing_newline: bool,
    pub mixed: bool,
}

/// Detects and normalizes line endings of `input` to LF-only. Counts CRLF,
/// LF, and solitary CR occurrences; picks the majority style (ties broken
/// CRLF > LF > CR) as the style to restore on save.
pub fn normalize_line_endings(input: &str) -> NormalizedText {
    let bytes = input.as_bytes();
    let mut i = 0usize;
    let mut crlf = 0usize;
    let mut lf = 0usize;
    let mut cr = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'\r' => {
                if i + 1 < bytes.len() && bytes[i + 1] == b'\n' {
                    crlf += 1;
                    i += 2;
                } else {
                    cr += 1;
                    i += 1;
                }
            }
            b'\n' => {
                lf += 1;
                i += 1;
            }
            _ => i += 1,
        }
    }
    let had_trailing_newline = !input.is_empty() && (input.ends_with("\r\n") || input.ends_with('\n') || input.ends_with('\r'));

    let mut original = LineEnding::Lf;
    let mut max = 0usize;
    for (style, count) in [(LineEnding::Crlf, crlf), (LineEnding::Lf, lf), (LineEnding::Cr, cr)] {
        if count > max {
            max = count;
            original = style;
        }
    }
    let non_zero = [crlf, lf, cr].iter().filter(|c| **c > 0).count();
    let mixed = non_zero > 1 && [crlf, lf, cr].iter().any(|c| *c > 0 && *c != max);

    if crlf == 0 && cr == 0 {
        return NormalizedText { normalized: input.to_string(), original, had_trailing_newline, mixed };
    }

    let mut out = String::with_capacity(input.len());
    let mut seg_start = 0usize;
    let mut j = 0usize;
    while j < bytes.len() {
        if bytes[j] == b'\r' {
            if seg_start < j {
                out.push_str(&input[seg_start..j]);
            }
            out.push('\n');
            j += if j + 1 < bytes.len() && bytes[j + 1] == b'\n' { 2 } else { 1 };
            seg_start = j;
        } else {
            j += 1;
        }
    }
    if seg_start < input.len() {
        out.push_str(&input[seg_start..]);
    }
    debug_assert!(!out.contains('\r'));
    NormalizedText { normalized: out, original, had_trailing_newline, mixed }
}

/// Restores `text`'s internal `\n`s to `style`, matching what was detected on
/// load (so a transformation round-trips a file's original line endings).
pub fn denormalize_line_endings(text: &str, style: LineEnding) -> String {
    match style {
        LineEnding::Lf => text.to_string(),
        _ => text.replace('\n', style.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_majority_crlf() {
        let result = normalize_line_endings("a\r\nb\r\nc\n");
        assert_eq!(result.original, LineEnding::Crlf);
        assert!(result.mixed);
        assert_eq!(result.normalized, "a\nb\nc\n");
    }

    #[test]
    fn round_trips_through_denormalize() {
        let result = normalize_line_endings("a\r\nb\r\n");
        let restored = denormalize_line_endings(&result.normalized, result.original);
        assert_eq!(restored, "a\r\nb\r\n");
    }
}
