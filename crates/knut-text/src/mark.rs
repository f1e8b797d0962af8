//! Position-stable marks (§3 Mark / RangeMark).
//!
//! A mark is `(document_ref, position)`. `document_ref` is modeled as a
//! `Weak<DocumentToken>` pointing at a zero-sized token owned by the
//! `TextBuffer`; once the buffer is dropped every mark created from it
//! reports invalid rather than crashing. The position itself lives in a
//! `Rc<RefCell<i64>>` shared with the buffer's registry (weakly, so marks
//! the caller drops are pruned lazily on the next edit) — `-1` is the
//! "collapsed/invalid" sentinel, matching "valid iff position >= 0".

use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Zero-sized identity token; one per `TextBuffer`.
pub struct DocumentToken;

#[derive(Default)]
pub struct MarkRegistry {
    cells: Vec<Weak<RefCell<i64>>>,
}

impl MarkRegistry {
    pub fn create(&mut self, token: &Rc<DocumentToken>, pos: usize) -> Mark {
        let cell = Rc::new(RefCell::new(pos as i64));
        self.cells.push(Rc::downgrade(&cell));
        Mark { doc: Rc::downgrade(token), cell }
    }

    /// Applies the §3 shift rule to every live mark after a change
    /// `(from, removed, added)` measured in bytes.
    pub fn notify_change(&mut self, from: usize, removed: usize, added: usize) {
        self.cells.retain(|w| w.strong_count() > 0);
        for weak in &self.cells {
            if let Some(cell) = weak.upgrade() {
                let mut v = cell.borrow_mut();
                if *v >= 0 {
                    let p = *v as usize;
                    *v = shift_position(p, from, removed, added) as i64;
                }
            }
        }
    }
}

/// The §3 shift rule, exposed standalone so callers can reason about or test
/// it without a buffer.
pub fn shift_position(pos: usize, from: usize, removed: usize, added: usize) -> usize {
    if pos < from {
        pos
    } else if pos < from + removed {
        from
    } else {
        pos - removed + added
    }
}

#[derive(Clone)]
pub struct Mark {
    doc: Weak<DocumentToken>,
    cell: Rc<RefCell<i64>>,
}

impl Mark {
    pub fn belongs_to(&self, token: &Rc<DocumentToken>) -> bool {
        match self.doc.upgrade() {
            Some(t) => Rc::ptr_eq(&t, token),
            None => false,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.doc.upgrade().is_some() && *self.cell.borrow() >= 0
    }

    pub fn position(&self) -> Option<usize> {
        if self.is_valid() {
            Some(*self.cell.borrow() as usize)
        } else {
            None
        }
    }
}

/// `(document_ref, start_mark, end_mark)`. A range *contains* a position `p`
/// iff `start <= p < end`.
#[derive(Clone)]
pub struct RangeMark {
    pub start: Mark,
    pub end: Mark,
}

impl RangeMark {
    pub fn new(start: Mark, end: Mark) -> Self {
        Self { start, end }
    }

    pub fn is_valid(&self) -> bool {
        self.start.is_valid() && self.end.is_valid()
    }

    pub fn contains(&self, pos: crate::Position) -> bool {
        match (self.start.position(), self.end.position()) {
            (Some(s), Some(e)) => s <= pos.0 && pos.0 < e,
            _ => false,
        }
    }

    pub fn range(&self) -> Option<(usize, usize)> {
        match (self.start.position(), self.end.position()) {
            (Some(s), Some(e)) => Some((s, e)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_rule_collapse_and_shift() {
        assert_eq!(shift_position(3, 5, 2, 1), 3);
        assert_eq!(shift_position(6, 5, 2, 1), 5);
        assert_eq!(shift_position(10, 5, 2, 1), 9);
    }
}
