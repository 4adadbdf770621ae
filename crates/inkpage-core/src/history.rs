//! Linear undo/redo history of committed strokes.

use crate::config::DEFAULT_HISTORY_CAPACITY;
use crate::stroke::{Stroke, StrokeId};

/// One stroke rewritten by the eraser into zero or more fragments.
#[derive(Debug, Clone, PartialEq)]
pub struct Replacement {
    /// Id of the stroke being replaced.
    pub original: StrokeId,
    /// Fragments that take its place, in order.
    pub fragments: Vec<Stroke>,
}

/// A single undoable step.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryEntry {
    /// A newly drawn stroke, painted above everything before it.
    Stroke(Stroke),
    /// An eraser pass: each original is swapped for its fragments in place.
    Replace(Vec<Replacement>),
}

/// Ordered history with a cursor.
///
/// The visible strokes are the loaded base strokes followed by the
/// contribution of entries `0..=cursor`. A cursor of `-1` means nothing from
/// the history is applied.
#[derive(Debug, Clone)]
pub struct History {
    /// Strokes loaded by import; below every entry and not undoable.
    base: Vec<Stroke>,
    entries: Vec<HistoryEntry>,
    cursor: isize,
    capacity: usize,
    /// Cached fold of `base` and the applied entries.
    visible: Vec<Stroke>,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl History {
    /// Create an empty history holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            base: Vec::new(),
            entries: Vec::new(),
            cursor: -1,
            capacity: capacity.max(1),
            visible: Vec::new(),
        }
    }

    /// Strokes currently visible, bottom to top.
    pub fn visible(&self) -> &[Stroke] {
        &self.visible
    }

    /// Number of stored entries, including undone ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the last applied entry, `-1` if none.
    pub fn cursor(&self) -> isize {
        self.cursor
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn can_undo(&self) -> bool {
        self.cursor >= 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len() as isize
    }

    /// Commit a finished stroke.
    ///
    /// Returns `true` if the oldest entry was evicted, in which case the
    /// visible set changed by more than the appended stroke.
    pub fn commit(&mut self, stroke: Stroke) -> bool {
        self.push_entry(HistoryEntry::Stroke(stroke))
    }

    /// Record an eraser pass as one entry. Empty passes are ignored.
    ///
    /// Returns `true` if an entry was recorded.
    pub fn replace(&mut self, replacements: Vec<Replacement>) -> bool {
        if replacements.is_empty() {
            return false;
        }
        self.push_entry(HistoryEntry::Replace(replacements));
        true
    }

    /// Step back one entry. Returns `true` if the visible set changed.
    pub fn undo(&mut self) -> bool {
        if !self.can_undo() {
            return false;
        }
        self.cursor -= 1;
        self.rebuild_visible();
        true
    }

    /// Re-apply the next entry. Returns `true` if the visible set changed.
    pub fn redo(&mut self) -> bool {
        if !self.can_redo() {
            return false;
        }
        self.cursor += 1;
        self.rebuild_visible();
        true
    }

    /// Drop every stroke and entry.
    pub fn clear(&mut self) {
        self.base.clear();
        self.entries.clear();
        self.cursor = -1;
        self.visible.clear();
    }

    /// Replace everything with a loaded set of strokes that cannot be undone.
    pub fn load(&mut self, strokes: Vec<Stroke>) {
        self.clear();
        self.base = strokes;
        self.visible = self.base.clone();
    }

    /// Apply a function to every stroke the history knows about, applied or not.
    pub fn for_each_stroke_mut(&mut self, mut f: impl FnMut(&mut Stroke)) {
        self.base.iter_mut().for_each(&mut f);
        for entry in &mut self.entries {
            match entry {
                HistoryEntry::Stroke(stroke) => f(stroke),
                HistoryEntry::Replace(replacements) => replacements
                    .iter_mut()
                    .flat_map(|r| r.fragments.iter_mut())
                    .for_each(&mut f),
            }
        }
        self.rebuild_visible();
    }

    fn push_entry(&mut self, entry: HistoryEntry) -> bool {
        // Linear history: anything past the cursor is gone.
        self.entries.truncate((self.cursor + 1) as usize);

        let appended_stroke = match &entry {
            HistoryEntry::Stroke(stroke) => Some(stroke.clone()),
            HistoryEntry::Replace(_) => None,
        };
        self.entries.push(entry);
        self.cursor = self.entries.len() as isize - 1;

        if self.entries.len() > self.capacity {
            let evicted = self.entries.remove(0);
            self.cursor -= 1;
            // An evicted stroke leaves the page; an evicted erase pass stays
            // applied to whatever it rewrote.
            if let HistoryEntry::Replace(_) = evicted {
                apply_entry(&mut self.base, &evicted);
            }
            log::debug!("History full; evicted the oldest entry");
            self.rebuild_visible();
            return true;
        }

        match appended_stroke {
            Some(stroke) => self.visible.push(stroke),
            None => self.rebuild_visible(),
        }
        false
    }

    fn rebuild_visible(&mut self) {
        let mut visible = self.base.clone();
        let applied = (self.cursor + 1) as usize;
        for entry in &self.entries[..applied] {
            apply_entry(&mut visible, entry);
        }
        self.visible = visible;
    }
}

fn apply_entry(visible: &mut Vec<Stroke>, entry: &HistoryEntry) {
    match entry {
        HistoryEntry::Stroke(stroke) => visible.push(stroke.clone()),
        HistoryEntry::Replace(replacements) => {
            for replacement in replacements {
                match visible.iter().position(|s| s.id == replacement.original) {
                    Some(index) => {
                        visible.splice(index..=index, replacement.fragments.iter().cloned());
                    }
                    None => {
                        // The original was evicted with its entry.
                        log::debug!("Skipping replacement of missing stroke {}", replacement.original);
                    }
                }
            }
        }
    }
}
