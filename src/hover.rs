//! # Hover/Highlight Controller
//!
//! Decides what the pointer does to the HighlightSet. Only rides already in
//! the ActiveSet can be highlighted. With Shift held, hovered rides are added
//! to the highlight; without it they replace it, and leaving every ride
//! clears it.

use std::collections::HashSet;

/// Keys the controller cares about. Everything but Shift is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Shift,
    Other,
}

/// Requested change to the HighlightSet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HighlightChange {
    /// Union these rides into the current highlight
    Add(Vec<String>),
    /// Make these rides the whole highlight (empty clears it)
    Replace(Vec<String>),
}

impl HighlightChange {
    /// Apply the change to a highlight set.
    pub fn apply_to(&self, highlight: &mut HashSet<String>) {
        match self {
            HighlightChange::Add(names) => highlight.extend(names.iter().cloned()),
            HighlightChange::Replace(names) => {
                highlight.clear();
                highlight.extend(names.iter().cloned());
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HoverController {
    shift_down: bool,
    last_features: Vec<String>,
    stale: bool,
}

impl HoverController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shift_down(&self) -> bool {
        self.shift_down
    }

    pub fn key_down(&mut self, key: Key) {
        if key == Key::Shift {
            self.shift_down = true;
        }
    }

    pub fn key_up(&mut self, key: Key) {
        if key == Key::Shift {
            self.shift_down = false;
        }
    }

    /// Handle the rides under the pointer (nearest first, as the map reports
    /// them). Returns the highlight change to apply, if any.
    pub fn on_hover(
        &mut self,
        features: &[String],
        active: &HashSet<String>,
    ) -> Option<HighlightChange> {
        let mut seen = HashSet::new();
        let hovered: Vec<String> = features
            .iter()
            .filter(|name| active.contains(name.as_str()) && seen.insert(*name))
            .cloned()
            .collect();

        if !self.stale && hovered == self.last_features {
            return None;
        }
        self.stale = false;
        self.last_features = hovered.clone();

        match (hovered.is_empty(), self.shift_down) {
            (true, true) => None,
            (true, false) => Some(HighlightChange::Replace(Vec::new())),
            (false, true) => Some(HighlightChange::Add(hovered)),
            (false, false) => Some(HighlightChange::Replace(hovered)),
        }
    }

    /// Make the next hover count as a change, e.g. after the ActiveSet
    /// changed under a still pointer.
    pub fn reset_hover(&mut self) {
        self.stale = true;
    }
}
