//! VCA/folder spill stack
//!
//! At most one lead (VCA) or parent (folder) track is spilled at a time.
//! Spilling another track pushes the current one so that un-spilling returns
//! to it (LIFO).

use crate::host::TrackId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpillStack {
    lead: Option<TrackId>,
    stack: Vec<TrackId>,
}

impl SpillStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently spilled track
    pub fn lead(&self) -> Option<TrackId> {
        self.lead
    }

    /// Number of remembered (pushed) tracks
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Toggle spill on `track`
    ///
    /// Un-spilling the current lead pops the previous one (or clears to no
    /// lead); spilling any other track pushes the current lead.
    pub fn toggle(&mut self, track: TrackId) {
        if self.lead == Some(track) {
            self.lead = self.stack.pop();
        } else {
            if let Some(current) = self.lead.take() {
                self.stack.push(current);
            }
            self.lead = Some(track);
        }
    }

    pub fn clear(&mut self) {
        self.lead = None;
        self.stack.clear();
    }

    /// Drop tracks failing `is_valid`, popping until the lead is valid again
    ///
    /// Returns true when the lead changed.
    pub fn retain_valid<F>(&mut self, is_valid: F) -> bool
    where
        F: Fn(TrackId) -> bool,
    {
        let before = self.lead;
        self.stack.retain(|t| is_valid(*t));
        if let Some(lead) = self.lead {
            if !is_valid(lead) {
                self.lead = self.stack.pop();
            }
        }
        before != self.lead
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: TrackId = TrackId(1);
    const B: TrackId = TrackId(2);
    const C: TrackId = TrackId(3);

    #[test]
    fn test_spill_and_unspill() {
        let mut spill = SpillStack::new();
        spill.toggle(A);
        assert_eq!(spill.lead(), Some(A));
        spill.toggle(A);
        assert_eq!(spill.lead(), None);
    }

    #[test]
    fn test_lifo_order() {
        let mut spill = SpillStack::new();
        spill.toggle(A);
        spill.toggle(B);
        assert_eq!(spill.lead(), Some(B));
        assert_eq!(spill.depth(), 1);

        // A is not the lead: it gets spilled and B is remembered
        spill.toggle(A);
        assert_eq!(spill.lead(), Some(A));

        // Un-spilling A pops B first
        spill.toggle(A);
        assert_eq!(spill.lead(), Some(B));
        spill.toggle(B);
        assert_eq!(spill.lead(), Some(A));
        spill.toggle(A);
        assert_eq!(spill.lead(), None);
    }

    #[test]
    fn test_retain_valid_pops_stale_lead() {
        let mut spill = SpillStack::new();
        spill.toggle(A);
        spill.toggle(B);
        spill.toggle(C);

        let changed = spill.retain_valid(|t| t != C && t != B);
        assert!(changed);
        assert_eq!(spill.lead(), Some(A));
        assert_eq!(spill.depth(), 0);

        assert!(!spill.retain_valid(|_| true));
    }
}
