use serde_derive::{Deserialize, Serialize};

use crate::crossing::Crossing;

/// Running entry/exit totals. Only ever incremented.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Counter {
    entries: u64,
    exits: u64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn apply(&mut self, event: Option<Crossing>) {
        match event {
            Some(Crossing::Entry) => self.entries += 1,
            Some(Crossing::Exit) => self.exits += 1,
            None => {}
        }
    }

    #[inline]
    pub fn entries(&self) -> u64 {
        self.entries
    }

    #[inline]
    pub fn exits(&self) -> u64 {
        self.exits
    }

    pub fn summary(&self) -> String {
        format!("Entries: {}  Exits: {}", self.entries, self.exits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_events() {
        let mut counter = Counter::new();

        counter.apply(Some(Crossing::Entry));
        counter.apply(None);
        counter.apply(Some(Crossing::Entry));
        counter.apply(Some(Crossing::Exit));

        assert_eq!(counter.entries(), 2);
        assert_eq!(counter.exits(), 1);
        assert_eq!(counter.summary(), "Entries: 2  Exits: 1");
    }
}
