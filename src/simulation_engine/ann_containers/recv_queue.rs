use std::collections::HashMap;

use crate::simulation_engine::announcement::{Announcement, Prefix};

/// Inbound announcements awaiting processing this phase, grouped by prefix.
/// Cleared every time an AS processes.
#[derive(Debug, Clone, Default)]
pub struct RecvQueue {
    info: HashMap<Prefix, Vec<Announcement>>,
}

impl RecvQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_ann(&mut self, ann: Announcement) {
        self.info.entry(ann.prefix).or_default().push(ann);
    }

    pub fn get(&self, prefix: &Prefix) -> Option<&Vec<Announcement>> {
        self.info.get(prefix)
    }

    /// Drains the queue for processing, leaving it empty.
    pub fn take(&mut self) -> HashMap<Prefix, Vec<Announcement>> {
        std::mem::take(&mut self.info)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Prefix, &Vec<Announcement>)> {
        self.info.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.info.is_empty()
    }

    pub fn clear(&mut self) {
        self.info.clear();
    }
}
