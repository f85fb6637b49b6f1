use std::collections::HashMap;

use crate::simulation_engine::announcement::{Announcement, Prefix};

/// The single currently-best route per prefix at one AS.
#[derive(Debug, Clone, Default)]
pub struct LocalRIB {
    info: HashMap<Prefix, Announcement>,
}

impl LocalRIB {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, prefix: &Prefix) -> Option<&Announcement> {
        self.info.get(prefix)
    }

    pub fn add_ann(&mut self, ann: Announcement) {
        self.info.insert(ann.prefix, ann);
    }

    pub fn pop(&mut self, prefix: &Prefix) -> Option<Announcement> {
        self.info.remove(prefix)
    }

    pub fn prefix_anns(&self) -> impl Iterator<Item = (&Prefix, &Announcement)> {
        self.info.iter()
    }

    pub fn len(&self) -> usize {
        self.info.len()
    }

    pub fn is_empty(&self) -> bool {
        self.info.is_empty()
    }

    pub fn clear(&mut self) {
        self.info.clear();
    }
}
