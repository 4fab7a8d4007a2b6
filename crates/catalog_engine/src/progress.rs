use std::sync::mpsc;

use catalog_core::{PageCursor, TerminationReason};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarvestEvent {
    CategoryStarted {
        category_id: String,
    },
    PageHarvested {
        cursor: PageCursor,
        records: usize,
        excluded: usize,
    },
    CategoryFinished {
        category_id: String,
        records: usize,
        termination: TerminationReason,
    },
    CategoryPersisted {
        category_id: String,
        location: String,
    },
    CategoryFailed {
        category_id: String,
        message: String,
    },
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: HarvestEvent);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgressSink;

impl ProgressSink for NoopProgressSink {
    fn emit(&self, _event: HarvestEvent) {}
}

pub struct ChannelProgressSink {
    tx: mpsc::Sender<HarvestEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: mpsc::Sender<HarvestEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: HarvestEvent) {
        let _ = self.tx.send(event);
    }
}
