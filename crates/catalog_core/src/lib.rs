//! Catalog harvester core: data model and the pure pagination state machine.
mod effect;
mod msg;
mod state;
mod types;
mod update;

pub use effect::Effect;
pub use msg::{Msg, NavigationResult};
pub use state::{PaginationLimits, PaginationState, Phase};
pub use types::{
    CardHandle, CategoryResult, CategorySource, EmptyRecordPolicy, ExtractedRecord, PageCursor,
    PaginationSignal, TerminationReason, CATEGORY_URL_COLUMN,
};
pub use update::update;
