pub mod log;
pub mod types;

pub use log::ActivityLog;
pub use types::{ActivityEntry, ActivityStatus, CATEGORY_ALL};
