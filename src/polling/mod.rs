mod controller;
mod source;
mod worker;

pub use controller::PollingController;
pub use source::{PollSource, PollStatus};
