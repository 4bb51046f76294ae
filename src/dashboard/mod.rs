mod facade;
mod sources;

pub use facade::{
    ActivityView, BugDataState, BugOverview, Dashboard, DashboardSnapshot, NotificationView,
    PollOverview,
};
pub use sources::{ActivitySource, BugSource, NotificationSource, QualityParams, QualitySource};
