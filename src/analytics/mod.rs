//! Analytics Aggregator: status and assignee distributions, velocity and
//! timeline summaries derived from a project's items

pub mod aggregator;
pub mod compute;
pub mod model;

pub use aggregator::Aggregator;
pub use compute::{AnalyticsOptions, analyze};
pub use model::{
    AnalyticsInfo, CategoryCount, NO_STATUS, Period, TimelineData, UNASSIGNED, VelocityData,
};
