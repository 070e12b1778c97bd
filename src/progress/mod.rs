//! Progress aggregation: rolls task state up through phases, roadmaps and epics
//!
//! Every aggregator reads a snapshot of persisted JSON and returns a
//! [`ProgressReport`]. Missing or corrupt files are reported in the result,
//! never raised.

mod aggregate;
pub mod refs;
mod status;
mod types;
mod velocity;

pub use aggregate::{
    aggregate_epic_progress, aggregate_phase_progress, aggregate_roadmap_progress,
    get_progress_at_level,
};
pub use refs::{PhaseRef, RoadmapRef};
pub use status::{determine_status, rounded_completion};
pub use types::ProgressReport;
pub use velocity::{calculate_velocity, calculate_velocity_at, ProgressSample, Trend, Velocity};
