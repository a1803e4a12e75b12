//! SPIKE-synchronization analysis of intracortical microstimulation sessions.
//!
//! A session file holds sorted-unit spike trains and stimulation onsets. The
//! [`analysis`] pipeline cuts a window around every stimulation, measures how
//! synchronously the units fire inside it, averages the profiles and plots them,
//! and finally compares sessions by their overall synchrony.
pub mod analysis;
pub mod simulate;
pub use analysis::{
    process_multiple_sessions_from_directory, AnalysisConfig, SessionPipeline, SpikeSync, SyncError,
    SynchronyMetric,
};
pub use simulate::{simulate_session, SimulationParams};
