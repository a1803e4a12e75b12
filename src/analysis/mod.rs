// src/analysis/mod.rs
pub mod aggregate;
pub mod config;
pub mod error;
pub mod extract;
pub mod label;
pub mod pipeline;
pub mod plot;
pub mod session;
pub mod spike_sync;
pub use aggregate::{average_profiles, histogram, AverageProfile, WindowHistogram};
pub use config::{AlignmentPolicy, AnalysisConfig, HistogramBinning, TimeBase};
pub use error::SyncError;
pub use extract::{extract, EventWindow, WindowedSpikeTrain};
pub use label::{parse_session_label, ParseLabelWarning, SessionLabel};
pub use pipeline::{
    process_multiple_sessions_from_directory, BatchReport, FailedSession, SessionPipeline,
    SessionReport,
};
pub use plot::{
    plot_adaptive_window_histogram, plot_average_sync_profile, plot_session_comparison,
    PlotStyle, ProfilePlot, ProfilePlotOptions, SessionSummary,
};
pub use session::{load_session, SessionLoader, SessionRecord, UnitId};
pub use spike_sync::{
    calculate_sync_profiles, window_synchrony, EventProfile, SkippedEvent, SpikeSync,
    SyncProfile, SyncProfiles, SynchronyMetric,
};
