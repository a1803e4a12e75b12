use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::analysis::error::SyncError;
/// Unit of the timestamps stored in a session file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TimeBase {
    #[default]
    Seconds,
    /// Sample indices; divided by the sampling rate on load.
    Samples,
}
/// How per-event profiles of different lengths are put on a common time base.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AlignmentPolicy {
    /// Interpolate every profile on a uniform grid spanning the window edges.
    Resample { points: usize },
    /// Cut every profile to the shortest one and spread it evenly over the window.
    Truncate,
}
impl Default for AlignmentPolicy {
    fn default() -> Self {
        AlignmentPolicy::Resample { points: 500 }
    }
}
/// Binning of the adaptive window histogram. Values outside `[min, max)` are not drawn.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistogramBinning {
    pub min: f64,
    pub max: f64,
    pub bins: usize,
}
impl Default for HistogramBinning {
    fn default() -> Self {
        // Most coincidence windows are a few milliseconds wide; the long tail is cut off.
        Self {
            min: 0.0,
            max: 0.08,
            bins: 50,
        }
    }
}
/// Parameters of one analysis run. Times are in seconds relative to stimulation onset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub pre_stimulus_time: f64,
    pub post_stimulus_time: f64,
    pub extract_entire_session: bool,
    pub plot_start_time: f64,
    pub plot_end_time: f64,
    pub stim_end_time: f64,
    pub time_base: TimeBase,
    pub alignment: AlignmentPolicy,
    pub max_tau: Option<f64>,
    pub histogram: HistogramBinning,
    pub session_prefix: String,
}
impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            pre_stimulus_time: -1.2,
            post_stimulus_time: 1.9,
            extract_entire_session: false,
            plot_start_time: -0.7,
            plot_end_time: 1.4,
            stim_end_time: 0.7,
            time_base: TimeBase::Seconds,
            alignment: AlignmentPolicy::default(),
            max_tau: None,
            histogram: HistogramBinning::default(),
            session_prefix: crate::analysis::label::DEFAULT_SESSION_PREFIX.to_owned(),
        }
    }
}
impl AnalysisConfig {
    /// Reads a JSON config file. Missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, SyncError> {
        let bytes = std::fs::read(path).map_err(|e| SyncError::file_access(path, e))?;
        let config: AnalysisConfig = serde_json::from_slice(&bytes)
            .map_err(|e| SyncError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }
    pub fn validate(&self) -> Result<(), SyncError> {
        let times = [
            self.pre_stimulus_time,
            self.post_stimulus_time,
            self.plot_start_time,
            self.plot_end_time,
            self.stim_end_time,
        ];
        if times.iter().any(|t| !t.is_finite()) {
            return Err(SyncError::Config("times must be finite".into()));
        }
        if self.pre_stimulus_time >= self.post_stimulus_time {
            return Err(SyncError::Config(format!(
                "pre-stimulus time {} must be before post-stimulus time {}",
                self.pre_stimulus_time, self.post_stimulus_time
            )));
        }
        if self.plot_start_time >= self.plot_end_time {
            return Err(SyncError::Config(format!(
                "plot range [{}, {}] is empty",
                self.plot_start_time, self.plot_end_time
            )));
        }
        // Per-event plots are drawn over the plot range; whole-session plots use the session span.
        if !self.extract_entire_session
            && (self.plot_end_time < self.pre_stimulus_time
                || self.plot_start_time >= self.post_stimulus_time)
        {
            return Err(SyncError::Config(format!(
                "plot range [{}, {}] lies outside the extraction window [{}, {})",
                self.plot_start_time,
                self.plot_end_time,
                self.pre_stimulus_time,
                self.post_stimulus_time
            )));
        }
        if let AlignmentPolicy::Resample { points } = self.alignment {
            if points < 2 {
                return Err(SyncError::Config(
                    "resampling needs at least two points".into(),
                ));
            }
        }
        if let Some(tau) = self.max_tau {
            if !(tau.is_finite() && tau > 0.0) {
                return Err(SyncError::Config(format!("max_tau must be positive, got {tau}")));
            }
        }
        let h = &self.histogram;
        if h.bins == 0 || !(h.min.is_finite() && h.max.is_finite()) || h.min >= h.max {
            return Err(SyncError::Config(format!(
                "histogram binning [{}, {}) with {} bins is invalid",
                h.min, h.max, h.bins
            )));
        }
        Ok(())
    }
    pub fn window(&self) -> (f64, f64) {
        (self.pre_stimulus_time, self.post_stimulus_time)
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    #[test]
    fn defaults_are_valid() {
        let config = AnalysisConfig::default();
        config.validate().unwrap();
        assert_eq!(config.window(), (-1.2, 1.9));
        assert!(!config.extract_entire_session);
    }
    #[test]
    fn partial_json_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"post_stimulus_time": 2.5, "alignment": {{"mode": "truncate"}}, "time_base": "samples"}}"#
        )
        .unwrap();
        let config = AnalysisConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.post_stimulus_time, 2.5);
        assert_eq!(config.pre_stimulus_time, -1.2);
        assert_eq!(config.alignment, AlignmentPolicy::Truncate);
        assert_eq!(config.time_base, TimeBase::Samples);
    }
    #[test]
    fn rejects_inverted_window() {
        let config = AnalysisConfig {
            pre_stimulus_time: 1.0,
            post_stimulus_time: -1.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(SyncError::Config(_))));
    }
    #[test]
    fn rejects_plot_range_outside_window() {
        let config = AnalysisConfig {
            pre_stimulus_time: 2.0,
            post_stimulus_time: 3.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(SyncError::Config(_))));
        let whole = AnalysisConfig {
            extract_entire_session: true,
            ..config
        };
        whole.validate().unwrap();
        let narrow = AnalysisConfig {
            pre_stimulus_time: -1.0,
            post_stimulus_time: 1.0,
            ..Default::default()
        };
        narrow.validate().unwrap();
    }
    #[test]
    fn rejects_bad_histogram_and_tau() {
        let mut config = AnalysisConfig::default();
        config.histogram.bins = 0;
        assert!(config.validate().is_err());
        let config = AnalysisConfig {
            max_tau: Some(0.0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
