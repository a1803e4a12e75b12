use std::path::{Path, PathBuf};
use crate::analysis::aggregate::histogram;
use crate::analysis::config::AnalysisConfig;
use crate::analysis::error::SyncError;
use crate::analysis::extract::extract;
use crate::analysis::label::{parse_session_label, SessionLabel};
use crate::analysis::plot::{
    plot_adaptive_window_histogram, plot_average_sync_profile, plot_session_comparison,
    PlotStyle, ProfilePlotOptions, SessionSummary,
};
use crate::analysis::session::{SessionLoader, SUPPORTED_EXTENSIONS};
use crate::analysis::spike_sync::{calculate_sync_profiles, window_synchrony, SpikeSync, SynchronyMetric};
pub const COMPARISON_PLOT_NAME: &str = "session_comparison.png";
/// Outcome of analysing one session file.
#[derive(Clone, Debug)]
pub struct SessionReport {
    pub path: PathBuf,
    pub label: SessionLabel,
    pub events: usize,
    pub profiles: usize,
    pub skipped_events: usize,
    /// Mean of the averaged profile.
    pub mean_profile_sync: Option<f64>,
    /// Synchrony over the whole session; `None` with fewer than two active units.
    pub session_sync: Option<f64>,
    pub written: Vec<PathBuf>,
}
#[derive(Debug)]
pub struct FailedSession {
    pub path: PathBuf,
    pub error: SyncError,
}
#[derive(Debug, Default)]
pub struct BatchReport {
    pub sessions: Vec<SessionReport>,
    pub failures: Vec<FailedSession>,
    pub comparison_plot: Option<PathBuf>,
}
impl BatchReport {
    pub fn summaries(&self) -> Vec<SessionSummary> {
        self.sessions
            .iter()
            .filter_map(|s| {
                s.session_sync.map(|mean_sync| SessionSummary {
                    label: s.label.clone(),
                    mean_sync,
                })
            })
            .collect()
    }
}
/// Load → extract → synchrony → plots, for single files or whole directories.
pub struct SessionPipeline<M: SynchronyMetric = SpikeSync> {
    config: AnalysisConfig,
    metric: M,
    loader: SessionLoader,
    output_dir: PathBuf,
    style: PlotStyle,
}
impl SessionPipeline<SpikeSync> {
    pub fn new(config: AnalysisConfig, output_dir: impl Into<PathBuf>) -> Result<Self, SyncError> {
        let metric = SpikeSync::new(config.max_tau);
        SessionPipeline::with_metric(config, metric, output_dir)
    }
}
impl<M: SynchronyMetric> SessionPipeline<M> {
    pub fn with_metric(
        config: AnalysisConfig,
        metric: M,
        output_dir: impl Into<PathBuf>,
    ) -> Result<Self, SyncError> {
        config.validate()?;
        Ok(Self {
            loader: SessionLoader::new(config.time_base),
            config,
            metric,
            output_dir: output_dir.into(),
            style: PlotStyle::default(),
        })
    }
    pub fn with_style(mut self, style: PlotStyle) -> Self {
        self.style = style;
        self
    }
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
    /// Runs every session file in `dir`, oldest session first. A failing file is
    /// logged and recorded, and the batch moves on; only an unreadable directory
    /// aborts. Ends with the cross-session comparison chart.
    pub fn process_multiple_sessions_from_directory(&self, dir: &Path) -> Result<BatchReport, SyncError> {
        let files = session_files(dir, &self.config.session_prefix)?;
        if files.is_empty() {
            log::warn!("{}: no session files found", dir.display());
        }
        let total = files.len();
        let mut report = BatchReport::default();
        for (i, (path, _)) in files.into_iter().enumerate() {
            log::info!("[{}/{}] {}", i + 1, total, path.display());
            match self.process_session_file(&path) {
                Ok(session) => report.sessions.push(session),
                Err(error) => {
                    log::error!("{}: {error}; skipping", path.display());
                    report.failures.push(FailedSession { path, error });
                }
            }
        }
        for session in report.sessions.iter().filter(|s| s.session_sync.is_none()) {
            log::warn!(
                "{}: fewer than two active units over the session; left out of the comparison",
                session.path.display()
            );
        }
        let summaries = report.summaries();
        if !summaries.is_empty() {
            let written = plot_session_comparison(&summaries, &self.style)
                .and_then(|png| self.write_output(COMPARISON_PLOT_NAME, &png));
            match written {
                Ok(path) => report.comparison_plot = Some(path),
                Err(e) => log::error!("session comparison chart not written: {e}"),
            }
        }
        log::info!(
            "batch complete: {} sessions analysed, {} failed",
            report.sessions.len(),
            report.failures.len()
        );
        Ok(report)
    }
    pub fn process_session_file(&self, path: &Path) -> Result<SessionReport, SyncError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "session".to_owned());
        let label = parse_session_label(&file_name, &self.config.session_prefix);
        if let Some(warning) = &label.warning {
            log::warn!("{warning}");
        }
        let session = self.loader.load(path)?;
        let config = &self.config;
        let whole = extract(&session, config.pre_stimulus_time, config.post_stimulus_time, true)?;
        let windows = if config.extract_entire_session {
            whole.clone()
        } else {
            extract(&session, config.pre_stimulus_time, config.post_stimulus_time, false)?
        };
        let sync = calculate_sync_profiles(&windows, &self.metric);
        let mut written = Vec::new();
        let mut mean_profile_sync = None;
        if sync.profiles.is_empty() {
            log::warn!("{}: no event had two active units; no profile plot", path.display());
        } else {
            let edges = sync.profiles[0].edges;
            let options = self.profile_plot_options(&label, edges);
            let plot = plot_average_sync_profile(
                sync.sync_profiles(),
                edges,
                config.alignment,
                &options,
                &self.style,
            )?;
            mean_profile_sync = plot.average.mean_value();
            written.push(self.write_output(&format!("{stem}_sync_profile.png"), &plot.png)?);
        }
        if !sync.adaptive_windows.is_empty() {
            let hist = histogram(&sync.adaptive_windows, config.histogram);
            let title = format!("Adaptive Time Window Distribution ({})", label.text);
            let png = plot_adaptive_window_histogram(&hist, &title, &self.style)?;
            written.push(self.write_output(&format!("{stem}_adaptive_windows.png"), &png)?);
        }
        let session_sync = whole.first().and_then(|w| window_synchrony(w, &self.metric));
        Ok(SessionReport {
            path: path.to_path_buf(),
            label,
            events: windows.len(),
            profiles: sync.profiles.len(),
            skipped_events: sync.skipped.len(),
            mean_profile_sync,
            session_sync,
            written,
        })
    }
    fn profile_plot_options(&self, label: &SessionLabel, edges: (f64, f64)) -> ProfilePlotOptions {
        let title = format!(
            "Average Synchronization Profile Across Stimulation Events ({})",
            label.text
        );
        if self.config.extract_entire_session {
            return ProfilePlotOptions {
                title,
                display: edges,
                stim_onset: None,
                stim_end: None,
            };
        }
        ProfilePlotOptions {
            title,
            display: (self.config.plot_start_time, self.config.plot_end_time),
            stim_onset: Some(0.0),
            stim_end: Some(self.config.stim_end_time),
        }
    }
    fn write_output(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, SyncError> {
        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| SyncError::file_access(&self.output_dir, e))?;
        let path = self.output_dir.join(name);
        std::fs::write(&path, bytes).map_err(|e| SyncError::file_access(&path, e))?;
        log::debug!("wrote {}", path.display());
        Ok(path)
    }
}
/// Session files in `dir` with their labels, in chronological order.
pub fn session_files(dir: &Path, prefix: &str) -> Result<Vec<(PathBuf, SessionLabel)>, SyncError> {
    let entries = std::fs::read_dir(dir).map_err(|e| SyncError::file_access(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| SyncError::file_access(dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let supported = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if !supported {
            log::debug!("ignoring {}", path.display());
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let label = parse_session_label(&name, prefix);
        files.push((path, label));
    }
    files.sort_by(|a, b| a.1.chronological(&b.1).then_with(|| a.0.cmp(&b.0)));
    Ok(files)
}
/// Runs the batch with default plot styling, writing images to `output_dir`.
pub fn process_multiple_sessions_from_directory(
    dir: &Path,
    config: AnalysisConfig,
    output_dir: &Path,
) -> Result<BatchReport, SyncError> {
    SessionPipeline::new(config, output_dir)?.process_multiple_sessions_from_directory(dir)
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::config::AlignmentPolicy;
    use crate::analysis::session::{SessionRecord, UnitId};
    use std::collections::BTreeMap;
    fn locked_session(stims: &[f64]) -> SessionRecord {
        let mut units = BTreeMap::new();
        for unit in 0..3i64 {
            let mut spikes: Vec<f64> = stims
                .iter()
                .flat_map(|&t| [t - 0.8, t + 0.01 * (unit as f64 + 1.0), t + 0.5 + 0.002 * unit as f64])
                .collect();
            spikes.push(0.05 * unit as f64);
            units.insert(UnitId::Index(unit), spikes);
        }
        SessionRecord::new(units, stims.to_vec(), 30000.0).unwrap()
    }
    #[test]
    fn single_file_writes_profile_and_histogram() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let path = input.path().join("ICMS92_15-Mar-2021.json");
        locked_session(&[5.0, 10.0, 15.0]).save_json(&path).unwrap();
        let pipeline = SessionPipeline::new(AnalysisConfig::default(), output.path()).unwrap();
        let report = pipeline.process_session_file(&path).unwrap();
        assert_eq!(report.label.text, "15-Mar-2021");
        assert_eq!(report.events, 3);
        assert_eq!(report.profiles, 3);
        assert_eq!(report.skipped_events, 0);
        assert_eq!(report.written.len(), 2);
        assert!(report.written.iter().all(|p| p.exists()));
        let sync = report.session_sync.unwrap();
        assert!((0.0..=1.0).contains(&sync));
        let mean = report.mean_profile_sync.unwrap();
        assert!((0.0..=1.0).contains(&mean));
    }
    #[test]
    fn whole_session_mode_yields_one_profile() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let path = input.path().join("whole.json");
        locked_session(&[5.0, 10.0]).save_json(&path).unwrap();
        let config = AnalysisConfig {
            extract_entire_session: true,
            ..Default::default()
        };
        let report = SessionPipeline::new(config, output.path())
            .unwrap()
            .process_session_file(&path)
            .unwrap();
        assert_eq!(report.events, 1);
        assert_eq!(report.profiles, 1);
        assert!(report.label.warning.is_some());
    }
    #[test]
    fn batch_continues_past_bad_files() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        locked_session(&[3.0, 6.0])
            .save_json(&input.path().join("ICMS92_02-Apr-2021.json"))
            .unwrap();
        locked_session(&[4.0])
            .save_json(&input.path().join("ICMS92_01-Apr-2021.json"))
            .unwrap();
        std::fs::write(input.path().join("ICMS92_03-Apr-2021.json"), b"{\"stim_trains\": []}").unwrap();
        std::fs::write(input.path().join("readme.txt"), b"not a session").unwrap();
        let report = process_multiple_sessions_from_directory(
            input.path(),
            AnalysisConfig::default(),
            output.path(),
        )
        .unwrap();
        let labels: Vec<&str> = report.sessions.iter().map(|s| s.label.text.as_str()).collect();
        assert_eq!(labels, vec!["01-Apr-2021", "02-Apr-2021"]);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(report.failures[0].error, SyncError::Format { .. }));
        let chart = report.comparison_plot.clone().unwrap();
        assert_eq!(chart, output.path().join(COMPARISON_PLOT_NAME));
        assert!(chart.exists());
        assert_eq!(report.summaries().len(), 2);
    }
    #[test]
    fn truncated_onset_profiles_are_plotted() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let mut units = BTreeMap::new();
        units.insert(UnitId::Index(0), vec![5.0, 10.0]);
        units.insert(UnitId::Index(1), vec![5.0, 10.0]);
        let path = input.path().join("ICMS92_15-Mar-2021.json");
        SessionRecord::new(units, vec![5.0, 10.0], 30000.0)
            .unwrap()
            .save_json(&path)
            .unwrap();
        let config = AnalysisConfig {
            pre_stimulus_time: -1.0,
            post_stimulus_time: 1.0,
            alignment: AlignmentPolicy::Truncate,
            ..Default::default()
        };
        let report = SessionPipeline::new(config, output.path())
            .unwrap()
            .process_session_file(&path)
            .unwrap();
        assert_eq!(report.events, 2);
        assert_eq!(report.profiles, 2);
        assert_eq!(report.mean_profile_sync, Some(1.0));
        assert_eq!(report.session_sync, Some(1.0));
        let profile_png = output.path().join("ICMS92_15-Mar-2021_sync_profile.png");
        assert!(report.written.contains(&profile_png));
        assert!(profile_png.exists());
    }
    #[test]
    fn comparison_failure_keeps_the_report() {
        let input = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        // No stimulation events: nothing is written per session, only the comparison chart.
        let mut units = BTreeMap::new();
        units.insert(UnitId::Index(0), vec![1.0, 2.0]);
        units.insert(UnitId::Index(1), vec![1.0, 2.5]);
        SessionRecord::new(units, vec![], 1000.0)
            .unwrap()
            .save_json(&input.path().join("ICMS92_01-Apr-2021.json"))
            .unwrap();
        let not_a_dir = scratch.path().join("plots");
        std::fs::write(&not_a_dir, b"occupied").unwrap();
        let report =
            process_multiple_sessions_from_directory(input.path(), AnalysisConfig::default(), &not_a_dir)
                .unwrap();
        assert_eq!(report.sessions.len(), 1);
        assert!(report.failures.is_empty());
        assert_eq!(report.summaries().len(), 1);
        assert_eq!(report.comparison_plot, None);
    }
    #[test]
    fn missing_directory_aborts() {
        let output = tempfile::tempdir().unwrap();
        let missing = output.path().join("nope");
        let err = process_multiple_sessions_from_directory(&missing, AnalysisConfig::default(), output.path())
            .unwrap_err();
        assert!(matches!(err, SyncError::FileAccess { .. }));
    }
    #[test]
    fn silent_session_has_no_outputs() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let mut units = BTreeMap::new();
        units.insert(UnitId::Index(0), vec![1.0, 2.0]);
        units.insert(UnitId::Index(1), vec![]);
        let path = input.path().join("quiet.json");
        SessionRecord::new(units, vec![1.0], 1000.0)
            .unwrap()
            .save_json(&path)
            .unwrap();
        let report = SessionPipeline::new(AnalysisConfig::default(), output.path())
            .unwrap()
            .process_session_file(&path)
            .unwrap();
        assert_eq!(report.skipped_events, 1);
        assert!(report.written.is_empty());
        assert_eq!(report.session_sync, None);
    }
}
