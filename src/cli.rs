use std::path::PathBuf;
use clap::{Args, Parser, Subcommand, ValueEnum};
use stimsync::analysis::{AlignmentPolicy, AnalysisConfig, SyncError, TimeBase};
#[derive(Parser)]
#[command(
    name = "stimsync",
    version,
    about = "SPIKE-synchronization around ICMS stimulation events",
    long_about = "Loads sorted-unit spike trains and stimulation timestamps, computes\n\
                  SPIKE-synchronization profiles per event and plots them per session."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}
#[derive(Subcommand)]
pub enum Command {
    /// Analyse every session file in a directory and compare sessions
    Batch(BatchArgs),
    /// Analyse a single session file
    Session(SessionArgs),
    /// Write a synthetic session file
    Simulate(SimulateArgs),
}
#[derive(Args)]
pub struct BatchArgs {
    /// Directory holding the session files
    pub dir: PathBuf,
    #[command(flatten)]
    pub analysis: AnalysisArgs,
}
#[derive(Args)]
pub struct SessionArgs {
    /// Session file (.pkl, .pickle or .json)
    pub file: PathBuf,
    #[command(flatten)]
    pub analysis: AnalysisArgs,
}
#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AlignmentMode {
    Resample,
    Truncate,
}
#[derive(Args)]
pub struct AnalysisArgs {
    /// Output directory for the plots
    #[arg(short, long, default_value = "sync_plots")]
    pub out: PathBuf,
    /// JSON file with analysis parameters; flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Window start relative to stimulation onset, in seconds
    #[arg(long, allow_hyphen_values = true)]
    pub pre: Option<f64>,
    /// Window end relative to stimulation onset, in seconds
    #[arg(long, allow_hyphen_values = true)]
    pub post: Option<f64>,
    /// Treat each session as a single window instead of per-event windows
    #[arg(long, default_value_t = false)]
    pub whole_session: bool,
    /// Unit of the timestamps in the input files
    #[arg(long, value_enum)]
    pub time_base: Option<TimeBase>,
    /// How profiles of different lengths are averaged
    #[arg(long, value_enum)]
    pub alignment: Option<AlignmentMode>,
    /// Grid size used by --alignment resample
    #[arg(long)]
    pub resample_points: Option<usize>,
    /// Cap on the coincidence window, in seconds
    #[arg(long)]
    pub max_tau: Option<f64>,
    /// Subject prefix of session file names
    #[arg(long)]
    pub prefix: Option<String>,
}
impl AnalysisArgs {
    /// Defaults, then the config file, then command-line overrides.
    pub fn to_config(&self) -> Result<AnalysisConfig, SyncError> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::from_json_file(path)?,
            None => AnalysisConfig::default(),
        };
        if let Some(pre) = self.pre {
            config.pre_stimulus_time = pre;
        }
        if let Some(post) = self.post {
            config.post_stimulus_time = post;
        }
        if self.whole_session {
            config.extract_entire_session = true;
        }
        if let Some(time_base) = self.time_base {
            config.time_base = time_base;
        }
        config.alignment = match (self.alignment, config.alignment) {
            (Some(AlignmentMode::Truncate), _) => AlignmentPolicy::Truncate,
            (None, AlignmentPolicy::Truncate) => AlignmentPolicy::Truncate,
            (_, current) => {
                let fallback = match current {
                    AlignmentPolicy::Resample { points } => points,
                    AlignmentPolicy::Truncate => 500,
                };
                AlignmentPolicy::Resample {
                    points: self.resample_points.unwrap_or(fallback),
                }
            }
        };
        if self.max_tau.is_some() {
            config.max_tau = self.max_tau;
        }
        if let Some(prefix) = &self.prefix {
            config.session_prefix = prefix.clone();
        }
        config.validate()?;
        Ok(config)
    }
}
#[derive(Args)]
pub struct SimulateArgs {
    /// Output JSON file
    pub file: PathBuf,
    /// Number of units
    #[arg(long, default_value_t = 8)]
    pub units: usize,
    /// Number of stimulation events
    #[arg(long, default_value_t = 20)]
    pub events: usize,
    /// Background firing rate in Hz
    #[arg(long, default_value_t = 5.0)]
    pub rate: f64,
    /// Probability that a unit responds to a stimulation
    #[arg(long, default_value_t = 0.8)]
    pub response_probability: f64,
    /// Random seed
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
}
#[cfg(test)]
mod tests {
    use super::*;
    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }
    #[test]
    fn batch_flags_override_defaults() {
        let cli = parse(&[
            "stimsync", "-vv", "batch", "data", "--pre", "-0.5", "--post", "1.0", "--alignment", "truncate",
        ]);
        assert_eq!(cli.verbose, 2);
        let Command::Batch(args) = cli.command else {
            panic!("expected batch");
        };
        assert_eq!(args.dir, PathBuf::from("data"));
        let config = args.analysis.to_config().unwrap();
        assert_eq!(config.window(), (-0.5, 1.0));
        assert_eq!(config.alignment, AlignmentPolicy::Truncate);
        assert_eq!(config.plot_start_time, -0.7);
    }
    #[test]
    fn resample_points_and_time_base() {
        let cli = parse(&[
            "stimsync", "session", "ICMS92_15-Mar-2021.pkl", "--resample-points", "64", "--time-base", "samples",
        ]);
        let Command::Session(args) = cli.command else {
            panic!("expected session");
        };
        let config = args.analysis.to_config().unwrap();
        assert_eq!(config.alignment, AlignmentPolicy::Resample { points: 64 });
        assert_eq!(config.time_base, TimeBase::Samples);
    }
    #[test]
    fn invalid_override_is_rejected() {
        let cli = parse(&["stimsync", "batch", "data", "--pre", "2", "--post", "1"]);
        let Command::Batch(args) = cli.command else {
            panic!("expected batch");
        };
        assert!(matches!(args.analysis.to_config(), Err(SyncError::Config(_))));
    }
}
