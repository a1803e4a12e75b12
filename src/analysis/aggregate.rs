use ndarray::{Array1, Array2, Axis};
use crate::analysis::config::{AlignmentPolicy, HistogramBinning};
use crate::analysis::error::SyncError;
use crate::analysis::spike_sync::SyncProfile;
/// Mean synchrony across events on a shared time axis.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AverageProfile {
    pub times: Vec<f64>,
    pub values: Vec<f64>,
    pub num_profiles: usize,
    /// Window the profiles were averaged over.
    pub edges: (f64, f64),
}
impl AverageProfile {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
    pub fn mean_value(&self) -> Option<f64> {
        Array1::from_vec(self.values.clone()).mean()
    }
    /// Points with `start <= time <= end`.
    pub fn points_within(&self, start: f64, end: f64) -> Vec<(f64, f64)> {
        self.times
            .iter()
            .zip(&self.values)
            .filter(|(t, _)| (start..=end).contains(*t))
            .map(|(&t, &v)| (t, v))
            .collect()
    }
}
/// Puts every profile on a common time base over `edges` and takes the
/// elementwise mean.
pub fn average_profiles<'a, I>(
    profiles: I,
    edges: (f64, f64),
    policy: AlignmentPolicy,
) -> Result<AverageProfile, SyncError>
where
    I: IntoIterator<Item = &'a SyncProfile>,
{
    let profiles: Vec<&SyncProfile> = profiles.into_iter().filter(|p| !p.is_empty()).collect();
    if profiles.is_empty() {
        return Ok(AverageProfile::default());
    }
    let (times, rows): (Array1<f64>, Vec<Vec<f64>>) = match policy {
        AlignmentPolicy::Resample { points } => {
            if points < 2 {
                return Err(SyncError::Config(
                    "resampling needs at least two points".into(),
                ));
            }
            let grid = Array1::linspace(edges.0, edges.1, points);
            let rows = profiles
                .iter()
                .map(|p| grid.iter().map(|&x| interpolate(p, x)).collect())
                .collect();
            (grid, rows)
        }
        AlignmentPolicy::Truncate => {
            let shortest = profiles.iter().map(|p| p.len()).min().unwrap_or(0);
            if shortest < profiles.iter().map(|p| p.len()).max().unwrap_or(0) {
                log::debug!("truncating {} profiles to {shortest} points", profiles.len());
            }
            let rows = profiles
                .iter()
                .map(|p| p.points[..shortest].iter().map(|pt| pt.value).collect())
                .collect();
            (Array1::linspace(edges.0, edges.1, shortest), rows)
        }
    };
    let width = times.len();
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    let stacked = Array2::from_shape_vec((profiles.len(), width), flat)
        .map_err(|e| SyncError::Config(e.to_string()))?;
    let mean = stacked
        .mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(width));
    Ok(AverageProfile {
        times: times.to_vec(),
        values: mean.to_vec(),
        num_profiles: profiles.len(),
        edges,
    })
}
// Linear between neighbouring points, flat beyond the first and last spike.
fn interpolate(profile: &SyncProfile, x: f64) -> f64 {
    let points = &profile.points;
    let k = points.partition_point(|p| p.time <= x);
    if k == 0 {
        return points[0].value;
    }
    if k == points.len() {
        return points[k - 1].value;
    }
    let (a, b) = (points[k - 1], points[k]);
    let w = (x - a.time) / (b.time - a.time);
    a.value + w * (b.value - a.value)
}
/// Counts of adaptive windows per bin, plus what fell outside the binning.
#[derive(Clone, Debug, PartialEq)]
pub struct WindowHistogram {
    pub binning: HistogramBinning,
    pub counts: Vec<usize>,
    pub underflow: usize,
    pub overflow: usize,
}
impl WindowHistogram {
    pub fn bin_edges(&self, bin: usize) -> (f64, f64) {
        let width = (self.binning.max - self.binning.min) / self.binning.bins as f64;
        let lo = self.binning.min + bin as f64 * width;
        (lo, lo + width)
    }
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}
pub fn histogram(widths: &[f64], binning: HistogramBinning) -> WindowHistogram {
    let mut counts = vec![0usize; binning.bins];
    let (mut underflow, mut overflow) = (0, 0);
    let scale = binning.bins as f64 / (binning.max - binning.min);
    for &w in widths {
        if w < binning.min {
            underflow += 1;
        } else if w >= binning.max {
            overflow += 1;
        } else {
            let bin = (((w - binning.min) * scale) as usize).min(binning.bins - 1);
            counts[bin] += 1;
        }
    }
    if overflow > 0 {
        log::debug!(
            "{overflow} of {} adaptive windows exceed {} s and are not binned",
            widths.len(),
            binning.max
        );
    }
    WindowHistogram {
        binning,
        counts,
        underflow,
        overflow,
    }
}
