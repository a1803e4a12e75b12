//! SPIKE-synchronization (Kreuz et al., 2015).
//!
//! Every spike is compared with the nearest spike of each other train. The two
//! are coincident when they are closer than an adaptive window `τ`, half the
//! smallest inter-spike interval around either of them. A spike's value is the
//! fraction of other trains it is coincident with, so every point of a profile
//! lies in `[0, 1]`.
use crate::analysis::error::SyncError;
use crate::analysis::extract::EventWindow;
/// Synchrony value at one instant. Spikes of several trains falling on the same
/// instant are merged into one point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProfilePoint {
    pub time: f64,
    pub value: f64,
    pub multiplicity: usize,
}
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SyncProfile {
    pub points: Vec<ProfilePoint>,
    /// Coincidence windows evaluated while building the profile.
    pub adaptive_windows: Vec<f64>,
}
impl SyncProfile {
    pub fn len(&self) -> usize {
        self.points.len()
    }
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
    pub fn times(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.time).collect()
    }
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }
    /// Spike-weighted mean of the profile, i.e. the overall synchrony.
    pub fn mean_value(&self) -> Option<f64> {
        let spikes: usize = self.points.iter().map(|p| p.multiplicity).sum();
        if spikes == 0 {
            return None;
        }
        let total: f64 = self
            .points
            .iter()
            .map(|p| p.value * p.multiplicity as f64)
            .sum();
        Some(total / spikes as f64)
    }
}
/// A multivariate spike-train synchrony measure.
pub trait SynchronyMetric {
    /// Synchrony time series over `trains`, observed on `edges`.
    fn profile(&self, trains: &[&[f64]], edges: (f64, f64)) -> SyncProfile;
    /// Single synchrony value for the whole observation, `None` when undefined.
    fn value(&self, trains: &[&[f64]], edges: (f64, f64)) -> Option<f64> {
        self.profile(trains, edges).mean_value()
    }
}
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SpikeSync {
    /// Upper bound on the coincidence window, in seconds.
    pub max_tau: Option<f64>,
}
impl SpikeSync {
    pub fn new(max_tau: Option<f64>) -> Self {
        Self { max_tau }
    }
    /// Half the smallest interval around spike `i` of `a` and spike `j` of `b`,
    /// never larger than half the observation interval.
    fn tau(&self, a: &[f64], i: usize, b: &[f64], j: usize, interval: f64) -> f64 {
        let mut m = interval;
        for (train, k) in [(a, i), (b, j)] {
            if k + 1 < train.len() {
                m = m.min(train[k + 1] - train[k]);
            }
            if k > 0 {
                m = m.min(train[k] - train[k - 1]);
            }
        }
        let tau = 0.5 * m;
        match self.max_tau {
            Some(cap) => tau.min(cap),
            None => tau,
        }
    }
    /// Coincidence of spike `i` of `a` with its nearest neighbour in `b`,
    /// along with the window used.
    fn coincidence(&self, a: &[f64], i: usize, b: &[f64], interval: f64) -> Option<(bool, f64)> {
        let t = a[i];
        let after = b.partition_point(|&s| s < t);
        let j = match (after.checked_sub(1), (after < b.len()).then_some(after)) {
            (Some(before), Some(after)) => {
                if t - b[before] <= b[after] - t {
                    before
                } else {
                    after
                }
            }
            (Some(before), None) => before,
            (None, Some(after)) => after,
            (None, None) => return None,
        };
        let delta = (t - b[j]).abs();
        let tau = self.tau(a, i, b, j, interval);
        Some((delta == 0.0 || delta < tau, tau))
    }
}
impl SynchronyMetric for SpikeSync {
    fn profile(&self, trains: &[&[f64]], edges: (f64, f64)) -> SyncProfile {
        if trains.len() < 2 {
            return SyncProfile::default();
        }
        let interval = edges.1 - edges.0;
        let others = (trains.len() - 1) as f64;
        let mut pooled: Vec<(f64, f64)> = Vec::with_capacity(trains.iter().map(|t| t.len()).sum());
        let mut adaptive_windows = Vec::new();
        for (n, train) in trains.iter().enumerate() {
            for i in 0..train.len() {
                let mut hits = 0usize;
                for (m, other) in trains.iter().enumerate() {
                    if m == n {
                        continue;
                    }
                    if let Some((coincident, tau)) = self.coincidence(train, i, other, interval) {
                        adaptive_windows.push(tau);
                        hits += usize::from(coincident);
                    }
                }
                pooled.push((train[i], hits as f64 / others));
            }
        }
        pooled.sort_by(|a, b| a.0.total_cmp(&b.0));
        let mut points: Vec<ProfilePoint> = Vec::with_capacity(pooled.len());
        for (time, value) in pooled {
            match points.last_mut() {
                Some(last) if last.time == time => {
                    let k = last.multiplicity as f64;
                    last.value = (last.value * k + value) / (k + 1.0);
                    last.multiplicity += 1;
                }
                _ => points.push(ProfilePoint {
                    time,
                    value,
                    multiplicity: 1,
                }),
            }
        }
        SyncProfile {
            points,
            adaptive_windows,
        }
    }
}
/// Profile of one event that passed the activity check.
#[derive(Clone, Debug, PartialEq)]
pub struct EventProfile {
    pub event_index: usize,
    pub edges: (f64, f64),
    pub profile: SyncProfile,
}
#[derive(Debug)]
pub struct SkippedEvent {
    pub event_index: usize,
    pub reason: SyncError,
}
#[derive(Debug, Default)]
pub struct SyncProfiles {
    pub profiles: Vec<EventProfile>,
    /// Every adaptive window of every computed profile, in event order.
    pub adaptive_windows: Vec<f64>,
    pub skipped: Vec<SkippedEvent>,
}
impl SyncProfiles {
    pub fn sync_profiles(&self) -> impl Iterator<Item = &SyncProfile> {
        self.profiles.iter().map(|p| &p.profile)
    }
}
/// Runs `metric` on every window with at least two active units. Windows that
/// fail the check are recorded in `skipped` and do not produce a profile.
pub fn calculate_sync_profiles<M: SynchronyMetric + ?Sized>(
    windows: &[EventWindow],
    metric: &M,
) -> SyncProfiles {
    let mut out = SyncProfiles::default();
    for window in windows {
        let active = window.active_units();
        if active < 2 {
            let reason = SyncError::InsufficientData {
                event: window.event_index,
                active,
            };
            log::warn!("skipping {reason}");
            out.skipped.push(SkippedEvent {
                event_index: window.event_index,
                reason,
            });
            continue;
        }
        let mut profile = metric.profile(&window.spike_trains(), window.edges);
        out.adaptive_windows
            .extend(std::mem::take(&mut profile.adaptive_windows));
        out.profiles.push(EventProfile {
            event_index: window.event_index,
            edges: window.edges,
            profile,
        });
    }
    log::info!(
        "computed {} synchrony profiles, skipped {} events",
        out.profiles.len(),
        out.skipped.len()
    );
    out
}
/// Overall synchrony of one window, `None` with fewer than two active units.
pub fn window_synchrony<M: SynchronyMetric + ?Sized>(window: &EventWindow, metric: &M) -> Option<f64> {
    if window.active_units() < 2 {
        return None;
    }
    metric.value(&window.spike_trains(), window.edges)
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::extract::WindowedSpikeTrain;
    use crate::analysis::session::UnitId;
    use approx::assert_abs_diff_eq;
    fn window(event_index: usize, trains: Vec<Vec<f64>>) -> EventWindow {
        EventWindow {
            event_index,
            stim_time: Some(event_index as f64),
            edges: (-1.0, 1.0),
            trains: trains
                .into_iter()
                .enumerate()
                .map(|(i, spike_times)| WindowedSpikeTrain {
                    unit: UnitId::Index(i as i64),
                    spike_times,
                })
                .collect(),
        }
    }
    #[test]
    fn identical_onset_spikes_are_fully_synchronous() {
        let profile = SpikeSync::default().profile(&[&[0.0], &[0.0]], (-1.0, 1.0));
        assert_eq!(
            profile.points,
            vec![ProfilePoint {
                time: 0.0,
                value: 1.0,
                multiplicity: 2
            }]
        );
        assert_eq!(profile.adaptive_windows, vec![1.0, 1.0]);
    }
    #[test]
    fn distant_spikes_do_not_coincide() {
        let a = [0.0, 0.1, 0.2];
        let b = [0.05 + 0.3, 0.45];
        let profile = SpikeSync::default().profile(&[&a, &b], (-1.0, 1.0));
        assert!(profile.points.iter().all(|p| p.value == 0.0));
        assert_eq!(profile.len(), 5);
    }
    #[test]
    fn window_adapts_to_local_firing_rate() {
        // 10 ms apart: coincident while the neighbouring ISIs are 100 ms...
        let slow = SpikeSync::default().profile(&[&[0.0, 0.1], &[0.01, 0.11]], (-1.0, 1.0));
        assert_abs_diff_eq!(slow.mean_value().unwrap(), 1.0);
        // ...but not when a burst shrinks the window below 10 ms.
        let fast = SpikeSync::default().profile(
            &[&[0.0, 0.005, 0.1], &[0.01, 0.11]],
            (-1.0, 1.0),
        );
        assert_eq!(fast.points[0].value, 0.0);
    }
    #[test]
    fn max_tau_caps_the_window() {
        let trains: [&[f64]; 2] = [&[0.0], &[0.02]];
        assert_eq!(SpikeSync::default().value(&trains, (-1.0, 1.0)), Some(1.0));
        assert_eq!(SpikeSync::new(Some(0.01)).value(&trains, (-1.0, 1.0)), Some(0.0));
    }
    #[test]
    fn values_are_bounded() {
        let trains: Vec<Vec<f64>> = (0..5)
            .map(|u| (0..40).map(|k| -1.0 + k as f64 * 0.05 + u as f64 * 0.003).collect())
            .collect();
        let refs: Vec<&[f64]> = trains.iter().map(|t| t.as_slice()).collect();
        let profile = SpikeSync::default().profile(&refs, (-1.0, 1.0));
        assert!(!profile.is_empty());
        assert!(profile.values().iter().all(|v| (0.0..=1.0).contains(v)));
        assert!(profile.times().windows(2).all(|w| w[0] < w[1]));
    }
    #[test]
    fn empty_train_lowers_synchrony() {
        let profile = SpikeSync::default().profile(&[&[0.0], &[0.0], &[]], (-1.0, 1.0));
        assert_abs_diff_eq!(profile.points[0].value, 0.5);
    }
    #[test]
    fn onset_locked_session_is_fully_synchronous() {
        use crate::analysis::extract::extract;
        use crate::analysis::session::SessionRecord;
        use std::collections::BTreeMap;
        let mut units = BTreeMap::new();
        units.insert(UnitId::Index(0), vec![5.0, 10.0]);
        units.insert(UnitId::Index(1), vec![5.0, 10.0]);
        let session = SessionRecord::new(units, vec![5.0, 10.0], 30000.0).unwrap();
        let windows = extract(&session, -1.0, 1.0, false).unwrap();
        let result = calculate_sync_profiles(&windows, &SpikeSync::default());
        assert!(result.skipped.is_empty());
        assert_eq!(result.profiles.len(), 2);
        for p in &result.profiles {
            assert_eq!(p.edges, (-1.0, 1.0));
            assert_eq!(p.profile.times(), vec![0.0]);
            assert_eq!(p.profile.values(), vec![1.0]);
        }
    }
    #[test]
    fn single_active_unit_is_skipped() {
        let windows = vec![
            window(0, vec![vec![0.0], vec![0.0]]),
            window(1, vec![vec![0.0, 0.3], vec![]]),
            window(2, vec![vec![0.2], vec![0.2]]),
        ];
        let result = calculate_sync_profiles(&windows, &SpikeSync::default());
        let indices: Vec<usize> = result.profiles.iter().map(|p| p.event_index).collect();
        assert_eq!(indices, vec![0, 2]);
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].event_index, 1);
        assert!(matches!(
            result.skipped[0].reason,
            SyncError::InsufficientData { event: 1, active: 1 }
        ));
        assert_eq!(result.adaptive_windows.len(), 4);
        for p in result.sync_profiles() {
            assert_eq!(p.values(), vec![1.0]);
            assert!(p.adaptive_windows.is_empty());
        }
    }
    #[test]
    fn window_synchrony_needs_two_active_units() {
        assert_eq!(window_synchrony(&window(0, vec![vec![0.1], vec![]]), &SpikeSync::default()), None);
        assert_eq!(
            window_synchrony(&window(0, vec![vec![0.1], vec![0.1]]), &SpikeSync::default()),
            Some(1.0)
        );
    }
}
