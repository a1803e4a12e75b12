use crate::analysis::error::SyncError;
use crate::analysis::session::{SessionRecord, UnitId};
/// Spike times of one unit inside one window.
#[derive(Clone, Debug, PartialEq)]
pub struct WindowedSpikeTrain {
    pub unit: UnitId,
    pub spike_times: Vec<f64>,
}
/// All units' spike trains around one stimulation event, or over the whole session.
#[derive(Clone, Debug, PartialEq)]
pub struct EventWindow {
    pub event_index: usize,
    /// Absolute onset of the event; `None` for a whole-session window.
    pub stim_time: Option<f64>,
    /// `[start, end)` of the window in the same time frame as the spike times.
    pub edges: (f64, f64),
    pub trains: Vec<WindowedSpikeTrain>,
}
impl EventWindow {
    /// Number of units with at least one spike in the window.
    pub fn active_units(&self) -> usize {
        self.trains
            .iter()
            .filter(|t| !t.spike_times.is_empty())
            .count()
    }
    pub fn spike_trains(&self) -> Vec<&[f64]> {
        self.trains.iter().map(|t| t.spike_times.as_slice()).collect()
    }
    pub fn total_spikes(&self) -> usize {
        self.trains.iter().map(|t| t.spike_times.len()).sum()
    }
}
/// Slices every unit's spikes into `[t + pre_time, t + post_time)` around each
/// stimulation time `t`, re-expressed relative to `t`. With `whole_session`
/// a single window carries the unmodified trains instead.
///
/// Events close to the start or end of the recording keep their short or
/// empty trains; callers decide what to do with them.
pub fn extract(
    session: &SessionRecord,
    pre_time: f64,
    post_time: f64,
    whole_session: bool,
) -> Result<Vec<EventWindow>, SyncError> {
    if !(pre_time.is_finite() && post_time.is_finite()) || pre_time >= post_time {
        return Err(SyncError::Config(format!(
            "extraction window [{pre_time}, {post_time}) is empty"
        )));
    }
    if whole_session {
        return Ok(vec![whole_session_window(session)]);
    }
    let windows: Vec<EventWindow> = session
        .stim_times()
        .iter()
        .enumerate()
        .map(|(event_index, &stim_time)| {
            let trains = session
                .units()
                .iter()
                .map(|(unit, spikes)| WindowedSpikeTrain {
                    unit: unit.clone(),
                    spike_times: slice_relative(spikes, stim_time, pre_time, post_time),
                })
                .collect();
            EventWindow {
                event_index,
                stim_time: Some(stim_time),
                edges: (pre_time, post_time),
                trains,
            }
        })
        .collect();
    log::info!(
        "extracted {} event windows of [{pre_time}, {post_time}) s across {} units",
        windows.len(),
        session.num_units()
    );
    Ok(windows)
}
// `spikes` is sorted, so `s - t` is monotone and both bounds can be found by bisection.
fn slice_relative(spikes: &[f64], t: f64, pre_time: f64, post_time: f64) -> Vec<f64> {
    let lo = spikes.partition_point(|&s| s - t < pre_time);
    let hi = spikes.partition_point(|&s| s - t < post_time);
    spikes[lo..hi.max(lo)].iter().map(|&s| s - t).collect()
}
fn whole_session_window(session: &SessionRecord) -> EventWindow {
    let (first, last) = session.time_span().unwrap_or((0.0, 0.0));
    let start = first.min(0.0);
    let end = if last > start { last } else { start + 1.0 };
    EventWindow {
        event_index: 0,
        stim_time: None,
        edges: (start, end),
        trains: session
            .units()
            .iter()
            .map(|(unit, spikes)| WindowedSpikeTrain {
                unit: unit.clone(),
                spike_times: spikes.clone(),
            })
            .collect(),
    }
}
