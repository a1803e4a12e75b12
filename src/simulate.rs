//! Synthetic ICMS sessions: Poisson background firing with stimulus-locked
//! responses, written in the same layout the loader reads.
use std::collections::BTreeMap;
use rand::Rng;
use rand_distr::{Distribution, Exp, Uniform};
use crate::analysis::session::{SessionRecord, UnitId};
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationParams {
    pub units: usize,
    pub events: usize,
    /// Background firing rate of every unit.
    pub baseline_rate_hz: f64,
    /// Spacing of stimulation onsets, in seconds.
    pub inter_event_s: f64,
    /// Chance that a unit answers a given stimulation.
    pub response_probability: f64,
    pub latency_s: f64,
    /// Half-width of the uniform jitter around the response latency.
    pub jitter_s: f64,
    pub sampling_rate: f64,
}
impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            units: 8,
            events: 20,
            baseline_rate_hz: 5.0,
            inter_event_s: 4.0,
            response_probability: 0.8,
            latency_s: 0.01,
            jitter_s: 0.002,
            sampling_rate: 30000.0,
        }
    }
}
impl SimulationParams {
    /// Recording length: one inter-event gap before the first and after the last event.
    pub fn duration(&self) -> f64 {
        (self.events + 1) as f64 * self.inter_event_s
    }
    pub fn stim_times(&self) -> Vec<f64> {
        (1..=self.events)
            .map(|k| k as f64 * self.inter_event_s)
            .collect()
    }
}
pub fn simulate_session<R: Rng>(params: &SimulationParams, rng: &mut R) -> Result<SessionRecord, String> {
    if !(0.0..=1.0).contains(&params.response_probability) {
        return Err(format!(
            "response probability must be within [0, 1], got {}",
            params.response_probability
        ));
    }
    // exponential inter-spike intervals give Poisson background firing
    let isi = Exp::new(params.baseline_rate_hz)
        .map_err(|e| format!("baseline rate {} Hz: {e}", params.baseline_rate_hz))?;
    let duration = params.duration();
    let stim_times = params.stim_times();
    let jitter = Uniform::new_inclusive(-params.jitter_s.abs(), params.jitter_s.abs());
    let mut units = BTreeMap::new();
    for u in 0..params.units {
        let mut spikes = Vec::new();
        if params.baseline_rate_hz > 0.0 {
            let mut t = 0.0;
            loop {
                t += isi.sample(rng);
                if t >= duration {
                    break;
                }
                spikes.push(t);
            }
        }
        for &stim in &stim_times {
            if rng.gen_bool(params.response_probability) {
                spikes.push(stim + params.latency_s + jitter.sample(rng));
            }
        }
        spikes.sort_by(f64::total_cmp);
        units.insert(UnitId::Name(format!("unit_{:02}", u + 1)), spikes);
    }
    log::debug!(
        "simulated {} units over {duration} s with {} stimulation events",
        params.units,
        stim_times.len()
    );
    SessionRecord::new(units, stim_times, params.sampling_rate)
}
