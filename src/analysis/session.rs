use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use crate::analysis::config::TimeBase;
use crate::analysis::error::SyncError;
/// File extensions the loader understands.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pkl", "pickle", "json"];
/// Identifier of a sorted unit. Numeric ids sort before named ones.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UnitId {
    Index(i64),
    Name(String),
}
impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitId::Index(i) => write!(f, "{i}"),
            UnitId::Name(name) => f.write_str(name),
        }
    }
}
impl Serialize for UnitId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            UnitId::Index(i) => serializer.serialize_i64(*i),
            UnitId::Name(name) => serializer.serialize_str(name),
        }
    }
}
struct UnitIdVisitor;
impl<'de> Visitor<'de> for UnitIdVisitor {
    type Value = UnitId;
    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an integer or string unit id")
    }
    fn visit_i64<E: de::Error>(self, v: i64) -> Result<UnitId, E> {
        Ok(UnitId::Index(v))
    }
    fn visit_u64<E: de::Error>(self, v: u64) -> Result<UnitId, E> {
        i64::try_from(v)
            .map(UnitId::Index)
            .map_err(|_| E::custom(format!("unit id {v} out of range")))
    }
    // JSON object keys are always strings; "12" still means unit 12.
    fn visit_str<E: de::Error>(self, v: &str) -> Result<UnitId, E> {
        Ok(v.parse::<i64>()
            .map(UnitId::Index)
            .unwrap_or_else(|_| UnitId::Name(v.to_owned())))
    }
    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<UnitId, E> {
        std::str::from_utf8(v)
            .map_err(E::custom)
            .and_then(|s| self.visit_str(s))
    }
}
impl<'de> Deserialize<'de> for UnitId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(UnitIdVisitor)
    }
}
/// One entry of `stim_trains`: a single onset or a whole train of pulses.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum StimEntry {
    Onset(f64),
    Train(Vec<f64>),
}
#[derive(Deserialize)]
struct RawSession {
    unit_spike_train_dict: BTreeMap<UnitId, Vec<f64>>,
    stim_trains: Vec<StimEntry>,
    sampling_rate: f64,
}
#[derive(Serialize)]
struct RawSessionRef<'a> {
    unit_spike_train_dict: &'a BTreeMap<UnitId, Vec<f64>>,
    stim_trains: &'a [f64],
    sampling_rate: f64,
}
/// Spike and stimulation timestamps of one recording session, in seconds.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionRecord {
    units: BTreeMap<UnitId, Vec<f64>>,
    stim_times: Vec<f64>,
    sampling_rate: f64,
}
impl SessionRecord {
    /// Builds a record from already-converted timestamps. Spike trains are sorted.
    pub fn new(
        units: BTreeMap<UnitId, Vec<f64>>,
        stim_times: Vec<f64>,
        sampling_rate: f64,
    ) -> Result<Self, String> {
        if !(sampling_rate.is_finite() && sampling_rate > 0.0) {
            return Err(format!("sampling rate must be positive, got {sampling_rate}"));
        }
        if let Some(t) = stim_times.iter().find(|t| !t.is_finite()) {
            return Err(format!("non-finite stimulation timestamp {t}"));
        }
        let mut units = units;
        for (id, spikes) in units.iter_mut() {
            if let Some(t) = spikes.iter().find(|t| !t.is_finite()) {
                return Err(format!("unit {id}: non-finite spike timestamp {t}"));
            }
            if !spikes.windows(2).all(|w| w[0] <= w[1]) {
                log::debug!("unit {id}: sorting {} spike timestamps", spikes.len());
                spikes.sort_by(f64::total_cmp);
            }
        }
        Ok(Self {
            units,
            stim_times,
            sampling_rate,
        })
    }
    pub fn units(&self) -> &BTreeMap<UnitId, Vec<f64>> {
        &self.units
    }
    pub fn stim_times(&self) -> &[f64] {
        &self.stim_times
    }
    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }
    pub fn num_units(&self) -> usize {
        self.units.len()
    }
    /// Earliest and latest timestamp over all spikes and stimulation events.
    pub fn time_span(&self) -> Option<(f64, f64)> {
        self.units
            .values()
            .flat_map(|s| s.first().into_iter().chain(s.last()))
            .chain(self.stim_times.iter())
            .fold(None, |acc, &t| match acc {
                None => Some((t, t)),
                Some((lo, hi)) => Some((f64::min(lo, t), f64::max(hi, t))),
            })
    }
    /// Writes the record in the JSON layout [`SessionLoader`] reads back.
    pub fn save_json(&self, path: &Path) -> Result<(), SyncError> {
        let raw = RawSessionRef {
            unit_spike_train_dict: &self.units,
            stim_trains: &self.stim_times,
            sampling_rate: self.sampling_rate,
        };
        let bytes =
            serde_json::to_vec_pretty(&raw).map_err(|e| SyncError::format(path, e.to_string()))?;
        std::fs::write(path, bytes).map_err(|e| SyncError::file_access(path, e))
    }
}
/// Reads session files (`.pkl`/`.pickle` or `.json`) into [`SessionRecord`]s.
#[derive(Clone, Copy, Debug, Default)]
pub struct SessionLoader {
    time_base: TimeBase,
}
impl SessionLoader {
    pub fn new(time_base: TimeBase) -> Self {
        Self { time_base }
    }
    pub fn load(&self, path: &Path) -> Result<SessionRecord, SyncError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(SyncError::format(
                path,
                format!("unsupported file extension {extension:?}"),
            ));
        }
        let bytes = std::fs::read(path).map_err(|e| SyncError::file_access(path, e))?;
        let raw: RawSession = match extension.as_str() {
            "json" => serde_json::from_slice(&bytes)
                .map_err(|e| SyncError::format(path, e.to_string()))?,
            _ => serde_pickle::from_slice(&bytes, serde_pickle::DeOptions::new())
                .map_err(|e| SyncError::format(path, pickle_error_reason(&bytes, e)))?,
        };
        let (units, stim_times, rate) = self.convert(raw, path);
        let record = SessionRecord::new(units, stim_times, rate)
            .map_err(|reason| SyncError::format(path, reason))?;
        log::info!(
            "{}: {} units, {} stimulation events, {} Hz",
            path.display(),
            record.num_units(),
            record.stim_times().len(),
            record.sampling_rate()
        );
        Ok(record)
    }
    fn convert(
        &self,
        raw: RawSession,
        path: &Path,
    ) -> (BTreeMap<UnitId, Vec<f64>>, Vec<f64>, f64) {
        let rate = raw.sampling_rate;
        let mut stim_times = Vec::with_capacity(raw.stim_trains.len());
        for (index, entry) in raw.stim_trains.into_iter().enumerate() {
            match entry {
                StimEntry::Onset(t) => stim_times.push(t),
                // Only the first pulse of a train marks the event.
                StimEntry::Train(train) => match train.first() {
                    Some(&t) => stim_times.push(t),
                    None => log::warn!(
                        "{}: stimulation train {index} is empty; dropped",
                        path.display()
                    ),
                },
            }
        }
        let mut units = raw.unit_spike_train_dict;
        if self.time_base == TimeBase::Samples {
            stim_times.iter_mut().for_each(|t| *t /= rate);
            units
                .values_mut()
                .flat_map(|s| s.iter_mut())
                .for_each(|t| *t /= rate);
        }
        (units, stim_times, rate)
    }
}
// numpy arrays pickle as `numpy.core.multiarray._reconstruct` globals, which
// serde-pickle cannot resolve.
fn pickle_error_reason(bytes: &[u8], err: serde_pickle::Error) -> String {
    if bytes.windows(b"numpy".len()).any(|w| w == b"numpy") {
        format!(
            "file contains numpy arrays, which cannot be read; re-export the session \
             with plain lists (e.g. `array.tolist()`) ({err})"
        )
    } else {
        err.to_string()
    }
}
/// Loads a session whose timestamps are in seconds.
pub fn load_session(path: &Path) -> Result<SessionRecord, SyncError> {
    SessionLoader::default().load(path)
}
