/*!
Signal traces and value lookup.

A trace is the recorded list of value changes of one named signal. The value
of a signal at time `T` is the value of the last change at or before `T`.
*/

use crate::error::{Result, SharedError};
use std::collections::BTreeMap;

/// Value carried by a signal change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleValue {
    /// A fully determined unsigned value
    Defined(u64),
    /// At least one bit is `x`/`z` (uninitialized simulation state)
    Undefined,
}

impl SampleValue {
    /// Parse a VCD-style bit string such as `"0101"`, `"1"` or `"xxxx"`.
    ///
    /// Any digit other than `0`/`1` makes the whole value undefined. Vectors
    /// wider than 64 bits keep their low 64 bits.
    pub fn from_bits(bits: &str) -> Self {
        if bits.is_empty() || !bits.bytes().all(|b| b == b'0' || b == b'1') {
            return Self::Undefined;
        }

        let low = &bits[bits.len().saturating_sub(64)..];
        match u64::from_str_radix(low, 2) {
            Ok(value) => Self::Defined(value),
            Err(_) => Self::Undefined,
        }
    }

    /// Get the value if it is defined
    pub fn defined(self) -> Option<u64> {
        match self {
            Self::Defined(value) => Some(value),
            Self::Undefined => None,
        }
    }

    /// Get the value, substituting `fallback` when undefined
    pub fn unwrap_or(self, fallback: u64) -> u64 {
        self.defined().unwrap_or(fallback)
    }
}

/// Chronologically ordered value changes of one signal
#[derive(Debug, Clone, PartialEq)]
pub struct SignalTrace {
    name: String,
    changes: Vec<(u64, SampleValue)>,
}

impl SignalTrace {
    /// Create a new trace with no recorded changes
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            changes: Vec::new(),
        }
    }

    /// Create a trace from a list of changes.
    ///
    /// Changes are ordered by timestamp; entries sharing a timestamp keep
    /// their listed order so the last one wins on lookup.
    pub fn from_changes(name: impl Into<String>, mut changes: Vec<(u64, SampleValue)>) -> Self {
        changes.sort_by_key(|&(time, _)| time);
        Self {
            name: name.into(),
            changes,
        }
    }

    /// Append a change. Out-of-order timestamps are inserted in place.
    pub fn push(&mut self, time: u64, value: SampleValue) {
        match self.changes.last() {
            Some(&(last, _)) if last > time => {
                let at = self.changes.partition_point(|&(t, _)| t <= time);
                self.changes.insert(at, (time, value));
            }
            _ => self.changes.push((time, value)),
        }
    }

    /// Get the signal name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get all recorded changes
    pub fn changes(&self) -> &[(u64, SampleValue)] {
        &self.changes
    }

    /// Get the number of recorded changes
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Check if the signal never changes
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Iterate over change timestamps in ascending order
    pub fn timestamps(&self) -> impl Iterator<Item = u64> + '_ {
        self.changes.iter().map(|&(time, _)| time)
    }

    /// Value in effect at `time`, or `default` before the first change
    pub fn value_at(&self, time: u64, default: SampleValue) -> SampleValue {
        match self.changes.partition_point(|&(t, _)| t <= time) {
            0 => default,
            n => self.changes[n - 1].1,
        }
    }

    /// Create a forward-walking cursor over this trace
    pub fn cursor(&self) -> TraceCursor<'_> {
        TraceCursor::new(self)
    }
}

/// Memoized lookup position into a [`SignalTrace`].
///
/// Queries in non-decreasing time order advance a single index; a query
/// earlier than the previous one rewinds to the start.
#[derive(Debug, Clone)]
pub struct TraceCursor<'a> {
    trace: &'a SignalTrace,
    /// Number of changes at or before `last_query`
    position: usize,
    last_query: Option<u64>,
}

impl<'a> TraceCursor<'a> {
    /// Create a cursor positioned before the first change
    pub fn new(trace: &'a SignalTrace) -> Self {
        Self {
            trace,
            position: 0,
            last_query: None,
        }
    }

    /// Value in effect at `time`, or `default` before the first change
    pub fn value_at(&mut self, time: u64, default: SampleValue) -> SampleValue {
        if self.last_query.is_some_and(|last| time < last) {
            self.position = 0;
        }

        let changes = self.trace.changes();
        while self.position < changes.len() && changes[self.position].0 <= time {
            self.position += 1;
        }
        self.last_query = Some(time);

        match self.position {
            0 => default,
            n => changes[n - 1].1,
        }
    }
}

/// Named signal store for one recorded simulation
#[derive(Debug, Clone, Default)]
pub struct Trace {
    signals: BTreeMap<String, SignalTrace>,
}

impl Trace {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a signal, returning the one it replaced under the same name
    pub fn insert(&mut self, signal: SignalTrace) -> Option<SignalTrace> {
        self.signals.insert(signal.name().to_string(), signal)
    }

    /// Look up a signal by name.
    ///
    /// An exact match wins. Otherwise a bit-range suffix is ignored on
    /// either side, so `tb.red[3:0]` finds a signal recorded as `tb.red` and
    /// vice versa, provided exactly one recorded signal matches that way.
    pub fn signal(&self, name: &str) -> Result<&SignalTrace> {
        if let Some(signal) = self.signals.get(name) {
            return Ok(signal);
        }

        let wanted = strip_bit_range(name);
        let mut matches = self
            .signals
            .values()
            .filter(|signal| strip_bit_range(signal.name()) == wanted);

        match (matches.next(), matches.next()) {
            (Some(signal), None) => Ok(signal),
            (None, _) => Err(SharedError::missing_signal(name, self.signal_names())),
            (Some(_), Some(_)) => Err(SharedError::AmbiguousSignal {
                name: name.to_string(),
                matches: self
                    .signals
                    .keys()
                    .filter(|key| strip_bit_range(key) == wanted)
                    .cloned()
                    .collect(),
            }),
        }
    }

    /// Get all signal names in sorted order
    pub fn signal_names(&self) -> Vec<String> {
        self.signals.keys().cloned().collect()
    }

    /// Get the number of signals
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    /// Check if the store holds no signals
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}

impl FromIterator<SignalTrace> for Trace {
    fn from_iter<I: IntoIterator<Item = SignalTrace>>(iter: I) -> Self {
        let mut trace = Trace::new();
        for signal in iter {
            trace.insert(signal);
        }
        trace
    }
}

/// Sorted, duplicate-free union of every change timestamp in `signals`
pub fn merged_timeline(signals: &[&SignalTrace]) -> Vec<u64> {
    let mut times: Vec<u64> = signals
        .iter()
        .flat_map(|&signal| signal.timestamps())
        .collect();
    times.sort_unstable();
    times.dedup();
    times
}

/// Remove a trailing `[msb:lsb]` / `[bit]` selector from a signal name
fn strip_bit_range(name: &str) -> &str {
    let trimmed = name.trim_end();
    if trimmed.ends_with(']') {
        if let Some(open) = trimmed.rfind('[') {
            return trimmed[..open].trim_end();
        }
    }
    trimmed
}
