/*!
Waveform file loading.

Reads a VCD (or FST/GHW) dump with `wellen` and converts every variable into
a [`SignalTrace`], keyed by its full hierarchical name. Variables declared
with a bit index keep it in the key (`tb.red[3:0]`, `tb.red[1]`), so the bits
of a vector dumped one wire at a time stay separate signals.
*/

use crate::error::{Result, SharedError};
use crate::trace::{SampleValue, SignalTrace, Trace};
use std::path::Path;
use tracing::{debug, info};

/// Load every signal of a waveform file into memory
pub fn load_trace<P: AsRef<Path>>(path: P) -> Result<Trace> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(SharedError::trace(format!("{} does not exist", path.display())));
    }

    let mut waveform = wellen::simple::read(path)
        .map_err(|e| SharedError::trace(format!("failed to read {}: {}", path.display(), e)))?;

    let vars: Vec<(String, wellen::SignalRef)> = waveform
        .hierarchy()
        .iter_vars()
        .map(|var| (signal_key(var, waveform.hierarchy()), var.signal_ref()))
        .collect();

    let refs: Vec<wellen::SignalRef> = vars.iter().map(|&(_, signal_ref)| signal_ref).collect();
    waveform.load_signals(&refs);

    let time_table = waveform.time_table();
    let mut trace = Trace::new();

    for (name, signal_ref) in vars {
        let mut signal = SignalTrace::new(name);

        if let Some(loaded) = waveform.get_signal(signal_ref) {
            for (time_idx, value) in loaded.iter_changes() {
                let time = time_table[time_idx as usize];
                let sample = value
                    .to_bit_string()
                    .map(|bits| SampleValue::from_bits(&bits))
                    .unwrap_or(SampleValue::Undefined);
                signal.push(time, sample);
            }
        }

        debug!("Loaded {} ({} changes)", signal.name(), signal.len());
        if let Some(previous) = trace.insert(signal) {
            return Err(SharedError::trace(format!(
                "{} declares signal {} more than once",
                path.display(),
                previous.name()
            )));
        }
    }

    info!(
        "Loaded {} signals over {} time steps from {}",
        trace.len(),
        time_table.len(),
        path.display()
    );

    Ok(trace)
}

/// Full hierarchical name plus the declared bit index, if any
fn signal_key(var: &wellen::Var, hierarchy: &wellen::Hierarchy) -> String {
    let name = var.full_name(hierarchy);
    match var.index() {
        Some(index) if index.msb() == index.lsb() => format!("{}[{}]", name, index.lsb()),
        Some(index) => format!("{}[{}:{}]", name, index.msb(), index.lsb()),
        None => name,
    }
}
