//! Event channel factories and handles.

use super::types::MonitoringSweep;
use tokio::sync::mpsc;

/// Default buffer size for event channels: enough to absorb bursts while
/// keeping memory bounded.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Sender handle for MonitoringSweep events.
pub type MonitoringSweepSender = mpsc::Sender<MonitoringSweep>;
/// Receiver handle for MonitoringSweep events.
pub type MonitoringSweepReceiver = mpsc::Receiver<MonitoringSweep>;

/// Create a new MonitoringSweep channel.
pub fn monitoring_sweep_channel() -> (MonitoringSweepSender, MonitoringSweepReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}
