//! In-process event channels feeding the background processors.
//!
//! Events are small and ephemeral — they carry identifiers, not data.
//! The channels are bounded; a full queue drops the event with a warning
//! rather than blocking the webhook response.

pub mod channels;
pub mod types;

pub use channels::{
    DEFAULT_CHANNEL_BUFFER, MonitoringSweepReceiver, MonitoringSweepSender,
    monitoring_sweep_channel,
};
pub use types::MonitoringSweep;
