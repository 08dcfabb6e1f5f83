//! Event type definitions.

use crewflow_sdk::Topic;
use uuid::Uuid;

/// Request for a background monitoring sweep over one tenant.
///
/// Emitted after processing a high-value topic, decoupled from the
/// handler's success or failure.
#[derive(Debug, Clone)]
pub struct MonitoringSweep {
    pub tenant_id: Uuid,
    /// The topic whose processing requested the sweep.
    pub topic: Topic,
}
