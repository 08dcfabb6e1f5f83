//! MonitoringRunner processor.
//!
//! Receives `MonitoringSweep` events queued by the webhook pipeline and
//! runs the monitoring collaborator for the affected tenant. Having a
//! dedicated consumer loop keeps sweep failures observable instead of
//! vanishing inside an un-awaited task.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::collaborators::MonitoringService;
use crate::events::MonitoringSweepReceiver;
use crate::reporter::ErrorReporter;

pub struct MonitoringRunner {
    monitoring: Arc<dyn MonitoringService>,
    sweep_rx: MonitoringSweepReceiver,
    shutdown_rx: watch::Receiver<bool>,
    reporter: ErrorReporter,
}

impl MonitoringRunner {
    pub fn new(
        monitoring: Arc<dyn MonitoringService>,
        sweep_rx: MonitoringSweepReceiver,
        shutdown_rx: watch::Receiver<bool>,
        reporter: ErrorReporter,
    ) -> Self {
        Self {
            monitoring,
            sweep_rx,
            shutdown_rx,
            reporter,
        }
    }

    pub async fn run(mut self) {
        info!("MonitoringRunner started");

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_rx.changed() => {
                    if *self.shutdown_rx.borrow() {
                        info!("MonitoringRunner received shutdown signal");
                        break;
                    }
                }

                Some(sweep) = self.sweep_rx.recv() => {
                    debug!(
                        tenant = %sweep.tenant_id,
                        topic = %sweep.topic,
                        "Running monitoring sweep"
                    );
                    if let Err(err) = self.monitoring.run_monitoring(sweep.tenant_id).await {
                        self.reporter
                            .report(
                                Some(sweep.tenant_id),
                                "monitoring_runner",
                                "run_monitoring",
                                &err,
                                serde_json::json!({ "topic": sweep.topic.as_str() }),
                            )
                            .await;
                    }
                }

                else => {
                    info!("Monitoring sweep channel closed");
                    break;
                }
            }
        }

        info!("MonitoringRunner shutdown complete");
    }
}
