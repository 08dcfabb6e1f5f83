//! Background processors.
//!
//! - `MonitoringRunner`: consumes `MonitoringSweep` events and drives the
//!   monitoring collaborator.
//! - `JobRunner`: polls the durable `scheduled_jobs` table and executes
//!   due jobs, recovering pending work after a restart.

pub mod job_runner;
pub mod monitoring_runner;

pub use job_runner::JobRunner;
pub use monitoring_runner::MonitoringRunner;
