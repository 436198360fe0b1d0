//! Leasewatch keeps leasing teams ahead of unit turnover: it compares the
//! waitlist roster against the availability feed on every sweep and alerts
//! each agent exactly once per unit they have qualifying contacts for.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
