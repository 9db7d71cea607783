//! Scheduler - periodic sweeps that replay service operations.
//!
//! The scheduler holds no state between runs. Each sweep asks
//! [`SweepQueries`](crate::ports::SweepQueries) for its work list and calls
//! the service API through [`ReconciliationApi`](crate::ports::ReconciliationApi)
//! once per item.

mod cadence;
mod runner;
mod sweep;

pub use cadence::Cadence;
pub use runner::{SchedulerRunner, SweepGroup};
pub use sweep::{Sweep, SweepReport, Sweeper, SweeperConfig};
