//! Actor-based background agents.

pub mod session_sweeper;

pub use session_sweeper::{SessionSweeperAgent, SweepExpired};
