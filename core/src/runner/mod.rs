mod abort;
pub mod exit;
mod io_pump;
mod liveness;
mod run;
mod traits;
pub mod types;

pub use abort::Terminator;
pub use io_pump::{relay, spawn_relay, EXIT_DRAIN_BUDGET};
pub use liveness::{Liveness, LivenessSignal};
pub use run::{run_session, ParentStdio, RunSessionArgs};
pub use traits::{RunnerPlugin, RunnerSession};
pub use types::{
    Direction, RelayEnd, RelayStats, RunOutcome, RunnerResult, RunnerStartArgs, SessionEnd, Signal,
};
