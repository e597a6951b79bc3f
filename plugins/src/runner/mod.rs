mod process;

pub use logpipe_core::runner::{
    Liveness, LivenessSignal, RunOutcome, RunnerPlugin, RunnerSession, RunnerStartArgs, Signal,
};
pub use process::ProcessRunnerPlugin;
