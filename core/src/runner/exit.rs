use crate::config::ExitStatusPolicy;

use super::types::RunnerResult;

/// The wrapper's own exit code for a finished session.
pub fn exit_code_for(result: &RunnerResult, policy: ExitStatusPolicy) -> i32 {
    match policy {
        ExitStatusPolicy::AlwaysZero => 0,
        ExitStatusPolicy::Propagate => match &result.outcome {
            Some(outcome) => outcome
                .exit_code
                .or(outcome.signal.map(|sig| 128 + sig))
                .unwrap_or(1),
            None => 1,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{Direction, RelayEnd, RelayStats, RunOutcome, SessionEnd};

    fn result(outcome: Option<RunOutcome>) -> RunnerResult {
        RunnerResult {
            outcome,
            end: SessionEnd::StdinClosed,
            duration_ms: 0,
            stdin: RelayStats {
                direction: Direction::Stdin,
                bytes: 0,
                end: RelayEnd::Eof,
            },
            stdout: None,
            stderr: None,
            killed: false,
        }
    }

    #[test]
    fn propagates_child_code() {
        let r = result(Some(RunOutcome {
            exit_code: Some(3),
            signal: None,
        }));
        assert_eq!(exit_code_for(&r, ExitStatusPolicy::Propagate), 3);
        assert_eq!(exit_code_for(&r, ExitStatusPolicy::AlwaysZero), 0);
    }

    #[test]
    fn signal_deaths_map_above_128() {
        let r = result(Some(RunOutcome {
            exit_code: None,
            signal: Some(15),
        }));
        assert_eq!(exit_code_for(&r, ExitStatusPolicy::Propagate), 143);
    }

    #[test]
    fn unknown_status_is_one() {
        assert_eq!(exit_code_for(&result(None), ExitStatusPolicy::Propagate), 1);
        let r = result(Some(RunOutcome {
            exit_code: None,
            signal: None,
        }));
        assert_eq!(exit_code_for(&r, ExitStatusPolicy::Propagate), 1);
    }
}
