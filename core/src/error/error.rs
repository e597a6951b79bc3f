use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("runner failed: {0}")]
    Runner(#[from] RunnerError),
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("config error: {0}")]
    Config(String),
    #[error("spawn failed: {0}")]
    Spawn(String),
    #[error("stream io error: {stream} {source}")]
    StreamIo {
        stream: &'static str,
        source: std::io::Error,
    },
}

impl CliError {
    /// Process exit code for a startup or session failure.
    ///
    /// 11: config error, 20: spawn / IO error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 11,
            CliError::Runner(re) => match re {
                RunnerError::Config(_) => 11,
                RunnerError::Spawn(_) => 20,
                RunnerError::StreamIo { .. } => 20,
            },
            CliError::Io(_) => 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_map_to_eleven() {
        assert_eq!(CliError::Config("missing".into()).exit_code(), 11);
        assert_eq!(
            CliError::Runner(RunnerError::Config("empty".into())).exit_code(),
            11
        );
    }

    #[test]
    fn spawn_and_io_errors_map_to_twenty() {
        assert_eq!(
            CliError::Runner(RunnerError::Spawn("not found".into())).exit_code(),
            20
        );
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        assert_eq!(CliError::Io(io).exit_code(), 20);
    }

    #[test]
    fn stream_failures_surface_as_io_exit_code() {
        let err: CliError = RunnerError::StreamIo {
            stream: "stdin",
            source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"),
        }
        .into();
        assert_eq!(err.exit_code(), 20);
    }

    #[test]
    fn stream_io_display_names_the_stream() {
        let err = RunnerError::StreamIo {
            stream: "stdout",
            source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed"),
        };
        assert_eq!(err.to_string(), "stream io error: stdout pipe closed");
    }
}
