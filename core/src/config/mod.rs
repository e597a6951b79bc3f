mod load;
mod types;

pub use load::{apply_env_overrides, load_from, load_settings, read_command, WrapperPaths};
pub use types::{AppConfig, ExitStatusPolicy, InterruptPolicy, LoggingConfig, RelayConfig};
