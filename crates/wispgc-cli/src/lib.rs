pub mod commands;
pub mod error;
pub mod output;

pub use commands::{CompactCommand, ConfigCommand, PolicyCommand, ReportCommand};
pub use error::{CliError, CliResult};
pub use output::{OutputFormat, truncate_string};
