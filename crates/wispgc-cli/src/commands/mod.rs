pub mod compact;
pub mod config;
pub mod policy;
pub mod report;

pub use compact::CompactCommand;
pub use config::ConfigCommand;
pub use policy::PolicyCommand;
pub use report::ReportCommand;

use wispgc::config::Config;

/// Scope precedence: flag, then WISPGC_SCOPE, then config.
pub(crate) fn resolve_scope(flag: Option<&str>, config: &Config) -> Option<String> {
    flag.map(str::to_string)
        .or_else(|| std::env::var("WISPGC_SCOPE").ok().filter(|s| !s.is_empty()))
        .or_else(|| config.compaction.scope.clone())
}

/// Role precedence: flag, then WISPGC_ROLE, then config.
pub(crate) fn resolve_role(flag: Option<&str>, config: &Config) -> Option<String> {
    flag.map(str::to_string)
        .or_else(|| std::env::var("WISPGC_ROLE").ok().filter(|s| !s.is_empty()))
        .or_else(|| config.compaction.role.clone())
}
