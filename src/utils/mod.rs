pub mod dirs;
pub mod logging;
pub mod progress;
pub mod rate_limit;
