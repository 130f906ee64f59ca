pub mod config;
pub mod core;
pub mod dry_run;
pub mod metrics;
#[doc(hidden)]
pub mod test_util;
pub mod trace;
