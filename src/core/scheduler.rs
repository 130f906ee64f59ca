//! Scheduler framework: plugin contracts, the built-in plugins and the host pipeline running them.

pub mod custom_scheduler;
pub mod interface;
pub mod kube_scheduler;
pub mod plugin;
