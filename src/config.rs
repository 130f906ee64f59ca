//! Config fields definitions for the dry-run scheduler and construction errors of its plugins

use serde::Deserialize;
use thiserror::Error;

use crate::core::scheduler::kube_scheduler::KubeSchedulerConfig;
use crate::metrics::printer::MetricsPrinterConfig;

#[derive(Debug, Deserialize, PartialEq)]
pub struct DryRunConfig {
    #[serde(default)]
    pub scheduler: KubeSchedulerConfig,
    /// If not set default output of logs is stdout/stderr
    pub logs_filepath: Option<String>,
    /// If not set metrics are printed to stdout as a pretty table
    pub metrics_printer: Option<MetricsPrinterConfig>,
}

/// Errors which prevent a scheduler or one of its plugins from being constructed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid mode, got {0}")]
    InvalidMode(String),
    #[error("invalid args of plugin {plugin}: {source}")]
    InvalidArgs {
        plugin: String,
        source: serde_json::Error,
    },
    #[error("plugin {0:?} is not registered")]
    UnknownPlugin(String),
    #[error("plugin {plugin:?} does not implement the {extension_point} extension point")]
    UnsupportedExtensionPoint {
        plugin: String,
        extension_point: &'static str,
    },
    #[error("score plugin {plugin:?} must have a positive weight, got {weight}")]
    InvalidWeight { plugin: String, weight: i64 },
    #[error("scheduler profile {0:?} is defined more than once")]
    DuplicateProfile(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::core::scheduler::kube_scheduler::default_kube_scheduler_config;
    use crate::metrics::printer::OutputFormat;

    #[test]
    fn test_scheduler_section_defaults_to_default_profile() {
        let config = serde_yaml::from_str::<DryRunConfig>("logs_filepath: null").unwrap();
        assert_eq!(config.scheduler, default_kube_scheduler_config());
        assert!(config.metrics_printer.is_none());
    }

    #[test]
    fn test_full_config_parses() {
        let config = serde_yaml::from_str::<DryRunConfig>(
            r#"
            scheduler:
              profiles:
                - scheduler_name: gang
                  plugins:
                    pre_filter: [{ name: CustomScheduler }]
                    score: [{ name: CustomScheduler, weight: 2 }]
                  plugin_config:
                    - name: CustomScheduler
                      args: { mode: Most }
            logs_filepath: /tmp/scheduler.log
            metrics_printer:
              format: JSON
              output_file: /tmp/metrics.json
            "#,
        )
        .unwrap();

        let profile = &config.scheduler.profiles[0];
        assert_eq!(profile.scheduler_name, "gang");
        assert!(profile.plugins.filter.is_empty());
        assert_eq!(profile.plugins.score[0].weight, Some(2));
        assert_eq!(
            profile.plugin_config[0].args,
            serde_json::json!({ "mode": "Most" })
        );
        assert_eq!(config.logs_filepath.as_deref(), Some("/tmp/scheduler.log"));
        assert_eq!(
            config.metrics_printer.unwrap().format,
            OutputFormat::JSON
        );
    }
}
