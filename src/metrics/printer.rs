use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use prettytable::{row, Table};
use serde::{Deserialize, Serialize};

use crate::dry_run::PodOutcome;
use crate::metrics::collector::{EstimatorWrapper, MetricsCollector};

#[derive(Debug, Default, Deserialize, PartialEq)]
pub enum OutputFormat {
    JSON,
    #[default]
    PrettyTable,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct MetricsPrinterConfig {
    #[serde(default)]
    pub format: OutputFormat,
    /// Stdout if not set.
    pub output_file: Option<PathBuf>,
}

pub fn print_metrics(
    collector: &MetricsCollector,
    outcomes: &[PodOutcome],
    config: &MetricsPrinterConfig,
) -> io::Result<()> {
    let mut output: Box<dyn Write> = match &config.output_file {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout()),
    };
    match config.format {
        OutputFormat::PrettyTable => print_metrics_as_pretty_table(collector, outcomes, &mut output),
        OutputFormat::JSON => print_metrics_as_json(collector, outcomes, &mut output),
    }
}

pub fn print_metrics_as_pretty_table<W: Write>(
    collector: &MetricsCollector,
    outcomes: &[PodOutcome],
    output: &mut W,
) -> io::Result<()> {
    let mut outcomes_table = Table::new();
    outcomes_table.add_row(row!["Pod", "Status", "Node", "Score", "Reason"]);
    for outcome in outcomes {
        outcomes_table.add_row(row![
            outcome.pod_name,
            format!("{:?}", outcome.status.code),
            outcome.node_name.as_deref().unwrap_or("-"),
            outcome
                .node_score
                .map_or_else(|| "-".to_string(), |score| score.to_string()),
            outcome.status.reason
        ]);
    }

    let mut aggregated_table = Table::new();
    aggregated_table.add_row(row!["Metric", "Count"]);
    aggregated_table.add_row(row!["Total nodes in snapshot", collector.total_nodes_in_snapshot]);
    aggregated_table.add_row(row!["Total pods in snapshot", collector.total_pods_in_snapshot]);
    aggregated_table.add_row(row!["Pods scheduled", collector.pods_scheduled]);
    aggregated_table.add_row(row!["Pods unschedulable", collector.pods_unschedulable]);
    aggregated_table.add_row(row!["Pods failed", collector.pods_failed]);

    let mut stats_table = Table::new();
    stats_table.add_row(row!["Metric", "Min", "Max", "Mean", "Variance"]);
    for (name, stats) in [
        ("Selected node score", &collector.selected_node_score_stats),
        ("Feasible nodes", &collector.feasible_nodes_stats),
    ] {
        stats_table.add_row(row![
            name,
            stats.min(),
            stats.max(),
            stats.mean(),
            stats.population_variance()
        ]);
    }

    outcomes_table.print(output)?;
    aggregated_table.print(output)?;
    stats_table.print(output)?;
    Ok(())
}

#[derive(Serialize)]
struct MetricsJSON<'a> {
    counters: Counters,
    stats: Stats,
    pods: &'a [PodOutcome],
}

#[derive(Serialize)]
struct Counters {
    total_nodes_in_snapshot: u64,
    total_pods_in_snapshot: u64,
    pods_scheduled: u64,
    pods_unschedulable: u64,
    pods_failed: u64,
}

#[derive(Serialize)]
struct Stats {
    selected_node_score: EstimatorStats,
    feasible_nodes: EstimatorStats,
}

#[derive(Serialize)]
struct EstimatorStats {
    min: f64,
    max: f64,
    mean: f64,
    variance: f64,
}

impl From<&EstimatorWrapper> for EstimatorStats {
    fn from(stats: &EstimatorWrapper) -> Self {
        Self {
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
            variance: stats.population_variance(),
        }
    }
}

pub fn print_metrics_as_json<W: Write>(
    collector: &MetricsCollector,
    outcomes: &[PodOutcome],
    output: &mut W,
) -> io::Result<()> {
    let metrics = MetricsJSON {
        counters: Counters {
            total_nodes_in_snapshot: collector.total_nodes_in_snapshot,
            total_pods_in_snapshot: collector.total_pods_in_snapshot,
            pods_scheduled: collector.pods_scheduled,
            pods_unschedulable: collector.pods_unschedulable,
            pods_failed: collector.pods_failed,
        },
        stats: Stats {
            selected_node_score: (&collector.selected_node_score_stats).into(),
            feasible_nodes: (&collector.feasible_nodes_stats).into(),
        },
        pods: outcomes,
    };

    let serialized_json = serde_json::to_string_pretty(&metrics)?;
    output.write_all(serialized_json.as_bytes())
}
