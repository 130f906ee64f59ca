use std::env;

use clap::Parser;
use file_rotate::compression::Compression;
use file_rotate::suffix::AppendCount;
use file_rotate::{ContentLimit, FileRotate};
use log::info;

use kubernetriks_custom_scheduler::config::DryRunConfig;
use kubernetriks_custom_scheduler::dry_run::DryRun;
use kubernetriks_custom_scheduler::metrics::printer::print_metrics;
use kubernetriks_custom_scheduler::trace::generic::ClusterSnapshot;

const MAX_LOG_FILE_BYTES: usize = 64 * 1024 * 1024;
const MAX_LOG_FILES: usize = 4;

#[derive(Parser)]
struct Args {
    #[clap(short, long)]
    config_file: std::path::PathBuf,
    #[clap(short, long)]
    snapshot_file: std::path::PathBuf,
}

fn init_logger(logs_filepath: Option<&str>) {
    // log level INFO by default
    let mut env_logger_builder = env_logger::builder();
    if env::var("RUST_LOG").is_err() {
        env_logger_builder.filter_level(log::LevelFilter::Info);
    }
    if let Some(path) = logs_filepath {
        let log_file = FileRotate::new(
            path,
            AppendCount::new(MAX_LOG_FILES),
            ContentLimit::Bytes(MAX_LOG_FILE_BYTES),
            Compression::None,
            #[cfg(unix)]
            None,
        );
        env_logger_builder.target(env_logger::Target::Pipe(Box::new(log_file)));
    }
    env_logger_builder.init();
}

fn main() {
    let args = Args::parse();

    let config_yaml =
        std::fs::read_to_string(&args.config_file).expect("could not read config file");
    let config = serde_yaml::from_str::<DryRunConfig>(&config_yaml).expect("invalid config file");

    init_logger(config.logs_filepath.as_deref());

    info!("Path to config file: {:?}", args.config_file);
    info!("Path to snapshot file: {:?}", args.snapshot_file);

    let snapshot_yaml =
        std::fs::read_to_string(&args.snapshot_file).expect("could not read snapshot file");
    let snapshot =
        serde_yaml::from_str::<ClusterSnapshot>(&snapshot_yaml).expect("invalid snapshot file");

    let mut dry_run = DryRun::new(&config, snapshot).unwrap_or_else(|err| panic!("{}", err));
    let outcomes = dry_run.run().unwrap_or_else(|err| panic!("{}", err));

    let printer_config = config.metrics_printer.unwrap_or_default();
    print_metrics(&dry_run.metrics_collector, &outcomes, &printer_config)
        .expect("could not print metrics");
}
