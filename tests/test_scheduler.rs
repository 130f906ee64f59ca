use std::sync::Arc;

use kubernetriks_custom_scheduler::config::ConfigError;
use kubernetriks_custom_scheduler::core::common::ObjectsInfo;
use kubernetriks_custom_scheduler::core::pod::Pod;
use kubernetriks_custom_scheduler::core::scheduler::interface::{
    PluginError, ScheduleError, StatusCode,
};
use kubernetriks_custom_scheduler::core::scheduler::kube_scheduler::{
    default_kube_scheduler_config, KubeScheduler, KubeSchedulerConfig, SCHEDULER_NAME_LABEL,
};
use kubernetriks_custom_scheduler::core::scheduler::plugin::Handle;
use kubernetriks_custom_scheduler::test_util::helpers::{
    group_pod, handle, memory_node, objects_with, UnavailableLister,
};

fn create_scheduler(config_yaml: Option<&str>, objects: &Arc<ObjectsInfo>) -> KubeScheduler {
    let config = match config_yaml {
        Some(yaml) => serde_yaml::from_str::<KubeSchedulerConfig>(yaml).unwrap(),
        None => default_kube_scheduler_config(),
    };
    KubeScheduler::new(&config, &handle(objects)).unwrap()
}

fn build_error(config_yaml: &str) -> ConfigError {
    let config = serde_yaml::from_str::<KubeSchedulerConfig>(config_yaml).unwrap();
    let objects = objects_with(vec![], vec![]);
    KubeScheduler::new(&config, &handle(&objects)).err().unwrap()
}

const MOST_PROFILE: &str = r#"
profiles:
  - scheduler_name: default_scheduler
    plugins:
      pre_filter: [{ name: CustomScheduler }]
      filter: [{ name: Fit }]
      score: [{ name: CustomScheduler, weight: 1 }]
    plugin_config:
      - name: CustomScheduler
        args: { mode: Most }
"#;

fn cluster() -> Vec<kubernetriks_custom_scheduler::core::node::Node> {
    vec![
        memory_node("node1", 8589934592),
        memory_node("node2", 17179869184),
        memory_node("node3", 34359738368),
    ]
}

#[test]
fn test_no_nodes_no_schedule() {
    let objects = objects_with(vec![], vec![]);
    let scheduler = create_scheduler(None, &objects);
    let pod = group_pod("pod_1", None, Some("1"));
    let err = scheduler.schedule_one(&pod).err().unwrap();
    assert_eq!(err, ScheduleError::NoNodesInCluster);
    assert_eq!(err.status().code, StatusCode::Unschedulable);
}

#[test]
fn test_no_sufficient_nodes_for_scheduling() {
    let objects = objects_with(vec![memory_node("node1", 8589934592)], vec![]);
    let scheduler = create_scheduler(None, &objects);
    let pod = Pod::new("pod_1".to_string(), 6000, 12884901888).with_label("minAvailable", "1");
    assert_eq!(
        scheduler.schedule_one(&pod).err().unwrap(),
        ScheduleError::NoSufficientNodes
    );
}

#[test]
fn test_least_mode_prefers_fullest_node() {
    let _ = env_logger::try_init();

    let objects = objects_with(cluster(), vec![]);
    let scheduler = create_scheduler(None, &objects);
    let pod = group_pod("pod_1", None, Some("1"));

    let result = scheduler.schedule_one(&pod).unwrap();
    assert_eq!(result.node_name, "node1");
    assert_eq!(result.node_score, 100);
    assert_eq!(result.feasible_nodes, 3);
}

#[test]
fn test_most_mode_prefers_emptiest_node() {
    let objects = objects_with(cluster(), vec![]);
    let scheduler = create_scheduler(Some(MOST_PROFILE), &objects);
    let pod = group_pod("pod_1", None, Some("1"));

    let result = scheduler.schedule_one(&pod).unwrap();
    assert_eq!(result.node_name, "node3");
    assert_eq!(result.node_score, 100);
}

#[test]
fn test_fit_runs_before_scoring() {
    // node1 is the best fit in Least mode but can not host the pod
    let objects = objects_with(cluster(), vec![]);
    let scheduler = create_scheduler(None, &objects);
    let pod = Pod::new("pod_1".to_string(), 1000, 12884901888).with_label("minAvailable", "1");

    let result = scheduler.schedule_one(&pod).unwrap();
    assert_eq!(result.node_name, "node2");
    assert_eq!(result.feasible_nodes, 2);
}

#[test]
fn test_gang_waits_for_quorum() {
    let pods: Vec<Pod> = (0..2)
        .map(|idx| group_pod(&format!("worker_{}", idx), Some("training"), Some("3")))
        .collect();
    let objects = objects_with(cluster(), pods.clone());
    let scheduler = create_scheduler(None, &objects);

    let err = scheduler.schedule_one(&pods[0]).err().unwrap();
    assert_eq!(
        err,
        ScheduleError::Plugin {
            plugin: "CustomScheduler".to_string(),
            error: PluginError::InsufficientGroupMembers {
                group: "training".to_string(),
                members: 2,
                min_available: 3,
            },
        }
    );
    assert!(err.status().is_retryable());

    // third member shows up, the retry succeeds
    objects
        .add_pod(group_pod("worker_2", Some("training"), Some("3")))
        .unwrap();
    assert!(scheduler.schedule_one(&pods[0]).is_ok());
}

#[test]
fn test_malformed_label_fails_pod() {
    let objects = objects_with(cluster(), vec![]);
    let scheduler = create_scheduler(None, &objects);
    let pod = group_pod("pod_1", Some("g1"), Some("many"));

    let status = scheduler.schedule_one(&pod).err().unwrap().status();
    assert_eq!(status.code, StatusCode::Error);
    assert!(status.reason.starts_with("plugin CustomScheduler failed: invalid minAvailable value \"many\""));
}

#[test]
fn test_node_lister_failure() {
    let lister = Arc::new(UnavailableLister {});
    let handle = Handle {
        pod_lister: lister.clone(),
        node_lister: lister,
    };
    let scheduler = KubeScheduler::new(&default_kube_scheduler_config(), &handle).unwrap();
    let err = scheduler
        .schedule_one(&group_pod("pod_1", None, Some("1")))
        .err()
        .unwrap();
    assert!(matches!(err, ScheduleError::ListNodes(_)));
    assert_eq!(err.status().code, StatusCode::Error);
}

#[test]
fn test_pod_selects_profile_by_label() {
    let config = r#"
profiles:
  - scheduler_name: default_scheduler
    plugins:
      score: [{ name: CustomScheduler }]
  - scheduler_name: spread
    plugins:
      score: [{ name: CustomScheduler }]
    plugin_config:
      - name: CustomScheduler
        args: { mode: Most }
"#;
    let objects = objects_with(cluster(), vec![]);
    let scheduler = create_scheduler(Some(config), &objects);

    let packed = Pod::new("packed".to_string(), 1000, 1024);
    assert_eq!(scheduler.schedule_one(&packed).unwrap().node_name, "node1");

    let spread = Pod::new("spread".to_string(), 1000, 1024).with_label(SCHEDULER_NAME_LABEL, "spread");
    assert_eq!(scheduler.schedule_one(&spread).unwrap().node_name, "node3");

    let unknown = Pod::new("unknown".to_string(), 1000, 1024).with_label(SCHEDULER_NAME_LABEL, "gpu");
    assert_eq!(
        scheduler.schedule_one(&unknown).err().unwrap(),
        ScheduleError::UnknownProfile("gpu".to_string())
    );
}

#[test]
fn test_weights_scale_normalized_scores() {
    let config = r#"
profiles:
  - scheduler_name: default_scheduler
    plugins:
      score: [{ name: CustomScheduler, weight: 3 }]
"#;
    let objects = objects_with(cluster(), vec![]);
    let scheduler = create_scheduler(Some(config), &objects);
    let result = scheduler
        .schedule_one(&Pod::new("pod_1".to_string(), 1000, 1024))
        .unwrap();
    assert_eq!(result.node_score, 300);
}

#[test]
fn test_invalid_mode_fails_construction() {
    let err = build_error(
        r#"
profiles:
  - plugins:
      score: [{ name: CustomScheduler }]
    plugin_config:
      - name: CustomScheduler
        args: { mode: Balanced }
"#,
    );
    assert!(matches!(&err, ConfigError::InvalidMode(mode) if mode == "Balanced"));
}

#[test]
fn test_unknown_plugin_fails_construction() {
    let err = build_error(
        r#"
profiles:
  - plugins:
      filter: [{ name: NodeAffinity }]
"#,
    );
    assert!(matches!(&err, ConfigError::UnknownPlugin(name) if name == "NodeAffinity"));
}

#[test]
fn test_plugin_at_unsupported_extension_point_fails_construction() {
    let err = build_error(
        r#"
profiles:
  - plugins:
      score: [{ name: Fit }]
"#,
    );
    assert!(matches!(
        err,
        ConfigError::UnsupportedExtensionPoint {
            extension_point: "Score",
            ..
        }
    ));
}

#[test]
fn test_non_positive_weight_fails_construction() {
    let err = build_error(
        r#"
profiles:
  - plugins:
      score: [{ name: CustomScheduler, weight: 0 }]
"#,
    );
    assert!(matches!(err, ConfigError::InvalidWeight { weight: 0, .. }));
}

#[test]
fn test_duplicate_profile_fails_construction() {
    let err = build_error(
        r#"
profiles:
  - scheduler_name: twin
  - scheduler_name: twin
"#,
    );
    assert!(matches!(&err, ConfigError::DuplicateProfile(name) if name == "twin"));
}
