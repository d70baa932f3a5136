use infragraph_core::config::{LoadConfig, LoadPolicy};
use infragraph_core::load::{CancellationToken, LoadBatch, LoadIssue, LoadRecord, Loader};
use infragraph_core::GraphError;

fn loader(policy: LoadPolicy) -> Loader {
    Loader::new(LoadConfig {
        policy,
        batch_size: 2,
    })
}

fn records_with_dangling() -> Vec<LoadRecord> {
    vec![
        LoadRecord::entity("app1", &["Application"]),
        LoadRecord::entity("vm1", &["VirtualMachine"]),
        LoadRecord::relationship("app1", "hosted_on", "vm1"),
        LoadRecord::relationship("app1", "hosted_on", "vm9"),
        LoadRecord::attribute("ghost", "status", "active"),
        LoadRecord::attribute("vm1", "status", "active"),
        LoadRecord::attribute("vm1", "status", "failed"),
    ]
}

#[test]
fn test_fail_fast_returns_first_integrity_error() {
    let err = loader(LoadPolicy::FailFast)
        .load(records_with_dangling())
        .unwrap_err();
    assert_eq!(
        err,
        GraphError::ReferentialIntegrity {
            subject: "app1".into(),
            predicate: "hosted_on".into(),
            missing: "vm9".into(),
        }
    );
}

#[test]
fn test_collect_excludes_and_reports_everything() {
    let loaded = loader(LoadPolicy::Collect)
        .load(records_with_dangling())
        .unwrap();
    let store = loaded.dataset.store();

    assert_eq!(store.relationship_count(), 1);
    assert_eq!(
        store.attribute("vm1", "status").and_then(|v| v.as_str()),
        Some("active")
    );
    assert_eq!(loaded.report.issues.len(), 3);
    assert!(matches!(
        &loaded.report.issues[0],
        LoadIssue::DanglingRelationship { missing, .. } if missing == "vm9"
    ));
    assert!(matches!(
        &loaded.report.issues[1],
        LoadIssue::DanglingAttribute { subject, .. } if subject == "ghost"
    ));
    assert!(matches!(
        &loaded.report.issues[2],
        LoadIssue::DuplicateAttribute { name, .. } if name == "status"
    ));
}

#[test]
fn test_duplicate_attribute_fails_fast() {
    let err = loader(LoadPolicy::FailFast)
        .load(vec![
            LoadRecord::entity("vm1", &[]),
            LoadRecord::attribute("vm1", "status", "active"),
            LoadRecord::attribute("vm1", "status", "failed"),
        ])
        .unwrap_err();
    assert_eq!(
        err,
        GraphError::DuplicateAttribute {
            subject: "vm1".into(),
            name: "status".into(),
        }
    );
}

#[test]
fn test_cycle_fails_regardless_of_policy() {
    for policy in [LoadPolicy::FailFast, LoadPolicy::Collect] {
        let err = loader(policy)
            .load(vec![
                LoadRecord::class("A", &["B"]),
                LoadRecord::class("B", &["A"]),
            ])
            .unwrap_err();
        assert!(matches!(err, GraphError::Cycle { .. }));
    }
}

#[test]
fn test_cancelled_before_load_applies_nothing() {
    let token = CancellationToken::new();
    token.cancel();
    let err = loader(LoadPolicy::FailFast)
        .with_cancellation(token)
        .load(records_with_dangling())
        .unwrap_err();
    assert_eq!(err, GraphError::LoadCancelled { applied: 0 });
}

#[test]
fn test_cancelled_mid_load_stops_at_batch_boundary() {
    let token = CancellationToken::new();
    let trigger = token.clone();
    let records = records_with_dangling()
        .into_iter()
        .enumerate()
        .map(move |(i, record)| {
            if i == 2 {
                trigger.cancel();
            }
            record
        });

    let err = loader(LoadPolicy::Collect)
        .with_cancellation(token)
        .load(records)
        .unwrap_err();
    // Pulling the third record cancels; the check before the second batch catches it.
    assert_eq!(err, GraphError::LoadCancelled { applied: 2 });
}

#[test]
fn test_load_batch_json() {
    let json = r#"{
        "classes": [{"name": "VirtualMachine", "parents": ["Compute"]}],
        "entities": [
            {"id": "app1", "classes": ["Application"]},
            {"id": "vm1", "classes": ["VirtualMachine"]}
        ],
        "attributes": [{"subject": "vm1", "name": "cpu_cores", "value": 4}],
        "relationships": [{"subject": "app1", "predicate": "hosted_on", "object": "vm1"}]
    }"#;
    let batch = LoadBatch::from_json(json).unwrap();
    assert_eq!(batch.len(), 5);

    let loaded = Loader::default().load(batch.into_records()).unwrap();
    assert!(loaded.report.is_clean());
    assert_eq!(loaded.report.records, 5);
    assert!(loaded.dataset.is_instance_of("vm1", "Compute"));
    assert_eq!(loaded.dataset.store().attribute_count(), 1);
}
