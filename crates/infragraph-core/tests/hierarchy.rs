use infragraph_core::load::{LoadRecord, Loader};
use infragraph_core::Dataset;

fn make_dataset() -> Dataset {
    Loader::default()
        .load(vec![
            LoadRecord::class("PhysicalInfrastructureLayer", &[]),
            LoadRecord::class("Compute", &["PhysicalInfrastructureLayer"]),
            LoadRecord::class("PhysicalServer", &["Compute"]),
            LoadRecord::class("VirtualMachine", &["Compute"]),
            LoadRecord::class("Application", &["ApplicationLayer"]),
            LoadRecord::class("Database", &["Application", "DataStore"]),
            LoadRecord::entity("server1", &["PhysicalServer"]),
            LoadRecord::entity("vm1", &["VirtualMachine"]),
            LoadRecord::entity("db1", &["Database"]),
            LoadRecord::entity("app1", &["Application"]),
            LoadRecord::entity("orphan", &[]),
        ])
        .unwrap()
        .dataset
}

#[test]
fn test_instance_of_is_monotone_over_ancestors() {
    let ds = make_dataset();
    let h = ds.hierarchy();
    for entity in ds.store().entities() {
        for class in h.classes() {
            if !ds.is_instance_of(&entity.id, class) {
                continue;
            }
            for ancestor in h.ancestors(class) {
                assert!(
                    ds.is_instance_of(&entity.id, ancestor),
                    "{} is a {} but not a {}",
                    entity.id,
                    class,
                    ancestor
                );
            }
        }
    }
}

#[test]
fn test_instances_of_uses_inference() {
    let ds = make_dataset();
    let layer: Vec<&str> = ds
        .instances_of("PhysicalInfrastructureLayer")
        .map(|e| e.id.as_str())
        .collect();
    assert_eq!(layer, vec!["server1", "vm1"]);

    let apps: Vec<&str> = ds
        .instances_of("ApplicationLayer")
        .map(|e| e.id.as_str())
        .collect();
    assert_eq!(apps, vec!["app1", "db1"]);
}

#[test]
fn test_unknown_entity_is_instance_of_nothing() {
    let ds = make_dataset();
    assert!(!ds.is_instance_of("nope", "Compute"));
    assert!(!ds.is_instance_of("orphan", "Compute"));
}

#[test]
fn test_dataset_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Dataset>();

    let ds = make_dataset();
    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| s.spawn(|| ds.instances_of("Compute").count()))
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), 2);
        }
    });
}
