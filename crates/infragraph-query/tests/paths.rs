use infragraph_core::Dataset;
use infragraph_core::config::QueryConfig;
use infragraph_core::load::{LoadRecord, Loader};
use infragraph_core::model::Value;
use infragraph_core::vocab::local_name;
use infragraph_query::{
    GroupPattern, PathExpr, PrefixMap, Query, QueryContext, QueryEngine, QueryError,
    QueryResults, Term, TermPattern,
};
use std::time::Instant;

const NS: &str = "http://example.org/infra#";

fn iri(local: &str) -> String {
    format!("{}{}", NS, local)
}

fn class(name: &str, parents: &[&str]) -> LoadRecord {
    let parents: Vec<String> = parents.iter().map(|p| iri(p)).collect();
    let parents: Vec<&str> = parents.iter().map(String::as_str).collect();
    LoadRecord::class(iri(name), &parents)
}

fn entity(id: &str, classes: &[&str]) -> LoadRecord {
    let classes: Vec<String> = classes.iter().map(|c| iri(c)).collect();
    let classes: Vec<&str> = classes.iter().map(String::as_str).collect();
    LoadRecord::entity(iri(id), &classes)
}

fn rel(subject: &str, predicate: &str, object: &str) -> LoadRecord {
    LoadRecord::relationship(iri(subject), iri(predicate), iri(object))
}

fn make_dataset() -> Dataset {
    let records = vec![
        class("PhysicalInfrastructureLayer", &[]),
        class("Compute", &["PhysicalInfrastructureLayer"]),
        class("PhysicalServer", &["Compute"]),
        class("VirtualMachine", &["Compute"]),
        class("Application", &["ApplicationLayer"]),
        class("Database", &["Application"]),
        entity("app1", &["Application"]),
        entity("app2", &["Application"]),
        entity("db1", &["Database"]),
        entity("vm1", &["VirtualMachine", "Compute"]),
        entity("vm2", &["VirtualMachine"]),
        entity("server1", &["PhysicalServer"]),
        entity("net1", &["Network"]),
        rel("app1", "hostedOn", "vm1"),
        rel("vm1", "runsOn", "server1"),
        rel("app1", "uses", "db1"),
        rel("db1", "hostedOn", "vm2"),
        rel("vm2", "runsOn", "server1"),
        rel("vm1", "communicatesVia", "net1"),
    ];
    Loader::default().load(records).unwrap().dataset
}

fn context() -> QueryContext {
    QueryContext::new(PrefixMap::new().with("", NS).with_standard_prefixes())
}

fn run(ds: &Dataset, query: &Query) -> QueryResults {
    QueryEngine::new(ds, &QueryConfig::default())
        .execute(query, &context())
        .unwrap()
}

fn locals(results: &QueryResults, var: &str) -> Vec<String> {
    results
        .column(var)
        .into_iter()
        .map(|t| match t {
            Some(Term::Iri(i)) => local_name(i).to_string(),
            Some(Term::Literal(v)) => v.lexical_form(),
            None => "-".to_string(),
        })
        .collect()
}

fn path(text: &str) -> PathExpr {
    PathExpr::parse(text).unwrap()
}

#[test]
fn test_transitive_alternation_in_traversal_order() {
    let ds = make_dataset();
    let query = Query::select(["x"]).pattern(GroupPattern::new().triple(
        TermPattern::iri(":app1"),
        path("(:hostedOn|:runsOn)+"),
        TermPattern::var("x"),
    ));
    assert_eq!(locals(&run(&ds, &query), "x"), vec!["vm1", "server1"]);
}

#[test]
fn test_transitive_over_cycle_terminates() {
    let ds = Loader::default()
        .load(vec![
            entity("a", &[]),
            entity("b", &[]),
            entity("c", &[]),
            rel("a", "uses", "b"),
            rel("b", "uses", "c"),
            rel("c", "uses", "a"),
        ])
        .unwrap()
        .dataset;

    let from_a = Query::select(["x"]).pattern(GroupPattern::new().triple(
        TermPattern::iri(":a"),
        path(":uses+"),
        TermPattern::var("x"),
    ));
    assert_eq!(locals(&run(&ds, &from_a), "x"), vec!["b", "c", "a"]);

    let all = Query::select(["s", "o"]).pattern(GroupPattern::new().triple(
        TermPattern::var("s"),
        path(":uses+"),
        TermPattern::var("o"),
    ));
    assert_eq!(run(&ds, &all).len(), 9);
}

#[test]
fn test_one_or_more_excludes_start_without_cycle() {
    let ds = make_dataset();
    let query = Query::select(["x"]).pattern(GroupPattern::new().triple(
        TermPattern::iri(":app1"),
        path(":hostedOn+"),
        TermPattern::var("x"),
    ));
    assert_eq!(locals(&run(&ds, &query), "x"), vec!["vm1"]);
}

#[test]
fn test_zero_or_more_includes_start() {
    let ds = make_dataset();
    let query = |start: &str| {
        Query::select(["x"]).pattern(GroupPattern::new().triple(
            TermPattern::iri(start),
            path(":hostedOn*"),
            TermPattern::var("x"),
        ))
    };
    assert_eq!(locals(&run(&ds, &query(":app1")), "x"), vec!["app1", "vm1"]);
    assert_eq!(locals(&run(&ds, &query(":app2")), "x"), vec!["app2"]);
}

#[test]
fn test_inverse_traversal() {
    let ds = make_dataset();
    let query = Query::select(["vm"]).pattern(GroupPattern::new().triple(
        TermPattern::iri(":server1"),
        path("^:runsOn"),
        TermPattern::var("vm"),
    ));
    assert_eq!(locals(&run(&ds, &query), "vm"), vec!["vm1", "vm2"]);

    // Same answer from the other end.
    let query = Query::select(["vm"]).pattern(GroupPattern::new().triple(
        TermPattern::var("vm"),
        path(":runsOn"),
        TermPattern::iri(":server1"),
    ));
    assert_eq!(locals(&run(&ds, &query), "vm"), vec!["vm1", "vm2"]);
}

#[test]
fn test_transitive_with_bound_object_walks_backwards() {
    let ds = make_dataset();
    let query = Query::select(["x"]).pattern(GroupPattern::new().triple(
        TermPattern::var("x"),
        path("(:uses|:hostedOn|:runsOn)+"),
        TermPattern::iri(":server1"),
    ));
    assert_eq!(
        locals(&run(&ds, &query), "x"),
        vec!["vm1", "vm2", "app1", "db1"]
    );
}

#[test]
fn test_type_match_is_hierarchy_aware() {
    let ds = make_dataset();
    let query = Query::select(["app"]).pattern(
        GroupPattern::new()
            .triple(
                TermPattern::var("app"),
                path("a"),
                TermPattern::iri(":ApplicationLayer"),
            )
            .triple(
                TermPattern::var("app"),
                path("(:uses|:hostedOn|:runsOn)+"),
                TermPattern::iri(":server1"),
            ),
    );
    assert_eq!(locals(&run(&ds, &query), "app"), vec!["app1", "db1"]);
}

#[test]
fn test_type_with_variable_binds_asserted_classes() {
    let ds = make_dataset();
    let query = Query::select(["t"]).pattern(GroupPattern::new().triple(
        TermPattern::iri(":vm1"),
        path("rdf:type"),
        TermPattern::var("t"),
    ));
    assert_eq!(
        locals(&run(&ds, &query), "t"),
        vec!["VirtualMachine", "Compute"]
    );
}

#[test]
fn test_subclass_star_over_classes() {
    let ds = make_dataset();
    let query = Query::select(["type"]).pattern(GroupPattern::new().triple(
        TermPattern::var("type"),
        path("rdfs:subClassOf*"),
        TermPattern::iri(":Compute"),
    ));
    assert_eq!(
        locals(&run(&ds, &query), "type"),
        vec!["Compute", "PhysicalServer", "VirtualMachine"]
    );
}

#[test]
fn test_inverse_type_lists_asserted_instances() {
    let ds = make_dataset();
    let members = |class: &str| {
        let query = Query::select(["x"]).pattern(GroupPattern::new().triple(
            TermPattern::iri(class),
            path("^a"),
            TermPattern::var("x"),
        ));
        locals(&run(&ds, &query), "x")
    };
    assert_eq!(members(":VirtualMachine"), vec!["vm1", "vm2"]);
    // Only vm1 asserts Compute; the inverse step does not infer.
    assert_eq!(members(":Compute"), vec!["vm1"]);
    assert!(members(":ApplicationLayer").is_empty());
}

#[test]
fn test_direct_subclasses_by_backward_step() {
    let ds = make_dataset();
    let query = Query::select(["sub"]).pattern(GroupPattern::new().triple(
        TermPattern::var("sub"),
        path("rdfs:subClassOf"),
        TermPattern::iri(":Compute"),
    ));
    assert_eq!(
        locals(&run(&ds, &query), "sub"),
        vec!["PhysicalServer", "VirtualMachine"]
    );
}

#[test]
fn test_count_distinct_entities_in_layer() {
    let ds = make_dataset();
    let pattern = GroupPattern::new()
        .triple(TermPattern::var("entity"), path("a"), TermPattern::var("type"))
        .triple(
            TermPattern::var("type"),
            path("rdfs:subClassOf*"),
            TermPattern::iri(":PhysicalInfrastructureLayer"),
        );

    let distinct = run(
        &ds,
        &Query::count(Some("entity"), true, "n").pattern(pattern.clone()),
    );
    assert_eq!(distinct.variables, vec!["n"]);
    assert_eq!(distinct.get(0, "n"), Some(&Term::Literal(Value::Integer(3))));

    // vm1 asserts both VirtualMachine and Compute.
    let plain = run(&ds, &Query::count(Some("entity"), false, "n").pattern(pattern));
    assert_eq!(plain.get(0, "n"), Some(&Term::literal(4i64)));
}

#[test]
fn test_attribute_values_are_path_targets() {
    let ds = Loader::default()
        .load(vec![
            entity("vm1", &[]),
            LoadRecord::attribute(iri("vm1"), iri("cpu"), 4i64),
        ])
        .unwrap()
        .dataset;
    let query = Query::select(["c"]).pattern(GroupPattern::new().triple(
        TermPattern::iri(":vm1"),
        path(":cpu"),
        TermPattern::var("c"),
    ));
    assert_eq!(run(&ds, &query).get(0, "c"), Some(&Term::literal(4i64)));
}

#[test]
fn test_parallel_and_sequential_agree() {
    let ds = make_dataset();
    let query = Query::select(["app", "x"]).pattern(
        GroupPattern::new()
            .triple(
                TermPattern::var("app"),
                path("a"),
                TermPattern::iri(":ApplicationLayer"),
            )
            .triple(
                TermPattern::var("app"),
                path("(:uses|:hostedOn|:runsOn|:communicatesVia)+"),
                TermPattern::var("x"),
            ),
    );

    let parallel = QueryConfig {
        parallel_paths: true,
        parallel_threshold: 0,
    };
    let sequential = QueryConfig {
        parallel_paths: false,
        ..QueryConfig::default()
    };
    let a = QueryEngine::new(&ds, &parallel)
        .execute(&query, &context())
        .unwrap();
    let b = QueryEngine::new(&ds, &sequential)
        .execute(&query, &context())
        .unwrap();
    assert_eq!(a, b);
    assert_eq!(
        locals(&a, "x"),
        vec!["db1", "vm1", "vm2", "server1", "net1", "vm2", "server1"]
    );
}

#[test]
fn test_deadline_exceeded_returns_error_not_partial_result() {
    let ds = make_dataset();
    let query = Query::select(["x"]).pattern(GroupPattern::new().triple(
        TermPattern::var("s"),
        path(":uses*"),
        TermPattern::var("x"),
    ));
    let err = QueryEngine::new(&ds, &QueryConfig::default())
        .execute(&query, &context().with_deadline(Instant::now()))
        .unwrap_err();
    assert_eq!(err, QueryError::DeadlineExceeded);
}
