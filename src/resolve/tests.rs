//! Tests for the lookup resolver

use super::*;
use crate::error::{Error, Result};
use crate::parse::Node;
use crate::query::{LookupQuery, Query};
use crate::registry::{load_catalog_from_str, ConnectorCatalog, LookupDescriptor};
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Mutex;
use std::time::Duration;
use test_case::test_case;

const CATALOG: &str = r"
name: shop
base_url: https://api.example.com
endpoints:
  - name: Customers
    suffix: /customers
  - name: Customer Orders
    suffix: /customers/{ID}/orders
    json_path: $.orders
  - name: Supplier
    suffix: /suppliers/{supplierId}
  - name: Order Lines
    suffix: /orders/{orderId}/lines
    expand_arrays: true
    top_level_only: true
";

fn catalog() -> ConnectorCatalog {
    load_catalog_from_str(CATALOG).unwrap()
}

fn set_of(values: &[Value]) -> ResolvedSet {
    ResolvedSet {
        rows: values
            .iter()
            .map(|v| ResolvedRow::new(Node::from_json(v.clone())))
            .collect(),
        ..Default::default()
    }
}

fn entities(values: &[Value]) -> Vec<Node> {
    values.iter().cloned().map(Node::from_json).collect()
}

/// Answers child queries from a closure and records them
struct FakeRunner<F> {
    respond: F,
    seen: Mutex<Vec<Query>>,
}

impl<F> FakeRunner<F>
where
    F: Fn(&Query) -> Result<ResolvedSet> + Send + Sync,
{
    fn new(respond: F) -> Self {
        Self {
            respond,
            seen: Mutex::new(Vec::new()),
        }
    }

    fn seen(&self) -> Vec<Query> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl<F> QueryRunner for FakeRunner<F>
where
    F: Fn(&Query) -> Result<ResolvedSet> + Send + Sync,
{
    async fn run(&self, query: Query, _remaining: usize) -> Result<ResolvedSet> {
        self.seen.lock().unwrap().push(query.clone());
        (self.respond)(&query)
    }
}

fn orders_lookup(key: &str) -> LookupQuery {
    LookupQuery::new(LookupDescriptor::new("Customer Orders", "ID").with_key(key))
}

fn one_order(_: &Query) -> Result<ResolvedSet> {
    Ok(set_of(&[json!({"order": 1})]))
}

// ============================================================================
// Keys
// ============================================================================

#[test_case("", KeyExpr::Entity ; "entity")]
#[test_case("ID", KeyExpr::Field("ID".to_string()) ; "field")]
#[test_case("$.supplier.id", KeyExpr::Path("$.supplier.id".to_string()) ; "path")]
#[test_case("$(region)", KeyExpr::Parameter("region".to_string()) ; "parameter")]
fn test_key_expr_parse(key: &str, expected: KeyExpr) {
    assert_eq!(KeyExpr::parse(key), expected);
}

#[test]
fn test_key_values_forms() {
    let parent = Query::new("Customers").with_parameter("region", "eu");
    let entity = Node::from_json(json!({"ID": 7, "supplier": {"id": "s1"}, "tags": [1, null, 2]}));
    let ids = |key: &str| {
        key_values(&entity, &LookupDescriptor::new("X", "p").with_key(key), &parent).unwrap()
    };

    assert_eq!(ids("ID"), vec!["7"]);
    assert_eq!(ids("$.supplier.id"), vec!["s1"]);
    assert_eq!(ids("$(region)"), vec!["eu"]);
    assert_eq!(ids("tags"), vec!["1", "2"]);
    assert!(ids("missing").is_empty());
    assert!(ids("$(absent)").is_empty());
}

#[test]
fn test_key_selecting_object_is_an_error() {
    let entity = Node::from_json(json!({"supplier": {"id": "s1"}}));
    let lookup = LookupDescriptor::new("Supplier", "supplierId").with_key("supplier");
    let err = key_values(&entity, &lookup, &Query::new("Orders")).unwrap_err();
    assert!(err.to_string().contains("selects an object"));
}

// ============================================================================
// Resolution
// ============================================================================

#[tokio::test]
async fn test_field_key_runs_child_query() {
    let catalog = catalog();
    let runner = FakeRunner::new(one_order);
    let parent = Query::new("Customers").with_lookup(orders_lookup("ID"));

    let rows = LookupResolver::new(&runner, &catalog)
        .resolve(&parent, entities(&[json!({"ID": 1, "name": "Ada"})]), 5)
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].children.len(), 1);
    assert_eq!(rows[0].children[0].prefix, "Customer Orders");
    assert_eq!(rows[0].children[0].result.len(), 1);

    let seen = runner.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].endpoint(), "Customer Orders");
    assert_eq!(seen[0].parameters().get("ID"), Some("1"));
    assert_eq!(seen[0].json_path(), Some("$.orders"));
}

#[tokio::test]
async fn test_scalar_entity_with_empty_key() {
    let catalog = catalog();
    let runner = FakeRunner::new(one_order);
    let parent = Query::new("Customers").with_lookup(orders_lookup(""));

    let rows = LookupResolver::new(&runner, &catalog)
        .resolve(&parent, entities(&[json!(42), json!(43)]), 5)
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    let ids: Vec<_> = runner
        .seen()
        .iter()
        .map(|q| q.parameters().get("ID").unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["42", "43"]);
}

#[tokio::test]
async fn test_scalar_entity_with_field_key_fails() {
    let catalog = catalog();
    let runner = FakeRunner::new(one_order);
    let parent = Query::new("Customers").with_lookup(orders_lookup("ID"));

    let err = LookupResolver::new(&runner, &catalog)
        .resolve(&parent, entities(&[json!("c1")]), 5)
        .await
        .unwrap_err();

    assert!(err
        .to_string()
        .contains("Only lookups on json objects are supported"));
    assert!(runner.seen().is_empty());
}

#[tokio::test]
async fn test_missing_or_null_key_drops_entity() {
    let catalog = catalog();
    let runner = FakeRunner::new(one_order);
    let parent = Query::new("Customers").with_lookup(orders_lookup("ID"));

    let rows = LookupResolver::new(&runner, &catalog)
        .resolve(
            &parent,
            entities(&[json!({"name": "no id"}), json!({"ID": null}), json!({"ID": 3})]),
            5,
        )
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(runner.seen().len(), 1);
    assert_eq!(rows[0].entity.get("ID"), Some(&Node::from_json(json!(3))));
}

#[tokio::test]
async fn test_id_list_fans_out_and_merges() {
    let catalog = catalog();
    let runner = FakeRunner::new(|q: &Query| {
        let id = q.parameters().get("ID").unwrap_or_default().to_string();
        Ok(set_of(&[json!({ "customer": id })]))
    });
    let parent = Query::new("Customers").with_lookup(orders_lookup("ids"));

    let rows = LookupResolver::new(&runner, &catalog)
        .resolve(&parent, entities(&[json!({"ids": [1, 2]})]), 5)
        .await
        .unwrap();

    assert_eq!(runner.seen().len(), 2);
    assert_eq!(rows[0].children[0].result.len(), 2);
}

#[tokio::test]
async fn test_zero_child_rows_drops_entity() {
    let catalog = catalog();
    let runner = FakeRunner::new(|q: &Query| {
        Ok(match q.parameters().get("ID") {
            Some("1") => set_of(&[json!({"order": 1})]),
            _ => ResolvedSet::default(),
        })
    });
    let parent = Query::new("Customers").with_lookup(orders_lookup("ID"));

    let rows = LookupResolver::new(&runner, &catalog)
        .resolve(&parent, entities(&[json!({"ID": 1}), json!({"ID": 2})]), 5)
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(runner.seen().len(), 2);
}

#[tokio::test]
async fn test_child_failure_fails_resolution() {
    let catalog = catalog();
    let runner = FakeRunner::new(|_: &Query| Err(Error::http_status(500, "u", "boom")));
    let parent = Query::new("Customers").with_lookup(orders_lookup("ID"));

    let err = LookupResolver::new(&runner, &catalog)
        .resolve(&parent, entities(&[json!({"ID": 1})]), 5)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 500, .. }));
}

#[tokio::test]
async fn test_depth_exhausted_ignores_lookups() {
    let catalog = catalog();
    let runner = FakeRunner::new(one_order);
    let parent = Query::new("Customers").with_lookup(orders_lookup("ID"));

    let rows = LookupResolver::new(&runner, &catalog)
        .resolve(&parent, entities(&[json!({"ID": 1})]), 0)
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert!(rows[0].children.is_empty());
    assert!(runner.seen().is_empty());
}

/// Answers later ids sooner so completion order differs from input order
struct ReversedRunner;

#[async_trait]
impl QueryRunner for ReversedRunner {
    async fn run(&self, query: Query, _remaining: usize) -> Result<ResolvedSet> {
        let id: u64 = query.parameters().get("ID").unwrap_or("0").parse().unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(50 - id * 10)).await;
        Ok(set_of(&[json!({ "id": id })]))
    }
}

#[tokio::test]
async fn test_concurrent_resolution_keeps_parent_order() {
    let catalog = catalog();
    let parent = Query::new("Customers").with_lookup(orders_lookup("ID"));
    let input: Vec<Value> = (1..=4).map(|id| json!({ "ID": id })).collect();

    let rows = LookupResolver::new(&ReversedRunner, &catalog)
        .with_concurrency(4)
        .resolve(&parent, entities(&input), 5)
        .await
        .unwrap();

    let ids: Vec<_> = rows
        .iter()
        .map(|r| r.entity.get("ID").unwrap().to_json())
        .collect();
    assert_eq!(ids, vec![json!(1), json!(2), json!(3), json!(4)]);
}

// ============================================================================
// Child queries
// ============================================================================

#[test]
fn test_child_query_inherits_parameters_first() {
    let catalog = catalog();
    let target = catalog.endpoint("Customer Orders").unwrap();
    let parent = Query::new("Customers")
        .with_parameter("region", "eu")
        .with_additional_parameter("trace", "1");
    let lookup = orders_lookup("ID");

    let child = child_query(target, &lookup, &parent, "1", &[]);

    let params: Vec<_> = child.parameters().iter().collect();
    assert_eq!(params, vec![("region", "eu"), ("ID", "1")]);
    assert_eq!(child.additional_parameters().get("trace"), Some("1"));
}

#[test]
fn test_child_query_without_inheritance() {
    let catalog = catalog();
    let target = catalog.endpoint("Customer Orders").unwrap();
    let parent = Query::new("Customers")
        .with_parameter("region", "eu")
        .with_additional_parameter("trace", "1");
    let mut descriptor = LookupDescriptor::new("Customer Orders", "ID").with_key("ID");
    descriptor.inherit_parameters = false;

    let child = child_query(target, &LookupQuery::new(descriptor), &parent, "1", &[]);

    let params: Vec<_> = child.parameters().iter().collect();
    assert_eq!(params, vec![("ID", "1")]);
    assert!(child.additional_parameters().is_empty());
}

#[test]
fn test_child_query_propagates_flags_and_nested_lookups() {
    let catalog = catalog();
    let target = catalog.endpoint("Customer Orders").unwrap();
    let mut descriptor = LookupDescriptor::new("Customer Orders", "ID").with_key("ID");
    descriptor.json_path = Some("$.orders[*].lines".to_string());
    descriptor.expand_arrays = true;
    descriptor.top_level_only = true;
    let nested = LookupQuery::new(
        LookupDescriptor::new("Supplier", "supplierId").with_key("supplier_id"),
    );
    let lookup = LookupQuery::new(descriptor).with_lookups(vec![nested]);

    let parent = Query::new("Customers").with_leaf_to_null(false);
    let child = child_query(target, &lookup, &parent, "1", &[]);

    assert_eq!(child.json_path(), Some("$.orders[*].lines"));
    assert!(child.expand_arrays());
    assert!(child.top_level_only());
    assert!(!child.leaf_to_null());
    assert_eq!(child.lookups().len(), 1);
    assert_eq!(child.lookups()[0].descriptor.endpoint, "Supplier");
}

#[test]
fn test_child_query_lookup_flags_override_target_defaults() {
    let catalog = catalog();
    let target = catalog.endpoint("Order Lines").unwrap();
    assert!(target.expand_arrays);
    let lookup = LookupQuery::new(LookupDescriptor::new("Order Lines", "orderId"));

    let parent = Query::new("Customer Orders");
    let child = child_query(target, &lookup, &parent, "10", &[]);

    assert!(!child.expand_arrays());
    assert!(!child.top_level_only());
}

#[test]
fn test_extra_parameters_static_and_derived() {
    let mut descriptor = LookupDescriptor::new("Customer Orders", "ID").with_key("ID");
    descriptor.parameters.insert("status".to_string(), "open".to_string());
    descriptor.parameters.insert("since".to_string(), "$.created".to_string());
    descriptor.parameters.insert("region".to_string(), "$(region)".to_string());
    descriptor.parameters.insert("absent".to_string(), "$.nope".to_string());

    let entity = Node::from_json(json!({"ID": 1, "created": "2024-01-01"}));
    let parent = Query::new("Customers").with_parameter("region", "eu");

    let extras = extra_parameters(&entity, &descriptor, &parent).unwrap();
    assert_eq!(
        extras,
        vec![
            ("status".to_string(), "open".to_string()),
            ("since".to_string(), "2024-01-01".to_string()),
            ("region".to_string(), "eu".to_string()),
        ]
    );
}
