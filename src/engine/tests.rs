//! Tests for engine module

use super::*;
use crate::cancel::CancelHandle;
use crate::http::mock::MockExecutor;
use crate::http::{HttpRequest, RawResponse};
use crate::parse::Scalar;
use crate::query::declared_lookups;
use crate::registry::load_catalog_from_str;
use crate::types::ScalarType;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

const BASE: &str = "https://api.example.com";

const SHOP: &str = r#"
name: shop
base_url: https://api.example.com
endpoints:
  - name: Customers
    suffix: /customers
    json_path: $.customers
    lookups:
      - endpoint: Customer Orders
        parameter_name: ID
        key: ID
  - name: Customer Orders
    suffix: /customers/{ID}/orders
    json_path: $.orders
    parameters:
      - name: ID
        required: true
        location: path
    lookups:
      - endpoint: Order Supplier
        parameter_name: supplierId
        key: supplierId
        inherit_parameters: false
  - name: Order Supplier
    suffix: /suppliers/{supplierId}
    json_path: $.supplier
"#;

fn shop_body(path: &str) -> Option<Value> {
    let body = match path {
        "/customers" => json!({"customers": [
            {"ID": 1, "name": "customer 1"},
            {"ID": 2, "name": "customer 2"}
        ]}),
        "/customers/1/orders" => json!({"orders": [
            {"orderId": "order1", "supplierId": "supplier1"},
            {"orderId": "order2", "supplierId": "supplier2"}
        ]}),
        "/customers/2/orders" => json!({"orders": [
            {"orderId": "order3", "supplierId": "supplier3"}
        ]}),
        "/suppliers/supplier1" => json!({"supplier": {"name": "supplier 1"}}),
        "/suppliers/supplier2" => json!({"supplier": {"name": "supplier 2"}}),
        "/suppliers/supplier3" => json!({"supplier": {"name": "supplier 3"}}),
        _ => return None,
    };
    Some(body)
}

fn path_of(request: &HttpRequest) -> String {
    url::Url::parse(&request.url).unwrap().path().to_string()
}

fn shop_mock() -> Arc<MockExecutor> {
    Arc::new(MockExecutor::new(|req| match shop_body(&path_of(req)) {
        Some(body) => Ok(RawResponse::ok(&req.url, body.to_string())),
        None => Ok(RawResponse {
            status: 404,
            ..RawResponse::ok(&req.url, "not found")
        }),
    }))
}

fn engine(yaml: &str, mock: &Arc<MockExecutor>) -> QueryEngine {
    let catalog = Arc::new(load_catalog_from_str(yaml).unwrap());
    QueryEngine::new(catalog, Transport::new(mock.clone(), BASE))
}

fn with_all_lookups(engine: &QueryEngine, endpoint: &str) -> Query {
    let descriptor = engine.catalog().endpoint(endpoint).unwrap();
    Query::for_endpoint(descriptor).with_lookups(declared_lookups(
        engine.catalog(),
        descriptor,
        LOOKUP_QUERY_LIMIT,
    ))
}

// ============================================================================
// QueryConfig / QueryStats Tests
// ============================================================================

#[test]
fn test_query_config_builder() {
    let config = QueryConfig::default();
    assert_eq!(config.lookup_concurrency, crate::resolve::DEFAULT_LOOKUP_CONCURRENCY);

    let config = QueryConfig::new().with_lookup_concurrency(0);
    assert_eq!(config.lookup_concurrency, 1);
}

#[test]
fn test_query_stats() {
    let mut stats = QueryStats::new();
    stats.add_query();
    stats.add_pages(3);
    stats.add_entities(10);
    stats.add_rows(4);
    stats.set_duration(12);

    assert_eq!(stats.queries_run, 1);
    assert_eq!(stats.pages_fetched, 3);
    assert_eq!(stats.entities_parsed, 10);
    assert_eq!(stats.rows_produced, 4);
    assert_eq!(stats.duration_ms, 12);
}

// ============================================================================
// Query execution
// ============================================================================

#[tokio::test]
async fn test_run_query_without_lookups() {
    let mock = shop_mock();
    let engine = engine(SHOP, &mock);
    let query = Query::for_endpoint(engine.catalog().endpoint("Customers").unwrap());

    let table = engine.run_query(&query).await.unwrap();

    assert_eq!(table.column_names(), vec!["ID", "name"]);
    assert_eq!(table.row_count(), 2);
    assert_eq!(mock.requests().len(), 1);
}

#[tokio::test]
async fn test_nested_lookups_join_supplier_names() {
    let mock = shop_mock();
    let engine = engine(SHOP, &mock);
    let query = with_all_lookups(&engine, "Customers");

    let table = engine.run_query(&query).await.unwrap();
    let grid = table.to_grid();

    assert_eq!(grid.len(), 4);
    assert_eq!(
        grid[0],
        vec![
            "ID",
            "name",
            "Customer Orders.orderId",
            "Customer Orders.supplierId",
            "Customer Orders.Order Supplier.name"
        ]
    );

    let suppliers: Vec<_> = table
        .column_values("Customer Orders.Order Supplier.name")
        .unwrap()
        .into_iter()
        .cloned()
        .collect();
    assert_eq!(
        suppliers,
        vec![
            Scalar::String("supplier 1".into()),
            Scalar::String("supplier 2".into()),
            Scalar::String("supplier 3".into())
        ]
    );
    assert_eq!(
        grid[1..]
            .iter()
            .map(|row| (row[1].as_str(), row[2].as_str()))
            .collect::<Vec<_>>(),
        vec![
            ("customer 1", "order1"),
            ("customer 1", "order2"),
            ("customer 2", "order3")
        ]
    );

    let stats = engine.stats();
    assert_eq!(stats.queries_run, 1 + 2 + 3);
    assert_eq!(stats.rows_produced, 3);
}

#[tokio::test]
async fn test_customer_without_orders_is_dropped() {
    let mock = Arc::new(MockExecutor::new(|req| {
        let body = match path_of(req).as_str() {
            "/customers" => json!({"customers": [
                {"ID": 1, "name": "customer 1"},
                {"ID": 3, "name": "customer 3"}
            ]}),
            "/customers/3/orders" => json!({"orders": []}),
            path => shop_body(path).unwrap_or_else(|| json!({})),
        };
        Ok(RawResponse::ok(&req.url, body.to_string()))
    }));
    let engine = engine(SHOP, &mock);
    let query = with_all_lookups(&engine, "Customers");

    let table = engine.run_query(&query).await.unwrap();
    let grid = table.to_grid();

    let names: Vec<_> = grid[1..].iter().map(|row| row[1].as_str()).collect();
    assert_eq!(names, vec!["customer 1", "customer 1"]);
}

#[tokio::test]
async fn test_lookup_substitutes_id_and_propagates_flags() {
    const FLAGS: &str = r#"
name: shop
base_url: https://api.example.com
endpoints:
  - name: Customers
    suffix: /customers
    json_path: $.customers
    lookups:
      - endpoint: Customer Orders
        parameter_name: ID
        key: ID
        json_path: $.data.orders
        expand_arrays: true
  - name: Customer Orders
    suffix: /customers/{ID}/orders
"#;
    let mock = Arc::new(MockExecutor::new(|req| {
        let body = if path_of(req) == "/customers" {
            json!({"customers": [{"ID": 7}]})
        } else {
            json!({"data": {"orders": [{"n": 1, "tags": ["a", "b"]}]}})
        };
        Ok(RawResponse::ok(&req.url, body.to_string()))
    }));
    let engine = engine(FLAGS, &mock);
    let query = with_all_lookups(&engine, "Customers").with_parameter("region", "eu");

    let table = engine.run_query(&query).await.unwrap();

    let urls: Vec<_> = mock.requests().into_iter().map(|r| r.url).collect();
    assert_eq!(
        urls,
        vec![
            "https://api.example.com/customers?region=eu",
            "https://api.example.com/customers/7/orders?region=eu"
        ]
    );
    assert_eq!(
        table.to_grid(),
        vec![
            vec!["ID", "Customer Orders.n", "Customer Orders.tags"],
            vec!["7", "1", "a"],
            vec!["7", "1", "b"],
        ]
    );
}

#[tokio::test]
async fn test_xml_schema_types_columns() {
    const ERP: &str = r#"
name: erp
base_url: https://erp.example.com
endpoints:
  - name: Orders
    suffix: /orders
    format: xml
    json_path: orders/order
    schema:
      name: orders
      children:
        - name: order
          children:
            - { name: id, type: "xs:int" }
            - { name: total, type: decimal }
            - { name: code, type: string }
"#;
    let mock = Arc::new(MockExecutor::new(|req| {
        Ok(RawResponse::ok(
            &req.url,
            "<orders>\
               <order><id>1</id><total>2.5</total><code>007</code></order>\
               <order><id>2</id><total>4</total><code>008</code></order>\
             </orders>",
        ))
    }));
    let engine = engine(ERP, &mock);
    let query = Query::for_endpoint(engine.catalog().endpoint("Orders").unwrap());

    let table = engine.run_query(&query).await.unwrap();

    let types: Vec<_> = table.columns().iter().map(|c| c.data_type).collect();
    assert_eq!(
        types,
        vec![ScalarType::Integer, ScalarType::Double, ScalarType::String]
    );
    assert_eq!(table.row_count(), 2);
    assert_eq!(table.get(1, "id"), Some(&Scalar::Number(2.into())));
    assert_eq!(table.get(0, "code"), Some(&Scalar::String("007".into())));
}

#[tokio::test]
async fn test_xml_schema_types_repeated_leaf_names() {
    const CRM: &str = r#"
name: crm
base_url: https://crm.example.com
endpoints:
  - name: Customers
    suffix: /customers
    format: xml
    json_path: customers/customer
    schema:
      name: customers
      children:
        - name: customer
          children:
            - name: address
              children:
                - { name: id, type: string }
            - { name: id, type: "xs:int" }
"#;
    let mock = Arc::new(MockExecutor::new(|req| {
        Ok(RawResponse::ok(
            &req.url,
            "<customers>               <customer><address><id>A-1</id></address><id>5</id></customer>             </customers>",
        ))
    }));
    let engine = engine(CRM, &mock);
    let query = Query::for_endpoint(engine.catalog().endpoint("Customers").unwrap());

    let table = engine.run_query(&query).await.unwrap();

    assert_eq!(table.column_names(), vec!["address.id", "id"]);
    let types: Vec<_> = table.columns().iter().map(|c| c.data_type).collect();
    assert_eq!(types, vec![ScalarType::String, ScalarType::Integer]);
    assert_eq!(table.get(0, "id"), Some(&Scalar::Number(5.into())));
    assert_eq!(table.get(0, "address.id"), Some(&Scalar::String("A-1".into())));
}

#[tokio::test]
async fn test_two_runs_are_identical() {
    let mock = shop_mock();
    let engine = engine(SHOP, &mock);
    let query = with_all_lookups(&engine, "Customers");

    let first = engine.run_query(&query).await.unwrap();
    let requests = mock.requests().len();
    let second = engine.run_query(&query).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(mock.requests().len(), requests * 2);
}

#[tokio::test]
async fn test_child_failure_names_endpoint() {
    let mock = Arc::new(MockExecutor::new(|req| {
        if path_of(req) == "/customers" {
            Ok(RawResponse::ok(&req.url, json!({"customers": [{"ID": 1}]}).to_string()))
        } else {
            Ok(RawResponse {
                status: 500,
                ..RawResponse::ok(&req.url, "boom")
            })
        }
    }));
    let engine = engine(SHOP, &mock);
    let query = with_all_lookups(&engine, "Customers");

    let err = engine.run_query(&query).await.unwrap_err();
    match err {
        Error::Endpoint { endpoint, source } => {
            assert_eq!(endpoint, "Customer Orders");
            assert!(matches!(*source, Error::HttpStatus { status: 500, .. }));
        }
        other => panic!("Expected Endpoint error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unknown_endpoint() {
    let mock = shop_mock();
    let engine = engine(SHOP, &mock);

    let err = engine.run_query(&Query::new("Invoices")).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Endpoint 'Invoices' is not defined by connector 'shop'"
    );
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn test_cancelled_query() {
    let mock = shop_mock();
    let (handle, token) = CancelHandle::new();
    let engine = engine(SHOP, &mock).with_cancel(token);
    handle.cancel();

    let query = with_all_lookups(&engine, "Customers");
    let err = engine.run_query(&query).await.unwrap_err();

    assert!(err.is_cancelled());
    assert!(mock.requests().is_empty());
}

// ============================================================================
// Connection check
// ============================================================================

#[tokio::test]
async fn test_check_fetches_first_page_only() {
    let mock = shop_mock();
    let engine = engine(SHOP, &mock);

    engine.check().await.unwrap();

    let requests = mock.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url, "https://api.example.com/customers");
}

#[tokio::test]
async fn test_check_reports_unparseable_body() {
    let mock = Arc::new(MockExecutor::new(|req| Ok(RawResponse::ok(&req.url, "<html>"))));
    let engine = engine(SHOP, &mock);

    let err = engine.check().await.unwrap_err();
    assert!(matches!(err, Error::Endpoint { ref endpoint, .. } if endpoint == "Customers"));
}
