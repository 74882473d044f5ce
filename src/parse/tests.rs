//! Tests for the response tree parser

use super::*;
use crate::types::{DataFormat, ScalarType};
use pretty_assertions::assert_eq;
use serde_json::json;
use test_case::test_case;

fn options(format: DataFormat, path: Option<&str>) -> ParseOptions<'_> {
    ParseOptions {
        format,
        json_path: path,
        leaf_to_null: true,
        schema: None,
    }
}

// ============================================================================
// Scalar narrowing
// ============================================================================

#[test_case("42", Scalar::Number(42.into()) ; "integer")]
#[test_case("-7", Scalar::Number((-7).into()) ; "negative integer")]
#[test_case("true", Scalar::Bool(true) ; "true literal")]
#[test_case("false", Scalar::Bool(false) ; "false literal")]
#[test_case("True", Scalar::String("True".into()) ; "capitalized stays string")]
#[test_case("abc", Scalar::String("abc".into()) ; "plain text")]
#[test_case("NaN", Scalar::String("NaN".into()) ; "non finite stays string")]
fn test_narrow(text: &str, expected: Scalar) {
    assert_eq!(Scalar::narrow(text), expected);
}

#[test]
fn test_narrow_float() {
    match Scalar::narrow("12.5") {
        Scalar::Number(n) => assert_eq!(n.as_f64(), Some(12.5)),
        other => panic!("Expected number, got {other:?}"),
    }
}

#[test]
fn test_coerce_declared_types() {
    let text = Scalar::String("17".into());
    assert_eq!(text.coerce(ScalarType::Integer), Scalar::Number(17.into()));
    assert_eq!(
        Scalar::String("yes".into()).coerce(ScalarType::Integer),
        Scalar::String("yes".into())
    );
    assert_eq!(
        Scalar::String("true".into()).coerce(ScalarType::Boolean),
        Scalar::Bool(true)
    );
    assert_eq!(
        Scalar::Number(5.into()).coerce(ScalarType::String),
        Scalar::String("5".into())
    );
    assert_eq!(Scalar::Null.coerce(ScalarType::Integer), Scalar::Null);
}

#[test]
fn test_inferred_type() {
    assert_eq!(Scalar::narrow("1").inferred_type(), Some(ScalarType::Integer));
    assert_eq!(Scalar::narrow("1.5").inferred_type(), Some(ScalarType::Double));
    assert_eq!(Scalar::narrow("x").inferred_type(), Some(ScalarType::String));
    assert_eq!(Scalar::Null.inferred_type(), None);
}

// ============================================================================
// XML
// ============================================================================

#[test_case(1 ; "single occurrence")]
#[test_case(2 ; "two occurrences")]
#[test_case(3 ; "three occurrences")]
fn test_repeated_tags_promote_to_list(count: usize) {
    let items: String = (0..count).map(|i| format!("<item>{i}</item>")).collect();
    let xml = format!("<root>{items}</root>");

    let doc = parse_untyped(&xml).unwrap();
    let item = doc.get("root").and_then(|r| r.get("item")).unwrap();

    match (count, item) {
        (1, Node::Scalar(s)) => assert_eq!(*s, Scalar::Number(0.into())),
        (n, Node::List(list)) => assert_eq!(list.len(), n),
        (n, other) => panic!("Unexpected shape for {n} items: {other:?}"),
    }
}

#[test]
fn test_xml_attributes_and_empty_elements() {
    let xml = r#"<?xml version="1.0"?>
        <order id="7" status="open">
            <note/>
            <total>10.50</total>
            <paid>false</paid>
        </order>"#;

    let doc = parse_untyped(xml).unwrap();
    let order = doc.get("order").unwrap();

    assert_eq!(order.get("@id"), Some(&Node::Scalar(Scalar::Number(7.into()))));
    assert_eq!(order.get("@status"), Some(&Node::string("open")));
    assert!(order.get("note").unwrap().is_null());
    assert_eq!(order.get("paid"), Some(&Node::Scalar(Scalar::Bool(false))));
}

#[test]
fn test_xml_field_order_preserved() {
    let doc = parse_untyped("<r><b>1</b><a>2</a><c>3</c></r>").unwrap();
    let keys: Vec<&String> = doc.get("r").unwrap().as_composite().unwrap().keys().collect();
    assert_eq!(keys, vec!["b", "a", "c"]);
}

#[test]
fn test_xml_malformed() {
    let err = parse_untyped("<a><b></a>").unwrap_err();
    assert!(matches!(err, crate::Error::XmlParse { .. }));
}

// ============================================================================
// Schema-aware XML
// ============================================================================

fn order_schema() -> SchemaElement {
    SchemaElement::composite(
        "orders",
        vec![SchemaElement::composite(
            "order",
            vec![
                SchemaElement::primitive("id", "xs:int"),
                SchemaElement::primitive("total", "xs:decimal"),
                SchemaElement::primitive("code", "xs:string"),
            ],
        )],
    )
}

#[test]
fn test_typed_parse_keeps_raw_text_and_registers_types() {
    let xml = "<orders>\
        <order><id>1</id><total>9.90</total><code>007</code></order>\
        <order><id>2</id><total>1.00</total><code>008</code></order>\
    </orders>";

    let (doc, types) = parse_typed(xml, &order_schema()).unwrap();

    let orders = doc.get("orders").and_then(|o| o.get("order")).unwrap();
    let Node::List(orders) = orders else {
        panic!("Expected list of orders");
    };
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].get("code"), Some(&Node::string("007")));
    assert_eq!(orders[0].get("id"), Some(&Node::string("1")));

    let id_path: Vec<String> = vec!["orders".into(), "order".into(), "id".into()];
    assert_eq!(types.get(&id_path), Some(ScalarType::Integer));
    assert_eq!(types.len(), 3);
    assert_eq!(types.get(&["total".to_string()]), None);
}

#[test]
fn test_typed_parse_missing_definition() {
    let xml = "<orders><order><id>1</id><extra>x</extra></order></orders>";
    let err = parse_typed(xml, &order_schema()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "XMLSchema is missing definition for orders/order/extra"
    );
}

#[test]
fn test_type_map_first_registration_wins() {
    let mut types = TypeMap::new();
    let path = vec!["a".to_string()];
    types.insert_if_absent(path.clone(), ScalarType::Integer);
    types.insert_if_absent(path.clone(), ScalarType::String);
    assert_eq!(types.get(&path), Some(ScalarType::Integer));

    let mut other = TypeMap::new();
    other.insert_if_absent(path.clone(), ScalarType::Boolean);
    other.insert_if_absent(vec!["b".to_string()], ScalarType::Date);
    types.merge(other);
    assert_eq!(types.get(&path), Some(ScalarType::Integer));
    assert_eq!(types.len(), 2);
}

// ============================================================================
// Path queries and extraction
// ============================================================================

#[test]
fn test_parse_path_segments() {
    assert_eq!(
        parse_path("$.data.items[0]").unwrap(),
        vec![
            Segment::Field("data".into()),
            Segment::Field("items".into()),
            Segment::Index(0)
        ]
    );
    assert_eq!(
        parse_path("/orders/order[*]").unwrap(),
        vec![
            Segment::Field("orders".into()),
            Segment::Field("order".into()),
            Segment::Wildcard
        ]
    );
    assert!(parse_path("items[0").is_err());
}

#[test]
fn test_field_names_skip_indexes() {
    assert_eq!(field_names("$.data.items[0]"), vec!["data", "items"]);
    assert_eq!(field_names("/orders/order[*]"), vec!["orders", "order"]);
    assert!(field_names("items[0").is_empty());
}

#[test]
fn test_json_entities_from_path() {
    let body = json!({"data": {"customers": [{"ID": 1}, {"ID": 2}]}}).to_string();
    let page = parse_response(&body, &options(DataFormat::Json, Some("$.data.customers"))).unwrap();
    assert_eq!(page.entities.len(), 2);
    assert_eq!(page.entities[1].get("ID"), Some(&Node::Scalar(Scalar::Number(2.into()))));
}

#[test]
fn test_json_field_mapped_over_list() {
    let body = json!({"items": [{"id": "a"}, {"id": "b"}, {"name": "no id"}]}).to_string();
    let page = parse_response(&body, &options(DataFormat::Json, Some("items.id"))).unwrap();
    assert_eq!(page.entities, vec![Node::string("a"), Node::string("b")]);
}

#[test]
fn test_json_negative_index() {
    let body = json!({"items": [1, 2, 3]}).to_string();
    let page = parse_response(&body, &options(DataFormat::Json, Some("items[-1]"))).unwrap();
    assert_eq!(page.entities, vec![Node::Scalar(Scalar::Number(3.into()))]);
}

#[test]
fn test_json_recursive_descent_uses_jsonpath() {
    let body = json!({"a": {"id": 1}, "b": [{"id": 2}]}).to_string();
    let page = parse_response(&body, &options(DataFormat::Json, Some("$..id"))).unwrap();
    assert_eq!(page.entities.len(), 2);
}

#[test]
fn test_leaf_to_null() {
    let body = json!({"data": []}).to_string();
    let page = parse_response(&body, &options(DataFormat::Json, Some("$.missing"))).unwrap();
    assert!(page.entities.is_empty());

    let strict = ParseOptions {
        leaf_to_null: false,
        ..options(DataFormat::Json, Some("$.missing"))
    };
    let err = parse_response(&body, &strict).unwrap_err();
    assert!(matches!(err, crate::Error::RecordExtraction { .. }));
}

#[test]
fn test_json_without_path_is_whole_document() {
    let body = json!([{"a": 1}, {"a": 2}]).to_string();
    let page = parse_response(&body, &options(DataFormat::Json, None)).unwrap();
    assert_eq!(page.entities.len(), 2);

    let page = parse_response("", &options(DataFormat::Json, None)).unwrap();
    assert!(page.entities.is_empty());
}

#[test]
fn test_json_key_order_preserved() {
    let body = r#"{"zeta": 1, "alpha": 2, "mid": 3}"#;
    let page = parse_response(body, &options(DataFormat::Json, None)).unwrap();
    let keys: Vec<&String> = page.entities[0].as_composite().unwrap().keys().collect();
    assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
}

#[test]
fn test_json_decode_error() {
    let err = parse_response("{not json", &options(DataFormat::Json, None)).unwrap_err();
    assert!(matches!(err, crate::Error::Decode { .. }));
}

#[test]
fn test_xml_entities_from_path() {
    let xml = "<orders><order><id>1</id></order><order><id>2</id></order></orders>";
    let page = parse_response(xml, &options(DataFormat::Xml, Some("orders/order"))).unwrap();
    assert_eq!(page.entities.len(), 2);
    assert_eq!(page.entities[0].get("id"), Some(&Node::Scalar(Scalar::Number(1.into()))));
}

#[test]
fn test_xml_typed_extraction_carries_types() {
    let xml = "<orders><order><id>1</id><total>2.5</total><code>A</code></order></orders>";
    let schema = order_schema();
    let opts = ParseOptions {
        schema: Some(&schema),
        ..options(DataFormat::Xml, Some("orders.order"))
    };
    let page = parse_response(xml, &opts).unwrap();
    assert_eq!(page.entities.len(), 1);
    assert_eq!(page.types.len(), 3);
    assert_eq!(page.entity_path, vec!["orders", "order"]);
}

#[test]
fn test_node_json_round_trip_keeps_order() {
    let value = json!({"b": [1, {"c": null}], "a": "x"});
    assert_eq!(Node::from_json(value.clone()).to_json(), value);
}
