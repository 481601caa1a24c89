// Round-trip coverage for the encoder/decoder pair: primitives, aggregates,
// the undefined/null distinction, and the classification error tier.

use causeway_bridge::attr::{AttrValue, FUNCTION_MARKER, SHAPE_MEMBER};
use causeway_bridge::value::Shared;
use causeway_bridge::{Bridge, BridgeConfig, EncodeError, TypeTag, Value, ValueObject};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;

fn roundtrip(bridge: &Bridge, value: &Value) -> Value {
    let mut list = causeway_bridge::AttrList::new();
    bridge.encode(&mut list, "v", value).unwrap();
    bridge.decode(list.get("v").unwrap()).unwrap()
}

#[rstest]
#[case::bool_true(Value::Bool(true))]
#[case::bool_false(Value::Bool(false))]
#[case::zero(Value::Number(0.0))]
#[case::negative(Value::Number(-12.25))]
#[case::string(Value::string("hello"))]
#[case::empty_string(Value::string(""))]
#[case::unicode(Value::string("føø — ばー"))]
#[case::null(Value::Null)]
#[case::undefined(Value::Undefined)]
fn test_primitive_roundtrip(#[case] value: Value) {
    let bridge = Bridge::new();
    assert_eq!(roundtrip(&bridge, &value), value);
}

#[test]
fn test_undefined_and_null_never_conflate() {
    let bridge = Bridge::new();
    let mut list = causeway_bridge::AttrList::new();
    bridge.encode(&mut list, "u", &Value::Undefined).unwrap();
    bridge.encode(&mut list, "n", &Value::Null).unwrap();
    assert_eq!(list.get("u").unwrap().tag(), TypeTag::AbsentBool);
    assert_eq!(list.get("n").unwrap().tag(), TypeTag::Byte);
    assert_eq!(bridge.decode(list.get("u").unwrap()).unwrap(), Value::Undefined);
    assert_eq!(bridge.decode(list.get("n").unwrap()).unwrap(), Value::Null);
}

#[test]
fn test_scenario_mixed_argument_list() {
    // encode [true, 3.5, "x", null, undefined] -> five positional entries
    // tagged {boolean, double, string, zero-byte, absent-boolean} in order.
    let bridge = Bridge::new();
    let args = [
        Value::Bool(true),
        Value::Number(3.5),
        Value::string("x"),
        Value::Null,
        Value::Undefined,
    ];
    let list = bridge.encode_args(&args).unwrap();
    assert_eq!(list.len(), 5);

    let tags: Vec<TypeTag> = (0..5)
        .map(|i| list.get(&i.to_string()).unwrap().tag())
        .collect();
    assert_eq!(
        tags,
        [
            TypeTag::Bool,
            TypeTag::Double,
            TypeTag::String,
            TypeTag::Byte,
            TypeTag::AbsentBool,
        ]
    );

    let decoded = bridge.decode_args(&list).unwrap();
    assert_eq!(decoded, args);
}

#[test]
fn test_array_roundtrip_keeps_shape_and_order() {
    let bridge = Bridge::new();
    let value = Value::array(vec![
        Value::Number(1.0),
        Value::string("two"),
        Value::Bool(false),
    ]);
    let mut list = causeway_bridge::AttrList::new();
    bridge.encode(&mut list, "seq", &value).unwrap();

    let AttrValue::List(nested) = list.get("seq").unwrap() else {
        panic!("expected nested list");
    };
    assert_eq!(
        nested.get(SHAPE_MEMBER),
        Some(&AttrValue::String("Array".to_string()))
    );

    assert_eq!(bridge.decode(list.get("seq").unwrap()).unwrap(), value);
}

#[test]
fn test_object_roundtrip_keeps_members_and_order() {
    let bridge = Bridge::new();
    let mut inner = ValueObject::new();
    inner.insert("deep", Value::Null);
    let mut obj = ValueObject::new();
    obj.insert("zeta", Value::Number(26.0));
    obj.insert("alpha", Value::string("first"));
    obj.insert("nested", Value::Object(inner));
    obj.insert("list", Value::array(vec![Value::Undefined, Value::Bool(true)]));
    let value = Value::Object(obj);

    let decoded = roundtrip(&bridge, &value);
    assert_eq!(decoded, value);

    // Plain objects carry no shape member.
    let mut list = causeway_bridge::AttrList::new();
    bridge.encode(&mut list, "o", &value).unwrap();
    let AttrValue::List(nested) = list.get("o").unwrap() else {
        panic!("expected nested list");
    };
    assert_eq!(nested.get(SHAPE_MEMBER), None);

    // And member order survives the trip.
    let Value::Object(decoded_obj) = decoded else {
        panic!("expected object");
    };
    let keys: Vec<&String> = decoded_obj.keys().collect();
    assert_eq!(keys, ["zeta", "alpha", "nested", "list"]);
}

#[test]
fn test_shared_wrapper_collapses_to_inner_value() {
    // Same collapse boxed primitives get: the wrapper does not survive the
    // trip, the wrapped value does.
    let bridge = Bridge::new();
    let value = Value::SharedValue(Shared::new(Value::string("inside")));
    assert_eq!(roundtrip(&bridge, &value), Value::string("inside"));
}

#[test]
fn test_integers_beyond_double_precision_are_lossy() {
    // Documented boundary: integers past 2^53 in magnitude collapse to the
    // nearest representable double on the way in.
    let bridge = Bridge::new();
    let exact = 9_007_199_254_740_992_u64; // 2^53
    let beyond = exact + 1;
    let decoded = roundtrip(&bridge, &Value::Number(beyond as f64));
    assert_eq!(decoded, Value::Number(exact as f64));
}

#[test]
fn test_symbol_is_unrepresentable() {
    let bridge = Bridge::new();
    let mut list = causeway_bridge::AttrList::new();
    let err = bridge
        .encode(&mut list, "sym", &Value::symbol("secret"))
        .unwrap_err();
    assert_eq!(
        err,
        EncodeError::Unrepresentable {
            name: "sym".to_string(),
            kind: "symbol",
        }
    );
}

#[test]
fn test_encode_args_attributes_the_failing_position() {
    let bridge = Bridge::new();
    let err = bridge
        .encode_args(&[Value::Bool(true), Value::Null, Value::symbol("nope")])
        .unwrap_err();
    assert_eq!(err.attribute(), "2");
}

#[test]
fn test_cycle_is_rejected() {
    let bridge = Bridge::new();
    let shared = Shared::new(Value::Null);
    let mut obj = ValueObject::new();
    obj.insert("me", Value::SharedValue(shared.clone()));
    let value = Value::Object(obj);
    shared.set(value.clone());

    let mut list = causeway_bridge::AttrList::new();
    let err = bridge.encode(&mut list, "cyclic", &value).unwrap_err();
    assert!(matches!(err, EncodeError::CycleDetected { .. }));
}

#[test]
fn test_depth_bound_is_enforced() {
    let config = BridgeConfig {
        max_encode_depth: 4,
        ..BridgeConfig::lenient()
    };
    let bridge = Bridge::with_config(config);

    let mut value = Value::Number(0.0);
    for _ in 0..8 {
        value = Value::array(vec![value]);
    }

    let mut list = causeway_bridge::AttrList::new();
    let err = bridge.encode(&mut list, "deep", &value).unwrap_err();
    assert_eq!(
        err,
        EncodeError::DepthExceeded {
            name: "0".to_string(),
            max: 4,
        }
    );

    // Shallow nesting under the same bound is fine.
    let shallow = Value::array(vec![Value::array(vec![Value::Number(1.0)])]);
    let mut list = causeway_bridge::AttrList::new();
    bridge.encode(&mut list, "ok", &shallow).unwrap();
}

#[test]
fn test_shared_siblings_are_not_a_cycle() {
    // The same shared cell appearing twice as siblings is a DAG, not a cycle.
    let bridge = Bridge::new();
    let shared = Shared::new(Value::Number(5.0));
    let value = Value::array(vec![
        Value::SharedValue(shared.clone()),
        Value::SharedValue(shared),
    ]);
    let decoded = roundtrip(&bridge, &value);
    assert_eq!(
        decoded,
        Value::array(vec![Value::Number(5.0), Value::Number(5.0)])
    );
}

#[test]
fn test_plain_data_lists_carry_no_function_marker() {
    let bridge = Bridge::new();
    let list = bridge
        .encode_args(&[Value::Number(1.0), Value::string("two")])
        .unwrap();
    assert!(!list.contains(FUNCTION_MARKER));
    assert!(list.function_tokens().is_empty());
}

proptest! {
    #[test]
    fn prop_primitive_roundtrip(value in prop_oneof![
        Just(Value::Undefined),
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<f64>().prop_filter("NaN has no equality", |n| !n.is_nan()).prop_map(Value::Number),
        ".*".prop_map(Value::string),
    ]) {
        let bridge = Bridge::new();
        prop_assert_eq!(roundtrip(&bridge, &value), value);
    }

    #[test]
    fn prop_argument_lists_roundtrip(values in proptest::collection::vec(
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            (-1e9f64..1e9).prop_map(Value::Number),
            "[a-z]{0,8}".prop_map(Value::string),
        ],
        0..8,
    )) {
        let bridge = Bridge::new();
        let list = bridge.encode_args(&values).unwrap();
        prop_assert_eq!(bridge.decode_args(&list).unwrap(), values);
    }
}
