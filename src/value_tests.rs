use super::*;
use num_bigint::BigInt;

#[test]
fn type_names() {
    let dt: Datetime = "1979-05-27T07:32:00Z".parse().unwrap();
    let cases = [
        (Value::from("s"), "string", "string"),
        (Value::from(1), "integer", "integer"),
        (Value::from(1.5), "float", "float"),
        (Value::from(true), "boolean", "boolean"),
        (Value::from(dt), "datetime", "offset datetime"),
        (Value::from(Array::new()), "array", "array"),
        (Value::from(Table::new()), "table", "table"),
    ];
    for (value, ty, element) in cases {
        assert_eq!(value.type_str(), ty);
        assert_eq!(value.element_type(), element);
    }
}

#[test]
fn integer_and_float_are_distinct() {
    assert_ne!(Value::from(1), Value::from(1.0));
    assert_eq!(Value::from(1).as_f64(), None);
    assert_eq!(Value::from(1.0).as_i64(), None);
}

#[test]
fn float_equality_is_bitwise() {
    assert_eq!(Value::from(f64::NAN), Value::from(-f64::NAN));
    assert_ne!(Value::from(0.0), Value::from(-0.0));
    assert_eq!(Value::from(f64::INFINITY), Value::from(f64::INFINITY));
    assert_ne!(Value::from(f64::INFINITY), Value::from(f64::NEG_INFINITY));
}

#[test]
fn big_integers() {
    let big: BigInt = "123456789012345678901234567890".parse().unwrap();
    let v = Value::from(big.clone());
    assert_eq!(v.as_i64(), None);
    assert_eq!(v.as_integer(), Some(&Integer::Big(big)));
    assert_eq!(format!("{v:?}"), "123456789012345678901234567890");

    // small values collapse to the 64-bit representation
    let small = Integer::from(BigInt::from(-42));
    assert!(matches!(small, Integer::I64(-42)));
    assert!(small.is_negative());
    assert_eq!(Integer::Big(BigInt::from(7)), Integer::I64(7));
    assert_eq!(Integer::Big(BigInt::from(7)).as_i64(), Some(7));
}

#[test]
fn accessors() {
    let mut t = Table::new();
    t.insert("name", Value::from("bot"));
    let mut v = Value::from(t);
    assert_eq!(v.get("name").and_then(Value::as_str), Some("bot"));
    assert_eq!(v.get("missing"), None);
    assert!(v.as_array().is_none());
    assert!(!v.is_array_of_tables());

    if let Some(t) = v.as_table_mut() {
        t.insert("enabled", Value::from(false));
    }
    assert_eq!(v.get("enabled").and_then(Value::as_bool), Some(false));

    let aot = Value::from(Array::of_tables());
    assert!(aot.is_array_of_tables());
    assert_eq!(Value::from(String::from("x")).as_str(), Some("x"));
}

#[test]
fn keys_compare_by_name() {
    let a = Key::spanned("k".into(), Span::new(0, 1));
    let b = Key::new("k");
    assert_eq!(a, b);
    assert_eq!(a.to_string(), "k");
    assert_eq!(format!("{b:?}"), "\"k\"");
}
