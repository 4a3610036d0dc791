use proptest::prelude::*;
use pvault_protocol::{Envelope, coerce_int, coerce_string, coerce_words};
use serde_json::{Value, json};

fn any_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        any::<f64>().prop_filter("finite", |f| f.is_finite()).prop_map(|f| json!(f)),
        ".{0,12}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 16, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,4}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

proptest! {
    #[test]
    fn coercion_never_panics(value in any_json()) {
        let _ = coerce_string(&value);
        let _ = coerce_int(&value);
        let _ = coerce_words(&value);
    }

    #[test]
    fn envelope_accessors_never_panic(value in any_json()) {
        let raw = json!({ "op": value.clone(), "sid": value.clone(), "words": value }).to_string();
        let envelope = Envelope::parse(Some(raw.as_str())).unwrap();
        let _ = envelope.string("op");
        let _ = envelope.int("sid");
        let _ = envelope.words("words");
    }

    #[test]
    fn integers_round_trip_through_strings(n in any::<i64>()) {
        prop_assert_eq!(coerce_int(&json!(n.to_string())), Some(n));
        prop_assert_eq!(coerce_string(&json!(n)), Some(n.to_string()));
    }
}
