use proptest::prelude::*;
use solcheck_sym::{equals, parse, simplify};

fn arb_expr() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        (-9i64..10).prop_map(|n| format!("({n})")),
        Just("x".to_string()),
        Just("y".to_string()),
    ];
    leaf.prop_recursive(3, 16, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("({a} + {b})")),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("({a} - {b})")),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("({a} * {b})")),
            (inner, 0u32..3).prop_map(|(a, k)| format!("({a})**{k}")),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn printed_form_reparses_to_an_equal_value(text in arb_expr()) {
        let expr = parse(&text).unwrap();
        let printed = expr.to_string();
        let reparsed = parse(&printed).unwrap();
        prop_assert!(equals(&expr, &reparsed).unwrap(), "{} printed as {}", text, printed);
    }

    #[test]
    fn simplification_preserves_value(text in arb_expr()) {
        let expr = parse(&text).unwrap();
        let simple = simplify(&expr).unwrap();
        prop_assert!(equals(&expr, &simple).unwrap());
    }
}
