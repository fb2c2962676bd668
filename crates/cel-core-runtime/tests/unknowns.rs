//! Unknown tracking and merge tests for cel-core-runtime.

mod common;

use cel_core_common::{operators, ExprFactory};
use cel_core_runtime::{
    Attribute, AttributePattern, EvalErrorKind, MapActivation, Qualifier, RuntimeOptions,
    UnknownSet, Value,
};
use common::plan;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn unknowns() -> RuntimeOptions {
    RuntimeOptions::default().with_unknown_processing(true)
}

fn activation_with_unknown(names: &[&str]) -> MapActivation {
    MapActivation::new()
        .with_binding("known", 1i64)
        .with_unknown_patterns(names.iter().map(|n| AttributePattern::new(*n)))
}

#[test]
fn unknown_variable_propagates_through_calls() {
    let mut f = ExprFactory::new();
    let x = f.ident("x");
    let one = f.int(1);
    let expr = f.binary(operators::ADD, x, one);

    let result = plan(&expr, unknowns())
        .evaluate(&activation_with_unknown(&["x"]))
        .unwrap();
    assert_eq!(
        result,
        Value::unknown(UnknownSet::from_attribute(Attribute::new("x")))
    );
}

#[test]
fn unknowns_from_both_operands_are_merged() {
    let mut f = ExprFactory::new();
    let (x, y) = (f.ident("x"), f.ident("y"));
    let expr = f.binary(operators::ADD, x, y);

    let result = plan(&expr, unknowns())
        .evaluate(&activation_with_unknown(&["x", "y"]))
        .unwrap();
    assert_eq!(
        result,
        Value::unknown(UnknownSet::from_attributes([
            Attribute::new("x"),
            Attribute::new("y"),
        ]))
    );
}

#[test]
fn error_takes_precedence_over_unknown() {
    let mut f = ExprFactory::new();
    let x = f.ident("x");
    let (one, zero) = (f.int(1), f.int(0));
    let div = f.binary(operators::DIVIDE, one, zero);
    let expr = f.binary(operators::ADD, x, div);

    for recursive in [true, false] {
        let options = unknowns().with_recursive_planning(recursive);
        let result = plan(&expr, options)
            .evaluate(&activation_with_unknown(&["x"]))
            .unwrap();
        assert_eq!(
            result.as_error().map(|e| e.kind),
            Some(EvalErrorKind::DivisionByZero)
        );
    }
}

#[test]
fn absorbing_value_beats_unknown() {
    let mut f = ExprFactory::new();
    let (x, t) = (f.ident("x"), f.bool(true));
    let or = f.or(x, t);
    let (x, fl) = (f.ident("x"), f.bool(false));
    let and = f.and(x, fl);
    let (x, t) = (f.ident("x"), f.bool(true));
    let and_true = f.and(x, t);

    let activation = activation_with_unknown(&["x"]);
    assert_eq!(
        plan(&or, unknowns()).evaluate(&activation).unwrap(),
        Value::Bool(true)
    );
    assert_eq!(
        plan(&and, unknowns()).evaluate(&activation).unwrap(),
        Value::Bool(false)
    );
    assert!(plan(&and_true, unknowns())
        .evaluate(&activation)
        .unwrap()
        .is_unknown());
}

#[test]
fn field_pattern_marks_selected_value_unknown() {
    let mut f = ExprFactory::new();
    let request = f.ident("request");
    let expr = f.select(request, "user");

    let activation = MapActivation::new()
        .with_binding("request", Value::map([("user".into(), Value::string("ada"))]))
        .with_unknown_patterns([AttributePattern::new("request").field("user")]);
    let result = plan(&expr, unknowns()).evaluate(&activation).unwrap();
    assert_eq!(
        result,
        Value::unknown(UnknownSet::from_attribute(
            Attribute::new("request").with_qualifier(Qualifier::field("user"))
        ))
    );
}

#[test]
fn unknowns_are_inert_when_processing_is_off() {
    let mut f = ExprFactory::new();
    let known = f.ident("known");
    let one = f.int(1);
    let expr = f.binary(operators::ADD, known, one);
    let activation = MapActivation::new()
        .with_binding("known", 1i64)
        .with_unknown_patterns([AttributePattern::new("known")]);
    assert_eq!(
        plan(&expr, RuntimeOptions::default())
            .evaluate(&activation)
            .unwrap(),
        Value::Int(2)
    );
}

fn bools(values: &[bool]) -> Value {
    Value::list(values.iter().copied().map(Value::Bool).collect::<Vec<_>>())
}

/// `xs` bound to `values`, with `xs[index]` declared unknown.
fn activation_with_unknown_element(values: &[bool], index: i64) -> MapActivation {
    MapActivation::new()
        .with_binding("xs", bools(values))
        .with_unknown_patterns([AttributePattern::new("xs").index(index)])
}

fn unknown_element(index: i64) -> Value {
    Value::unknown(UnknownSet::from_attribute(
        Attribute::new("xs").with_qualifier(Qualifier::Int(index)),
    ))
}

#[test]
fn unknown_list_element_reaches_exists_all_and_map() {
    let mut f = ExprFactory::new();
    // xs.exists(x, x)
    let (xs, x) = (f.ident("xs"), f.ident("x"));
    let exists = f.exists(xs, "x", x);
    // xs.all(x, x)
    let (xs, x) = (f.ident("xs"), f.ident("x"));
    let all = f.all(xs, "x", x);
    // xs.map(x, x ? 1 : 2)
    let (xs, x) = (f.ident("xs"), f.ident("x"));
    let (one, two) = (f.int(1), f.int(2));
    let ternary = f.conditional(x, one, two);
    let map = f.map_macro(xs, "x", ternary);

    for recursive in [true, false] {
        let options = unknowns().with_recursive_planning(recursive);
        let activation = activation_with_unknown_element(&[false, true], 1);
        assert_eq!(
            plan(&exists, options.clone()).evaluate(&activation).unwrap(),
            unknown_element(1)
        );
        assert_eq!(
            plan(&map, options.clone()).evaluate(&activation).unwrap(),
            unknown_element(1)
        );

        let activation = activation_with_unknown_element(&[true, true], 1);
        assert_eq!(
            plan(&all, options).evaluate(&activation).unwrap(),
            unknown_element(1)
        );
    }
}

#[test]
fn known_elements_still_decide_comprehensions() {
    let mut f = ExprFactory::new();
    let (xs, x) = (f.ident("xs"), f.ident("x"));
    let exists = f.exists(xs, "x", x);
    let (xs, x) = (f.ident("xs"), f.ident("x"));
    let all = f.all(xs, "x", x);

    for recursive in [true, false] {
        let options = unknowns().with_recursive_planning(recursive);
        let activation = activation_with_unknown_element(&[true, false], 1);
        assert_eq!(
            plan(&exists, options.clone()).evaluate(&activation).unwrap(),
            Value::Bool(true)
        );
        let activation = activation_with_unknown_element(&[false, true], 1);
        assert_eq!(
            plan(&all, options).evaluate(&activation).unwrap(),
            Value::Bool(false)
        );
    }
}

#[test]
fn unknown_map_value_selected_through_iteration_key() {
    // m.map(k, m[k])
    let mut f = ExprFactory::new();
    let m = f.ident("m");
    let (m2, k) = (f.ident("m"), f.ident("k"));
    let value = f.index(m2, k);
    let expr = f.map_macro(m, "k", value);

    let activation = MapActivation::new()
        .with_binding(
            "m",
            Value::map([("a".into(), Value::Int(1)), ("b".into(), Value::Int(2))]),
        )
        .with_unknown_patterns([AttributePattern::new("m").field("b")]);
    for recursive in [true, false] {
        let options = unknowns().with_recursive_planning(recursive);
        assert_eq!(
            plan(&expr, options).evaluate(&activation).unwrap(),
            Value::unknown(UnknownSet::from_attribute(
                Attribute::new("m").with_qualifier(Qualifier::field("b"))
            ))
        );
    }
}

#[test]
fn missing_list_element_is_an_error_in_comprehensions() {
    let mut f = ExprFactory::new();
    let (xs, x) = (f.ident("xs"), f.ident("x"));
    let expr = f.map_macro(xs, "x", x);

    let activation = MapActivation::new()
        .with_binding("xs", bools(&[true, false]))
        .with_missing_patterns([AttributePattern::new("xs").index(1)]);
    for recursive in [true, false] {
        let options = RuntimeOptions::default()
            .with_missing_attribute_errors(true)
            .with_recursive_planning(recursive);
        let result = plan(&expr, options).evaluate(&activation).unwrap();
        assert_eq!(
            result.as_error().map(|e| e.kind),
            Some(EvalErrorKind::MissingAttribute)
        );
    }
}

fn attribute() -> impl Strategy<Value = Attribute> {
    ("[a-c]", prop::collection::vec("[x-z]", 0..3)).prop_map(|(root, fields)| {
        fields
            .iter()
            .fold(Attribute::new(root.as_str()), |attr, field| {
                attr.with_qualifier(Qualifier::field(field))
            })
    })
}

fn unknown_set() -> impl Strategy<Value = UnknownSet> {
    prop::collection::vec(attribute(), 0..4).prop_map(UnknownSet::from_attributes)
}

proptest! {
    #[test]
    fn merge_is_commutative(a in unknown_set(), b in unknown_set()) {
        prop_assert_eq!(a.merge(&b), b.merge(&a));
    }

    #[test]
    fn merge_is_associative(a in unknown_set(), b in unknown_set(), c in unknown_set()) {
        prop_assert_eq!(a.merge(&b).merge(&c), a.merge(&b.merge(&c)));
    }

    #[test]
    fn merge_is_idempotent(a in unknown_set()) {
        prop_assert_eq!(a.merge(&a), a.clone());
    }

    #[test]
    fn merge_contains_both_inputs(a in unknown_set(), b in unknown_set()) {
        let merged = a.merge(&b);
        for attr in a.attributes().chain(b.attributes()) {
            prop_assert!(merged.contains(attr));
        }
        prop_assert!(merged.len() <= a.len() + b.len());
    }
}
