//! End-to-end evaluation tests for cel-core-runtime.

mod common;

use cel_core_common::{operators, ExprFactory, SpannedExpr};
use cel_core_runtime::{
    AttributePattern, EmptyActivation, EvalErrorKind, ListBuilder, MapActivation, MapBuilder,
    MapKey, RuntimeOptions, Value, ValueKind,
};
use common::{plan, plan_with, with_counted_function};
use pretty_assertions::assert_eq;

fn error_kind(value: &Value) -> Option<EvalErrorKind> {
    value.as_error().map(|err| err.kind)
}

/// `[1, 2, currentUser.age].exists(x, x > 17)`
fn exists_over_user_age(f: &mut ExprFactory) -> SpannedExpr {
    let (one, two) = (f.int(1), f.int(2));
    let user = f.ident("currentUser");
    let age = f.select(user, "age");
    let range = f.list(vec![one, two, age]);
    let x = f.ident("x");
    let limit = f.int(17);
    let pred = f.binary(operators::GREATER, x, limit);
    f.exists(range, "x", pred)
}

fn user(age: i64) -> Value {
    Value::map([(MapKey::from("age"), Value::Int(age))])
}

#[test]
fn exists_over_activation_values() {
    let mut f = ExprFactory::new();
    let expr = exists_over_user_age(&mut f);
    let program = plan(&expr, RuntimeOptions::default());

    let activation = MapActivation::new().with_binding("currentUser", user(30));
    assert_eq!(program.evaluate(&activation).unwrap(), Value::Bool(true));

    let activation = MapActivation::new().with_binding("currentUser", user(12));
    assert_eq!(program.evaluate(&activation).unwrap(), Value::Bool(false));
}

#[test]
fn missing_attribute_is_an_error_value() {
    let mut f = ExprFactory::new();
    let expr = exists_over_user_age(&mut f);
    let options = RuntimeOptions::default().with_missing_attribute_errors(true);
    let program = plan(&expr, options);

    let pattern = AttributePattern::new("currentUser").field("age");
    for current_user in [user(30), Value::map([])] {
        let activation = MapActivation::new()
            .with_binding("currentUser", current_user)
            .with_missing_patterns([pattern.clone()]);
        let result = program.evaluate(&activation).unwrap();
        assert_eq!(error_kind(&result), Some(EvalErrorKind::MissingAttribute));
    }
}

#[test]
fn false_and_never_calls_rhs() {
    let (functions, calls) = with_counted_function(Vec::new(), |_| Value::Bool(true));
    let mut f = ExprFactory::new();
    let lhs = f.bool(false);
    let rhs = f.call("counted", Vec::new());
    let expr = f.and(lhs, rhs);

    let program = plan_with(&functions, &expr, RuntimeOptions::default());
    assert_eq!(program.evaluate(&EmptyActivation).unwrap(), Value::Bool(false));
    assert_eq!(calls.count(), 0);

    let program = plan_with(
        &functions,
        &expr,
        RuntimeOptions::default().with_short_circuiting(false),
    );
    assert_eq!(program.evaluate(&EmptyActivation).unwrap(), Value::Bool(false));
    assert_eq!(calls.count(), 1);
}

#[test]
fn exists_stops_at_first_match() {
    let (functions, calls) = with_counted_function(vec![ValueKind::Int], |args| {
        Value::Bool(args[0] == Value::Int(2))
    });
    let mut f = ExprFactory::new();
    let elements = (1..=4).map(|i| f.int(i)).collect();
    let range = f.list(elements);
    let x = f.ident("x");
    let pred = f.call("counted", vec![x]);
    let expr = f.exists(range, "x", pred);

    let program = plan_with(&functions, &expr, RuntimeOptions::default());
    assert_eq!(program.evaluate(&EmptyActivation).unwrap(), Value::Bool(true));
    assert_eq!(calls.count(), 2);
}

#[test]
fn all_over_empty_list_is_true() {
    let mut f = ExprFactory::new();
    let range = f.list(Vec::new());
    let pred = f.bool(false);
    let expr = f.all(range, "x", pred);
    assert_eq!(
        plan(&expr, RuntimeOptions::default())
            .evaluate(&EmptyActivation)
            .unwrap(),
        Value::Bool(true)
    );
}

#[test]
fn exists_one_counts_matches() {
    let mut f = ExprFactory::new();
    let elements = vec![f.int(1), f.int(5), f.int(7)];
    let range = f.list(elements);
    let x = f.ident("x");
    let four = f.int(4);
    let pred = f.binary(operators::GREATER, x, four);
    let expr = f.exists_one(range, "x", pred);
    assert_eq!(
        plan(&expr, RuntimeOptions::default())
            .evaluate(&EmptyActivation)
            .unwrap(),
        Value::Bool(false)
    );
}

#[test]
fn filter_keeps_matching_elements() {
    let mut f = ExprFactory::new();
    let elements = (1..=5).map(|i| f.int(i)).collect();
    let range = f.list(elements);
    let x = f.ident("x");
    let two = f.int(2);
    let rem = f.binary(operators::MODULO, x, two);
    let one = f.int(1);
    let pred = f.binary(operators::EQUALS, rem, one);
    let expr = f.filter(range, "x", pred);

    for append in [true, false] {
        let options = RuntimeOptions::default().with_comprehension_list_append(append);
        assert_eq!(
            plan(&expr, options).evaluate(&EmptyActivation).unwrap(),
            Value::list(vec![Value::Int(1), Value::Int(3), Value::Int(5)])
        );
    }
}

#[test]
fn lazy_bind_evaluates_once_per_evaluation() {
    let (functions, calls) = with_counted_function(Vec::new(), |_| Value::Int(21));
    let mut f = ExprFactory::new();
    let init = f.call("counted", Vec::new());
    let (y1, y2) = (f.ident("y"), f.ident("y"));
    let body = f.binary(operators::ADD, y1, y2);
    let expr = f.bind("y", init, body);

    let program = plan_with(&functions, &expr, RuntimeOptions::default());
    assert_eq!(program.evaluate(&EmptyActivation).unwrap(), Value::Int(42));
    assert_eq!(calls.count(), 1);

    assert_eq!(program.evaluate(&EmptyActivation).unwrap(), Value::Int(42));
    assert_eq!(calls.count(), 2);
}

#[test]
fn unused_lazy_bind_is_never_evaluated() {
    let (functions, calls) = with_counted_function(Vec::new(), |_| Value::Int(1));
    let mut f = ExprFactory::new();
    let init = f.call("counted", Vec::new());
    let body = f.int(0);
    let expr = f.bind_macro("y", init, body);

    let program = plan_with(&functions, &expr, RuntimeOptions::default());
    assert_eq!(program.evaluate(&EmptyActivation).unwrap(), Value::Int(0));
    assert_eq!(calls.count(), 0);

    let eager = RuntimeOptions::default().with_lazy_bind_initialization(false);
    let program = plan_with(&functions, &expr, eager);
    assert_eq!(program.evaluate(&EmptyActivation).unwrap(), Value::Int(0));
    assert_eq!(calls.count(), 1);
}

#[test]
fn bind_inside_map_is_recomputed_per_element() {
    // [1, 2, 3].map(x, cel.bind(y, x * 10, y + 1))
    let mut f = ExprFactory::new();
    let elements = (1..=3).map(|i| f.int(i)).collect();
    let range = f.list(elements);
    let x = f.ident("x");
    let ten = f.int(10);
    let init = f.binary(operators::MULTIPLY, x, ten);
    let y = f.ident("y");
    let one = f.int(1);
    let body = f.binary(operators::ADD, y, one);
    let bound = f.bind_macro("y", init, body);
    let expr = f.map_macro(range, "x", bound);

    let expected = Value::list(vec![Value::Int(11), Value::Int(21), Value::Int(31)]);
    for lazy in [true, false] {
        let options = RuntimeOptions::default().with_lazy_bind_initialization(lazy);
        assert_eq!(
            plan(&expr, options).evaluate(&EmptyActivation).unwrap(),
            expected
        );
    }
}

#[test]
fn ternary_selects_branch() {
    let mut f = ExprFactory::new();
    let x = f.ident("x");
    let zero = f.int(0);
    let cond = f.binary(operators::LESS, x, zero);
    let neg = f.string("negative");
    let pos = f.string("non-negative");
    let expr = f.conditional(cond, neg, pos);
    let program = plan(&expr, RuntimeOptions::default());

    let activation = MapActivation::new().with_binding("x", -3i64);
    assert_eq!(program.evaluate(&activation).unwrap(), Value::string("negative"));
    let activation = MapActivation::new().with_binding("x", 3i64);
    assert_eq!(program.evaluate(&activation).unwrap(), Value::string("non-negative"));
    let activation = MapActivation::new().with_binding("x", "three");
    assert_eq!(
        error_kind(&program.evaluate(&activation).unwrap()),
        Some(EvalErrorKind::NoMatchingOverload)
    );
}

/// `1 / 0 == 1`
fn failing_comparison(f: &mut ExprFactory) -> SpannedExpr {
    let (one, zero) = (f.int(1), f.int(0));
    let div = f.binary(operators::DIVIDE, one, zero);
    let one = f.int(1);
    f.binary(operators::EQUALS, div, one)
}

#[test]
fn logic_absorbs_errors() {
    let mut f = ExprFactory::new();
    let (lhs, rhs) = (failing_comparison(&mut f), f.bool(true));
    let or = f.or(lhs, rhs);
    let (lhs, rhs) = (failing_comparison(&mut f), f.bool(false));
    let and = f.and(lhs, rhs);
    let (lhs, rhs) = (failing_comparison(&mut f), f.bool(true));
    let and_true = f.and(lhs, rhs);

    for short_circuiting in [true, false] {
        let options = RuntimeOptions::default().with_short_circuiting(short_circuiting);
        assert_eq!(
            plan(&or, options.clone()).evaluate(&EmptyActivation).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            plan(&and, options.clone()).evaluate(&EmptyActivation).unwrap(),
            Value::Bool(false)
        );
        let result = plan(&and_true, options).evaluate(&EmptyActivation).unwrap();
        assert_eq!(error_kind(&result), Some(EvalErrorKind::DivisionByZero));
    }
}

#[test]
fn iteration_budget_is_enforced() {
    let mut f = ExprFactory::new();
    let elements = (1..=3).map(|i| f.int(i)).collect();
    let range = f.list(elements);
    let x = f.ident("x");
    let expr = f.map_macro(range, "x", x);

    let options = RuntimeOptions::default().with_comprehension_max_iterations(2);
    let result = plan(&expr, options).evaluate(&EmptyActivation).unwrap();
    assert_eq!(error_kind(&result), Some(EvalErrorKind::IterationBudgetExceeded));

    let options = RuntimeOptions::default().with_comprehension_max_iterations(3);
    assert_eq!(
        plan(&expr, options).evaluate(&EmptyActivation).unwrap(),
        Value::list(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
    );
}

#[test]
fn map_comprehension_iterates_keys() {
    let mut f = ExprFactory::new();
    let (ka, va) = (f.string("a"), f.int(1));
    let (kb, vb) = (f.string("b"), f.int(2));
    let range = f.map(vec![(ka, va), (kb, vb)]);
    let k = f.ident("k");
    let expr = f.map_macro(range, "k", k);
    assert_eq!(
        plan(&expr, RuntimeOptions::default())
            .evaluate(&EmptyActivation)
            .unwrap(),
        Value::list(vec![Value::string("a"), Value::string("b")])
    );
}

#[test]
fn optional_entries_are_skipped_when_absent() {
    let mut f = ExprFactory::new();
    let one = f.int(1);
    let none = f.call("optional.none", Vec::new());
    let two = f.int(2);
    let some = f.call("optional.of", vec![two]);
    let expr = f.list_with_optionals(vec![(one, false), (none, true), (some, true)]);
    assert_eq!(
        plan(&expr, RuntimeOptions::default())
            .evaluate(&EmptyActivation)
            .unwrap(),
        Value::list(vec![Value::Int(1), Value::Int(2)])
    );
}

#[test]
fn builders_produce_equal_values() {
    let mut list = ListBuilder::new();
    list.reserve(2);
    list.add(Value::Int(1));
    list.add(Value::string("two"));
    assert_eq!(
        list.build(),
        Value::list(vec![Value::Int(1), Value::string("two")])
    );

    let mut map = MapBuilder::new();
    map.insert(Value::string("a"), Value::Int(1)).unwrap();
    map.insert(Value::Int(2), Value::Bool(true)).unwrap();
    assert!(map.insert(Value::UInt(2), Value::Null).is_err());
    assert!(map.insert(Value::Double(1.5), Value::Null).is_err());
    assert_eq!(
        map.build(),
        Value::map([
            (MapKey::from("a"), Value::Int(1)),
            (MapKey::Int(2), Value::Bool(true)),
        ])
    );
}
