//! Invariant dispatch and constraint-satisfaction tests

use newton::diagnostics::{CompileError, SourceFile};
use newton::invariants::{invariant_by_parameters, number_parameters_zero_to_n};
use newton::{lexer, parser, State};
use pretty_assertions::assert_eq;

fn analyze(source: &str) -> State {
    let file = SourceFile::new("<test>", source);
    let tokens = lexer::lex(source).expect("lexing failed");
    let ast = parser::parse_file(&tokens, &file).expect("parsing failed");
    newton::check::check(&ast, &file).expect("check failed")
}

const FLIGHT_RULES: &str = r#"
    dimensions { meter "m"; second "s"; pascal "Pa"; }
    laws {
        distance = meter;
        time = second;
        speed = distance / time;
        altimeterStaticPressure = pascal;
        pitotStaticPressure = pascal;
    }
    constant maxAirspeed: distance / time = 250.0;

    invariant speedEnvelope(v: speed) {
        v in 0 .. 300;
        v <= maxAirspeed;
    }

    invariant staticPorts(a: altimeterStaticPressure, b: pitotStaticPressure) {
        a ~ b tolerance 50.0;
    }
"#;

// ==================== Dispatch ====================

#[test]
fn test_ordinals_are_assigned_sequentially() {
    let state = analyze(FLIGHT_RULES);
    let mut tuple = vec![
        state.bind_parameter("altimeterStaticPressure", 101325.0).unwrap(),
        state.bind_parameter("pitotStaticPressure", 101300.0).unwrap(),
    ];
    number_parameters_zero_to_n(&mut tuple);
    assert_eq!(tuple[0].ordinal, 0);
    assert_eq!(tuple[1].ordinal, 1);
}

#[test]
fn test_dispatch_selects_by_dimension_signature() {
    let state = analyze(FLIGHT_RULES);

    let speed_tuple = vec![state.bind_parameter("speed", 120.0).unwrap()];
    let inv = invariant_by_parameters(&state, &speed_tuple).unwrap();
    assert_eq!(inv.name, "speedEnvelope");

    let pressure_tuple = vec![
        state.bind_parameter("altimeterStaticPressure", 101325.0).unwrap(),
        state.bind_parameter("pitotStaticPressure", 101300.0).unwrap(),
    ];
    let inv = invariant_by_parameters(&state, &pressure_tuple).unwrap();
    assert_eq!(inv.name, "staticPorts");
}

#[test]
fn test_dispatch_ignores_parameter_names() {
    let state = analyze(FLIGHT_RULES);

    // Bound through a different quantity of the same dimension.
    let tuple = vec![
        state.bind_parameter("pitotStaticPressure", 1.0).unwrap(),
        state.bind_parameter("altimeterStaticPressure", 1.0).unwrap(),
    ];
    let inv = invariant_by_parameters(&state, &tuple).unwrap();
    assert_eq!(inv.name, "staticPorts");
}

#[test]
fn test_dispatch_requires_matching_count() {
    let state = analyze(FLIGHT_RULES);
    let tuple = vec![state.bind_parameter("altimeterStaticPressure", 1.0).unwrap()];
    assert!(invariant_by_parameters(&state, &tuple).is_none());
}

#[test]
fn test_no_matching_invariant_is_an_error() {
    let state = analyze(FLIGHT_RULES);
    let tuple = vec![state.bind_parameter("distance", 5.0).unwrap()];
    let err = state.satisfies_constraints(&tuple).unwrap_err();
    assert!(matches!(err, CompileError::NoMatchingInvariant { .. }));
}

// ==================== Satisfaction ====================

#[test]
fn test_range_and_constant_comparison_satisfied() {
    let state = analyze(FLIGHT_RULES);
    let tuple = vec![state.bind_parameter("speed", 120.0).unwrap()];

    let report = state.satisfies_constraints(&tuple).unwrap();
    assert!(report.satisfied());
    assert_eq!(report.invariants.len(), 1);
    assert_eq!(report.invariants[0].constraints.len(), 2);
}

#[test]
fn test_range_violation_reported_with_message() {
    let state = analyze(FLIGHT_RULES);
    let tuple = vec![state.bind_parameter("speed", 350.0).unwrap()];

    let report = state.satisfies_constraints(&tuple).unwrap();
    assert!(!report.satisfied());

    let range = &report.invariants[0].constraints[0];
    assert!(!range.satisfies_value_constraint);
    // Dimension side of a range constraint always holds.
    assert!(range.satisfies_dimension_constraint);
    assert!(range.value_error.as_ref().unwrap().contains("350"));

    // The constant comparison is violated too.
    let limit = &report.invariants[0].constraints[1];
    assert!(!limit.satisfies_value_constraint);
}

#[test]
fn test_tolerance_comparison() {
    let state = analyze(FLIGHT_RULES);

    let close = vec![
        state.bind_parameter("altimeterStaticPressure", 101325.0).unwrap(),
        state.bind_parameter("pitotStaticPressure", 101300.0).unwrap(),
    ];
    assert!(state.satisfies_constraints(&close).unwrap().satisfied());

    let apart = vec![
        state.bind_parameter("altimeterStaticPressure", 101325.0).unwrap(),
        state.bind_parameter("pitotStaticPressure", 101000.0).unwrap(),
    ];
    assert!(!state.satisfies_constraints(&apart).unwrap().satisfied());
}

#[test]
fn test_approx_without_tolerance_is_exact() {
    let state = analyze(
        r#"
        dimensions { meter "m"; }
        laws { distance = meter; }
        invariant pinned(d: distance) { d ~ 10; }
        "#,
    );

    let exact = vec![state.bind_parameter("distance", 10.0).unwrap()];
    assert!(state.satisfies_constraints(&exact).unwrap().satisfied());

    let off = vec![state.bind_parameter("distance", 10.0001).unwrap()];
    assert!(!state.satisfies_constraints(&off).unwrap().satisfied());
}

#[test]
fn test_values_bind_positionally_not_by_name() {
    let state = analyze(
        r#"
        dimensions { meter "m"; second "s"; }
        laws {
            distance = meter;
            time = second;
        }
        invariant slow(d: distance, t: time) { d / t <= 10; }
        "#,
    );

    // Signature matching is order-insensitive (a product), so a tuple bound
    // as (time, distance) still dispatches; values then bind by position,
    // which puts the time value in `d`.
    let swapped = vec![
        state.bind_parameter("time", 100.0).unwrap(),
        state.bind_parameter("distance", 1.0).unwrap(),
    ];
    let report = state.satisfies_constraints(&swapped).unwrap();
    assert!(!report.satisfied());

    let ordered = vec![
        state.bind_parameter("distance", 100.0).unwrap(),
        state.bind_parameter("time", 100.0).unwrap(),
    ];
    assert!(state.satisfies_constraints(&ordered).unwrap().satisfied());
}

#[test]
fn test_expression_constraints_evaluate_arithmetic() {
    let state = analyze(
        r#"
        dimensions { meter "m"; second "s"; }
        laws {
            distance = meter;
            time = second;
        }
        constant halfLife: second = 2.0;
        invariant decays(t: time) { t - halfLife >= 0; }
        "#,
    );

    let late = vec![state.bind_parameter("time", 5.0).unwrap()];
    assert!(state.satisfies_constraints(&late).unwrap().satisfied());

    let early = vec![state.bind_parameter("time", 1.0).unwrap()];
    let report = state.satisfies_constraints(&early).unwrap();
    let c = &report.invariants[0].constraints[0];
    assert!(!c.satisfies_value_constraint);
    assert!(c.satisfies_dimension_constraint);
}

#[test]
fn test_binding_unknown_quantity_fails() {
    let state = analyze(FLIGHT_RULES);
    assert!(state.bind_parameter("flux", 1.0).is_none());
}

#[test]
fn test_signature_overflow_is_refused() {
    // `f` carries a 2^32 numerator product; five of them push the tuple
    // signature past u128 and dispatch must refuse rather than wrap.
    let state = analyze(
        r#"
        dimensions { meter "m"; }
        laws {
            a = meter;
            b = a * a;
            c = b * b;
            d = c * c;
            e = d * d;
            f = e * e;
        }
        invariant wide(p: f, q: f, r: f, s: f, t: f) { p in 0 .. 1; }
        "#,
    );

    let tuple: Vec<_> = (0..5)
        .map(|_| state.bind_parameter("f", 0.5).unwrap())
        .collect();

    assert!(invariant_by_parameters(&state, &tuple).is_none());
    let err = state.satisfies_constraints(&tuple).unwrap_err();
    assert!(matches!(err, CompileError::DimensionProductOverflow { .. }));
}
