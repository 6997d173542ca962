//! End-to-end dimension checking tests

use newton::check::{self, comparison_dimensions_match, propagate_expr};
use newton::diagnostics::{CompileError, SourceFile};
use newton::{lexer, parser, State};
use pretty_assertions::assert_eq;

fn analyze(source: &str) -> Result<State, Vec<CompileError>> {
    let file = SourceFile::new("<test>", source);
    let tokens = lexer::lex(source).expect("lexing failed");
    let ast = parser::parse_file(&tokens, &file).expect("parsing failed");
    check::check(&ast, &file)
}

fn analyze_ok(source: &str) -> State {
    match analyze(source) {
        Ok(state) => state,
        Err(errors) => panic!("expected clean check, got: {:?}", errors),
    }
}

// ==================== Laws and propagation ====================

#[test]
fn test_speed_is_distance_over_time() {
    let state = analyze_ok(
        r#"
        dimensions { meter "m"; second "s"; }
        laws {
            distance = meter;
            time = second;
            speed = distance / time;
        }
        "#,
    );

    let speed = state.physics_by_name("speed").unwrap();
    assert_eq!(speed.numerator_prime_product, 2);
    assert_eq!(speed.denominator_prime_product, 3);
    assert_eq!(speed.numerator.len(), 1);
    assert_eq!(speed.denominator.len(), 1);
}

#[test]
fn test_repeated_division_accumulates_denominator() {
    let state = analyze_ok(
        r#"
        dimensions { meter "m"; second "s"; }
        laws {
            distance = meter;
            time = second;
            speed = distance / time;
            acceleration = speed / time;
        }
        "#,
    );

    let acc = state.physics_by_name("acceleration").unwrap();
    assert_eq!(acc.numerator_prime_product, 2);
    assert_eq!(acc.denominator_prime_product, 9);
}

#[test]
fn test_multiplication_merges_both_sides() {
    let state = analyze_ok(
        r#"
        dimensions { meter "m"; second "s"; kilogram "kg"; }
        laws {
            distance = meter;
            time = second;
            mass = kilogram;
            speed = distance / time;
            momentum = mass * speed as "kg*m/s";
        }
        "#,
    );

    let momentum = state.physics_by_name("momentum").unwrap();
    assert_eq!(momentum.numerator_prime_product, 5 * 2);
    assert_eq!(momentum.denominator_prime_product, 3);
    assert_eq!(momentum.dimension_alias.as_deref(), Some("kg*m/s"));
}

#[test]
fn test_addition_requires_like_dimensions() {
    let errors = analyze(
        r#"
        dimensions { meter "m"; second "s"; }
        laws {
            distance = meter;
            time = second;
            nonsense = distance + time;
        }
        "#,
    )
    .unwrap_err();

    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], CompileError::DimensionMismatch { .. }));
}

#[test]
fn test_addition_of_like_dimensions_keeps_lhs() {
    let state = analyze_ok(
        r#"
        dimensions { meter "m"; second "s"; }
        laws {
            distance = meter;
            time = second;
            leg = distance / time;
            total = leg + distance / time;
        }
        "#,
    );

    let total = state.physics_by_name("total").unwrap();
    let leg = state.physics_by_name("leg").unwrap();
    assert!(total.same_dimension(leg));
}

#[test]
fn test_undeclared_identifier_in_law() {
    let errors = analyze(
        r#"
        dimensions { meter "m"; }
        laws { speed = meter / time; }
        "#,
    )
    .unwrap_err();

    assert!(
        matches!(&errors[0], CompileError::UndeclaredIdentifier { name, .. } if name == "time")
    );
}

#[test]
fn test_errors_accumulate_across_statements() {
    let errors = analyze(
        r#"
        dimensions { meter "m"; second "s"; }
        laws {
            distance = meter;
            time = second;
            bad1 = distance + time;
            bad2 = distance + time;
            good = distance / time;
        }
        "#,
    )
    .unwrap_err();

    // Both bad laws are reported in one pass.
    assert_eq!(errors.len(), 2);
}

#[test]
fn test_chained_squaring_overflows_gracefully() {
    // Each law doubles the numerator's prime exponent; by `g` the product
    // needs 2^64 and must be refused, not wrapped.
    let errors = analyze(
        r#"
        dimensions { meter "m"; }
        laws {
            a = meter;
            b = a * a;
            c = b * b;
            d = c * c;
            e = d * d;
            f = e * e;
            g = f * f;
        }
        "#,
    )
    .unwrap_err();

    assert_eq!(errors.len(), 1);
    assert!(matches!(
        errors[0],
        CompileError::DimensionProductOverflow { .. }
    ));
}

// ==================== Vectors ====================

#[test]
fn test_single_vector_operand_marks_term_vector() {
    let state = analyze_ok(
        r#"
        dimensions { meter "m"; second "s"; }
        vectors { displacement -> distance; velocity -> speed; }
        laws {
            time = second;
            displacement = displacement * meter;
            velocity = displacement / time;
        }
        "#,
    );

    let velocity = state.physics_by_name("velocity").unwrap();
    assert!(velocity.is_vector);
    assert_eq!(velocity.numerator_prime_product, 2);
    assert_eq!(velocity.denominator_prime_product, 3);
}

#[test]
fn test_vector_lhs_rejects_scalar_rhs() {
    let errors = analyze(
        r#"
        dimensions { meter "m"; second "s"; }
        vectors { velocity -> speed; }
        laws {
            distance = meter;
            time = second;
            velocity = distance / time;
        }
        "#,
    )
    .unwrap_err();

    assert!(matches!(errors[0], CompileError::DimensionMismatch { .. }));
}

#[test]
fn test_dot_with_scalar_operand_is_rejected() {
    let errors = analyze(
        r#"
        dimensions { meter "m"; second "s"; }
        vectors { velocity -> speed; }
        laws {
            time = second;
            work = dot(time, velocity);
        }
        "#,
    )
    .unwrap_err();

    assert!(matches!(
        errors[0],
        CompileError::VectorArityViolation { .. }
    ));
}

#[test]
fn test_two_vectors_under_plain_multiply_are_rejected() {
    let errors = analyze(
        r#"
        dimensions { meter "m"; second "s"; }
        vectors { velocity -> speed; acceleration -> rate; }
        laws {
            power = velocity * acceleration;
        }
        "#,
    )
    .unwrap_err();

    assert!(matches!(
        errors[0],
        CompileError::VectorArityViolation { .. }
    ));
}

#[test]
fn test_dot_multiplies_dimensions_of_both_operands() {
    let state = analyze_ok(
        r#"
        dimensions { meter "m"; second "s"; }
        vectors { displacement -> distance; velocity -> speed; }
        laws {
            time = second;
            displacement = displacement * meter;
            velocity = displacement / time;
            closure = dot(displacement, velocity);
        }
        "#,
    );

    let closure = state.physics_by_name("closure").unwrap();
    assert_eq!(closure.numerator_prime_product, 4);
    assert_eq!(closure.denominator_prime_product, 3);
    // dot results are not marked vector.
    assert!(!closure.is_vector);
}

#[test]
fn test_cross_divides_by_radian() {
    let state = analyze_ok(
        r#"
        dimensions { meter "m"; second "s"; radian "rad"; }
        vectors { displacement -> distance; velocity -> speed; }
        laws {
            time = second;
            displacement = displacement * meter;
            velocity = displacement / time;
            swept = cross(displacement, velocity);
        }
        "#,
    );

    let swept = state.physics_by_name("swept").unwrap();
    let radian = state.dimension_by_name("radian").unwrap();
    assert_eq!(swept.numerator_prime_product, 4);
    assert_eq!(swept.denominator_prime_product, 3 * radian.prime);
}

#[test]
fn test_cross_without_radian_declared() {
    let errors = analyze(
        r#"
        dimensions { meter "m"; second "s"; }
        vectors { displacement -> distance; velocity -> speed; }
        laws {
            time = second;
            displacement = displacement * meter;
            velocity = displacement / time;
            swept = cross(displacement, velocity);
        }
        "#,
    )
    .unwrap_err();

    assert!(
        matches!(&errors[0], CompileError::UndeclaredIdentifier { name, .. } if name == "radian")
    );
}

// ==================== Redeclaration and shadowing ====================

#[test]
fn test_dimension_redeclaration_conflict() {
    let errors = analyze(r#"dimensions { meter "m"; meter "m"; }"#).unwrap_err();
    assert!(matches!(
        errors[0],
        CompileError::RedeclarationConflict { .. }
    ));
}

#[test]
fn test_dimension_declarations_beyond_prime_capacity() {
    let mut source = String::from("dimensions {\n");
    for i in 0..=newton::units::PrimeAllocator::capacity() {
        source.push_str(&format!("    dim{i} \"d{i}\";\n"));
    }
    source.push_str("}\n");

    // The first 168 declarations register; only the one past capacity errors.
    let errors = analyze(&source).unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        errors[0],
        CompileError::PrimeTableExhausted { capacity: 168, .. }
    ));
}

#[test]
fn test_law_redeclaration_bumps_subindex() {
    let state = analyze_ok(
        r#"
        dimensions { meter "m"; second "s"; }
        laws {
            distance = meter;
            time = second;
            speed = distance / time;
            speed = distance / time;
        }
        "#,
    );

    let first = state.physics_by_name_and_subindex("speed", 0).unwrap();
    let latest = state.physics_by_name("speed").unwrap();
    assert_eq!(first.subindex, 0);
    assert_eq!(latest.subindex, 1);
    assert!(first.same_dimension(latest));
}

// ==================== Constants ====================

#[test]
fn test_constant_declaration() {
    let state = analyze_ok(
        r#"
        dimensions { meter "m"; second "s"; }
        laws {
            distance = meter;
            time = second;
        }
        constant g: distance / (time * time) = 9.80665;
        "#,
    );

    let g = state.physics_by_name("g").unwrap();
    assert!(g.is_constant);
    assert_eq!(g.value, Some(9.80665));
    assert_eq!(g.numerator_prime_product, 2);
    assert_eq!(g.denominator_prime_product, 9);
}

// ==================== Integral chains ====================

#[test]
fn test_scalar_integral_chain_consistent() {
    analyze_ok(
        r#"
        dimensions { meter "m"; second "s"; }
        laws {
            distance = meter;
            time = second;
            speed = distance / time;
            acceleration = speed / time;
        }
        integrals scalar { distance -> speed -> acceleration; }
        "#,
    );
}

#[test]
fn test_reordered_chain_is_inconsistent() {
    let errors = analyze(
        r#"
        dimensions { meter "m"; second "s"; }
        laws {
            distance = meter;
            time = second;
            speed = distance / time;
            acceleration = speed / time;
        }
        integrals scalar { distance -> acceleration -> speed; }
        "#,
    )
    .unwrap_err();

    assert!(matches!(
        &errors[0],
        CompileError::IntegralChainInconsistency { name, expected, found, .. }
            if name == "acceleration" && *expected == -1 && *found == -2
    ));
}

#[test]
fn test_vector_chain_rejects_scalar_member() {
    let errors = analyze(
        r#"
        dimensions { meter "m"; second "s"; }
        vectors { displacement -> distance; }
        laws {
            time = second;
            displacement = displacement * meter;
            speed = meter / time;
        }
        integrals vector { displacement -> speed; }
        "#,
    )
    .unwrap_err();

    assert!(matches!(
        errors.last().unwrap(),
        CompileError::VectorArityViolation { .. }
    ));
}

#[test]
fn test_chain_requires_time_dimension() {
    let errors = analyze(
        r#"
        dimensions { meter "m"; }
        laws { distance = meter; }
        integrals scalar { distance -> distance; }
        "#,
    )
    .unwrap_err();

    assert!(
        matches!(&errors[0], CompileError::UndeclaredIdentifier { name, .. } if name == "second")
    );
}

// ==================== Invariants ====================

#[test]
fn test_same_dimension_distinct_symbols_compare_clean() {
    let state = analyze_ok(
        r#"
        dimensions { pascal "Pa"; }
        laws {
            altimeterStaticPressure = pascal;
            pitotStaticPressure = pascal;
        }
        invariant staticPorts(a: altimeterStaticPressure, b: pitotStaticPressure) {
            a == b;
        }
        "#,
    );

    assert_eq!(state.invariants().len(), 1);
    let a = state.physics_by_name("altimeterStaticPressure").unwrap();
    let b = state.physics_by_name("pitotStaticPressure").unwrap();
    assert!(a.same_dimension(b));
}

#[test]
fn test_invariant_constraint_dimension_mismatch() {
    let errors = analyze(
        r#"
        dimensions { meter "m"; second "s"; }
        laws {
            distance = meter;
            time = second;
        }
        invariant confused(d: distance, t: time) {
            d == t;
        }
        "#,
    )
    .unwrap_err();

    assert!(matches!(errors[0], CompileError::DimensionMismatch { .. }));
}

#[test]
fn test_invariant_dimensionless_side_compares_against_anything() {
    let state = analyze_ok(
        r#"
        dimensions { meter "m"; }
        laws { distance = meter; }
        invariant bounded(d: distance) {
            d in 0 .. 100;
            d <= 42;
        }
        "#,
    );

    assert_eq!(state.invariants().len(), 1);
    assert_eq!(state.invariants()[0].constraints.len(), 2);
}

#[test]
fn test_invariant_with_unknown_parameter_type_is_not_registered() {
    let errors = analyze(
        r#"
        dimensions { meter "m"; }
        invariant ghost(x: warpFactor) { x in 0 .. 1; }
        "#,
    )
    .unwrap_err();

    assert!(
        matches!(&errors[0], CompileError::UndeclaredIdentifier { name, .. } if name == "warpFactor")
    );
}

#[test]
fn test_invariant_parameters_live_in_child_scope() {
    let state = analyze_ok(
        r#"
        dimensions { meter "m"; }
        laws { distance = meter; }
        invariant bounded(d: distance) { d in 0 .. 1; }
        "#,
    );

    // The parameter name is not visible from the global scope.
    assert!(state.physics_by_name("d").is_none());
    let param = state.invariants()[0].params[0].physics;
    assert!(state
        .physics
        .get(param)
        .same_dimension(state.physics_by_name("distance").unwrap()));
}

// ==================== Propagator unit checks ====================

#[test]
fn test_propagation_never_mutates_stored_tables() {
    let state = analyze_ok(
        r#"
        dimensions { meter "m"; second "s"; }
        laws {
            distance = meter;
            time = second;
            speed = distance / time;
        }
        "#,
    );

    let before = state.physics_by_name("distance").unwrap().clone();

    let src = state.source.to_named_source();
    let expr = parse_expr("distance * speed / time");
    let result = propagate_expr(&state, state.scopes.root(), &expr, &src).unwrap();
    assert_eq!(result.numerator_prime_product, 4);
    assert_eq!(result.denominator_prime_product, 9);

    let after = state.physics_by_name("distance").unwrap();
    assert_eq!(before.numerator, after.numerator);
    assert_eq!(before.numerator_prime_product, after.numerator_prime_product);
}

#[test]
fn test_comparison_dimensions_match_rules() {
    let state = analyze_ok(
        r#"
        dimensions { meter "m"; second "s"; }
        laws {
            distance = meter;
            time = second;
        }
        "#,
    );

    let d = state.physics_by_name("distance").unwrap();
    let t = state.physics_by_name("time").unwrap();
    let dimensionless = newton::units::Physics::anonymous(newton::common::Span::dummy());

    assert!(comparison_dimensions_match(d, d));
    assert!(!comparison_dimensions_match(d, t));
    assert!(comparison_dimensions_match(d, &dimensionless));
    assert!(comparison_dimensions_match(&dimensionless, t));
}

/// Parse a bare expression by wrapping it in a one-law description.
fn parse_expr(text: &str) -> newton::ast::Expr {
    let source = format!("laws {{ __scratch = {}; }}", text);
    let ast = newton::parse(&source).unwrap();
    match &ast.items[0] {
        newton::ast::Item::Laws(block) => block.laws[0].rhs.clone(),
        _ => unreachable!(),
    }
}
