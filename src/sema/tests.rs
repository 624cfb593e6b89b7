#![cfg(test)]
//! Cross-module scenarios exercising the whole engine end to end.

use crate::{
    ast::{
        ConceptDecl, ConceptRef, Expr, Member, MultiLevelArgList, ParamRef, Requirement,
        RequirementStatus, Span, StructDef, TemplateArg, TemplateDecl, TemplateParamList, Type,
        Value,
    },
    diag::{render_all, Severity},
    sema::{satisfaction::UnsatisfiedCause, Sema},
};

use crate::ast::require;
use require::ReturnTypeRequirement;

pub(crate) fn t_param() -> Type {
    Type::Param(ParamRef::new(0, 0, "T"))
}

pub(crate) fn ty_args(types: &[Type]) -> MultiLevelArgList {
    MultiLevelArgList::from_innermost(types.iter().cloned().map(TemplateArg::Type).collect())
}

pub(crate) fn struct_with_fn(name: &str, member: &str, value: bool) -> Type {
    StructDef::new(name)
        .with_member(
            member,
            Member::ConstFn {
                value: Value::Bool(value),
                noexcept: true,
            },
        )
        .into_type()
}

pub(crate) fn concept_of(name: &str, constraint: Expr) -> ConceptRef {
    ConceptDecl::new(name, TemplateParamList::types(&["T"]), constraint)
}

fn check_one(sema: &mut Sema, concept: &ConceptRef, ty: Type) -> crate::sema::Satisfaction {
    let constraint = concept.constraint.clone();
    sema.check_constraint_satisfaction(
        &**concept,
        &[constraint],
        &ty_args(&[ty]),
        Span::default(),
    )
    .unwrap()
}

#[test]
fn clause_lists_stop_at_the_first_unsatisfied_clause() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut sema = Sema::new();
    let td = TemplateDecl::new(
        "X",
        TemplateParamList::types(&["T"]),
        vec![
            Expr::member_call(t_param(), "f"),
            Expr::member_call(t_param(), "g"),
        ],
    );
    let s = struct_with_fn("S", "f", false);
    let satisfaction = sema
        .check_constraint_satisfaction(
            &td,
            &td.associated_constraints,
            &ty_args(&[s]),
            Span::default(),
        )
        .unwrap();
    assert!(!satisfaction.is_satisfied);
    // Only the first clause was evaluated, and only it produced a detail.
    assert_eq!(satisfaction.details.len(), 1);
    assert_eq!(sema.metrics.substitutions, 1);
}

#[test]
fn disjunction_with_both_sides_false_reports_both_in_order() {
    let mut sema = Sema::new();
    let c = concept_of(
        "Either",
        Expr::or(
            Expr::member_call(t_param(), "f"),
            Expr::member_call(t_param(), "g"),
        ),
    );
    let s = StructDef::new("S")
        .with_member(
            "f",
            Member::ConstFn {
                value: Value::Bool(false),
                noexcept: true,
            },
        )
        .with_member(
            "g",
            Member::ConstFn {
                value: Value::Bool(false),
                noexcept: true,
            },
        )
        .into_type();
    let satisfaction = check_one(&mut sema, &c, s);
    assert!(!satisfaction.is_satisfied);
    assert_eq!(satisfaction.details.len(), 2);
    let rendered: Vec<String> = satisfaction
        .details
        .iter()
        .map(|d| d.clause.to_string())
        .collect();
    assert_eq!(rendered, vec!["T::f()", "T::g()"]);
}

#[test]
fn concept_behind_concept_shares_the_satisfaction_cache() {
    let mut sema = Sema::new();
    let has_f = concept_of("HasF", Expr::member_call(t_param(), "f"));
    let usable = concept_of(
        "Usable",
        Expr::concept_id(has_f.clone(), vec![TemplateArg::Type(t_param())]),
    );
    let s = struct_with_fn("S", "f", true);
    let satisfaction = check_one(&mut sema, &usable, s.clone());
    assert!(satisfaction.is_satisfied);
    // Both the outer and the inner concept were cached.
    assert!(sema.satisfaction_cached(usable.id, &vec![TemplateArg::Type(s.clone())]));
    assert!(sema.satisfaction_cached(has_f.id, &vec![TemplateArg::Type(s.clone())]));

    // Re-checking the inner concept directly is pure cache.
    let substitutions = sema.metrics.substitutions;
    let inner = check_one(&mut sema, &has_f, s);
    assert!(inner.is_satisfied);
    assert_eq!(sema.metrics.substitutions, substitutions);
}

#[test]
fn nested_requirement_with_partial_levels_is_dependent() {
    let mut sema = Sema::new();
    // requires { requires U::f(); } with U one level deeper than supplied.
    let deep_constraint = Expr::member_call(Type::Param(ParamRef::new(1, 0, "U")), "f");
    let outer = Expr::requires(vec![Requirement::nested(deep_constraint)]);
    let (satisfaction, flags) = sema
        .check_nested_satisfaction(&outer, &ty_args(&[Type::Int]))
        .unwrap();
    assert!(satisfaction.is_satisfied);
    assert!(flags.is_dependent);
}

#[test]
fn compound_requirement_type_constraint_failure_diagnoses_recursively() {
    let mut sema = Sema::new();
    // concept SameAsInt<T> = sizeof(T) == sizeof(int);
    let same_as_int = concept_of(
        "SameAsInt",
        Expr::binary(
            crate::ast::BinaryOp::Eq,
            Expr::size_of(t_param()),
            Expr::size_of(Type::Int),
        ),
    );
    // concept MakesInt<T> = requires { { T::make() } -> SameAsInt; };
    let makes_int = concept_of(
        "MakesInt",
        Expr::requires(vec![Requirement::compound(
            Expr::member_call(t_param(), "make"),
            None,
            ReturnTypeRequirement::TypeConstraint {
                concept: same_as_int,
                extra_args: vec![],
                substituted: None,
            },
        )]),
    );
    let bool_maker = StructDef::new("BoolMaker")
        .with_member(
            "make",
            Member::ConstFn {
                value: Value::Bool(true),
                noexcept: true,
            },
        )
        .into_type();
    let satisfaction = check_one(&mut sema, &makes_int, bool_maker);
    assert!(!satisfaction.is_satisfied);
    sema.diagnose_unsatisfied_constraint(&satisfaction, true);
    let notes = sema.diags.diagnostics();
    // The type-constraint note, then the elaborated sizeof comparison from
    // inside SameAsInt.
    assert!(notes[0].message.contains("'bool' does not satisfy 'SameAsInt'"));
    assert!(notes[1].message.contains("evaluated to false"));
    assert!(notes.iter().all(|n| n.severity == Severity::Note));
}

#[test]
fn requirement_statuses_surface_through_requires_expressions() {
    let mut sema = Sema::new();
    let with_type = StructDef::new("Typed")
        .with_member("value_type", Member::Type(Type::Int))
        .into_type();
    // requires { typename T::value_type; T::f(); }
    let c = concept_of(
        "Shaped",
        Expr::requires(vec![
            Requirement::type_req(Type::member(t_param(), "value_type")),
            Requirement::simple(Expr::member_call(t_param(), "f")),
        ]),
    );
    let satisfaction = check_one(&mut sema, &c, with_type);
    // The type requirement holds; the simple requirement fails on lookup.
    assert!(!satisfaction.is_satisfied);
    let UnsatisfiedCause::EvaluatedFalse(substituted) = &satisfaction.details[0].cause else {
        panic!("expected a well-formed-but-false record");
    };
    let crate::ast::ExprKind::Requires(re) = &substituted.kind else {
        panic!("expected a requires-expression");
    };
    assert_eq!(re.requirements[0].status(), RequirementStatus::Satisfied);
    assert_eq!(
        re.requirements[1].status(),
        RequirementStatus::ExprSubstitutionFailure
    );
    assert!(matches!(
        re.requirements[1],
        Requirement::Simple(require::ExprRequirement {
            value: require::ExprOrFailure::Failure(_),
            ..
        })
    ));
}

#[test]
fn end_to_end_rendering_annotates_the_source() {
    let mut sema = Sema::new();
    let source = "template<typename T> concept Small = sizeof(T) <= 8; static_assert(Small<Wide>);";
    let sizeof_span = Span::new(37, 52);
    let c = ConceptDecl::new(
        "Small",
        TemplateParamList::types(&["T"]),
        Expr::binary(
            crate::ast::BinaryOp::Le,
            Expr::size_of(t_param()),
            Expr::int_lit(8),
        )
        .with_span(sizeof_span),
    );
    let wide = StructDef::new("Wide").with_size(32).into_type();
    let td = TemplateDecl::new(
        "assertion",
        TemplateParamList::types(&["T"]),
        vec![Expr::concept_id(c, vec![TemplateArg::Type(t_param())]).with_span(Span::new(68, 79))],
    );
    let ok = sema
        .ensure_template_argument_list_constraints(
            &td,
            &vec![TemplateArg::Type(wide)],
            Span::new(68, 79),
        )
        .unwrap();
    assert!(!ok);
    let out = render_all(source, Some("input.cpp"), sema.diags.diagnostics());
    assert!(out.contains("error: constraints not satisfied for template 'assertion' [with T = Wide]"));
    assert!(out.contains("input.cpp"));
    assert!(out.contains("evaluated to false"));
}
