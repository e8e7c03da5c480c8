//! RefactorSwitch
//!
//! Arrow switches are rewritten in place rather than re-rendered: a
//! `return` or `x = ` prefix is inserted, arm bodies are edited where they
//! stand and everything else, comments included, is left untouched.

use crate::comments::comments_in;
use crate::edit::{Fix, FixKind, TextEdit};
use crate::error::{reject, RefactorError, RejectReason, RefactorResult};
use crate::source_utils::{indent_at, reindent};
use crate::tree::*;

use super::plan::{assignment_arm_body, assignment_lhs, common_assignment, statements_of, switch_facts};
use super::reachability::{dead_code_after, delete_statement, escaping_jumps, has_break_or_yield, is_exhaustive_switch, Reachability};
use super::statement_switch::REMOVE_DEFAULT;
use super::{Context, Scope};

/// Arrow switch statement: return switch, assignment switch, simplification.
pub fn check_statement<'a>(ctx: &Context<'a>, stmt: &'a Stmt, s: &'a SwitchNode, scope: &Scope<'_, 'a>) -> RefactorResult<Vec<Fix>> {
    if scope.inside_switch() {
        return reject(RejectReason::NestedSwitch);
    }
    if !s.is_rule_switch() {
        return reject(RejectReason::NotArrowSwitch);
    }
    let config = &ctx.config.refactor_switch;
    let all_handled = switch_facts(ctx, &s.selector, &s.cases).all_enum_values_handled(ctx);

    let mut candidates = Vec::new();
    let mut last_error = RefactorError::from(RejectReason::NothingToDo);
    if config.enable_return_switch {
        match return_switch(ctx, stmt, s, scope, all_handled) {
            Ok(edits) => candidates.push((edits, "Convert to return switch")),
            Err(err) => last_error = err,
        }
    }
    if config.enable_assignment_switch {
        match assignment_switch(ctx, stmt, s, scope, all_handled) {
            Ok(edits) => candidates.push((edits, "Convert to assignment switch")),
            Err(err) => last_error = err,
        }
    }
    if config.enable_simplify_switch {
        let edits = simplify(ctx, s, false);
        if !edits.is_empty() {
            candidates.push((edits, "Simplify switch"));
        }
    }
    if candidates.is_empty() {
        return Err(last_error);
    }
    Ok(with_remove_default(ctx, s, all_handled, candidates))
}

/// Switch expression: simplification only.
pub fn check_expression<'a>(ctx: &Context<'a>, s: &'a SwitchNode, scope: &Scope<'_, 'a>) -> RefactorResult<Vec<Fix>> {
    if scope.inside_switch() {
        return reject(RejectReason::NestedSwitch);
    }
    if !s.is_rule_switch() {
        return reject(RejectReason::NotArrowSwitch);
    }
    if !ctx.config.refactor_switch.enable_simplify_switch {
        return reject(RejectReason::Disabled);
    }
    let edits = simplify(ctx, s, true);
    if edits.is_empty() {
        return reject(RejectReason::NothingToDo);
    }
    let all_handled = switch_facts(ctx, &s.selector, &s.cases).all_enum_values_handled(ctx);
    Ok(with_remove_default(ctx, s, all_handled, vec![(edits, "Simplify switch")]))
}

/// Primary fixes in order, then for each a variant dropping a `default`
/// made redundant by full enum coverage.
fn with_remove_default(ctx: &Context<'_>, s: &SwitchNode, all_handled: bool, candidates: Vec<(Vec<TextEdit>, &str)>) -> Vec<Fix> {
    let default = s.cases.iter().find(|c| c.has_default() && !c.has_null()).filter(|_| all_handled);
    let mut fixes = Vec::new();
    let mut secondary = Vec::new();
    for (edits, description) in candidates {
        if let Some(case) = default {
            let mut without: Vec<TextEdit> = edits.iter().filter(|e| !case.span.contains(e.span)).cloned().collect();
            without.push(delete_statement(ctx.source, case.span));
            secondary.push(Fix::new(FixKind::Secondary, REMOVE_DEFAULT, without));
        }
        fixes.push(Fix::new(FixKind::Primary, description, edits));
    }
    fixes.extend(secondary);
    fixes
}

fn return_switch<'a>(
    ctx: &Context<'a>,
    stmt: &'a Stmt,
    s: &'a SwitchNode,
    scope: &Scope<'_, 'a>,
    all_handled: bool,
) -> RefactorResult<Vec<TextEdit>> {
    let reach = Reachability::new(ctx.model);
    let mut returns = Vec::new();
    let mut all_abrupt = true;
    for case in &s.cases {
        let body = case.rule_body().ok_or(RejectReason::ShapeMismatch)?;
        if has_break_or_yield(body) {
            return reject(RejectReason::BreakOrYield);
        }
        if !matches!(statements_of(body).last(), Some(Stmt::Return(_) | Stmt::Throw(_))) {
            return reject(RejectReason::ShapeMismatch);
        }
        all_abrupt &= !reach.can_complete_normally(body);
        collect_returns(body, &mut returns);
    }
    if returns.is_empty() || returns.iter().any(|r| r.value.is_none()) {
        return reject(RejectReason::ShapeMismatch);
    }
    if reach.can_complete_normally(stmt) && !(all_abrupt && all_handled) {
        return reject(RejectReason::NotExhaustive);
    }
    if !escaping_jumps(stmt).is_empty() {
        return reject(RejectReason::EscapingJump);
    }

    let mut edits = vec![TextEdit::insert(s.span.start, "return "), TextEdit::insert(s.span.end, ";")];
    for case in &s.cases {
        let Some(body) = case.rule_body() else { continue };
        match statements_of(body) {
            [Stmt::Return(ReturnStmt { value: Some(value), .. })] if collapsible(ctx, body) => {
                edits.push(TextEdit::replace(body.span(), format!("{};", value.span().text(ctx.source))));
            }
            _ => {
                let mut inner = Vec::new();
                collect_returns(body, &mut inner);
                edits.extend(inner.into_iter().filter_map(|r| {
                    let value = r.value.as_ref()?;
                    Some(TextEdit::replace(r.span, format!("yield {};", value.span().text(ctx.source))))
                }));
            }
        }
    }
    edits.extend(dead_code_after(ctx.source, ctx.model, scope, s.span, 0));
    tracing::trace!(returns = returns.len(), edits = edits.len(), "planned return switch");
    Ok(edits)
}

fn assignment_switch<'a>(
    ctx: &Context<'a>,
    stmt: &'a Stmt,
    s: &'a SwitchNode,
    scope: &Scope<'_, 'a>,
    all_handled: bool,
) -> RefactorResult<Vec<TextEdit>> {
    if !(s.has_default() || all_handled || is_exhaustive_switch(s)) {
        return reject(RejectReason::NotExhaustive);
    }
    let bodies: Vec<&[Stmt]> = s
        .cases
        .iter()
        .map(|c| c.rule_body().map(statements_of))
        .collect::<Option<_>>()
        .ok_or(RejectReason::ShapeMismatch)?;
    let assign = common_assignment(ctx, &bodies).ok_or(RejectReason::ShapeMismatch)?;
    if bodies.iter().any(|b| assignment_arm_body(b).is_none()) {
        return reject(RejectReason::ShapeMismatch);
    }

    let (lhs, merged) = assignment_lhs(ctx, scope, assign, stmt);
    let mut edits = vec![TextEdit::insert(s.span.start, lhs), TextEdit::insert(s.span.end, ";")];
    edits.extend(merged);
    for (case, stmts) in s.cases.iter().zip(&bodies) {
        let (Some(body), [Stmt::Expr(ExprStmt { expr: Expr::Assign(a), span })]) = (case.rule_body(), *stmts) else {
            continue;
        };
        let value = a.value.span().text(ctx.source);
        if collapsible(ctx, body) {
            edits.push(TextEdit::replace(body.span(), format!("{};", value)));
        } else {
            edits.push(TextEdit::replace(*span, format!("yield {};", value)));
        }
    }
    Ok(edits)
}

/// Brace removal, flattening of nested blocks and `{ yield v; }` to `v;`.
/// Arms with comments inside the braces are left alone.
fn simplify(ctx: &Context<'_>, s: &SwitchNode, expression: bool) -> Vec<TextEdit> {
    let mut edits = Vec::new();
    for case in &s.cases {
        let Some(body @ Stmt::Block(_)) = case.rule_body() else { continue };
        if !collapsible(ctx, body) {
            continue;
        }
        let inner = body.unwrap_single_blocks();
        let replacement = match inner {
            Stmt::Expr(e) if !expression => e.span.text(ctx.source).to_string(),
            Stmt::Throw(t) => t.span.text(ctx.source).to_string(),
            Stmt::Yield(y) if expression => format!("{};", y.value.span().text(ctx.source)),
            _ => {
                let block = innermost_block(body);
                if block.span() == body.span() {
                    continue;
                }
                let text = block.span().text(ctx.source);
                reindent(text, indent_at(ctx.source, block.span().start), indent_at(ctx.source, body.span().start))
            }
        };
        edits.push(TextEdit::replace(body.span(), replacement));
    }
    edits
}

fn innermost_block(stmt: &Stmt) -> &Stmt {
    let mut at = stmt;
    while let Stmt::Block(b) = at {
        match b.stmts.as_slice() {
            [inner @ Stmt::Block(_)] => at = inner,
            _ => break,
        }
    }
    at
}

/// A body whose braces may be dropped without losing comments.
fn collapsible(ctx: &Context<'_>, body: &Stmt) -> bool {
    comments_in(ctx.comments(), body.span()).is_empty()
}

/// Returns belonging to the method, not to lambdas nested in `stmt`.
fn collect_returns<'a>(stmt: &'a Stmt, out: &mut Vec<&'a ReturnStmt>) {
    walk(Node::Stmt(stmt), &mut |n| match n {
        Node::Stmt(Stmt::Return(r)) => {
            out.push(r);
            false
        }
        Node::Expr(Expr::Lambda(_)) => false,
        _ => true,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RefactorConfig;
    use crate::edit::apply_edits;
    use crate::parser::{parse_string, ParsedFile};
    use crate::refactor::Frame;

    fn parse(src: &str) -> ParsedFile {
        parse_string(src.to_string(), "A.java".to_string()).expect("Should parse")
    }

    fn run(parsed: &ParsedFile, config: &RefactorConfig, index: usize) -> RefactorResult<Vec<Fix>> {
        let ctx = Context::new(parsed, config);
        let body = parsed.unit.types[0].methods[0].body.as_ref().expect("Should have body");
        let frames = [Frame::Body(body.span), Frame::Block { stmts: &body.stmts, index, span: body.span, braced: true }];
        let Stmt::Switch(s) = &body.stmts[index] else { panic!("expected switch") };
        check_statement(&ctx, &body.stmts[index], s, &Scope::new(&frames))
    }

    const ENUM_RETURN: &str = "class A {\n  enum C { R, G }\n  int m(C c) {\n    switch (c) {\n      case R -> {\n        return 1;\n      }\n      case G -> {\n        a();\n        return 2;\n      }\n      default -> throw new IllegalStateException();\n    }\n  }\n}\n";

    #[test]
    fn test_return_switch_in_place() {
        let parsed = parse(ENUM_RETURN);
        let mut config = RefactorConfig::default();
        config.refactor_switch.enable_return_switch = true;
        let fixes = run(&parsed, &config, 0).expect("Should convert");
        assert_eq!(fixes.len(), 2);
        assert_eq!(
            apply_edits(ENUM_RETURN, &fixes[0].edits).expect("Should apply"),
            "class A {\n  enum C { R, G }\n  int m(C c) {\n    return switch (c) {\n      case R -> 1;\n      case G -> {\n        a();\n        yield 2;\n      }\n      default -> throw new IllegalStateException();\n    };\n  }\n}\n"
        );
        let secondary = apply_edits(ENUM_RETURN, &fixes[1].edits).expect("Should apply");
        assert_eq!(fixes[1].kind, FixKind::Secondary);
        assert!(!secondary.contains("default"));
        assert!(secondary.contains("        yield 2;\n      }\n    };\n"));
    }

    #[test]
    fn test_return_switch_requires_returns() {
        let parsed = parse("class A { int m(int i) { switch (i) { case 1 -> a(); default -> { return 2; } } return 0; } }");
        let mut config = RefactorConfig::default();
        config.refactor_switch.enable_return_switch = true;
        let err = run(&parsed, &config, 0).unwrap_err();
        assert_eq!(err.reason(), Some(RejectReason::ShapeMismatch));
    }

    #[test]
    fn test_lambda_return_not_yielded() {
        let src = "class A { Runnable m(int i) { switch (i) { case 1 -> { Runnable r = () -> { return; }; return r; } default -> { return null; } } } }";
        let parsed = parse(src);
        let mut config = RefactorConfig::default();
        config.refactor_switch.enable_return_switch = true;
        let fixes = run(&parsed, &config, 0).expect("Should convert");
        let text = apply_edits(src, &fixes[0].edits).expect("Should apply");
        assert!(text.contains("() -> { return; }; yield r; }"));
        assert!(text.contains("default -> null;"));
    }

    #[test]
    fn test_assignment_switch_in_place() {
        let src = "class A {\n  void m(int i) {\n    String s = null;\n    switch (i) {\n      case 1 -> s = \"one\";\n      case 2 -> {\n        s = \"two\";\n      }\n      default -> s = \"many\";\n    }\n    use(s);\n  }\n}\n";
        let parsed = parse(src);
        let mut config = RefactorConfig::default();
        config.refactor_switch.enable_assignment_switch = true;
        let fixes = run(&parsed, &config, 1).expect("Should convert");
        assert_eq!(fixes.len(), 1);
        assert_eq!(
            apply_edits(src, &fixes[0].edits).expect("Should apply"),
            "class A {\n  void m(int i) {\n    String s = switch (i) {\n      case 1 -> \"one\";\n      case 2 -> \"two\";\n      default -> \"many\";\n    };\n    use(s);\n  }\n}\n"
        );
    }

    #[test]
    fn test_simplify_statement_switch() {
        let src = "class A {\n  void m(int i) {\n    switch (i) {\n      case 1 -> {\n        a();\n      }\n      case 2 -> {\n        {\n          b();\n          c();\n        }\n      }\n      default -> {\n        // keep\n        d();\n      }\n    }\n  }\n}\n";
        let parsed = parse(src);
        let mut config = RefactorConfig::default();
        config.refactor_switch.enable_simplify_switch = true;
        let fixes = run(&parsed, &config, 0).expect("Should simplify");
        assert_eq!(
            apply_edits(src, &fixes[0].edits).expect("Should apply"),
            "class A {\n  void m(int i) {\n    switch (i) {\n      case 1 -> a();\n      case 2 -> {\n        b();\n        c();\n      }\n      default -> {\n        // keep\n        d();\n      }\n    }\n  }\n}\n"
        );
    }

    #[test]
    fn test_simplify_yield_in_expression() {
        let src = "class A { int m(int i) { return switch (i) { case 1 -> { yield 10; } default -> 0; }; } }";
        let parsed = parse(src);
        let mut config = RefactorConfig::default();
        config.refactor_switch.enable_simplify_switch = true;
        let ctx = Context::new(&parsed, &config);
        let body = parsed.unit.types[0].methods[0].body.as_ref().expect("Should have body");
        let Stmt::Return(ReturnStmt { value: Some(Expr::Switch(s)), .. }) = &body.stmts[0] else {
            panic!("expected return switch")
        };
        let frames = [Frame::Body(body.span)];
        let fixes = check_expression(&ctx, s, &Scope::new(&frames)).expect("Should simplify");
        assert_eq!(
            apply_edits(src, &fixes[0].edits).expect("Should apply"),
            "class A { int m(int i) { return switch (i) { case 1 -> 10; default -> 0; }; } }"
        );
    }

    #[test]
    fn test_expression_inside_switch_is_rejected() {
        let src = "class A { void m(int i, int j) { switch (j) { case 1 -> { int v = switch (i) { case 1 -> { yield 10; } default -> 0; }; } default -> {} } } }";
        let parsed = parse(src);
        let mut config = RefactorConfig::default();
        config.refactor_switch.enable_simplify_switch = true;
        let ctx = Context::new(&parsed, &config);
        let body = parsed.unit.types[0].methods[0].body.as_ref().expect("Should have body");
        let Stmt::Switch(outer) = &body.stmts[0] else { panic!("expected switch") };
        let Some(Stmt::Block(arm)) = outer.cases[0].rule_body() else { panic!("expected block arm") };
        let Stmt::LocalVar(var) = &arm.stmts[0] else { panic!("expected local var") };
        let Some(Expr::Switch(inner)) = &var.declarators[0].init else { panic!("expected switch expression") };

        let frames = [
            Frame::Body(body.span),
            Frame::Block { stmts: &body.stmts, index: 0, span: body.span, braced: true },
            Frame::Switch(outer),
        ];
        let err = check_expression(&ctx, inner, &Scope::new(&frames)).unwrap_err();
        assert_eq!(err.reason(), Some(RejectReason::NestedSwitch));

        let top = [Frame::Body(body.span)];
        assert!(check_expression(&ctx, inner, &Scope::new(&top)).is_ok());
    }
}
