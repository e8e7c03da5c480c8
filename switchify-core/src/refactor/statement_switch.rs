//! StatementSwitchToExpressionSwitch
//!
//! Colon-style switch statements become arrow switches. Empty cases are
//! grouped with the next one; a non-empty case that falls through into the
//! next rejects. Three forms are offered, in order: `return switch`,
//! `x = switch` and the direct statement translation.

use crate::comments::{comments_in, render_filtered};
use crate::edit::{Fix, FixKind};
use crate::error::{reject, RejectReason, RefactorResult};
use crate::tree::*;

use super::emit;
use super::plan::{
    assignment_arm_body, assignment_lhs, common_assignment, constant_label, group_equal_arms, return_arm_body, span_of,
    statement_body, switch_facts, ArmBody, ArmLabel, DispatchForm, PlannedArm, RewritePlan,
};
use super::reachability::{dead_code_after, has_break_or_yield, Reachability};
use super::{Context, Scope};

pub(crate) const REMOVE_DEFAULT: &str = "Remove default case because all enum values handled";

/// Consecutive cases sharing one body.
struct Group<'a> {
    cases: &'a [SwitchCase],
    label: ArmLabel,
    /// Body of the last case of the group.
    body: &'a [Stmt],
    span: Span,
}

impl<'a> Group<'a> {
    fn has_default(&self) -> bool {
        self.cases.iter().any(SwitchCase::has_default)
    }
}

pub fn check<'a>(ctx: &Context<'a>, stmt: &'a Stmt, s: &'a SwitchNode, scope: &Scope<'_, 'a>) -> RefactorResult<Vec<Fix>> {
    if scope.inside_switch() {
        return reject(RejectReason::NestedSwitch);
    }
    if s.cases.is_empty() {
        return reject(RejectReason::NothingToDo);
    }
    if s.cases.iter().any(|c| c.kind == CaseKind::Rule) {
        return reject(RejectReason::ArrowCase);
    }
    if s.cases.iter().any(|c| c.has_pattern() || c.guard.is_some()) {
        return reject(RejectReason::PatternLabel);
    }
    let groups = groups(ctx, s)?;
    check_local_scopes(&groups)?;

    let config = &ctx.config.statement_switch;
    let facts = switch_facts(ctx, &s.selector, groups.iter().filter(|g| !g.has_default()).flat_map(|g| g.cases));
    let all_handled = facts.all_enum_values_handled(ctx);
    let exhaustive = s.has_default() || all_handled;
    let can_remove_default = s.has_default() && all_handled;
    tracing::trace!(groups = groups.len(), exhaustive, can_remove_default, "grouped switch cases");

    let mut candidates = Vec::new();
    if config.enable_return_switch_conversion && exhaustive {
        if let Some(bodies) = return_bodies(&groups) {
            let extra = dead_code_after(ctx.source, ctx.model, scope, s.span, 0);
            candidates.push((DispatchForm::Return, bodies, extra, "Convert to return switch"));
        }
    }
    if config.enable_assignment_switch_conversion && exhaustive {
        let stripped: Vec<&[Stmt]> = groups.iter().map(|g| strip_trailing_break(g.body)).collect();
        let assign = if stripped.iter().any(|b| b.is_empty()) { None } else { common_assignment(ctx, &stripped) };
        let bodies: Option<Vec<ArmBody>> = stripped.iter().map(|b| assignment_arm_body(b)).collect();
        if let (Some(assign), Some(bodies)) = (assign, bodies) {
            let (lhs, merged) = assignment_lhs(ctx, scope, assign, stmt);
            candidates.push((DispatchForm::Assign { lhs }, bodies, merged.into_iter().collect(), "Convert to assignment switch"));
        }
    }
    if config.enable_direct_conversion {
        let bodies = groups.iter().map(|g| direct_body(strip_trailing_break(g.body))).collect();
        candidates.push((DispatchForm::Statement, bodies, Vec::new(), "Convert to arrow switch"));
    }
    if candidates.is_empty() {
        return reject(RejectReason::ShapeMismatch);
    }

    let comments = ctx.comments();
    let first_case = s.cases[0].span.start;
    let leading = render_filtered(&comments_in(comments, Span::new(s.body_span.start, first_case)));
    let last_end = groups.last().map(|g| g.span.end).unwrap_or(first_case);
    let trailing = render_filtered(&comments_in(comments, Span::new(last_end, s.body_span.end)));
    let selector = s.selector.strip_parens().span().text(ctx.source).trim().to_string();

    let mut fixes = Vec::new();
    let mut secondary = Vec::new();
    for (form, bodies, extra, description) in candidates {
        let is_assignment = matches!(form, DispatchForm::Assign { .. });
        let arms = planned_arms(ctx, &groups, bodies, &trailing);
        let mut plan = RewritePlan::new(selector.clone(), form, arms, s.span);
        plan.leading = leading.clone();
        plan.extra = extra;
        fixes.push(emit::fix(ctx, &plan, FixKind::Primary, description));
        // only the assignment form may drop its default
        if can_remove_default && is_assignment {
            let before = plan.arms.len();
            plan.arms.retain(|a| a.label != ArmLabel::Default);
            if plan.arms.len() < before {
                secondary.push(emit::fix(ctx, &plan, FixKind::Secondary, REMOVE_DEFAULT));
            }
        }
    }
    fixes.extend(secondary);
    Ok(fixes)
}

fn groups<'a>(ctx: &Context<'a>, s: &'a SwitchNode) -> RefactorResult<Vec<Group<'a>>> {
    let reach = Reachability::new(ctx.model);
    let mut out = Vec::new();
    let mut start = 0;
    for (i, case) in s.cases.iter().enumerate() {
        let last = i + 1 == s.cases.len();
        if case.body.is_empty() && !last {
            continue;
        }
        if !last && reach.can_complete_normally_all(&case.body) {
            return reject(RejectReason::FallThrough);
        }
        let cases = &s.cases[start..=i];
        out.push(Group { cases, label: group_label(ctx, cases)?, body: &case.body, span: cases[0].span.union(case.span) });
        start = i + 1;
    }
    Ok(out)
}

/// `default` absorbs the other labels of its group; `null` may only be
/// combined with `default`.
fn group_label(ctx: &Context<'_>, cases: &[SwitchCase]) -> RefactorResult<ArmLabel> {
    let has_default = cases.iter().any(SwitchCase::has_default);
    let has_null = cases.iter().any(SwitchCase::has_null);
    let constants: Vec<String> = cases.iter().flat_map(SwitchCase::expressions).map(|e| constant_label(ctx, e)).collect();
    match (has_default, has_null) {
        (true, true) => Ok(ArmLabel::NullDefault),
        (true, false) => Ok(ArmLabel::Default),
        (false, true) if constants.is_empty() => Ok(ArmLabel::Null),
        (false, true) => reject(RejectReason::ShapeMismatch),
        (false, false) => Ok(ArmLabel::Constants(constants)),
    }
}

/// A local declared in one case and used by a later one would go out of
/// scope once every arm gets its own block.
fn check_local_scopes(groups: &[Group<'_>]) -> RefactorResult<()> {
    for (i, group) in groups.iter().enumerate() {
        let declared: Vec<&str> = group
            .body
            .iter()
            .filter_map(|s| match s {
                Stmt::LocalVar(d) => Some(d),
                _ => None,
            })
            .flat_map(|d| d.declarators.iter().map(|d| d.name.as_str()))
            .collect();
        if declared.is_empty() {
            continue;
        }
        let used_later = groups[i + 1..].iter().flat_map(|g| g.body).any(|stmt| {
            any_node(Node::Stmt(stmt), &mut |n| matches!(n, Node::Expr(Expr::Name(name)) if declared.contains(&name.name.as_str())))
        });
        if used_later {
            tracing::trace!(locals = ?declared, "local shared between cases");
            return reject(RejectReason::ShapeMismatch);
        }
    }
    Ok(())
}

fn strip_trailing_break(stmts: &[Stmt]) -> &[Stmt] {
    match stmts.split_last() {
        Some((Stmt::Break(JumpStmt { label: None, .. }), rest)) => rest,
        _ => stmts,
    }
}

fn direct_body(stmts: &[Stmt]) -> ArmBody {
    match stmts {
        [] => ArmBody::Empty,
        [only] => statement_body(only),
        _ => ArmBody::Statements { stmts: span_of(stmts), yield_value: None },
    }
}

fn return_bodies(groups: &[Group<'_>]) -> Option<Vec<ArmBody>> {
    let mut any_value = false;
    let mut bodies = Vec::with_capacity(groups.len());
    for group in groups {
        if group.body.iter().any(has_break_or_yield) {
            return None;
        }
        let (body, value) = return_arm_body(group.body)?;
        any_value |= value;
        bodies.push(body);
    }
    any_value.then_some(bodies)
}

fn planned_arms(ctx: &Context<'_>, groups: &[Group<'_>], bodies: Vec<ArmBody>, trailing: &[String]) -> Vec<PlannedArm> {
    let comments = ctx.comments();
    let mut range_start = groups.first().map(|g| g.span.start).unwrap_or(0);
    let mut arms: Vec<PlannedArm> = groups
        .iter()
        .zip(bodies)
        .map(|(group, body)| {
            let range = Span::new(range_start, group.span.end);
            range_start = group.span.end;
            PlannedArm::new(group.label.clone(), body).with_comments(comments, range, group.span.start)
        })
        .collect();
    if let Some(last) = arms.last_mut() {
        last.trailing.extend(trailing.iter().cloned());
    }
    group_equal_arms(ctx.source, arms)
}
