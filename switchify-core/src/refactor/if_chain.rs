//! IfChainToSwitch
//!
//! ```java
//! if (o instanceof String s) {          switch (o) {
//!   a(s);                                 case String s -> a(s);
//! } else if (o instanceof Integer i) { =>   case Integer i -> b(i);
//!   b(i);                                 case null, default -> c();
//! } else { c(); }                       }
//! ```
//!
//! The chain is extracted and checked for duplicates, dominance is repaired
//! by reordering, and the catch-all arms are settled. A single statement
//! after a chain whose branches all jump may be pulled up as the default
//! arm. Code left unreachable behind the new switch is deleted.

use crate::edit::{Fix, FixKind};
use crate::error::{reject, RejectReason, RefactorResult};
use crate::tree::*;

use super::branch::{extract_chain, Branch, Test};
use super::domination::{
    detect_duplicates, fix_default_null_unconditional, fix_dominance, is_exhaustive, SubjectFacts,
};
use super::emit;
use super::plan::{
    assignment_arm_body, assignment_lhs, common_assignment, constant_label, group_equal_arms, pattern_text,
    return_arm_body, statement_body, statements_of, ArmBody, ArmLabel, DispatchForm, PlannedArm, RewritePlan,
};
use super::reachability::{dead_code_after, delete_statement, has_break_or_yield, Reachability};
use super::{Context, Scope};

pub fn check<'a>(ctx: &Context<'a>, stmt: &'a Stmt, root: &'a IfStmt, scope: &Scope<'_, 'a>) -> RefactorResult<Vec<Fix>> {
    if scope.inside_if() {
        return reject(RejectReason::NotChainRoot);
    }
    let safe = ctx.config.if_chain.enable_safe;
    let chain = extract_chain(ctx, root, safe)?;
    if has_break_or_yield(stmt) {
        return reject(RejectReason::BreakOrYield);
    }
    let facts = SubjectFacts { ty: chain.subject_type.clone(), handled_enum_values: chain.handled_enum_values.clone() };
    let reach = Reachability::new(ctx.model);
    let abrupt = |b: &Branch<'_>| b.body.map(|s| !reach.can_complete_normally(s)).unwrap_or(false);

    let following = scope.following();
    let candidate = match following {
        [only] if !chain.has_else && chain.branches.iter().all(&abrupt) && !has_break_or_yield(only) => Some(only),
        _ => None,
    };

    let plain = settle(ctx, &facts, chain.branches.clone(), safe, root.span.start);
    let pulled = candidate.and_then(|next| {
        // an int or string chain keeps its trailing code; it is not exhaustive
        if plain.is_ok() && !facts.all_enum_values_handled(ctx) {
            return None;
        }
        let mut branches = chain.branches.clone();
        branches.push(Branch {
            test: Test::Unconditional,
            includes_null: false,
            guard: None,
            body: Some(next),
            range: next.span(),
            test_start: next.span().start,
            pulled_up: true,
        });
        match settle(ctx, &facts, branches, safe, root.span.start) {
            Ok(settled) => Some((settled, next)),
            Err(err) => {
                tracing::trace!(reason = %err, "pull-up rejected");
                None
            }
        }
    });
    let (branches, pulled_stmt) = match pulled {
        Some((settled, next)) => (settled, Some(next)),
        None => (plain?, None),
    };

    let exhaustive = is_exhaustive(ctx, &facts, &branches);
    let all_abrupt = branches.iter().all(&abrupt);
    let mut extra = Vec::new();
    if let Some(next) = pulled_stmt {
        extra.push(delete_statement(ctx.source, next.span()));
    }
    if exhaustive && all_abrupt {
        extra.extend(dead_code_after(ctx.source, ctx.model, scope, root.span, usize::from(pulled_stmt.is_some())));
    }
    tracing::trace!(arms = branches.len(), exhaustive, pulled = pulled_stmt.is_some(), "planned if chain");

    let selector = chain.subject.text(ctx.source).to_string();
    let comments = ctx.comments();
    let arm = |branch: &Branch<'a>, body: ArmBody| -> PlannedArm {
        PlannedArm::new(label(ctx, branch), body).with_comments(comments, branch.range, branch.test_start)
    };

    let mut fixes = Vec::new();
    let arms: Vec<PlannedArm> = branches
        .iter()
        .map(|b| arm(b, b.body.map(statement_body).unwrap_or(ArmBody::Empty)))
        .collect();
    let mut plan = RewritePlan::new(selector.clone(), DispatchForm::Statement, group_equal_arms(ctx.source, arms), root.span);
    plan.extra = extra.clone();
    fixes.push(emit::fix(ctx, &plan, FixKind::Primary, "Convert if-chain to switch"));

    if ctx.config.if_chain.enable_return_switch && exhaustive {
        let bodies: Option<Vec<(ArmBody, bool)>> =
            branches.iter().map(|b| b.body.and_then(|s| return_arm_body(statements_of(s)))).collect();
        if let Some(bodies) = bodies.filter(|bodies| bodies.iter().any(|(_, value)| *value)) {
            let arms = branches.iter().zip(bodies).map(|(b, (body, _))| arm(b, body)).collect();
            let mut plan = RewritePlan::new(selector.clone(), DispatchForm::Return, group_equal_arms(ctx.source, arms), root.span);
            plan.extra = extra.clone();
            fixes.push(emit::fix(ctx, &plan, FixKind::Primary, "Convert if-chain to return switch"));
        }
    }

    if ctx.config.if_chain.enable_assignment_switch && exhaustive {
        let bodies: Option<Vec<&[Stmt]>> = branches.iter().map(|b| b.body.map(statements_of)).collect();
        let assign = bodies.as_ref().and_then(|bodies| common_assignment(ctx, bodies));
        if let (Some(bodies), Some(assign)) = (bodies.as_ref(), assign) {
            let arm_bodies: Option<Vec<ArmBody>> = bodies.iter().map(|s| assignment_arm_body(s)).collect();
            if let Some(arm_bodies) = arm_bodies {
                let (lhs, merged) = assignment_lhs(ctx, scope, assign, stmt);
                let arms = branches.iter().zip(arm_bodies).map(|(b, body)| arm(b, body)).collect();
                let mut plan =
                    RewritePlan::new(selector, DispatchForm::Assign { lhs }, group_equal_arms(ctx.source, arms), root.span);
                plan.extra.extend(merged);
                if let Some(next) = pulled_stmt {
                    plan.extra.push(delete_statement(ctx.source, next.span()));
                }
                fixes.push(emit::fix(ctx, &plan, FixKind::Primary, "Convert if-chain to assignment switch"));
            }
        }
    }
    Ok(fixes)
}

/// Duplicates, dominance, then the catch-all arms; adding an arm can
/// introduce a dominance violation, so dominance is fixed again.
fn settle<'a>(
    ctx: &Context<'_>,
    facts: &SubjectFacts,
    branches: Vec<Branch<'a>>,
    safe: bool,
    chain_start: usize,
) -> RefactorResult<Vec<Branch<'a>>> {
    detect_duplicates(ctx, &branches)?;
    let branches = fix_dominance(ctx, branches, !safe)?;
    let (branches, added) = fix_default_null_unconditional(ctx, facts, branches, safe, chain_start)?;
    if added {
        return fix_dominance(ctx, branches, true);
    }
    Ok(branches)
}

fn label(ctx: &Context<'_>, branch: &Branch<'_>) -> ArmLabel {
    match &branch.test {
        Test::Type { ty, binding } => ArmLabel::Pattern {
            text: pattern_text(ctx, ty, *binding),
            guard: branch.guard.map(|g| g.text(ctx.source).trim().to_string()),
        },
        Test::Equality(expr) => ArmLabel::Constants(vec![constant_label(ctx, expr)]),
        Test::Null => ArmLabel::Null,
        Test::Unconditional if branch.includes_null => ArmLabel::NullDefault,
        Test::Unconditional => ArmLabel::Default,
    }
}
