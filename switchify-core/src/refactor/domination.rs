//! Exclusivity & domination analysis
//!
//! Checks an ordered arm list for duplicate labels, reorders arms so that
//! no label is dominated by an earlier one (JLS 14.11.1), and settles the
//! `default` / `case null` / unconditional-pattern arms a switch needs.

use std::collections::HashSet;

use crate::error::{reject, RejectReason, RefactorResult};
use crate::semantics::{ConstValue, JavaType, Symbol};
use crate::source_utils::strip_trivia;

use super::branch::{Branch, Test};
use super::Context;

/// Facts about the subject shared by every check in this module.
#[derive(Debug, Clone)]
pub struct SubjectFacts {
    pub ty: Option<JavaType>,
    pub handled_enum_values: Vec<String>,
}

impl SubjectFacts {
    /// The subject is an enum and every one of its constants has an arm.
    pub fn all_enum_values_handled(&self, ctx: &Context<'_>) -> bool {
        let Some(ty) = &self.ty else {
            return false;
        };
        if !ctx.model.is_enum_type(ty) {
            return false;
        }
        let constants = ctx.model.enum_constants_of(ty);
        !constants.is_empty() && constants.iter().all(|c| self.handled_enum_values.contains(c))
    }

    fn can_be_null(&self) -> bool {
        !self.ty.as_ref().map(JavaType::is_primitive).unwrap_or(false)
    }
}

/// Whether `rhs` can never be selected when `lhs` is listed before it.
pub fn is_dominated_by(ctx: &Context<'_>, lhs: &Branch<'_>, rhs: &Branch<'_>) -> bool {
    if rhs.is_default() {
        return false;
    }
    if matches!(rhs.test, Test::Null) {
        return lhs.is_default();
    }

    match &rhs.test {
        Test::Equality(constant) => {
            if lhs.guard.is_some() {
                return false;
            }
            let Test::Type { ty, .. } = &lhs.test else {
                // constants never dominate constants
                return false;
            };
            let (Some(constant_ty), Some(pattern_ty)) = (ctx.model.type_of(constant), ctx.model.resolve_type(ty)) else {
                return false;
            };
            if constant_ty.is_primitive() {
                match pattern_ty.unboxed() {
                    Some(unboxed) => ctx.model.is_subtype(&constant_ty, &JavaType::Primitive(unboxed)),
                    // a primitive constant has to come before a pattern it cannot unbox to
                    None => true,
                }
            } else {
                ctx.model.is_subtype(&constant_ty, &pattern_ty)
            }
        }
        Test::Type { ty: rhs_ty, .. } => {
            if lhs.is_default() || lhs.has_null() {
                return true;
            }
            if lhs.guard.is_some() {
                return false;
            }
            match &lhs.test {
                Test::Type { ty: lhs_ty, .. } => match (ctx.model.resolve_type(rhs_ty), ctx.model.resolve_type(lhs_ty)) {
                    (Some(r), Some(l)) => ctx.model.is_subtype(&r, &l),
                    _ => rhs_ty.name == lhs_ty.name && rhs_ty.array_dims == lhs_ty.array_dims,
                },
                _ => false,
            }
        }
        Test::Null | Test::Unconditional => false,
    }
}

fn has_dominance_violation(ctx: &Context<'_>, branches: &[Branch<'_>]) -> bool {
    (1..branches.len()).any(|r| (0..r).any(|l| is_dominated_by(ctx, &branches[l], &branches[r])))
}

/// Reject chains testing the same constant, enum value, `null`, or the same
/// type with the same guard twice. Guards are compared as written.
pub fn detect_duplicates(ctx: &Context<'_>, branches: &[Branch<'_>]) -> RefactorResult<()> {
    let mut constants: Vec<ConstValue> = Vec::new();
    let mut enum_values: HashSet<Symbol> = HashSet::new();
    let mut patterns: HashSet<(String, usize, Option<String>)> = HashSet::new();
    let mut seen_null = false;

    for branch in branches {
        if branch.has_null() {
            if seen_null {
                return reject(RejectReason::DuplicateTest);
            }
            seen_null = true;
        }
        match &branch.test {
            Test::Equality(expr) => {
                if let Some(value) = ctx.model.constant_value(expr) {
                    if constants.iter().any(|c| c.same_label(&value)) {
                        return reject(RejectReason::DuplicateTest);
                    }
                    constants.push(value);
                }
                if let Some(symbol @ Symbol::EnumConstant { .. }) = ctx.model.symbol_of(expr) {
                    if !enum_values.insert(symbol) {
                        return reject(RejectReason::DuplicateTest);
                    }
                }
            }
            Test::Type { ty, .. } => {
                let guard = branch.guard.map(|g| strip_trivia(g.text(ctx.source)));
                if !patterns.insert((ty.name.clone(), ty.array_dims, guard)) {
                    return reject(RejectReason::DuplicateTest);
                }
            }
            Test::Null | Test::Unconditional => {}
        }
    }
    Ok(())
}

/// Insertion-based repair of dominance violations: arms are appended in
/// source order and, on a violation, the new arm is tried at every earlier
/// position from the back. Without `can_reorder` any violation rejects.
pub fn fix_dominance<'a>(ctx: &Context<'_>, branches: Vec<Branch<'a>>, can_reorder: bool) -> RefactorResult<Vec<Branch<'a>>> {
    let mut placed: Vec<Branch<'a>> = Vec::with_capacity(branches.len());
    for branch in branches {
        placed.push(branch);
        if !has_dominance_violation(ctx, &placed) {
            continue;
        }
        if !can_reorder {
            return reject(RejectReason::DominanceConflict);
        }
        let Some(branch) = placed.pop() else {
            continue;
        };
        let mut fixed = false;
        for pos in (0..placed.len()).rev() {
            placed.insert(pos, branch.clone());
            if !has_dominance_violation(ctx, &placed) {
                fixed = true;
                break;
            }
            placed.remove(pos);
        }
        if !fixed {
            return reject(RejectReason::DominanceConflict);
        }
        tracing::trace!("reordered arm to resolve dominance");
    }
    Ok(placed)
}

/// Settle the catch-all arms. Returns the arms and whether one was added.
///
/// At most one unconditional pattern may exist, never together with a
/// `default`; pattern dispatch needs one of the two. Non-pattern dispatch
/// that does not cover every enum value gets an empty `default`. In safe
/// mode a subject that may be `null` gets `case null` folded into the
/// default or as its own empty arm.
pub fn fix_default_null_unconditional<'a>(
    ctx: &Context<'_>,
    facts: &SubjectFacts,
    mut branches: Vec<Branch<'a>>,
    safe: bool,
    chain_start: usize,
) -> RefactorResult<(Vec<Branch<'a>>, bool)> {
    let has_default = branches.iter().any(Branch::is_default);
    let has_null = branches.iter().any(Branch::has_null);
    let has_pattern = branches.iter().any(|b| b.test.is_pattern());
    let unconditional = branches.iter().filter(|b| is_unconditional_pattern(ctx, facts, b)).count();
    let null_throws = facts.can_be_null() && !has_null;

    if has_default && unconditional > 0 {
        return reject(RejectReason::DefaultAndUnconditional);
    }
    if unconditional > 1 {
        return reject(RejectReason::MultipleUnconditional);
    }
    if has_pattern && !has_default && unconditional == 0 {
        return reject(RejectReason::PatternWithoutDefault);
    }

    let mut added = false;
    if !has_pattern && !has_default && !facts.all_enum_values_handled(ctx) {
        let at = branches.iter().map(|b| b.range.end).max().unwrap_or(chain_start);
        let mut default = Branch::synthesized(Test::Unconditional, at);
        default.includes_null = safe && null_throws;
        branches.push(default);
        added = true;
    } else if safe && null_throws {
        if has_default {
            for branch in branches.iter_mut().filter(|b| b.is_default()) {
                branch.includes_null = true;
            }
        } else {
            branches.push(Branch::synthesized(Test::Null, chain_start));
        }
        added = true;
    }
    Ok((branches, added))
}

/// A guard-free type pattern that every non-null subject value matches.
pub fn is_unconditional_pattern(ctx: &Context<'_>, facts: &SubjectFacts, branch: &Branch<'_>) -> bool {
    let Test::Type { ty, .. } = &branch.test else {
        return false;
    };
    if branch.guard.is_some() {
        return false;
    }
    match (&facts.ty, ctx.model.resolve_type(ty)) {
        (Some(subject), Some(pattern)) => ctx.model.is_subtype(subject, &pattern),
        _ => false,
    }
}

/// Whether the arm list, as emitted, handles every value of the subject.
pub fn is_exhaustive(ctx: &Context<'_>, facts: &SubjectFacts, branches: &[Branch<'_>]) -> bool {
    branches.iter().any(Branch::is_default)
        || branches.iter().any(|b| is_unconditional_pattern(ctx, facts, b))
        || (facts.all_enum_values_handled(ctx) && branches.iter().any(Branch::has_null))
}
