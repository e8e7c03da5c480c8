//! Rewrite planning
//!
//! A [`RewritePlan`] is the target switch described by source positions:
//! labels as text, bodies as spans into the original file, comments as
//! text to re-emit. [`super::emit`] turns it into the replacement string.

use std::fmt;

use crate::comments::{self, render_filtered};
use crate::edit::TextEdit;
use crate::semantics::Symbol;
use crate::tree::*;

use super::domination::SubjectFacts;
use super::reachability::delete_statement;
use super::subject::Subject;
use super::{Context, Scope};

/// Label of one arm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArmLabel {
    Constants(Vec<String>),
    Pattern { text: String, guard: Option<String> },
    Null,
    Default,
    NullDefault,
}

impl fmt::Display for ArmLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArmLabel::Constants(values) => write!(f, "case {}", values.join(", ")),
            ArmLabel::Pattern { text, guard: Some(guard) } => write!(f, "case {} when {}", text, guard),
            ArmLabel::Pattern { text, guard: None } => write!(f, "case {}", text),
            ArmLabel::Null => write!(f, "case null"),
            ArmLabel::Default => write!(f, "default"),
            ArmLabel::NullDefault => write!(f, "case null, default"),
        }
    }
}

/// Right-hand side of an arm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArmBody {
    /// `{}`.
    Empty,
    /// An expression statement or `throw`, copied with its `;`.
    Inline(Span),
    /// An expression; `;` is appended.
    Value(Span),
    /// An existing `{ ... }` block, copied.
    Braced(Span),
    /// Statements wrapped in new braces, optionally ending in `yield`.
    Statements { stmts: Option<Span>, yield_value: Option<Span> },
}

impl ArmBody {
    /// Source spans the emitted text carries, for comment bookkeeping.
    pub fn printed(&self) -> Vec<Span> {
        match self {
            ArmBody::Empty => Vec::new(),
            ArmBody::Inline(s) | ArmBody::Value(s) | ArmBody::Braced(s) => vec![*s],
            ArmBody::Statements { stmts, yield_value } => stmts.iter().chain(yield_value.iter()).copied().collect(),
        }
    }

    /// Body text with whitespace runs collapsed, for grouping equal arms.
    fn normalized(&self, source: &str) -> Option<String> {
        let spans = self.printed();
        if spans.is_empty() {
            return None;
        }
        let mut text = format!("{:?}:", std::mem::discriminant(self));
        for span in spans {
            text.push_str(&span.text(source).split_whitespace().collect::<Vec<_>>().join(" "));
            text.push('|');
        }
        Some(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedArm {
    pub label: ArmLabel,
    /// Comment lines printed above the label.
    pub leading: Vec<String>,
    /// Comments from removed syntax, printed at the top of the body.
    pub orphans: Vec<String>,
    /// Comments printed after the body content.
    pub trailing: Vec<String>,
    pub body: ArmBody,
}

impl PlannedArm {
    pub fn new(label: ArmLabel, body: ArmBody) -> Self {
        PlannedArm { label, leading: Vec::new(), orphans: Vec::new(), trailing: Vec::new(), body }
    }

    /// Attach the comments of `range`: those before `test_start` lead the
    /// arm, those after the printed body trail it, the rest not carried by
    /// the body become orphans.
    pub fn with_comments(mut self, all: &[Comment], range: Span, test_start: usize) -> Self {
        if range.is_empty() {
            return self;
        }
        let split = test_start.clamp(range.start, range.end);
        let printed = self.body.printed();
        let body_end = printed.iter().map(|s| s.end).max();
        let leading = comments::comments_in(all, Span::new(range.start, split));
        let (trailing, orphans): (Vec<&Comment>, Vec<&Comment>) = comments::orphans(all, Span::new(split, range.end), &printed)
            .into_iter()
            .partition(|c| body_end.map_or(false, |end| c.span.start >= end));
        self.leading = render_filtered(&leading);
        self.orphans = render_filtered(&orphans);
        self.trailing = render_filtered(&trailing);
        self
    }
}

/// What the new switch produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchForm {
    Statement,
    Return,
    /// `lhs` ends in the operator, e.g. `x += ` or `int x = `.
    Assign { lhs: String },
}

impl DispatchForm {
    pub fn prefix(&self) -> &str {
        match self {
            DispatchForm::Statement => "",
            DispatchForm::Return => "return ",
            DispatchForm::Assign { lhs } => lhs,
        }
    }

    pub fn is_expression(&self) -> bool {
        !matches!(self, DispatchForm::Statement)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewritePlan {
    /// Selector expression text, without the surrounding parentheses.
    pub selector: String,
    pub form: DispatchForm,
    pub arms: Vec<PlannedArm>,
    /// Comment lines printed before the first arm.
    pub leading: Vec<String>,
    /// Source replaced by the rendered switch.
    pub replace: Span,
    /// Further edits: deleted declarations, pulled-up or dead statements.
    pub extra: Vec<TextEdit>,
}

impl RewritePlan {
    pub fn new(selector: String, form: DispatchForm, arms: Vec<PlannedArm>, replace: Span) -> Self {
        RewritePlan { selector, form, arms, leading: Vec::new(), replace, extra: Vec::new() }
    }
}

/// Merge adjacent constant arms whose bodies are identical once whitespace
/// is normalized. Arms carrying their own comments are never folded into a
/// previous arm.
pub fn group_equal_arms(source: &str, arms: Vec<PlannedArm>) -> Vec<PlannedArm> {
    let mut out: Vec<PlannedArm> = Vec::with_capacity(arms.len());
    for arm in arms {
        if let Some(prev) = out.last_mut() {
            let mergeable = arm.leading.is_empty()
                && arm.orphans.is_empty()
                && arm.trailing.is_empty()
                && prev.orphans.is_empty()
                && matches!((&prev.label, &arm.label), (ArmLabel::Constants(_), ArmLabel::Constants(_)))
                && prev.body.normalized(source).is_some()
                && prev.body.normalized(source) == arm.body.normalized(source);
            if mergeable {
                if let (ArmLabel::Constants(into), ArmLabel::Constants(from)) = (&mut prev.label, arm.label) {
                    into.extend(from);
                }
                continue;
            }
        }
        out.push(arm);
    }
    out
}

/// Type pattern text. Raw generic types get wildcards (`List` becomes
/// `List<?>`); a pattern without a binding is named `unused`.
pub fn pattern_text(ctx: &Context<'_>, ty: &TypeName, binding: Option<&Binding>) -> String {
    let written = ty.span.text(ctx.source);
    let mut text = match (ty.type_args, ctx.model.type_parameter_count(ty)) {
        (None, params) if params > 0 => {
            let wildcards = vec!["?"; params].join(", ");
            let (base, dims) = written.split_at(written.find('[').unwrap_or(written.len()));
            format!("{}<{}>{}", base.trim_end(), wildcards, dims)
        }
        _ => written.to_string(),
    };
    text.push(' ');
    text.push_str(binding.map(|b| b.name.as_str()).unwrap_or("unused"));
    text
}

/// Drop redundant braces around an arm body: descend through blocks
/// holding one statement, stopping at an expression statement or `throw`.
pub fn strip_unnecessary_braces(stmt: &Stmt) -> &Stmt {
    let mut at = stmt;
    while let Stmt::Block(block) = at {
        match block.stmts.as_slice() {
            [only @ (Stmt::Expr(_) | Stmt::Throw(_))] => return only,
            [only @ Stmt::Block(_)] => at = only,
            _ => break,
        }
    }
    at
}

/// Arm body for a statement that becomes the right-hand side as is.
pub fn statement_body(stmt: &Stmt) -> ArmBody {
    let stripped = strip_unnecessary_braces(stmt);
    match stripped {
        Stmt::Block(b) => ArmBody::Braced(b.span),
        Stmt::Expr(_) | Stmt::Throw(_) => ArmBody::Inline(stripped.span()),
        other => ArmBody::Statements { stmts: Some(other.span()), yield_value: None },
    }
}

/// Span covering a run of statements.
pub fn span_of(stmts: &[Stmt]) -> Option<Span> {
    let first = stmts.first()?;
    let last = stmts.last()?;
    Some(first.span().union(last.span()))
}

/// The statements an arm body stands for: the contents of a block (after
/// unwrapping single nested blocks), or the statement itself.
pub fn statements_of(stmt: &Stmt) -> &[Stmt] {
    match stmt.unwrap_single_blocks() {
        Stmt::Block(b) => &b.stmts,
        other => std::slice::from_ref(other),
    }
}

/// Label text for a constant: enum constants by simple name, anything
/// else as written.
pub fn constant_label(ctx: &Context<'_>, expr: &Expr) -> String {
    match ctx.model.symbol_of(expr) {
        Some(Symbol::EnumConstant { name, .. }) => name,
        _ => expr.strip_parens().span().text(ctx.source).trim().to_string(),
    }
}

/// Body of a `return switch` arm for statements ending in `return value`
/// or `throw`. The flag tells whether the arm produces a value.
pub fn return_arm_body(stmts: &[Stmt]) -> Option<(ArmBody, bool)> {
    let (last, prefix) = stmts.split_last()?;
    if prefix.iter().any(contains_return) {
        return None;
    }
    match last {
        Stmt::Return(ReturnStmt { value: Some(value), .. }) => {
            let value = value.span();
            match span_of(prefix) {
                None => Some((ArmBody::Value(value), true)),
                Some(stmts) => Some((ArmBody::Statements { stmts: Some(stmts), yield_value: Some(value) }, true)),
            }
        }
        Stmt::Throw(t) if prefix.is_empty() => Some((ArmBody::Inline(t.span), false)),
        Stmt::Throw(_) => Some((ArmBody::Statements { stmts: span_of(stmts), yield_value: None }, false)),
        _ => None,
    }
}

fn contains_return(stmt: &Stmt) -> bool {
    any_node(Node::Stmt(stmt), &mut |n| matches!(n, Node::Stmt(Stmt::Return(_))))
}

/// The assignment an arm performs when its statements are exactly one
/// assignment expression statement.
pub fn single_assignment(stmts: &[Stmt]) -> Option<&AssignExpr> {
    match stmts {
        [Stmt::Expr(ExprStmt { expr: Expr::Assign(assign), .. })] => Some(assign),
        _ => None,
    }
}

pub fn is_single_throw(stmts: &[Stmt]) -> bool {
    matches!(stmts, [Stmt::Throw(_)])
}

/// The assignment shared by every arm: each arm is one assignment with the
/// same operator to the same variable, or a single `throw`. At least one
/// arm must assign.
pub fn common_assignment<'a>(ctx: &Context<'_>, arms: &[&'a [Stmt]]) -> Option<&'a AssignExpr> {
    let mut first: Option<&'a AssignExpr> = None;
    for stmts in arms {
        if is_single_throw(stmts) {
            continue;
        }
        let assign = single_assignment(stmts)?;
        match first {
            None => first = Some(assign),
            Some(f) => {
                let same_target = Subject::new(&f.target, ctx.model, ctx.source).matches(&assign.target, ctx.model, ctx.source, true);
                if f.op != assign.op || !same_target {
                    return None;
                }
            }
        }
    }
    first
}

/// Arm body of an assignment switch: the assigned value, or the `throw`.
pub fn assignment_arm_body(stmts: &[Stmt]) -> Option<ArmBody> {
    match stmts {
        [Stmt::Throw(t)] => Some(ArmBody::Inline(t.span)),
        _ => single_assignment(stmts).map(|a| ArmBody::Value(a.value.span())),
    }
}

/// Left-hand side for `target op switch ...`, merged with the declaration
/// directly before `construct` when that is possible. Also returns the
/// edit deleting the merged declaration.
pub fn assignment_lhs(ctx: &Context<'_>, scope: &Scope<'_, '_>, assign: &AssignExpr, construct: &Stmt) -> (String, Option<TextEdit>) {
    let target = assign.target.span().text(ctx.source).trim();
    let plain = format!("{} {} ", target, assign.op);
    match mergeable_declaration(ctx, scope, assign, construct) {
        Some(decl) => {
            let mut prefix = String::new();
            if let Some(mods) = decl.modifiers.span {
                prefix.push_str(mods.text(ctx.source).trim());
                prefix.push(' ');
            }
            prefix.push_str(decl.ty.span.text(ctx.source).trim());
            (format!("{} {} = ", prefix, target), Some(delete_statement(ctx.source, decl.span)))
        }
        None => (plain, None),
    }
}

/// The declaration immediately preceding `construct`, if it declares the
/// assigned variable alone with no dimensions on the name, has no or a
/// constant initializer, is not `volatile` and the variable is not read
/// inside `construct`.
fn mergeable_declaration<'a>(
    ctx: &Context<'_>,
    scope: &Scope<'_, 'a>,
    assign: &AssignExpr,
    construct: &Stmt,
) -> Option<&'a LocalVarDecl> {
    if assign.op != "=" {
        return None;
    }
    let Some(Stmt::LocalVar(decl)) = scope.preceding().last() else {
        return None;
    };
    let [declarator] = decl.declarators.as_slice() else {
        return None;
    };
    // `int x[];` would lose its brackets in `int x = ...`
    if decl.ty.is_var() || declarator.array_dims > 0 {
        return None;
    }
    let symbol = ctx.model.symbol_of(&assign.target)?;
    let declared = Symbol::Local { name: declarator.name.clone(), decl: declarator.name_span };
    if symbol != declared || decl.modifiers.has("volatile") || ctx.model.is_volatile(&symbol) {
        return None;
    }
    if let Some(init) = &declarator.init {
        if !init.is_null_literal() && ctx.model.constant_value(init).is_none() {
            return None;
        }
    }
    if reads_variable(ctx, construct, &symbol) {
        tracing::trace!(variable = %declarator.name, "declaration not merged: variable is read");
        return None;
    }
    Some(decl)
}

/// Whether `symbol` is read anywhere in `stmt`; the target of a plain
/// assignment is a write.
fn reads_variable(ctx: &Context<'_>, stmt: &Stmt, symbol: &Symbol) -> bool {
    let mut written = Vec::new();
    walk(Node::Stmt(stmt), &mut |n| {
        if let Node::Expr(Expr::Assign(a)) = n {
            if a.op == "=" {
                written.push(a.target.strip_parens().span());
            }
        }
        true
    });
    any_node(Node::Stmt(stmt), &mut |n| match n {
        Node::Expr(e @ Expr::Name(name)) => {
            !written.contains(&name.span) && ctx.model.symbol_of(e).as_ref() == Some(symbol)
        }
        _ => false,
    })
}

/// Subject facts of a switch: the selector type and the enum constants
/// named by the given cases. Cases carrying `default` are skipped.
pub fn switch_facts<'c>(ctx: &Context<'_>, selector: &Expr, cases: impl IntoIterator<Item = &'c SwitchCase>) -> SubjectFacts {
    let handled_enum_values = cases
        .into_iter()
        .filter(|c| !c.has_default())
        .flat_map(SwitchCase::expressions)
        .map(|e| constant_label(ctx, e))
        .collect();
    SubjectFacts { ty: ctx.model.type_of(selector.strip_parens()), handled_enum_values }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_display() {
        assert_eq!(ArmLabel::Constants(vec!["A".into(), "B".into()]).to_string(), "case A, B");
        assert_eq!(
            ArmLabel::Pattern { text: "String s".into(), guard: Some("s.isEmpty()".into()) }.to_string(),
            "case String s when s.isEmpty()"
        );
        assert_eq!(ArmLabel::NullDefault.to_string(), "case null, default");
    }

    #[test]
    fn test_group_equal_arms() {
        let source = "a();  a();\nb();";
        let arms = vec![
            PlannedArm::new(ArmLabel::Constants(vec!["1".into()]), ArmBody::Inline(Span::new(0, 4))),
            PlannedArm::new(ArmLabel::Constants(vec!["2".into()]), ArmBody::Inline(Span::new(6, 10))),
            PlannedArm::new(ArmLabel::Constants(vec!["3".into()]), ArmBody::Inline(Span::new(11, 15))),
            PlannedArm::new(ArmLabel::Default, ArmBody::Inline(Span::new(11, 15))),
        ];
        let grouped = group_equal_arms(source, arms);
        assert_eq!(grouped.len(), 3);
        assert_eq!(grouped[0].label, ArmLabel::Constants(vec!["1".into(), "2".into()]));
        assert_eq!(grouped[2].label, ArmLabel::Default);
    }

    #[test]
    fn test_commented_arm_not_grouped() {
        let source = "a();a();";
        let mut second = PlannedArm::new(ArmLabel::Constants(vec!["2".into()]), ArmBody::Inline(Span::new(4, 8)));
        second.leading.push("// two".into());
        let arms = vec![PlannedArm::new(ArmLabel::Constants(vec!["1".into()]), ArmBody::Inline(Span::new(0, 4))), second];
        assert_eq!(group_equal_arms(source, arms).len(), 2);
    }

    #[test]
    fn test_return_arm_body() {
        let src = "class A { int m(int x) { a(); return x; } }";
        let parsed = crate::parser::parse_string(src.to_string(), "A.java".to_string()).expect("Should parse");
        let body = parsed.unit.types[0].methods[0].body.as_ref().expect("Should have body");
        let (arm, value) = return_arm_body(&body.stmts).expect("Should qualify");
        assert!(value);
        assert!(matches!(arm, ArmBody::Statements { stmts: Some(_), yield_value: Some(_) }));
        assert!(return_arm_body(&body.stmts[..1]).is_none());
    }

    fn merged_lhs(src: &str) -> (String, bool) {
        let parsed = crate::parser::parse_string(src.to_string(), "A.java".to_string()).expect("Should parse");
        let config = crate::config::RefactorConfig::default();
        let ctx = Context::new(&parsed, &config);
        let body = parsed.unit.types[0].methods[0].body.as_ref().expect("Should have body");
        let frames = [
            super::super::Frame::Body(body.span),
            super::super::Frame::Block { stmts: &body.stmts, index: 1, span: body.span, braced: true },
        ];
        let Stmt::Expr(ExprStmt { expr: Expr::Assign(assign), .. }) = &body.stmts[1] else {
            panic!("expected assignment")
        };
        let (lhs, delete) = assignment_lhs(&ctx, &Scope::new(&frames), assign, &body.stmts[1]);
        (lhs, delete.is_some())
    }

    #[test]
    fn test_declaration_merge() {
        assert_eq!(merged_lhs("class A { void m() { int x; x = 1; } }"), ("int x = ".to_string(), true));
        assert_eq!(merged_lhs("class A { void m() { final int x; x = 1; } }"), ("final int x = ".to_string(), true));
    }

    #[test]
    fn test_declaration_merge_blocked() {
        // dimensions on the name
        assert_eq!(merged_lhs("class A { void m() { int x[]; x = null; } }"), ("x = ".to_string(), false));
        // non-constant initializer
        assert_eq!(merged_lhs("class A { void m() { int x = f(); x = 1; } }"), ("x = ".to_string(), false));
        assert_eq!(merged_lhs("class A { void m() { volatile int x; x = 1; } }"), ("x = ".to_string(), false));
        // read on the right-hand side
        assert_eq!(merged_lhs("class A { void m() { int x = 0; x = x + 1; } }"), ("x = ".to_string(), false));
    }

    #[test]
    fn test_form_prefix() {
        assert_eq!(DispatchForm::Return.prefix(), "return ");
        assert_eq!(DispatchForm::Assign { lhs: "int x = ".into() }.prefix(), "int x = ");
        assert!(!DispatchForm::Statement.is_expression());
    }
}
