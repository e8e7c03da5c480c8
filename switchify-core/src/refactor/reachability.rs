//! Reachability & completion analysis
//!
//! An implementation of JLS 14.22 "can complete normally" over the typed
//! tree, with two practical additions: `System.exit(..)` never completes,
//! and callers may force chosen statements to be treated as abrupt. The
//! latter answers "what would be reachable if this construct were replaced
//! by an exhaustive switch whose arms all jump".

use std::collections::HashSet;

use crate::comments::has_lint_marker;
use crate::edit::TextEdit;
use crate::semantics::{ConstValue, SemanticModel};
use crate::source_utils::{is_first_on_line, line_start};
use crate::tree::*;

use super::{Frame, Scope};

pub struct Reachability<'m> {
    model: &'m dyn SemanticModel,
    forced_abrupt: Vec<Span>,
}

impl<'m> Reachability<'m> {
    pub fn new(model: &'m dyn SemanticModel) -> Self {
        Reachability { model, forced_abrupt: Vec::new() }
    }

    /// Treat the statement with exactly this span as never completing.
    pub fn with_abrupt(mut self, span: Span) -> Self {
        self.forced_abrupt.push(span);
        self
    }

    pub fn can_complete_normally(&self, stmt: &Stmt) -> bool {
        Visitor { reach: self, breaks: HashSet::new(), continues: HashSet::new(), targets: Vec::new() }.stmt(stmt)
    }

    /// A statement sequence completes if its last statement does; an empty
    /// one always does.
    pub fn can_complete_normally_all(&self, stmts: &[Stmt]) -> bool {
        let mut visitor = Visitor { reach: self, breaks: HashSet::new(), continues: HashSet::new(), targets: Vec::new() };
        visitor.stmts(stmts)
    }
}

#[derive(Debug)]
struct Target {
    span: Span,
    label: Option<String>,
    /// Loops and switches take unlabeled `break`; only loops take
    /// unlabeled `continue`.
    breakable: bool,
    is_loop: bool,
}

struct Visitor<'r, 'm> {
    reach: &'r Reachability<'m>,
    breaks: HashSet<Span>,
    continues: HashSet<Span>,
    targets: Vec<Target>,
}

impl<'r, 'm> Visitor<'r, 'm> {
    fn stmts(&mut self, stmts: &[Stmt]) -> bool {
        let mut completes = true;
        for stmt in stmts {
            completes = self.stmt(stmt);
        }
        completes
    }

    fn stmt(&mut self, stmt: &Stmt) -> bool {
        if self.reach.forced_abrupt.contains(&stmt.span()) {
            return false;
        }
        match stmt {
            Stmt::Block(b) => self.stmts(&b.stmts),
            Stmt::Expr(e) => !is_system_exit(&e.expr),
            Stmt::LocalVar(_) | Stmt::LocalClass(_) | Stmt::Empty(_) | Stmt::Other(_) => true,
            Stmt::Return(_) | Stmt::Throw(_) | Stmt::Yield(_) => false,
            Stmt::Break(jump) => {
                if let Some(target) = self.resolve(jump.label.as_deref(), false) {
                    self.breaks.insert(target);
                }
                false
            }
            Stmt::Continue(jump) => {
                if let Some(target) = self.resolve(jump.label.as_deref(), true) {
                    self.continues.insert(target);
                }
                false
            }
            Stmt::If(s) => {
                let then = self.stmt(&s.then);
                let otherwise = s.otherwise.as_ref().map(|e| self.stmt(e)).unwrap_or(true);
                then || otherwise
            }
            Stmt::Labeled(l) => {
                self.targets.push(Target {
                    span: l.body.span(),
                    label: Some(l.label.clone()),
                    breakable: false,
                    is_loop: false,
                });
                let completes = self.stmt(&l.body);
                self.targets.pop();
                completes || self.breaks.contains(&l.body.span())
            }
            Stmt::Loop(l) => self.loop_stmt(l),
            Stmt::Switch(s) => self.switch(s),
            Stmt::Synchronized(s) => self.stmts(&s.body.stmts),
            Stmt::Try(t) => {
                let mut completes = self.stmts(&t.body.stmts);
                for c in &t.catches {
                    completes |= self.stmts(&c.body.stmts);
                }
                if let Some(f) = &t.finally {
                    if !self.stmts(&f.stmts) {
                        completes = false;
                    }
                }
                completes
            }
        }
    }

    fn loop_stmt(&mut self, l: &LoopStmt) -> bool {
        let cond = l.condition.as_ref().and_then(|c| self.reach.model.constant_value(c));
        self.targets.push(Target { span: l.span, label: None, breakable: true, is_loop: true });
        let body_completes = if cond == Some(ConstValue::Bool(false)) { true } else { self.stmt(&l.body) };
        self.targets.pop();

        let always_true = match l.kind {
            LoopKind::ForEach => return true,
            // `for (;;)` has no condition and never exits on its own
            LoopKind::For => l.condition.is_none() || cond == Some(ConstValue::Bool(true)),
            LoopKind::While | LoopKind::DoWhile => cond == Some(ConstValue::Bool(true)),
        };
        let broken = self.breaks.contains(&l.span);
        match l.kind {
            LoopKind::DoWhile => {
                ((body_completes || self.continues.contains(&l.span)) && !always_true) || broken
            }
            _ => !always_true || broken,
        }
    }

    fn switch(&mut self, s: &SwitchNode) -> bool {
        self.targets.push(Target { span: s.span, label: None, breakable: true, is_loop: false });
        let result = if s.is_rule_switch() {
            let mut any_completes = false;
            for case in &s.cases {
                let completes = match case.rule_body() {
                    Some(Stmt::Block(b)) => self.stmts(&b.stmts),
                    Some(Stmt::Throw(_)) => false,
                    _ => true,
                };
                any_completes |= completes;
            }
            any_completes || !is_exhaustive_switch(s)
        } else if s.cases.iter().all(|c| c.body.is_empty()) {
            true
        } else {
            let mut last_completes = true;
            for case in &s.cases {
                last_completes = self.stmts(&case.body);
            }
            let trailing_label = s.cases.last().map(|c| c.body.is_empty()).unwrap_or(true);
            last_completes || trailing_label || !is_exhaustive_switch(s)
        };
        self.targets.pop();
        result || self.breaks.contains(&s.span)
    }

    fn resolve(&self, label: Option<&str>, is_continue: bool) -> Option<Span> {
        let found = match label {
            Some(name) => self.targets.iter().rev().find(|t| t.label.as_deref() == Some(name)),
            None if is_continue => self.targets.iter().rev().find(|t| t.is_loop),
            None => self.targets.iter().rev().find(|t| t.breakable),
        };
        found.map(|t| t.span)
    }
}

/// Enhanced switches (patterns or `case null`) are exhaustive by
/// construction; old-style ones only with a `default`.
pub fn is_exhaustive_switch(s: &SwitchNode) -> bool {
    s.cases.iter().any(|c| c.has_default() || c.has_pattern() || c.has_null())
}

fn is_system_exit(expr: &Expr) -> bool {
    match expr {
        Expr::Call(call) if call.name == "exit" => {
            matches!(call.receiver.as_deref(), Some(Expr::Name(n)) if n.name == "System")
        }
        _ => false,
    }
}

/// Any `break` or `yield` anywhere in the tree.
pub fn has_break_or_yield(stmt: &Stmt) -> bool {
    any_node(Node::Stmt(stmt), &mut |n| matches!(n, Node::Stmt(Stmt::Break(_) | Stmt::Yield(_))))
}

/// `break`/`continue` statements in `stmt` whose target lies outside it.
/// Jumps inside lambda bodies and switch expressions are not considered.
/// An unlabeled `break` directly in a switch targets that switch.
pub fn escaping_jumps(stmt: &Stmt) -> Vec<Span> {
    let mut out = Vec::new();
    collect_jumps_at(stmt, &mut Vec::new(), &mut out, false, false);
    out
}

fn collect_jumps_at(stmt: &Stmt, labels: &mut Vec<String>, out: &mut Vec<Span>, breakable: bool, in_loop: bool) {
    match stmt {
        Stmt::Break(j) => {
            let escapes = match &j.label {
                Some(l) => !labels.contains(l),
                None => !breakable,
            };
            if escapes {
                out.push(j.span);
            }
        }
        Stmt::Continue(j) => {
            let escapes = match &j.label {
                Some(l) => !labels.contains(l),
                None => !in_loop,
            };
            if escapes {
                out.push(j.span);
            }
        }
        Stmt::Labeled(l) => {
            labels.push(l.label.clone());
            collect_jumps_at(&l.body, labels, out, breakable, in_loop);
            labels.pop();
        }
        Stmt::Loop(l) => collect_jumps_at(&l.body, labels, out, true, true),
        Stmt::Switch(s) => {
            for case in &s.cases {
                for body in &case.body {
                    collect_jumps_at(body, labels, out, true, in_loop);
                }
            }
        }
        other => {
            for child in Node::Stmt(other).children() {
                if let Node::Stmt(s) = child {
                    collect_jumps_at(s, labels, out, breakable, in_loop);
                }
            }
        }
    }
}

/// Deletions of code made unreachable once the construct at `construct`
/// (the statement at the innermost frame's index) stops completing
/// normally. `pulled` statements directly after the construct are already
/// consumed by the rewrite and are skipped at the innermost block.
pub fn dead_code_after(
    source: &str,
    model: &dyn SemanticModel,
    scope: &Scope<'_, '_>,
    construct: Span,
    pulled: usize,
) -> Vec<TextEdit> {
    let mut reach = Reachability::new(model).with_abrupt(construct);
    let mut edits = Vec::new();
    let mut pulled = pulled;
    for frame in scope.frames.iter().rev() {
        match frame {
            Frame::Block { stmts, index, span, braced: true } => {
                let Some(current) = stmts.get(*index) else {
                    break;
                };
                if reach.can_complete_normally(current) {
                    break;
                }
                let last_kept = (*index + pulled).min(stmts.len() - 1);
                edits.extend(delete_following(source, stmts, last_kept, *span));
                pulled = 0;
                reach = reach.with_abrupt(*span);
            }
            Frame::Block { braced: false, .. } => break,
            Frame::Stmt(_) => continue,
            Frame::Switch(_) | Frame::SwitchExpr(_) | Frame::Body(_) => break,
        }
    }
    if !edits.is_empty() {
        tracing::trace!(construct = ?construct, regions = edits.len(), "deleting unreachable code");
    }
    edits
}

fn delete_following(source: &str, stmts: &[Stmt], last_kept: usize, block: Span) -> Vec<TextEdit> {
    if last_kept + 1 >= stmts.len() {
        return Vec::new();
    }
    let start = stmts[last_kept].span().end;
    let close = block.end.saturating_sub(1);
    let region = Span::new(start, close);
    if has_lint_marker(region.text(source)) {
        return stmts[last_kept + 1..].iter().map(|s| delete_statement(source, s.span())).collect();
    }
    let end = region.text(source).rfind('\n').map(|i| start + i).unwrap_or(close);
    if end <= start {
        return Vec::new();
    }
    vec![TextEdit::delete(Span::new(start, end))]
}

/// Delete one statement and, when it sits on its own line, that line.
pub fn delete_statement(source: &str, span: Span) -> TextEdit {
    let rest = &source[span.end.min(source.len())..];
    let to_eol = rest.find('\n').unwrap_or(rest.len());
    if is_first_on_line(source, span.start) && rest[..to_eol].trim().is_empty() {
        let start = line_start(source, span.start);
        let end = (span.end + to_eol + 1).min(source.len());
        return TextEdit::delete(Span::new(start, end));
    }
    TextEdit::delete(span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_string, ParsedFile};

    fn parse(body: &str) -> ParsedFile {
        let src = format!("class A {{ int f(int x, Object o) {{ {} }} }}", body);
        parse_string(src, "A.java".to_string()).expect("Should parse")
    }

    fn body(parsed: &ParsedFile) -> &[Stmt] {
        &parsed.unit.types[0].methods[0].body.as_ref().expect("Should have body").stmts
    }

    #[test]
    fn test_if_else_both_return() {
        let parsed = parse("if (x == 1) { return 1; } else { return 2; }");
        let reach = Reachability::new(&parsed.model);
        assert!(!reach.can_complete_normally(&body(&parsed)[0]));
    }

    #[test]
    fn test_if_without_else_completes() {
        let parsed = parse("if (x == 1) { return 1; }");
        let reach = Reachability::new(&parsed.model);
        assert!(reach.can_complete_normally(&body(&parsed)[0]));
        assert!(reach.can_complete_normally_all(body(&parsed)));
    }

    #[test]
    fn test_infinite_loop_with_break() {
        let parsed = parse("while (true) { if (x > 0) break; } for (;;) { x++; }");
        let reach = Reachability::new(&parsed.model);
        assert!(reach.can_complete_normally(&body(&parsed)[0]));
        assert!(!reach.can_complete_normally(&body(&parsed)[1]));
    }

    #[test]
    fn test_old_switch_with_default() {
        let parsed = parse("switch (x) { case 1: return 1; default: throw new RuntimeException(); }");
        let reach = Reachability::new(&parsed.model);
        assert!(!reach.can_complete_normally(&body(&parsed)[0]));

        let parsed = parse("switch (x) { case 1: return 1; case 2: return 2; }");
        let reach = Reachability::new(&parsed.model);
        assert!(reach.can_complete_normally(&body(&parsed)[0]));
    }

    #[test]
    fn test_try_finally_and_system_exit() {
        let parsed = parse("try { return 1; } finally { x++; } System.exit(1);");
        let reach = Reachability::new(&parsed.model);
        assert!(!reach.can_complete_normally(&body(&parsed)[0]));
        assert!(!reach.can_complete_normally(&body(&parsed)[1]));
    }

    #[test]
    fn test_forced_abrupt() {
        let parsed = parse("if (x == 1) { return 1; } return 0;");
        let stmts = body(&parsed);
        let reach = Reachability::new(&parsed.model).with_abrupt(stmts[0].span());
        assert!(!reach.can_complete_normally(&stmts[0]));
        assert!(!reach.can_complete_normally_all(&stmts[..1]));
    }

    #[test]
    fn test_escaping_jumps() {
        let parsed = parse("for (;;) { switch (x) { case 1: break; case 2: continue; default: for (;;) { break; } } }");
        let Stmt::Loop(l) = &body(&parsed)[0] else { panic!("expected loop") };
        let Stmt::Block(b) = l.body.as_ref() else { panic!("expected block") };
        let escaping = escaping_jumps(&b.stmts[0]);
        assert_eq!(escaping.len(), 1);
        assert_eq!(escaping[0].text(&parsed.source), "continue;");
    }

    #[test]
    fn test_has_break_or_yield() {
        let parsed = parse("if (x == 1) { for (;;) { break; } } if (x == 2) { return 1; }");
        assert!(has_break_or_yield(&body(&parsed)[0]));
        assert!(!has_break_or_yield(&body(&parsed)[1]));
    }
}
