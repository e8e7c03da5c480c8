//! The rewrite engine
//!
//! A [`Scanner`] walks every method body, initializer and lambda of a
//! parsed file, keeping a stack of enclosing [`Frame`]s, and offers each
//! `if` and `switch` to the enabled rules:
//!
//! - [`if_chain`]: `if`/`else if` chains over one subject to a switch
//! - [`statement_switch`]: colon-style switch statements to arrow form
//! - [`arrow_switch`]: arrow switches to return/assignment form, simplified
//!
//! The shared analysis lives in [`subject`], [`branch`], [`domination`] and
//! [`reachability`]; rules build a [`plan::RewritePlan`] that [`emit`]
//! renders into text edits.

pub mod arrow_switch;
pub mod branch;
pub mod domination;
pub mod emit;
pub mod if_chain;
pub mod plan;
pub mod reachability;
pub mod statement_switch;
pub mod subject;

use crate::config::{RefactorConfig, Rule};
use crate::edit::{Finding, Fix};
use crate::error::{RefactorError, RefactorResult};
use crate::parser::ParsedFile;
use crate::semantics::SemanticModel;
use crate::source_utils::detect_indent_unit;
use crate::tree::*;

/// Everything a rule may consult about the file under analysis.
pub struct Context<'a> {
    pub source: &'a str,
    pub file: &'a str,
    pub unit: &'a CompilationUnit,
    pub model: &'a dyn SemanticModel,
    pub config: &'a RefactorConfig,
    /// One level of indentation as used by the file.
    pub indent_unit: String,
}

impl<'a> Context<'a> {
    pub fn new(parsed: &'a ParsedFile, config: &'a RefactorConfig) -> Self {
        Context {
            source: &parsed.source,
            file: &parsed.file_path,
            unit: &parsed.unit,
            model: &parsed.model,
            config,
            indent_unit: detect_indent_unit(&parsed.source),
        }
    }

    pub fn comments(&self) -> &'a [Comment] {
        &self.unit.comments
    }
}

/// One enclosing construct of the statement being analyzed.
#[derive(Debug, Clone, Copy)]
pub enum Frame<'a> {
    /// A statement list and the position of the current statement in it.
    /// Colon-case bodies are unbraced lists.
    Block { stmts: &'a [Stmt], index: usize, span: Span, braced: bool },
    /// A compound statement the current one is nested in.
    Stmt(&'a Stmt),
    Switch(&'a SwitchNode),
    SwitchExpr(&'a SwitchNode),
    /// Method, initializer or lambda body.
    Body(Span),
}

/// The frames around a statement, outermost first.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'f, 'a> {
    pub frames: &'f [Frame<'a>],
}

impl<'f, 'a> Scope<'f, 'a> {
    pub fn new(frames: &'f [Frame<'a>]) -> Self {
        Scope { frames }
    }

    fn innermost_block(&self) -> Option<(&'a [Stmt], usize)> {
        match self.frames.last() {
            Some(Frame::Block { stmts, index, .. }) => Some((stmts, *index)),
            _ => None,
        }
    }

    /// Statements after the current one in the same list.
    pub fn following(&self) -> &'a [Stmt] {
        match self.innermost_block() {
            Some((stmts, index)) => stmts.get(index + 1..).unwrap_or(&[]),
            None => &[],
        }
    }

    /// Statements before the current one in the same list.
    pub fn preceding(&self) -> &'a [Stmt] {
        match self.innermost_block() {
            Some((stmts, index)) => &stmts[..index.min(stmts.len())],
            None => &[],
        }
    }

    pub fn inside_if(&self) -> bool {
        self.frames.iter().any(|f| matches!(f, Frame::Stmt(Stmt::If(_))))
    }

    pub fn inside_switch_statement(&self) -> bool {
        self.frames.iter().any(|f| matches!(f, Frame::Switch(_)))
    }

    pub fn inside_switch(&self) -> bool {
        self.frames.iter().any(|f| matches!(f, Frame::Switch(_) | Frame::SwitchExpr(_)))
    }
}

/// Run every enabled rule over a parsed file.
pub fn run_rules(parsed: &ParsedFile, config: &RefactorConfig) -> Vec<Finding> {
    let ctx = Context::new(parsed, config);
    let mut scanner = Scanner { ctx: &ctx, frames: Vec::new(), findings: Vec::new() };
    for ty in &parsed.unit.types {
        scanner.type_decl(ty);
    }
    tracing::debug!(file = %parsed.file_path, findings = scanner.findings.len(), "scanned file");
    scanner.findings
}

fn message(rule: Rule) -> &'static str {
    match rule {
        Rule::IfChainToSwitch => "This if-chain may be converted into a switch",
        Rule::StatementSwitchToExpressionSwitch => {
            "This statement switch can be converted to an equivalent expression switch"
        }
        Rule::RefactorSwitch => "This switch can be refactored to be more readable",
    }
}

struct Scanner<'c, 'a> {
    ctx: &'c Context<'a>,
    frames: Vec<Frame<'a>>,
    findings: Vec<Finding>,
}

impl<'c, 'a> Scanner<'c, 'a> {
    fn type_decl(&mut self, ty: &'a TypeDecl) {
        // a class body starts a fresh context, even when declared inside a method
        let outer = std::mem::take(&mut self.frames);
        for constant in &ty.enum_constants {
            for arg in &constant.args {
                self.expr(arg);
            }
        }
        for field in &ty.fields {
            for init in field.declarators.iter().filter_map(|d| d.init.as_ref()) {
                self.frames.push(Frame::Body(field.span));
                self.expr(init);
                self.frames.pop();
            }
        }
        for init in &ty.initializers {
            self.body(init);
        }
        for method in &ty.methods {
            if let Some(body) = &method.body {
                self.body(body);
            }
        }
        for nested in &ty.types {
            self.type_decl(nested);
        }
        self.frames = outer;
    }

    fn body(&mut self, block: &'a Block) {
        self.frames.push(Frame::Body(block.span));
        self.stmts(&block.stmts, block.span, true);
        self.frames.pop();
    }

    fn stmts(&mut self, stmts: &'a [Stmt], span: Span, braced: bool) {
        for (index, stmt) in stmts.iter().enumerate() {
            self.frames.push(Frame::Block { stmts, index, span, braced });
            self.stmt(stmt);
            self.frames.pop();
        }
    }

    fn stmt(&mut self, stmt: &'a Stmt) {
        match stmt {
            Stmt::Block(b) => self.stmts(&b.stmts, b.span, true),
            Stmt::If(s) => {
                self.check(Rule::IfChainToSwitch, s.span, |ctx, scope| if_chain::check(ctx, stmt, s, scope));
                self.frames.push(Frame::Stmt(stmt));
                self.expr(&s.condition);
                self.stmt(&s.then);
                if let Some(otherwise) = &s.otherwise {
                    self.stmt(otherwise);
                }
                self.frames.pop();
            }
            Stmt::Switch(s) => {
                if s.is_rule_switch() {
                    self.check(Rule::RefactorSwitch, s.span, |ctx, scope| arrow_switch::check_statement(ctx, stmt, s, scope));
                } else {
                    self.check(Rule::StatementSwitchToExpressionSwitch, s.span, |ctx, scope| {
                        statement_switch::check(ctx, stmt, s, scope)
                    });
                }
                self.expr(&s.selector);
                self.frames.push(Frame::Switch(s));
                self.cases(s);
                self.frames.pop();
            }
            Stmt::Loop(l) => {
                self.frames.push(Frame::Stmt(stmt));
                for d in &l.decls {
                    for init in d.declarators.iter().filter_map(|d| d.init.as_ref()) {
                        self.expr(init);
                    }
                }
                for e in l.condition.iter().chain(&l.other_exprs) {
                    self.expr(e);
                }
                self.stmt(&l.body);
                self.frames.pop();
            }
            Stmt::Labeled(l) => {
                self.frames.push(Frame::Stmt(stmt));
                self.stmt(&l.body);
                self.frames.pop();
            }
            Stmt::Try(t) => {
                self.frames.push(Frame::Stmt(stmt));
                for r in &t.resources {
                    for init in r.declarators.iter().filter_map(|d| d.init.as_ref()) {
                        self.expr(init);
                    }
                }
                self.stmts(&t.body.stmts, t.body.span, true);
                for c in &t.catches {
                    self.stmts(&c.body.stmts, c.body.span, true);
                }
                if let Some(f) = &t.finally {
                    self.stmts(&f.stmts, f.span, true);
                }
                self.frames.pop();
            }
            Stmt::Synchronized(s) => {
                self.frames.push(Frame::Stmt(stmt));
                self.expr(&s.lock);
                self.stmts(&s.body.stmts, s.body.span, true);
                self.frames.pop();
            }
            Stmt::Expr(_) | Stmt::LocalVar(_) | Stmt::Return(_) | Stmt::Throw(_) | Stmt::Yield(_) => {
                for child in Node::Stmt(stmt).children() {
                    if let Node::Expr(e) = child {
                        self.expr(e);
                    }
                }
            }
            Stmt::LocalClass(decl) => self.type_decl(decl),
            Stmt::Break(_) | Stmt::Continue(_) | Stmt::Empty(_) | Stmt::Other(_) => {}
        }
    }

    fn cases(&mut self, s: &'a SwitchNode) {
        for case in &s.cases {
            if let Some(guard) = &case.guard {
                self.expr(guard);
            }
            match case.kind {
                CaseKind::Statement => self.stmts(&case.body, case.span, false),
                CaseKind::Rule => {
                    for body in &case.body {
                        self.stmt(body);
                    }
                }
            }
        }
    }

    fn expr(&mut self, expr: &'a Expr) {
        match expr {
            Expr::Lambda(l) => {
                self.frames.push(Frame::Body(l.span));
                match &l.body {
                    LambdaBody::Expr(e) => self.expr(e),
                    LambdaBody::Block(b) => self.stmts(&b.stmts, b.span, true),
                }
                self.frames.pop();
            }
            Expr::Switch(s) => {
                self.check(Rule::RefactorSwitch, s.span, |ctx, scope| arrow_switch::check_expression(ctx, s, scope));
                self.expr(&s.selector);
                self.frames.push(Frame::SwitchExpr(s));
                self.cases(s);
                self.frames.pop();
            }
            Expr::New(n) => {
                for arg in &n.args {
                    self.expr(arg);
                }
                if let Some(body) = &n.body {
                    self.type_decl(body);
                }
            }
            other => {
                for child in Node::Expr(other).children() {
                    if let Node::Expr(e) = child {
                        self.expr(e);
                    }
                }
            }
        }
    }

    /// Run one rule at one construct and record the outcome.
    fn check<F>(&mut self, rule: Rule, span: Span, run: F)
    where
        F: FnOnce(&Context<'a>, &Scope<'_, 'a>) -> RefactorResult<Vec<Fix>>,
    {
        if !self.ctx.config.is_enabled(rule) {
            return;
        }
        if self.ctx.model.is_suppressed(span, &rule.to_string()) {
            tracing::debug!(%rule, start = span.start, "suppressed");
            return;
        }
        let scope = Scope::new(&self.frames);
        match run(self.ctx, &scope) {
            Ok(fixes) if !fixes.is_empty() => {
                tracing::debug!(%rule, start = span.start, fixes = fixes.len(), "finding");
                self.findings.push(Finding {
                    rule,
                    file: self.ctx.file.to_string(),
                    span,
                    message: message(rule).to_string(),
                    fixes,
                });
            }
            Ok(_) => {}
            Err(RefactorError::InvariantViolation { span: at, message }) => {
                tracing::warn!(%rule, file = self.ctx.file, start = at.start, %message, "skipping construct");
            }
            Err(err) => {
                tracing::debug!(%rule, start = span.start, reason = %err, "not rewritten");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_string;

    fn parse(src: &str) -> ParsedFile {
        parse_string(src.to_string(), "A.java".to_string()).expect("Should parse")
    }

    #[test]
    fn test_scope_neighbours() {
        let parsed = parse("class A { void m() { int a = 1; int b = 2; int c = 3; } }");
        let body = parsed.unit.types[0].methods[0].body.as_ref().expect("Should have body");
        let frames = [Frame::Body(body.span), Frame::Block { stmts: &body.stmts, index: 1, span: body.span, braced: true }];
        let scope = Scope::new(&frames);
        assert_eq!(scope.preceding().len(), 1);
        assert_eq!(scope.following().len(), 1);
        assert!(!scope.inside_if());
        assert!(!scope.inside_switch());
    }

    #[test]
    fn test_disabled_rules_find_nothing() {
        let parsed = parse(
            "class A { void m(int i) { if (i == 1) { a(); } else if (i == 2) { b(); } else if (i == 3) { c(); } } }",
        );
        assert!(run_rules(&parsed, &RefactorConfig::default()).is_empty());
    }

    #[test]
    fn test_suppressed_rule_is_skipped() {
        let parsed = parse(
            "class A { @SuppressWarnings(\"IfChainToSwitch\") void m(int i) { if (i == 1) { a(); } else if (i == 2) { b(); } else if (i == 3) { c(); } } }",
        );
        let mut config = RefactorConfig::default();
        config.if_chain.enable_main = true;
        assert!(run_rules(&parsed, &config).is_empty());
    }

    #[test]
    fn test_chain_inside_lambda_is_found() {
        let parsed = parse(
            "class A { Runnable r = () -> { if (i == 1) { a(); } else if (i == 2) { b(); } else if (i == 3) { c(); } }; int i; }",
        );
        let mut config = RefactorConfig::default();
        config.if_chain.enable_main = true;
        let findings = run_rules(&parsed, &config);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule, Rule::IfChainToSwitch);
        assert_eq!(findings[0].message, "This if-chain may be converted into a switch");
    }

    #[test]
    fn test_chains_inside_local_and_anonymous_classes_are_found() {
        let parsed = parse(
            "class A {\n\
             void m(boolean flag) {\n\
             class Local { void f(int i) { if (i == 1) { a(); } else if (i == 2) { b(); } else if (i == 3) { c(); } } }\n\
             if (flag) {\n\
             Runnable r = new Runnable() { public void run() { int i = 0; if (i == 1) { a(); } else if (i == 2) { b(); } else if (i == 3) { c(); } } };\n\
             }\n\
             }\n\
             }\n",
        );
        let mut config = RefactorConfig::default();
        config.if_chain.enable_main = true;
        let findings = run_rules(&parsed, &config);
        assert_eq!(findings.len(), 2);
        assert!(findings.iter().all(|f| f.rule == Rule::IfChainToSwitch));
        let lines: Vec<_> = findings
            .iter()
            .map(|f| parsed.source[..f.span.start].matches('\n').count() + 1)
            .collect();
        assert_eq!(lines, vec![3, 5]);
    }
}
