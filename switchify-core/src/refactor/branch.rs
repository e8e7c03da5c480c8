//! Branch extraction
//!
//! Walks `if (c1) b1 else if (c2) b2 ... else bN` top-down and decomposes
//! each condition into a [`Test`] against one common subject.

use crate::error::{reject, RejectReason, RefactorResult};
use crate::semantics::{JavaType, Primitive, Symbol};
use crate::tree::*;

use super::subject::Subject;
use super::Context;

/// What an arm tests.
#[derive(Debug, Clone)]
pub enum Test<'a> {
    /// `instanceof T [name]`.
    Type { ty: &'a TypeName, binding: Option<&'a Binding> },
    /// `== CONST` or `== Enum.VALUE`; the expression is the label.
    Equality(&'a Expr),
    Null,
    /// `else`, `default` or a pulled-up trailing statement.
    Unconditional,
}

impl<'a> Test<'a> {
    pub fn is_pattern(&self) -> bool {
        matches!(self, Test::Type { .. })
    }
}

/// One arm of a chain, possibly synthesized.
#[derive(Debug, Clone)]
pub struct Branch<'a> {
    pub test: Test<'a>,
    /// An unconditional arm that also takes `null` (`case null, default`).
    pub includes_null: bool,
    /// Residual condition after `&&`, printed as `when ...`.
    pub guard: Option<Span>,
    /// `None` for synthesized empty arms.
    pub body: Option<&'a Stmt>,
    /// Source owned by this arm, from the end of the previous body to the
    /// end of this one. Empty for synthesized arms.
    pub range: Span,
    /// Where the arm's own syntax starts inside `range`; comments before it
    /// lead the arm.
    pub test_start: usize,
    pub pulled_up: bool,
}

impl<'a> Branch<'a> {
    pub fn synthesized(test: Test<'a>, at: usize) -> Self {
        Branch {
            test,
            includes_null: false,
            guard: None,
            body: None,
            range: Span::at(at),
            test_start: at,
            pulled_up: false,
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self.test, Test::Unconditional)
    }

    pub fn has_null(&self) -> bool {
        matches!(self.test, Test::Null) || self.includes_null
    }
}

/// Result of walking one `if` chain.
#[derive(Debug)]
pub struct ExtractedChain<'a> {
    pub subject: Subject<'a>,
    pub subject_type: Option<JavaType>,
    pub branches: Vec<Branch<'a>>,
    /// Number of `if` links.
    pub depth: usize,
    pub has_else: bool,
    pub handled_enum_values: Vec<String>,
}

struct Decomposed<'a> {
    test: Test<'a>,
    guard: Option<Span>,
    subject: &'a Expr,
    enum_value: Option<String>,
}

pub fn extract_chain<'a>(ctx: &Context<'a>, root: &'a IfStmt, safe: bool) -> RefactorResult<ExtractedChain<'a>> {
    let max = ctx.config.if_chain.max_chain_length;
    let mut subject: Option<Subject<'a>> = None;
    let mut branches = Vec::new();
    let mut handled = Vec::new();
    let mut depth = 0;
    let mut has_else = false;
    let mut current = root;
    let mut range_start = root.span.start;

    loop {
        depth += 1;
        if depth > max {
            return reject(RejectReason::TooLong);
        }
        let decomposed = decompose(ctx, &current.condition, false)?;
        match &subject {
            None => subject = Some(Subject::new(decomposed.subject, ctx.model, ctx.source)),
            Some(s) => {
                if !s.matches(decomposed.subject, ctx.model, ctx.source, safe) {
                    return reject(RejectReason::SubjectMismatch);
                }
            }
        }
        if let Some(value) = decomposed.enum_value {
            handled.push(value);
        }
        let body_end = current.then.span().end;
        branches.push(Branch {
            test: decomposed.test,
            includes_null: false,
            guard: decomposed.guard,
            body: Some(current.then.as_ref()),
            range: Span::new(range_start, body_end),
            test_start: current.span.start,
            pulled_up: false,
        });
        range_start = body_end;

        match current.otherwise.as_deref() {
            None => break,
            Some(Stmt::If(next)) => current = next,
            Some(other) => {
                branches.push(Branch {
                    test: Test::Unconditional,
                    includes_null: false,
                    guard: None,
                    body: Some(other),
                    range: Span::new(range_start, other.span().end),
                    test_start: other.span().start,
                    pulled_up: false,
                });
                has_else = true;
                break;
            }
        }
    }

    if depth < 3 {
        return reject(RejectReason::TooShallow);
    }
    let subject = subject.ok_or_else(|| crate::error::RefactorError::invariant(root.span, "chain without subject"))?;
    let subject_type = ctx.model.type_of(subject.expr);
    tracing::trace!(depth, has_else, subject = subject.text(ctx.source), "extracted if chain");
    Ok(ExtractedChain { subject, subject_type, branches, depth, has_else, handled_enum_values: handled })
}

fn decompose<'a>(ctx: &Context<'a>, cond: &'a Expr, must_be_instanceof: bool) -> RefactorResult<Decomposed<'a>> {
    match cond.strip_parens() {
        Expr::InstanceOf(i) => match &i.target {
            InstanceOfTarget::Record(_) => reject(RejectReason::RecordPattern),
            InstanceOfTarget::Type { ty, binding } => Ok(Decomposed {
                test: Test::Type { ty, binding: binding.as_ref() },
                guard: None,
                subject: &i.operand,
                enum_value: None,
            }),
        },
        Expr::Binary(b) if b.op == "&&" => {
            let left = decompose(ctx, &b.left, true)?;
            if !left.test.is_pattern() {
                return reject(RejectReason::EqualityWithCondition);
            }
            let guard_start = left.guard.map(|g| g.start).unwrap_or_else(|| b.right.span().start);
            Ok(Decomposed { guard: Some(Span::new(guard_start, b.span.end)), ..left })
        }
        Expr::Binary(b) if b.op == "==" => {
            if must_be_instanceof {
                return reject(RejectReason::EqualityWithCondition);
            }
            if b.right.is_null_literal() {
                return Ok(Decomposed { test: Test::Null, guard: None, subject: &b.left, enum_value: None });
            }
            if b.left.is_null_literal() {
                return Ok(Decomposed { test: Test::Null, guard: None, subject: &b.right, enum_value: None });
            }
            let (subject, constant) = if ctx.model.constant_value(&b.right).is_some() {
                (&b.left, Some(&b.right))
            } else if ctx.model.constant_value(&b.left).is_some() {
                (&b.right, Some(&b.left))
            } else {
                (&b.left, None)
            };
            if let Some(constant) = constant {
                check_constant_domain(ctx, subject)?;
                return Ok(Decomposed { test: Test::Equality(constant), guard: None, subject, enum_value: None });
            }

            let left_enum = enum_constant_name(ctx, &b.left);
            let right_enum = enum_constant_name(ctx, &b.right);
            match (left_enum, right_enum) {
                (Some(name), None) => Ok(Decomposed {
                    test: Test::Equality(&b.left),
                    guard: None,
                    subject: &b.right,
                    enum_value: Some(name),
                }),
                (None, Some(name)) => Ok(Decomposed {
                    test: Test::Equality(&b.right),
                    guard: None,
                    subject: &b.left,
                    enum_value: Some(name),
                }),
                _ => reject(RejectReason::UnsupportedPredicate),
            }
        }
        _ => reject(RejectReason::UnsupportedPredicate),
    }
}

/// Constant labels need a `byte`, `short`, `char` or `int` subject,
/// possibly boxed.
fn check_constant_domain(ctx: &Context<'_>, subject: &Expr) -> RefactorResult<()> {
    let Some(ty) = ctx.model.type_of(subject) else {
        return reject(RejectReason::UnknownSubjectType);
    };
    match ty.unboxed() {
        Some(Primitive::Byte | Primitive::Short | Primitive::Char | Primitive::Int) => Ok(()),
        _ => reject(RejectReason::UnsupportedDomain),
    }
}

fn enum_constant_name(ctx: &Context<'_>, expr: &Expr) -> Option<String> {
    match ctx.model.symbol_of(expr)? {
        Symbol::EnumConstant { name, .. } => Some(name),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RefactorConfig;
    use crate::parser::{parse_string, ParsedFile};

    fn parse(src: &str) -> ParsedFile {
        parse_string(src.to_string(), "A.java".to_string()).expect("Should parse")
    }

    fn first_if(parsed: &ParsedFile) -> &IfStmt {
        let body = parsed.unit.types[0].methods[0].body.as_ref().expect("Should have body");
        body.stmts
            .iter()
            .find_map(|s| match s {
                Stmt::If(i) => Some(i),
                _ => None,
            })
            .expect("Should have if")
    }

    fn extract<'a>(parsed: &'a ParsedFile, config: &'a RefactorConfig) -> RefactorResult<ExtractedChain<'a>> {
        let ctx = Context::new(parsed, config);
        extract_chain(&ctx, first_if(parsed), false)
    }

    #[test]
    fn test_enum_chain() {
        let parsed = parse(
            "class A { enum C { R, G, B } void m(C c) { if (c == C.R) { a(); } else if (c == C.G) { b(); } else if (C.B == c) { d(); } else { e(); } } }",
        );
        let config = RefactorConfig::all_enabled();
        let chain = extract(&parsed, &config).expect("Should extract");
        assert_eq!(chain.depth, 3);
        assert!(chain.has_else);
        assert_eq!(chain.branches.len(), 4);
        assert_eq!(chain.handled_enum_values, vec!["R", "G", "B"]);
        assert!(matches!(chain.branches[3].test, Test::Unconditional));
    }

    #[test]
    fn test_pattern_with_guard() {
        let parsed = parse(
            "class A { void m(Object o) { if (o instanceof String s && s.isEmpty() && s != null) { a(); } else if (o instanceof Integer) { b(); } else if (o == null) { c(); } } }",
        );
        let config = RefactorConfig::all_enabled();
        let chain = extract(&parsed, &config).expect("Should extract");
        let guard = chain.branches[0].guard.expect("Should have guard");
        assert_eq!(guard.text(&parsed.source), "s.isEmpty() && s != null");
        assert!(matches!(chain.branches[2].test, Test::Null));
        assert!(!chain.has_else);
    }

    #[test]
    fn test_rejections() {
        let config = RefactorConfig::all_enabled();
        let shallow = parse("class A { void m(int i) { if (i == 1) { a(); } else if (i == 2) { b(); } else { c(); } } }");
        assert_eq!(extract(&shallow, &config).unwrap_err().reason(), Some(RejectReason::TooShallow));

        let long = parse("class A { void m(long i) { if (i == 1) { a(); } else if (i == 2) { b(); } else if (i == 3) { c(); } } }");
        assert_eq!(extract(&long, &config).unwrap_err().reason(), Some(RejectReason::UnsupportedDomain));

        let mixed = parse(
            "class A { void m(int i, int j) { if (i == 1) { a(); } else if (j == 2) { b(); } else if (i == 3) { c(); } } }",
        );
        assert_eq!(extract(&mixed, &config).unwrap_err().reason(), Some(RejectReason::SubjectMismatch));

        let compound = parse(
            "class A { void m(int i) { if (i == 1 && i > 0) { a(); } else if (i == 2) { b(); } else if (i == 3) { c(); } } }",
        );
        assert_eq!(extract(&compound, &config).unwrap_err().reason(), Some(RejectReason::EqualityWithCondition));
    }

    #[test]
    fn test_max_chain_length() {
        let mut config = RefactorConfig::all_enabled();
        config.if_chain.max_chain_length = 2;
        let parsed = parse("class A { void m(int i) { if (i == 1) { a(); } else if (i == 2) { b(); } else if (i == 3) { c(); } } }");
        assert_eq!(extract(&parsed, &config).unwrap_err().reason(), Some(RejectReason::TooLong));
    }
}
