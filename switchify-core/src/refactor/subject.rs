//! Subject identity
//!
//! Two tests belong to one chain only if they read the same value. A
//! [`SubjectKey`] is the resolved access path of the expression when every
//! step resolves to a variable, and its comment- and whitespace-free token
//! text otherwise.

use crate::semantics::{SemanticModel, Symbol};
use crate::source_utils::strip_trivia;
use crate::tree::{any_node, Expr, Node};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubjectKey {
    /// `a.b.c` as resolved symbols; `this.` and type qualifiers dropped.
    Path(Vec<Symbol>),
    Text(String),
}

impl SubjectKey {
    pub fn of(expr: &Expr, model: &dyn SemanticModel, source: &str) -> SubjectKey {
        match symbol_path(expr, model) {
            Some(path) => SubjectKey::Path(path),
            None => SubjectKey::Text(strip_trivia(expr.strip_parens().span().text(source))),
        }
    }
}

fn symbol_path(expr: &Expr, model: &dyn SemanticModel) -> Option<Vec<Symbol>> {
    let expr = expr.strip_parens();
    match expr {
        Expr::Name(_) => {
            let symbol = model.symbol_of(expr)?;
            symbol.is_variable().then(|| vec![symbol])
        }
        Expr::Field(access) => {
            let symbol = model.symbol_of(expr)?;
            if !symbol.is_variable() {
                return None;
            }
            let object = access.object.strip_parens();
            if matches!(object, Expr::This(_)) || matches!(model.symbol_of(object), Some(Symbol::Type(_))) {
                return Some(vec![symbol]);
            }
            let mut path = symbol_path(object, model)?;
            path.push(symbol);
            Some(path)
        }
        _ => None,
    }
}

/// No calls, assignments, increments, instance creation or unknown
/// constructs anywhere in the expression.
pub fn is_side_effect_free(expr: &Expr) -> bool {
    !any_node(Node::Expr(expr), &mut |node| match node {
        Node::Expr(e) => match e {
            Expr::Call(_) | Expr::Assign(_) | Expr::New(_) | Expr::Switch(_) | Expr::Other(_) => true,
            Expr::Unary(u) => u.op == "++" || u.op == "--",
            _ => false,
        },
        Node::Stmt(_) => true,
    })
}

/// The expression a chain dispatches on.
#[derive(Debug, Clone)]
pub struct Subject<'a> {
    pub expr: &'a Expr,
    pub key: SubjectKey,
}

impl<'a> Subject<'a> {
    pub fn new(expr: &'a Expr, model: &dyn SemanticModel, source: &str) -> Self {
        Subject { expr, key: SubjectKey::of(expr, model, source) }
    }

    /// Whether `other` reads the same value. Resolved paths decide when
    /// both sides have one; otherwise token text must agree, and in safe
    /// mode only for side-effect-free expressions.
    pub fn matches(&self, other: &Expr, model: &dyn SemanticModel, source: &str, safe: bool) -> bool {
        let key = SubjectKey::of(other, model, source);
        match (&self.key, &key) {
            (SubjectKey::Path(a), SubjectKey::Path(b)) => a == b,
            _ => {
                let same_text = strip_trivia(self.expr.strip_parens().span().text(source))
                    == strip_trivia(other.strip_parens().span().text(source));
                same_text && (!safe || (is_side_effect_free(self.expr) && is_side_effect_free(other)))
            }
        }
    }

    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        self.expr.strip_parens().span().text(source)
    }
}
