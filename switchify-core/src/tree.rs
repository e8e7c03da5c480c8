//! Typed Java syntax tree
//!
//! An owned, read-only tree lowered from tree-sitter-java by
//! [`crate::parser::lower`]. Every node carries a byte [`Span`] into the
//! original source; node text is always recovered from the source so that
//! rewrites can splice original code verbatim.
//!
//! The tree only models what the rewrite rules look at. Anything else is
//! kept as [`Stmt::Other`] / [`Expr::Other`] with its span (and, for
//! expressions, its sub-expressions so reads can still be found).

use serde::Serialize;

/// Half-open byte range `[start, end)` into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    /// Empty span at a single offset (an insertion point).
    pub fn at(offset: usize) -> Self {
        Span { start: offset, end: offset }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Source text covered by this span, or `""` if out of range.
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        source.get(self.start..self.end).unwrap_or("")
    }

    pub fn contains(&self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Closed-interval intersection: spans that merely touch are connected.
    pub fn is_connected(&self, other: Span) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Strict overlap: at least one byte in common.
    pub fn overlaps(&self, other: Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn union(&self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    Line,
    Block,
}

/// A comment token. Comments are opaque: they are moved, never reformatted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub span: Span,
    pub kind: CommentKind,
    pub text: String,
}

/// One parsed `.java` file.
#[derive(Debug, Clone, Default)]
pub struct CompilationUnit {
    pub types: Vec<TypeDecl>,
    pub comments: Vec<Comment>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
    Record,
}

#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub kind: TypeKind,
    pub name: String,
    pub span: Span,
    pub modifiers: Modifiers,
    pub type_params: usize,
    pub superclass: Option<TypeName>,
    pub interfaces: Vec<TypeName>,
    pub enum_constants: Vec<EnumConstant>,
    pub record_components: Vec<Param>,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<MethodDecl>,
    pub initializers: Vec<Block>,
    pub types: Vec<TypeDecl>,
}

impl TypeDecl {
    /// A declaration with no members yet.
    pub fn new(kind: TypeKind, name: String, span: Span) -> Self {
        TypeDecl {
            kind,
            name,
            span,
            modifiers: Modifiers::default(),
            type_params: 0,
            superclass: None,
            interfaces: Vec::new(),
            enum_constants: Vec::new(),
            record_components: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            initializers: Vec::new(),
            types: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnumConstant {
    pub name: String,
    pub span: Span,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub modifiers: Modifiers,
    pub ty: TypeName,
    pub declarators: Vec<Declarator>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Declarator {
    pub name: String,
    pub name_span: Span,
    /// Brackets written after the name, as in `int x[]`.
    pub array_dims: usize,
    pub init: Option<Expr>,
    pub span: Span,
}

impl Declarator {
    /// The declaration's type with this declarator's own dimensions added.
    pub fn declared_type(&self, ty: &TypeName) -> TypeName {
        TypeName { array_dims: ty.array_dims + self.array_dims, ..ty.clone() }
    }
}

#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub name: String,
    pub modifiers: Modifiers,
    /// `None` for constructors.
    pub return_type: Option<TypeName>,
    pub params: Vec<Param>,
    pub body: Option<Block>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub modifiers: Modifiers,
    pub ty: TypeName,
    pub name: String,
    pub name_span: Span,
    pub span: Span,
}

#[derive(Debug, Clone, Default)]
pub struct Modifiers {
    /// Keyword modifiers in source order (`public`, `final`, `volatile`, ...).
    pub keywords: Vec<String>,
    pub annotations: Vec<Annotation>,
    pub span: Option<Span>,
}

impl Modifiers {
    pub fn has(&self, keyword: &str) -> bool {
        self.keywords.iter().any(|k| k == keyword)
    }
}

#[derive(Debug, Clone)]
pub struct Annotation {
    /// Simple name, e.g. `SuppressWarnings`.
    pub name: String,
    /// String literal arguments with quotes removed.
    pub string_values: Vec<String>,
    pub span: Span,
}

/// A written type. Only the outermost name and the number of type
/// arguments matter to the rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeName {
    /// Simple name of the (possibly qualified) type; `int`, `var`, `String`.
    pub name: String,
    /// `None` when no `<...>` is written; `Some(0)` for the diamond.
    pub type_args: Option<usize>,
    pub array_dims: usize,
    pub span: Span,
}

impl TypeName {
    pub fn is_var(&self) -> bool {
        self.name == "var" && self.array_dims == 0
    }
}

#[derive(Debug, Clone)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Block(Block),
    If(IfStmt),
    Switch(SwitchNode),
    Expr(ExprStmt),
    LocalVar(LocalVarDecl),
    Return(ReturnStmt),
    Throw(ThrowStmt),
    Break(JumpStmt),
    Continue(JumpStmt),
    Yield(YieldStmt),
    Loop(LoopStmt),
    Labeled(LabeledStmt),
    Try(TryStmt),
    Synchronized(SyncStmt),
    Empty(Span),
    /// A class, interface, enum or record declared inside a block.
    LocalClass(Box<TypeDecl>),
    /// Asserts and anything else not modelled.
    Other(Span),
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    /// The parenthesized condition as written.
    pub condition: Expr,
    pub then: Box<Stmt>,
    pub otherwise: Option<Box<Stmt>>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ExprStmt {
    pub expr: Expr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct LocalVarDecl {
    pub modifiers: Modifiers,
    pub ty: TypeName,
    pub declarators: Vec<Declarator>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ThrowStmt {
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct JumpStmt {
    pub label: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct YieldStmt {
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopKind {
    While,
    DoWhile,
    For,
    ForEach,
}

#[derive(Debug, Clone)]
pub struct LoopStmt {
    pub kind: LoopKind,
    /// `None` for `for (;;)` and for enhanced for.
    pub condition: Option<Expr>,
    /// Variables declared by the loop header.
    pub decls: Vec<LocalVarDecl>,
    /// Initializers, updates, the iterated expression and the like.
    pub other_exprs: Vec<Expr>,
    pub body: Box<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct LabeledStmt {
    pub label: String,
    pub body: Box<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct TryStmt {
    pub resources: Vec<LocalVarDecl>,
    pub body: Block,
    pub catches: Vec<CatchClause>,
    pub finally: Option<Block>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct CatchClause {
    pub param: Option<Param>,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub struct SyncStmt {
    pub lock: Expr,
    pub body: Block,
    pub span: Span,
}

/// A `switch`, used both as a statement and as an expression.
#[derive(Debug, Clone)]
pub struct SwitchNode {
    /// The parenthesized selector as written.
    pub selector: Box<Expr>,
    pub cases: Vec<SwitchCase>,
    /// Span of the `{ ... }` switch block.
    pub body_span: Span,
    pub span: Span,
}

impl SwitchNode {
    pub fn has_default(&self) -> bool {
        self.cases.iter().any(|c| c.has_default())
    }

    pub fn is_rule_switch(&self) -> bool {
        !self.cases.is_empty() && self.cases.iter().all(|c| c.kind == CaseKind::Rule)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseKind {
    /// `case X:` followed by statements.
    Statement,
    /// `case X ->` followed by one expression statement, throw or block.
    Rule,
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
    pub labels: Vec<CaseLabel>,
    pub guard: Option<Expr>,
    pub kind: CaseKind,
    /// Colon cases: the statements up to the next label. Rules: exactly
    /// one statement.
    pub body: Vec<Stmt>,
    /// From the `case`/`default` keyword through the `:` or `->`.
    pub label_span: Span,
    pub span: Span,
}

impl SwitchCase {
    pub fn has_default(&self) -> bool {
        self.labels.iter().any(|l| matches!(l, CaseLabel::Default(_)))
    }

    pub fn has_null(&self) -> bool {
        self.labels.iter().any(|l| matches!(l, CaseLabel::Null(_)))
    }

    pub fn has_pattern(&self) -> bool {
        self.labels.iter().any(|l| matches!(l, CaseLabel::Pattern(_)))
    }

    pub fn expressions(&self) -> impl Iterator<Item = &Expr> {
        self.labels.iter().filter_map(|l| match l {
            CaseLabel::Expr(e) => Some(e),
            _ => None,
        })
    }

    /// The single body statement of an arrow case.
    pub fn rule_body(&self) -> Option<&Stmt> {
        match self.kind {
            CaseKind::Rule => self.body.first(),
            CaseKind::Statement => None,
        }
    }

    /// Span covering the body statements, if any.
    pub fn body_span(&self) -> Option<Span> {
        let first = self.body.first()?;
        let last = self.body.last()?;
        Some(first.span().union(last.span()))
    }
}

#[derive(Debug, Clone)]
pub enum CaseLabel {
    Expr(Expr),
    Pattern(Pattern),
    Null(Span),
    Default(Span),
}

impl CaseLabel {
    pub fn span(&self) -> Span {
        match self {
            CaseLabel::Expr(e) => e.span(),
            CaseLabel::Pattern(p) => p.span,
            CaseLabel::Null(s) | CaseLabel::Default(s) => *s,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Pattern {
    pub kind: PatternKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum PatternKind {
    Type { ty: TypeName, binding: Option<Binding> },
    /// Record deconstruction; never rewritten.
    Record,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Name(NameExpr),
    Field(FieldAccess),
    This(Span),
    Literal(Literal),
    Binary(BinaryExpr),
    Unary(UnaryExpr),
    InstanceOf(InstanceOfExpr),
    Assign(AssignExpr),
    Call(CallExpr),
    Paren(ParenExpr),
    Switch(Box<SwitchNode>),
    Lambda(LambdaExpr),
    Cast(CastExpr),
    New(NewExpr),
    Conditional(ConditionalExpr),
    Other(OtherExpr),
}

#[derive(Debug, Clone)]
pub struct NameExpr {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FieldAccess {
    pub object: Box<Expr>,
    pub field: String,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Int,
    Long,
    Float,
    Double,
    Char,
    String,
    Bool,
    Null,
}

#[derive(Debug, Clone)]
pub struct Literal {
    pub kind: LiteralKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct BinaryExpr {
    pub left: Box<Expr>,
    pub op: String,
    pub right: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct UnaryExpr {
    /// `!`, `-`, `+`, `~`, `++`, `--`.
    pub op: String,
    pub operand: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct InstanceOfExpr {
    pub operand: Box<Expr>,
    pub target: InstanceOfTarget,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum InstanceOfTarget {
    Type { ty: TypeName, binding: Option<Binding> },
    Record(Span),
}

#[derive(Debug, Clone)]
pub struct AssignExpr {
    pub target: Box<Expr>,
    /// `=`, `+=`, `-=`, ...
    pub op: String,
    pub value: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct CallExpr {
    pub receiver: Option<Box<Expr>>,
    pub name: String,
    pub args: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ParenExpr {
    pub inner: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum LambdaBody {
    Expr(Box<Expr>),
    Block(Block),
}

#[derive(Debug, Clone)]
pub struct LambdaExpr {
    pub params: Vec<Binding>,
    pub body: LambdaBody,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct CastExpr {
    pub ty: TypeName,
    pub operand: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct NewExpr {
    pub ty: TypeName,
    pub args: Vec<Expr>,
    /// Anonymous class body, named after the instantiated type and offset.
    pub body: Option<Box<TypeDecl>>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ConditionalExpr {
    pub condition: Box<Expr>,
    pub then: Box<Expr>,
    pub otherwise: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct OtherExpr {
    pub children: Vec<Expr>,
    pub span: Span,
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Name(e) => e.span,
            Expr::Field(e) => e.span,
            Expr::This(s) => *s,
            Expr::Literal(e) => e.span,
            Expr::Binary(e) => e.span,
            Expr::Unary(e) => e.span,
            Expr::InstanceOf(e) => e.span,
            Expr::Assign(e) => e.span,
            Expr::Call(e) => e.span,
            Expr::Paren(e) => e.span,
            Expr::Switch(e) => e.span,
            Expr::Lambda(e) => e.span,
            Expr::Cast(e) => e.span,
            Expr::New(e) => e.span,
            Expr::Conditional(e) => e.span,
            Expr::Other(e) => e.span,
        }
    }

    /// Strip any number of enclosing parentheses.
    pub fn strip_parens(&self) -> &Expr {
        let mut at = self;
        while let Expr::Paren(p) = at {
            at = &p.inner;
        }
        at
    }

    pub fn is_null_literal(&self) -> bool {
        matches!(self.strip_parens(), Expr::Literal(Literal { kind: LiteralKind::Null, .. }))
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.strip_parens(), Expr::Literal(_))
    }
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Block(b) => b.span,
            Stmt::If(s) => s.span,
            Stmt::Switch(s) => s.span,
            Stmt::Expr(s) => s.span,
            Stmt::LocalVar(s) => s.span,
            Stmt::Return(s) => s.span,
            Stmt::Throw(s) => s.span,
            Stmt::Break(s) | Stmt::Continue(s) => s.span,
            Stmt::Yield(s) => s.span,
            Stmt::Loop(s) => s.span,
            Stmt::Labeled(s) => s.span,
            Stmt::Try(s) => s.span,
            Stmt::Synchronized(s) => s.span,
            Stmt::LocalClass(d) => d.span,
            Stmt::Empty(s) | Stmt::Other(s) => *s,
        }
    }

    pub fn is_return_or_throw(&self) -> bool {
        matches!(self, Stmt::Return(_) | Stmt::Throw(_))
    }

    /// Unwrap blocks that hold exactly one statement.
    pub fn unwrap_single_blocks(&self) -> &Stmt {
        let mut at = self;
        while let Stmt::Block(b) = at {
            match b.stmts.as_slice() {
                [only] => at = only,
                _ => break,
            }
        }
        at
    }
}

/// A borrowed node of either kind, for generic traversal.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Stmt(&'a Stmt),
    Expr(&'a Expr),
}

impl<'a> Node<'a> {
    pub fn span(self) -> Span {
        match self {
            Node::Stmt(s) => s.span(),
            Node::Expr(e) => e.span(),
        }
    }

    /// Direct children in source order.
    pub fn children(self) -> Vec<Node<'a>> {
        let mut out = Vec::new();
        match self {
            Node::Stmt(stmt) => stmt_children(stmt, &mut out),
            Node::Expr(expr) => expr_children(expr, &mut out),
        }
        out
    }
}

fn stmt_children<'a>(stmt: &'a Stmt, out: &mut Vec<Node<'a>>) {
    match stmt {
        Stmt::Block(b) => out.extend(b.stmts.iter().map(Node::Stmt)),
        Stmt::If(s) => {
            out.push(Node::Expr(&s.condition));
            out.push(Node::Stmt(&s.then));
            if let Some(e) = &s.otherwise {
                out.push(Node::Stmt(e));
            }
        }
        Stmt::Switch(s) => switch_children(s, out),
        Stmt::Expr(s) => out.push(Node::Expr(&s.expr)),
        Stmt::LocalVar(d) => out.extend(d.declarators.iter().filter_map(|d| d.init.as_ref()).map(Node::Expr)),
        Stmt::Return(r) => out.extend(r.value.iter().map(Node::Expr)),
        Stmt::Throw(t) => out.push(Node::Expr(&t.value)),
        Stmt::Yield(y) => out.push(Node::Expr(&y.value)),
        Stmt::Loop(l) => {
            for d in &l.decls {
                out.extend(d.declarators.iter().filter_map(|d| d.init.as_ref()).map(Node::Expr));
            }
            out.extend(l.other_exprs.iter().map(Node::Expr));
            out.extend(l.condition.iter().map(Node::Expr));
            out.push(Node::Stmt(&l.body));
        }
        Stmt::Labeled(l) => out.push(Node::Stmt(&l.body)),
        Stmt::Try(t) => {
            for r in &t.resources {
                out.extend(r.declarators.iter().filter_map(|d| d.init.as_ref()).map(Node::Expr));
            }
            out.extend(t.body.stmts.iter().map(Node::Stmt));
            for c in &t.catches {
                out.extend(c.body.stmts.iter().map(Node::Stmt));
            }
            if let Some(f) = &t.finally {
                out.extend(f.stmts.iter().map(Node::Stmt));
            }
        }
        Stmt::Synchronized(s) => {
            out.push(Node::Expr(&s.lock));
            out.extend(s.body.stmts.iter().map(Node::Stmt));
        }
        // class bodies are separate scopes; walks stop at them
        Stmt::LocalClass(_) | Stmt::Break(_) | Stmt::Continue(_) | Stmt::Empty(_) | Stmt::Other(_) => {}
    }
}

fn switch_children<'a>(s: &'a SwitchNode, out: &mut Vec<Node<'a>>) {
    out.push(Node::Expr(&s.selector));
    for case in &s.cases {
        for label in &case.labels {
            if let CaseLabel::Expr(e) = label {
                out.push(Node::Expr(e));
            }
        }
        out.extend(case.guard.iter().map(Node::Expr));
        out.extend(case.body.iter().map(Node::Stmt));
    }
}

fn expr_children<'a>(expr: &'a Expr, out: &mut Vec<Node<'a>>) {
    match expr {
        Expr::Field(f) => out.push(Node::Expr(&f.object)),
        Expr::Binary(b) => {
            out.push(Node::Expr(&b.left));
            out.push(Node::Expr(&b.right));
        }
        Expr::Unary(u) => out.push(Node::Expr(&u.operand)),
        Expr::InstanceOf(i) => out.push(Node::Expr(&i.operand)),
        Expr::Assign(a) => {
            out.push(Node::Expr(&a.target));
            out.push(Node::Expr(&a.value));
        }
        Expr::Call(c) => {
            out.extend(c.receiver.iter().map(|r| Node::Expr(r.as_ref())));
            out.extend(c.args.iter().map(Node::Expr));
        }
        Expr::Paren(p) => out.push(Node::Expr(&p.inner)),
        Expr::Switch(s) => switch_children(s, out),
        Expr::Lambda(l) => match &l.body {
            LambdaBody::Expr(e) => out.push(Node::Expr(e)),
            LambdaBody::Block(b) => out.extend(b.stmts.iter().map(Node::Stmt)),
        },
        Expr::Cast(c) => out.push(Node::Expr(&c.operand)),
        Expr::New(n) => out.extend(n.args.iter().map(Node::Expr)),
        Expr::Conditional(c) => {
            out.push(Node::Expr(&c.condition));
            out.push(Node::Expr(&c.then));
            out.push(Node::Expr(&c.otherwise));
        }
        Expr::Other(o) => out.extend(o.children.iter().map(Node::Expr)),
        Expr::Name(_) | Expr::This(_) | Expr::Literal(_) => {}
    }
}

/// Pre-order walk. `visit` returns `false` to skip a node's children.
pub fn walk<'a>(node: Node<'a>, visit: &mut impl FnMut(Node<'a>) -> bool) {
    if visit(node) {
        for child in node.children() {
            walk(child, visit);
        }
    }
}

/// True if any node under `node` (inclusive) satisfies `pred`.
pub fn any_node<'a>(node: Node<'a>, pred: &mut impl FnMut(Node<'a>) -> bool) -> bool {
    let mut found = false;
    walk(node, &mut |n| {
        if found {
            return false;
        }
        if pred(n) {
            found = true;
            return false;
        }
        true
    });
    found
}
