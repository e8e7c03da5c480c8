//! Lowering from the tree-sitter concrete syntax tree to [`crate::tree`]
//!
//! Unknown or erroneous node kinds become `Other` nodes, which every rule
//! treats as opaque, so a syntax error only disables rewrites around it.

use tree_sitter::Node as TsNode;

use crate::tree::*;

/// Lower a `program` node.
pub fn lower_program(root: TsNode, source: &str) -> CompilationUnit {
    let lowerer = Lowerer { source };
    let mut types = Vec::new();
    for child in named_children(root) {
        if let Some(decl) = lowerer.type_decl(child) {
            types.push(decl);
        }
    }
    CompilationUnit {
        types,
        comments: collect_comments(root, source),
        span: span_of(root),
    }
}

fn span_of(node: TsNode) -> Span {
    Span::new(node.start_byte(), node.end_byte())
}

fn is_comment(node: TsNode) -> bool {
    matches!(node.kind(), "line_comment" | "block_comment" | "comment")
}

/// All children with their field names, comments excluded.
fn children_with_fields(node: TsNode) -> Vec<(Option<&'static str>, TsNode)> {
    let mut out = Vec::new();
    let mut cursor = node.walk();
    if cursor.goto_first_child() {
        loop {
            let child = cursor.node();
            if !is_comment(child) {
                out.push((cursor.field_name(), child));
            }
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }
    out
}

fn named_children(node: TsNode) -> Vec<TsNode> {
    children_with_fields(node)
        .into_iter()
        .map(|(_, n)| n)
        .filter(|n| n.is_named())
        .collect()
}

fn field<'t>(node: TsNode<'t>, name: &str) -> Option<TsNode<'t>> {
    node.child_by_field_name(name)
}

fn fields<'t>(node: TsNode<'t>, name: &str) -> Vec<TsNode<'t>> {
    children_with_fields(node)
        .into_iter()
        .filter(|(f, _)| *f == Some(name))
        .map(|(_, n)| n)
        .collect()
}

fn first_of_kind<'t>(node: TsNode<'t>, kinds: &[&str]) -> Option<TsNode<'t>> {
    named_children(node).into_iter().find(|n| kinds.contains(&n.kind()))
}

fn collect_comments(root: TsNode, source: &str) -> Vec<Comment> {
    let mut comments = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if is_comment(node) {
            let text = node.utf8_text(source.as_bytes()).unwrap_or("").to_string();
            let kind = if text.starts_with("//") { CommentKind::Line } else { CommentKind::Block };
            comments.push(Comment { span: span_of(node), kind, text });
            continue;
        }
        let mut cursor = node.walk();
        if cursor.goto_first_child() {
            loop {
                stack.push(cursor.node());
                if !cursor.goto_next_sibling() {
                    break;
                }
            }
        }
    }
    comments.sort_by_key(|c| c.span.start);
    comments
}

struct Lowerer<'s> {
    source: &'s str,
}

impl<'s> Lowerer<'s> {
    fn text(&self, node: TsNode) -> &'s str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    // ---------------------------------------------------------------
    // Declarations
    // ---------------------------------------------------------------

    fn type_decl(&self, node: TsNode) -> Option<TypeDecl> {
        let kind = match node.kind() {
            "class_declaration" => TypeKind::Class,
            "interface_declaration" => TypeKind::Interface,
            "enum_declaration" => TypeKind::Enum,
            "record_declaration" => TypeKind::Record,
            _ => return None,
        };
        let name = field(node, "name").map(|n| self.text(n).to_string())?;
        let mut decl = TypeDecl::new(kind, name, span_of(node));
        decl.modifiers = self.modifiers_of(node);
        decl.type_params = field(node, "type_parameters")
            .map(|tp| named_children(tp).len())
            .unwrap_or(0);
        decl.superclass = field(node, "superclass")
            .and_then(|s| named_children(s).into_iter().next())
            .map(|t| self.type_name(t));

        for child in named_children(node) {
            if matches!(child.kind(), "super_interfaces" | "extends_interfaces") {
                for list in named_children(child) {
                    let items = if list.kind() == "type_list" { named_children(list) } else { vec![list] };
                    decl.interfaces.extend(items.into_iter().map(|t| self.type_name(t)));
                }
            }
        }

        if kind == TypeKind::Record {
            if let Some(params) = field(node, "parameters") {
                decl.record_components = self.params(params);
            }
        }

        if let Some(body) = field(node, "body") {
            self.type_body(body, &mut decl);
        }
        Some(decl)
    }

    /// `new T(..) { .. }`: the body becomes a class extending `T`.
    fn anonymous_class(&self, base: &TypeName, body: TsNode, span: Span) -> TypeDecl {
        let mut decl = TypeDecl::new(TypeKind::Class, format!("{}${}", base.name, span.start), span);
        decl.superclass = Some(base.clone());
        self.type_body(body, &mut decl);
        decl
    }

    fn type_body(&self, body: TsNode, decl: &mut TypeDecl) {
        for member in named_children(body) {
            match member.kind() {
                "enum_constant" => {
                    if let Some(name) = field(member, "name") {
                        let args = field(member, "arguments")
                            .map(|a| self.arguments(a))
                            .unwrap_or_default();
                        decl.enum_constants.push(EnumConstant {
                            name: self.text(name).to_string(),
                            span: span_of(member),
                            args,
                        });
                    }
                }
                "enum_body_declarations" => self.type_body(member, decl),
                "field_declaration" | "constant_declaration" => {
                    decl.fields.push(FieldDecl {
                        modifiers: self.modifiers_of(member),
                        ty: self.type_field(member),
                        declarators: self.declarators(member),
                        span: span_of(member),
                    });
                }
                "method_declaration" | "constructor_declaration" | "compact_constructor_declaration" => {
                    decl.methods.push(self.method(member));
                }
                "block" => decl.initializers.push(self.block(member)),
                "static_initializer" => {
                    if let Some(b) = first_of_kind(member, &["block"]) {
                        decl.initializers.push(self.block(b));
                    }
                }
                _ => {
                    if let Some(nested) = self.type_decl(member) {
                        decl.types.push(nested);
                    }
                }
            }
        }
    }

    fn method(&self, node: TsNode) -> MethodDecl {
        let return_type = if node.kind() == "method_declaration" {
            field(node, "type").map(|t| self.type_name(t))
        } else {
            None
        };
        MethodDecl {
            name: field(node, "name").map(|n| self.text(n).to_string()).unwrap_or_default(),
            modifiers: self.modifiers_of(node),
            return_type,
            params: field(node, "parameters").map(|p| self.params(p)).unwrap_or_default(),
            body: field(node, "body").map(|b| self.block(b)),
            span: span_of(node),
        }
    }

    fn params(&self, node: TsNode) -> Vec<Param> {
        let mut out = Vec::new();
        for p in named_children(node) {
            match p.kind() {
                "formal_parameter" | "catch_formal_parameter" => {
                    if let Some(name) = field(p, "name") {
                        out.push(Param {
                            modifiers: self.modifiers_of(p),
                            ty: self.type_field(p),
                            name: self.text(name).to_string(),
                            name_span: span_of(name),
                            span: span_of(p),
                        });
                    }
                }
                "spread_parameter" => {
                    let ty = first_of_kind(p, TYPE_KINDS).map(|t| self.type_name(t));
                    let declarator = first_of_kind(p, &["variable_declarator"]);
                    if let (Some(mut ty), Some(d)) = (ty, declarator) {
                        if let Some(name) = field(d, "name") {
                            ty.array_dims += 1;
                            out.push(Param {
                                modifiers: self.modifiers_of(p),
                                ty,
                                name: self.text(name).to_string(),
                                name_span: span_of(name),
                                span: span_of(p),
                            });
                        }
                    }
                }
                _ => {}
            }
        }
        out
    }

    fn declarators(&self, node: TsNode) -> Vec<Declarator> {
        fields(node, "declarator")
            .into_iter()
            .filter_map(|d| {
                let name = field(d, "name")?;
                Some(Declarator {
                    name: self.text(name).to_string(),
                    name_span: span_of(name),
                    array_dims: field(d, "dimensions").map(|n| self.text(n).matches('[').count()).unwrap_or(0),
                    init: field(d, "value").map(|v| self.expr(v)),
                    span: span_of(d),
                })
            })
            .collect()
    }

    fn modifiers_of(&self, node: TsNode) -> Modifiers {
        let Some(mods) = first_of_kind(node, &["modifiers"]) else {
            return Modifiers::default();
        };
        let mut out = Modifiers { span: Some(span_of(mods)), ..Modifiers::default() };
        for (_, child) in children_with_fields(mods) {
            match child.kind() {
                "marker_annotation" | "annotation" => {
                    let name = field(child, "name")
                        .map(|n| self.text(n).rsplit('.').next().unwrap_or("").to_string())
                        .unwrap_or_default();
                    let mut string_values = Vec::new();
                    if let Some(args) = field(child, "arguments") {
                        self.collect_strings(args, &mut string_values);
                    }
                    out.annotations.push(Annotation { name, string_values, span: span_of(child) });
                }
                _ if !child.is_named() => out.keywords.push(self.text(child).to_string()),
                _ => {}
            }
        }
        out
    }

    fn collect_strings(&self, node: TsNode, out: &mut Vec<String>) {
        if node.kind() == "string_literal" {
            out.push(self.text(node).trim_matches('"').to_string());
            return;
        }
        for child in named_children(node) {
            self.collect_strings(child, out);
        }
    }

    fn type_field(&self, node: TsNode) -> TypeName {
        match field(node, "type") {
            Some(t) => self.type_name(t),
            None => TypeName { name: String::new(), type_args: None, array_dims: 0, span: span_of(node) },
        }
    }

    fn type_name(&self, node: TsNode) -> TypeName {
        let span = span_of(node);
        match node.kind() {
            "array_type" => {
                let mut inner = field(node, "element")
                    .map(|e| self.type_name(e))
                    .unwrap_or_else(|| TypeName { name: String::new(), type_args: None, array_dims: 0, span });
                let dims = field(node, "dimensions").map(|d| self.text(d).matches('[').count()).unwrap_or(1);
                inner.array_dims += dims.max(1);
                inner.span = span;
                inner
            }
            "generic_type" => {
                let children = named_children(node);
                let base = children
                    .iter()
                    .find(|c| matches!(c.kind(), "type_identifier" | "scoped_type_identifier"))
                    .map(|c| simple_name(self.text(*c)))
                    .unwrap_or_default();
                let args = children
                    .iter()
                    .find(|c| c.kind() == "type_arguments")
                    .map(|a| named_children(*a).len());
                TypeName { name: base, type_args: args, array_dims: 0, span }
            }
            "annotated_type" => named_children(node)
                .into_iter()
                .filter(|c| !c.kind().ends_with("annotation"))
                .last()
                .map(|t| self.type_name(t))
                .unwrap_or_else(|| TypeName { name: String::new(), type_args: None, array_dims: 0, span }),
            _ => TypeName { name: simple_name(self.text(node)), type_args: None, array_dims: 0, span },
        }
    }

    // ---------------------------------------------------------------
    // Statements
    // ---------------------------------------------------------------

    fn block(&self, node: TsNode) -> Block {
        Block {
            stmts: named_children(node).into_iter().map(|c| self.stmt(c)).collect(),
            span: span_of(node),
        }
    }

    fn stmt(&self, node: TsNode) -> Stmt {
        let span = span_of(node);
        match node.kind() {
            "block" | "constructor_body" => Stmt::Block(self.block(node)),
            "expression_statement" => {
                let Some(inner) = named_children(node).into_iter().next() else {
                    return Stmt::Other(span);
                };
                if inner.kind() == "switch_expression" && !self.text(node).trim_end().ends_with(';') {
                    return Stmt::Switch(self.switch(inner));
                }
                Stmt::Expr(ExprStmt { expr: self.expr(inner), span })
            }
            "switch_expression" | "switch_statement" => Stmt::Switch(self.switch(node)),
            "local_variable_declaration" => Stmt::LocalVar(self.local_var(node)),
            "if_statement" => {
                let condition = field(node, "condition").map(|c| self.expr(c));
                let then = field(node, "consequence").map(|c| self.stmt(c));
                let (Some(condition), Some(then)) = (condition, then) else {
                    return Stmt::Other(span);
                };
                let otherwise = field(node, "alternative").map(|alt| {
                    let target = if alt.kind() == "else_clause" {
                        named_children(alt).into_iter().last().unwrap_or(alt)
                    } else {
                        alt
                    };
                    Box::new(self.stmt(target))
                });
                Stmt::If(IfStmt { condition, then: Box::new(then), otherwise, span })
            }
            "return_statement" => Stmt::Return(ReturnStmt {
                value: named_children(node).into_iter().next().map(|v| self.expr(v)),
                span,
            }),
            "throw_statement" => match named_children(node).into_iter().next() {
                Some(v) => Stmt::Throw(ThrowStmt { value: self.expr(v), span }),
                None => Stmt::Other(span),
            },
            "yield_statement" => match named_children(node).into_iter().next() {
                Some(v) => Stmt::Yield(YieldStmt { value: self.expr(v), span }),
                None => Stmt::Other(span),
            },
            "break_statement" => Stmt::Break(JumpStmt { label: self.jump_label(node), span }),
            "continue_statement" => Stmt::Continue(JumpStmt { label: self.jump_label(node), span }),
            "while_statement" => self.loop_stmt(node, LoopKind::While),
            "do_statement" => self.loop_stmt(node, LoopKind::DoWhile),
            "for_statement" => self.loop_stmt(node, LoopKind::For),
            "enhanced_for_statement" => self.loop_stmt(node, LoopKind::ForEach),
            "labeled_statement" => {
                let children = named_children(node);
                let label = children.iter().find(|c| c.kind() == "identifier").map(|c| self.text(*c).to_string());
                let body = children.iter().rev().find(|c| c.kind() != "identifier").map(|c| self.stmt(*c));
                match (label, body) {
                    (Some(label), Some(body)) => Stmt::Labeled(LabeledStmt { label, body: Box::new(body), span }),
                    _ => Stmt::Other(span),
                }
            }
            "try_statement" | "try_with_resources_statement" => self.try_stmt(node),
            "synchronized_statement" => {
                let lock = first_of_kind(node, &["parenthesized_expression"]).map(|l| self.expr(l));
                let body = field(node, "body").or_else(|| first_of_kind(node, &["block"])).map(|b| self.block(b));
                match (lock, body) {
                    (Some(lock), Some(body)) => Stmt::Synchronized(SyncStmt { lock, body, span }),
                    _ => Stmt::Other(span),
                }
            }
            ";" | "empty_statement" => Stmt::Empty(span),
            _ => match self.type_decl(node) {
                Some(decl) => Stmt::LocalClass(Box::new(decl)),
                None => Stmt::Other(span),
            },
        }
    }

    fn jump_label(&self, node: TsNode) -> Option<String> {
        first_of_kind(node, &["identifier"]).map(|i| self.text(i).to_string())
    }

    fn local_var(&self, node: TsNode) -> LocalVarDecl {
        LocalVarDecl {
            modifiers: self.modifiers_of(node),
            ty: self.type_field(node),
            declarators: self.declarators(node),
            span: span_of(node),
        }
    }

    fn loop_stmt(&self, node: TsNode, kind: LoopKind) -> Stmt {
        let span = span_of(node);
        let Some(body) = field(node, "body") else {
            return Stmt::Other(span);
        };
        let mut decls = Vec::new();
        let mut other_exprs = Vec::new();
        let mut condition = None;
        match kind {
            LoopKind::While | LoopKind::DoWhile => {
                condition = field(node, "condition").map(|c| self.expr(c));
            }
            LoopKind::For => {
                condition = field(node, "condition").map(|c| self.expr(c));
                for init in fields(node, "init") {
                    if init.kind() == "local_variable_declaration" {
                        decls.push(self.local_var(init));
                    } else {
                        other_exprs.push(self.expr(init));
                    }
                }
                other_exprs.extend(fields(node, "update").into_iter().map(|u| self.expr(u)));
            }
            LoopKind::ForEach => {
                if let Some(name) = field(node, "name") {
                    decls.push(LocalVarDecl {
                        modifiers: self.modifiers_of(node),
                        ty: self.type_field(node),
                        declarators: vec![Declarator {
                            name: self.text(name).to_string(),
                            name_span: span_of(name),
                            array_dims: 0,
                            init: None,
                            span: span_of(name),
                        }],
                        span: span_of(name),
                    });
                }
                other_exprs.extend(field(node, "value").map(|v| self.expr(v)));
            }
        }
        Stmt::Loop(LoopStmt { kind, condition, decls, other_exprs, body: Box::new(self.stmt(body)), span })
    }

    fn try_stmt(&self, node: TsNode) -> Stmt {
        let span = span_of(node);
        let Some(body) = field(node, "body") else {
            return Stmt::Other(span);
        };
        let mut resources = Vec::new();
        let mut catches = Vec::new();
        let mut finally = None;
        for child in named_children(node) {
            match child.kind() {
                "resource_specification" => {
                    for res in named_children(child) {
                        let Some(name) = field(res, "name") else { continue };
                        resources.push(LocalVarDecl {
                            modifiers: self.modifiers_of(res),
                            ty: self.type_field(res),
                            declarators: vec![Declarator {
                                name: self.text(name).to_string(),
                                name_span: span_of(name),
                                array_dims: 0,
                                init: field(res, "value").map(|v| self.expr(v)),
                                span: span_of(res),
                            }],
                            span: span_of(res),
                        });
                    }
                }
                "catch_clause" => {
                    let param = first_of_kind(child, &["catch_formal_parameter"]).and_then(|p| {
                        let name = field(p, "name")?;
                        let ty = first_of_kind(p, &["catch_type"])
                            .and_then(|ct| named_children(ct).into_iter().next())
                            .map(|t| self.type_name(t))?;
                        Some(Param {
                            modifiers: self.modifiers_of(p),
                            ty,
                            name: self.text(name).to_string(),
                            name_span: span_of(name),
                            span: span_of(p),
                        })
                    });
                    if let Some(b) = field(child, "body") {
                        catches.push(CatchClause { param, body: self.block(b) });
                    }
                }
                "finally_clause" => {
                    finally = first_of_kind(child, &["block"]).map(|b| self.block(b));
                }
                _ => {}
            }
        }
        Stmt::Try(TryStmt { resources, body: self.block(body), catches, finally, span })
    }

    fn switch(&self, node: TsNode) -> SwitchNode {
        let span = span_of(node);
        let selector = field(node, "condition")
            .map(|c| self.expr(c))
            .unwrap_or_else(|| Expr::Other(OtherExpr { children: Vec::new(), span }));
        let body = field(node, "body");
        let mut cases = Vec::new();
        if let Some(body) = body {
            for child in named_children(body) {
                match child.kind() {
                    "switch_block_statement_group" => self.statement_group(child, &mut cases),
                    "switch_rule" => cases.push(self.switch_rule(child)),
                    _ => {}
                }
            }
        }
        SwitchNode {
            selector: Box::new(selector),
            cases,
            body_span: body.map(span_of).unwrap_or(span),
            span,
        }
    }

    /// `case A: case B: stmts` lowers to one case per label; all but the
    /// last have empty bodies.
    fn statement_group(&self, node: TsNode, cases: &mut Vec<SwitchCase>) {
        let children = children_with_fields(node);
        let mut pending: Vec<(TsNode, usize)> = Vec::new();
        let mut stmts = Vec::new();
        let mut iter = children.iter().peekable();
        while let Some((_, child)) = iter.next() {
            if child.kind() == "switch_label" {
                let mut label_end = child.end_byte();
                if let Some((_, colon)) = iter.peek() {
                    if colon.kind() == ":" {
                        label_end = colon.end_byte();
                        iter.next();
                    }
                }
                pending.push((*child, label_end));
            } else if child.is_named() {
                stmts.push(self.stmt(*child));
            }
        }
        let last = pending.len().saturating_sub(1);
        for (i, (label, label_end)) in pending.into_iter().enumerate() {
            let (labels, guard) = self.switch_label(label);
            let label_span = Span::new(label.start_byte(), label_end);
            let body = if i == last { std::mem::take(&mut stmts) } else { Vec::new() };
            let end = body.last().map(|s| s.span().end).unwrap_or(label_end);
            cases.push(SwitchCase {
                labels,
                guard,
                kind: CaseKind::Statement,
                body,
                label_span,
                span: Span::new(label.start_byte(), end),
            });
        }
    }

    fn switch_rule(&self, node: TsNode) -> SwitchCase {
        let span = span_of(node);
        let children = children_with_fields(node);
        let label = children.iter().map(|(_, c)| *c).find(|c| c.kind() == "switch_label");
        let arrow_end = children
            .iter()
            .map(|(_, c)| *c)
            .find(|c| c.kind() == "->")
            .map(|a| a.end_byte())
            .unwrap_or(span.start);
        let body = children
            .iter()
            .map(|(_, c)| *c)
            .filter(|c| c.is_named() && c.kind() != "switch_label")
            .last()
            .map(|b| self.stmt(b));
        let (labels, guard) = label.map(|l| self.switch_label(l)).unwrap_or_default();
        SwitchCase {
            labels,
            guard,
            kind: CaseKind::Rule,
            body: body.into_iter().collect(),
            label_span: Span::new(span.start, arrow_end),
            span,
        }
    }

    fn switch_label(&self, node: TsNode) -> (Vec<CaseLabel>, Option<Expr>) {
        let mut labels = Vec::new();
        let mut guard = None;
        for (_, child) in children_with_fields(node) {
            match child.kind() {
                "default" => labels.push(CaseLabel::Default(span_of(child))),
                "case" | "," => {}
                "null_literal" => labels.push(CaseLabel::Null(span_of(child))),
                "guard" => guard = named_children(child).into_iter().next().map(|g| self.expr(g)),
                "pattern" | "type_pattern" | "record_pattern" => labels.push(CaseLabel::Pattern(self.pattern(child))),
                _ if child.is_named() => labels.push(CaseLabel::Expr(self.expr(child))),
                _ => {}
            }
        }
        (labels, guard)
    }

    fn pattern(&self, node: TsNode) -> Pattern {
        let span = span_of(node);
        match node.kind() {
            "pattern" => match named_children(node).into_iter().next() {
                Some(inner) => self.pattern(inner),
                None => Pattern { kind: PatternKind::Record, span },
            },
            "type_pattern" => {
                let children = named_children(node);
                let ty = children
                    .iter()
                    .find(|c| c.kind() != "identifier" && c.kind() != "modifiers")
                    .map(|t| self.type_name(*t));
                let binding = children
                    .iter()
                    .rev()
                    .find(|c| c.kind() == "identifier")
                    .map(|b| Binding { name: self.text(*b).to_string(), span: span_of(*b) });
                match ty {
                    Some(ty) => Pattern { kind: PatternKind::Type { ty, binding }, span },
                    None => Pattern { kind: PatternKind::Record, span },
                }
            }
            _ => Pattern { kind: PatternKind::Record, span },
        }
    }

    // ---------------------------------------------------------------
    // Expressions
    // ---------------------------------------------------------------

    fn arguments(&self, node: TsNode) -> Vec<Expr> {
        named_children(node).into_iter().map(|a| self.expr(a)).collect()
    }

    fn expr(&self, node: TsNode) -> Expr {
        let span = span_of(node);
        match node.kind() {
            "identifier" => Expr::Name(NameExpr { name: self.text(node).to_string(), span }),
            "this" => Expr::This(span),
            "field_access" => {
                let object = field(node, "object").map(|o| self.expr(o));
                let name = field(node, "field").map(|f| self.text(f).to_string());
                match (object, name) {
                    (Some(object), Some(field)) => Expr::Field(FieldAccess { object: Box::new(object), field, span }),
                    _ => self.other(node),
                }
            }
            "decimal_integer_literal" | "hex_integer_literal" | "octal_integer_literal" | "binary_integer_literal" => {
                let text = self.text(node);
                let kind = if text.ends_with('l') || text.ends_with('L') { LiteralKind::Long } else { LiteralKind::Int };
                Expr::Literal(Literal { kind, span })
            }
            "decimal_floating_point_literal" | "hex_floating_point_literal" => {
                let text = self.text(node);
                let kind = if text.ends_with('f') || text.ends_with('F') { LiteralKind::Float } else { LiteralKind::Double };
                Expr::Literal(Literal { kind, span })
            }
            "character_literal" => Expr::Literal(Literal { kind: LiteralKind::Char, span }),
            "string_literal" | "text_block" => Expr::Literal(Literal { kind: LiteralKind::String, span }),
            "true" | "false" => Expr::Literal(Literal { kind: LiteralKind::Bool, span }),
            "null_literal" => Expr::Literal(Literal { kind: LiteralKind::Null, span }),
            "binary_expression" => {
                let left = field(node, "left").map(|l| self.expr(l));
                let right = field(node, "right").map(|r| self.expr(r));
                let op = field(node, "operator").map(|o| self.text(o).to_string());
                match (left, op, right) {
                    (Some(left), Some(op), Some(right)) => Expr::Binary(BinaryExpr {
                        left: Box::new(left),
                        op,
                        right: Box::new(right),
                        span,
                    }),
                    _ => self.other(node),
                }
            }
            "unary_expression" => {
                let op = field(node, "operator").map(|o| self.text(o).to_string());
                let operand = field(node, "operand").map(|o| self.expr(o));
                match (op, operand) {
                    (Some(op), Some(operand)) => Expr::Unary(UnaryExpr { op, operand: Box::new(operand), span }),
                    _ => self.other(node),
                }
            }
            "update_expression" => {
                let children = children_with_fields(node);
                let op = children
                    .iter()
                    .find(|(_, c)| !c.is_named())
                    .map(|(_, c)| self.text(*c).to_string());
                let operand = children.iter().find(|(_, c)| c.is_named()).map(|(_, c)| self.expr(*c));
                match (op, operand) {
                    (Some(op), Some(operand)) => Expr::Unary(UnaryExpr { op, operand: Box::new(operand), span }),
                    _ => self.other(node),
                }
            }
            "instanceof_expression" => {
                let Some(left) = field(node, "left") else {
                    return self.other(node);
                };
                let target = if let Some(pattern) = field(node, "pattern") {
                    match self.pattern(pattern).kind {
                        PatternKind::Type { ty, binding } => InstanceOfTarget::Type { ty, binding },
                        PatternKind::Record => InstanceOfTarget::Record(span_of(pattern)),
                    }
                } else if let Some(right) = field(node, "right") {
                    let binding = field(node, "name").map(|n| Binding { name: self.text(n).to_string(), span: span_of(n) });
                    InstanceOfTarget::Type { ty: self.type_name(right), binding }
                } else if let Some(record) = first_of_kind(node, &["record_pattern"]) {
                    InstanceOfTarget::Record(span_of(record))
                } else {
                    return self.other(node);
                };
                Expr::InstanceOf(InstanceOfExpr { operand: Box::new(self.expr(left)), target, span })
            }
            "assignment_expression" => {
                let left = field(node, "left").map(|l| self.expr(l));
                let right = field(node, "right").map(|r| self.expr(r));
                let op = field(node, "operator").map(|o| self.text(o).to_string());
                match (left, op, right) {
                    (Some(target), Some(op), Some(value)) => Expr::Assign(AssignExpr {
                        target: Box::new(target),
                        op,
                        value: Box::new(value),
                        span,
                    }),
                    _ => self.other(node),
                }
            }
            "method_invocation" => {
                let Some(name) = field(node, "name") else {
                    return self.other(node);
                };
                Expr::Call(CallExpr {
                    receiver: field(node, "object").map(|o| Box::new(self.expr(o))),
                    name: self.text(name).to_string(),
                    args: field(node, "arguments").map(|a| self.arguments(a)).unwrap_or_default(),
                    span,
                })
            }
            "parenthesized_expression" => match named_children(node).into_iter().next() {
                Some(inner) => Expr::Paren(ParenExpr { inner: Box::new(self.expr(inner)), span }),
                None => self.other(node),
            },
            "switch_expression" => Expr::Switch(Box::new(self.switch(node))),
            "lambda_expression" => {
                let mut params = Vec::new();
                if let Some(p) = field(node, "parameters") {
                    match p.kind() {
                        "identifier" => params.push(Binding { name: self.text(p).to_string(), span: span_of(p) }),
                        "formal_parameters" => {
                            params.extend(self.params(p).into_iter().map(|fp| Binding { name: fp.name, span: fp.name_span }))
                        }
                        _ => params.extend(
                            named_children(p)
                                .into_iter()
                                .filter(|c| c.kind() == "identifier")
                                .map(|c| Binding { name: self.text(c).to_string(), span: span_of(c) }),
                        ),
                    }
                }
                let Some(body) = field(node, "body") else {
                    return self.other(node);
                };
                let body = if body.kind() == "block" {
                    LambdaBody::Block(self.block(body))
                } else {
                    LambdaBody::Expr(Box::new(self.expr(body)))
                };
                Expr::Lambda(LambdaExpr { params, body, span })
            }
            "cast_expression" => {
                let ty = field(node, "type").map(|t| self.type_name(t));
                let value = field(node, "value").map(|v| self.expr(v));
                match (ty, value) {
                    (Some(ty), Some(operand)) => Expr::Cast(CastExpr { ty, operand: Box::new(operand), span }),
                    _ => self.other(node),
                }
            }
            "object_creation_expression" => match field(node, "type") {
                Some(ty) => {
                    let ty = self.type_name(ty);
                    let body = first_of_kind(node, &["class_body"])
                        .map(|b| Box::new(self.anonymous_class(&ty, b, span)));
                    Expr::New(NewExpr {
                        args: field(node, "arguments").map(|a| self.arguments(a)).unwrap_or_default(),
                        ty,
                        body,
                        span,
                    })
                }
                None => self.other(node),
            },
            "ternary_expression" => {
                let c = field(node, "condition").map(|e| self.expr(e));
                let t = field(node, "consequence").map(|e| self.expr(e));
                let o = field(node, "alternative").map(|e| self.expr(e));
                match (c, t, o) {
                    (Some(c), Some(t), Some(o)) => Expr::Conditional(ConditionalExpr {
                        condition: Box::new(c),
                        then: Box::new(t),
                        otherwise: Box::new(o),
                        span,
                    }),
                    _ => self.other(node),
                }
            }
            _ => self.other(node),
        }
    }

    /// Opaque expression; sub-expressions are kept so reads stay visible.
    fn other(&self, node: TsNode) -> Expr {
        let children = named_children(node)
            .into_iter()
            .filter(|c| !TYPE_KINDS.contains(&c.kind()) && !matches!(c.kind(), "class_body" | "type_arguments"))
            .map(|c| self.expr(c))
            .collect();
        Expr::Other(OtherExpr { children, span: span_of(node) })
    }
}

const TYPE_KINDS: &[&str] = &[
    "type_identifier",
    "scoped_type_identifier",
    "generic_type",
    "array_type",
    "integral_type",
    "floating_point_type",
    "boolean_type",
    "void_type",
    "annotated_type",
];

fn simple_name(text: &str) -> String {
    text.trim().rsplit('.').next().unwrap_or("").trim().to_string()
}
