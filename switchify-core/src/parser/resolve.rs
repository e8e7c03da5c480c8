//! Source-only name and type resolution
//!
//! [`SourceModel`] answers [`SemanticModel`] queries from the declarations
//! of a single compilation unit plus a small table of well-known
//! `java.lang` / `java.util` types. Results are precomputed in one walk
//! and keyed by expression span. Anything declared outside the file is
//! unknown and every query involving it answers conservatively.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::semantics::{ConstValue, JavaType, Primitive, SemanticModel, Symbol};
use crate::tree::*;

/// Supertypes of library types the rules commonly test against.
static BUILTIN_SUPERTYPES: &[(&str, &[&str])] = &[
    ("String", &["CharSequence", "Comparable", "Serializable"]),
    ("StringBuilder", &["CharSequence"]),
    ("Integer", &["Number", "Comparable"]),
    ("Long", &["Number", "Comparable"]),
    ("Short", &["Number", "Comparable"]),
    ("Byte", &["Number", "Comparable"]),
    ("Double", &["Number", "Comparable"]),
    ("Float", &["Number", "Comparable"]),
    ("BigInteger", &["Number", "Comparable"]),
    ("BigDecimal", &["Number", "Comparable"]),
    ("Character", &["Comparable", "Serializable"]),
    ("Boolean", &["Comparable", "Serializable"]),
    ("Number", &["Serializable"]),
    ("Enum", &["Comparable", "Serializable"]),
    ("Throwable", &["Serializable"]),
    ("Exception", &["Throwable"]),
    ("Error", &["Throwable"]),
    ("RuntimeException", &["Exception"]),
    ("IOException", &["Exception"]),
    ("IllegalArgumentException", &["RuntimeException"]),
    ("IllegalStateException", &["RuntimeException"]),
    ("NullPointerException", &["RuntimeException"]),
    ("UnsupportedOperationException", &["RuntimeException"]),
    ("ClassCastException", &["RuntimeException"]),
    ("ArithmeticException", &["RuntimeException"]),
    ("IndexOutOfBoundsException", &["RuntimeException"]),
    ("NumberFormatException", &["IllegalArgumentException"]),
    ("Iterable", &[]),
    ("Collection", &["Iterable"]),
    ("List", &["Collection"]),
    ("Set", &["Collection"]),
    ("Queue", &["Collection"]),
    ("Deque", &["Queue"]),
    ("ArrayList", &["List"]),
    ("LinkedList", &["List", "Deque"]),
    ("ArrayDeque", &["Deque"]),
    ("HashSet", &["Set"]),
    ("LinkedHashSet", &["HashSet"]),
    ("TreeSet", &["Set"]),
    ("HashMap", &["Map"]),
    ("LinkedHashMap", &["HashMap"]),
    ("TreeMap", &["Map"]),
];

static BUILTIN_TYPE_PARAMS: &[(&str, usize)] = &[
    ("Iterable", 1),
    ("Collection", 1),
    ("List", 1),
    ("ArrayList", 1),
    ("LinkedList", 1),
    ("Set", 1),
    ("HashSet", 1),
    ("TreeSet", 1),
    ("Queue", 1),
    ("Deque", 1),
    ("Optional", 1),
    ("Comparable", 1),
    ("Class", 1),
    ("Supplier", 1),
    ("Consumer", 1),
    ("Predicate", 1),
    ("Map", 2),
    ("HashMap", 2),
    ("TreeMap", 2),
    ("Function", 2),
    ("BiConsumer", 2),
];

#[derive(Debug, Clone)]
struct TypeInfo {
    kind: TypeKind,
    supertypes: Vec<String>,
    enum_constants: Vec<String>,
    fields: HashMap<String, FieldInfo>,
    methods: HashMap<String, Option<JavaType>>,
    type_params: usize,
}

#[derive(Debug, Clone)]
struct FieldInfo {
    ty: Option<JavaType>,
    is_static: bool,
    is_final: bool,
    is_volatile: bool,
    constant: Option<ConstValue>,
}

/// Semantic model built from one compilation unit.
#[derive(Debug, Default)]
pub struct SourceModel {
    types: HashMap<String, TypeInfo>,
    symbols: HashMap<Span, Symbol>,
    expr_types: HashMap<Span, JavaType>,
    constants: HashMap<Span, ConstValue>,
    suppressions: Vec<(Span, Vec<String>)>,
}

impl SourceModel {
    pub fn build(unit: &CompilationUnit, source: &str) -> Self {
        let mut model = SourceModel::default();
        for decl in &unit.types {
            model.collect_type(decl);
        }
        model.fold_field_constants(&unit.types, source);

        let mut walker = Walker { model: &mut model, source, scopes: Vec::new(), type_stack: Vec::new() };
        for decl in &unit.types {
            walker.type_decl(decl);
        }
        tracing::trace!(
            types = model.types.len(),
            symbols = model.symbols.len(),
            "built source model"
        );
        model
    }

    fn collect_type(&mut self, decl: &TypeDecl) {
        let mut supertypes: Vec<String> = decl.superclass.iter().map(|t| t.name.clone()).collect();
        supertypes.extend(decl.interfaces.iter().map(|t| t.name.clone()));
        match decl.kind {
            TypeKind::Enum => supertypes.push("Enum".to_string()),
            TypeKind::Record => supertypes.push("Record".to_string()),
            _ => {}
        }

        let interface = decl.kind == TypeKind::Interface;
        let mut fields = HashMap::new();
        for field in &decl.fields {
            for d in &field.declarators {
                fields.insert(
                    d.name.clone(),
                    FieldInfo {
                        ty: type_from_name(&d.declared_type(&field.ty)),
                        is_static: interface || field.modifiers.has("static"),
                        is_final: interface || field.modifiers.has("final"),
                        is_volatile: field.modifiers.has("volatile"),
                        constant: None,
                    },
                );
            }
            self.note_suppressions(&field.modifiers, field.span);
        }
        for component in &decl.record_components {
            fields.insert(
                component.name.clone(),
                FieldInfo {
                    ty: type_from_name(&component.ty),
                    is_static: false,
                    is_final: true,
                    is_volatile: false,
                    constant: None,
                },
            );
        }

        let mut methods = HashMap::new();
        for method in &decl.methods {
            if let Some(ret) = &method.return_type {
                methods.entry(method.name.clone()).or_insert_with(|| type_from_name(ret));
            }
            self.note_suppressions(&method.modifiers, method.span);
        }
        self.note_suppressions(&decl.modifiers, decl.span);

        self.types.insert(
            decl.name.clone(),
            TypeInfo {
                kind: decl.kind,
                supertypes,
                enum_constants: decl.enum_constants.iter().map(|c| c.name.clone()).collect(),
                fields,
                methods,
                type_params: decl.type_params,
            },
        );
        for nested in &decl.types {
            self.collect_type(nested);
        }
    }

    fn note_suppressions(&mut self, modifiers: &Modifiers, span: Span) {
        for annotation in &modifiers.annotations {
            if annotation.name == "SuppressWarnings" {
                self.suppressions.push((span, annotation.string_values.clone()));
            }
        }
    }

    /// `static final` / `final` field initializers, folded until stable so
    /// constants may refer to constants declared later.
    fn fold_field_constants(&mut self, types: &[TypeDecl], source: &str) {
        let mut decls = Vec::new();
        collect_decls(types, &mut decls);
        for _ in 0..4 {
            let mut updates = Vec::new();
            for decl in &decls {
                for field in &decl.fields {
                    for d in &field.declarators {
                        let Some(init) = &d.init else { continue };
                        let known = self.field_info(&decl.name, &d.name).and_then(|f| f.constant.clone());
                        if known.is_some() {
                            continue;
                        }
                        if let Some(value) = self.fold_in_type(init, &decl.name, source) {
                            updates.push((decl.name.clone(), d.name.clone(), value));
                        }
                    }
                }
            }
            if updates.is_empty() {
                break;
            }
            for (owner, name, value) in updates {
                if let Some(info) = self.types.get_mut(&owner).and_then(|t| t.fields.get_mut(&name)) {
                    if info.is_final {
                        info.constant = Some(value);
                    }
                }
            }
        }
    }

    fn fold_in_type(&self, expr: &Expr, owner: &str, source: &str) -> Option<ConstValue> {
        match expr {
            Expr::Name(n) => self.field_info(owner, &n.name).filter(|f| f.is_final).and_then(|f| f.constant.clone()),
            Expr::Field(fa) => match fa.object.strip_parens() {
                Expr::Name(t) => self.field_info(&t.name, &fa.field).filter(|f| f.is_static && f.is_final)?.constant.clone(),
                _ => None,
            },
            other => fold_node(other, source, &|e| self.fold_in_type(e, owner, source)),
        }
    }

    fn field_info(&self, owner: &str, name: &str) -> Option<&FieldInfo> {
        self.lookup_member(owner, name).and_then(|(decl_owner, member)| match member {
            Member::Field => self.types.get(&decl_owner)?.fields.get(name),
            Member::EnumConstant => None,
        })
    }

    /// Find a field or enum constant in `owner` or its known supertypes.
    fn lookup_member(&self, owner: &str, name: &str) -> Option<(String, Member)> {
        let mut queue = VecDeque::from([owner.to_string()]);
        let mut seen = HashSet::new();
        while let Some(ty) = queue.pop_front() {
            if !seen.insert(ty.clone()) {
                continue;
            }
            let Some(info) = self.types.get(&ty) else { continue };
            if info.fields.contains_key(name) {
                return Some((ty, Member::Field));
            }
            if info.enum_constants.iter().any(|c| c == name) {
                return Some((ty, Member::EnumConstant));
            }
            queue.extend(info.supertypes.iter().cloned());
        }
        None
    }

    fn method_return(&self, owner: &str, name: &str) -> Option<Option<JavaType>> {
        let mut queue = VecDeque::from([owner.to_string()]);
        let mut seen = HashSet::new();
        while let Some(ty) = queue.pop_front() {
            if !seen.insert(ty.clone()) {
                continue;
            }
            let Some(info) = self.types.get(&ty) else { continue };
            if let Some(ret) = info.methods.get(name) {
                return Some(ret.clone());
            }
            queue.extend(info.supertypes.iter().cloned());
        }
        None
    }

    fn direct_supertypes(&self, name: &str) -> Vec<String> {
        if let Some(info) = self.types.get(name) {
            return info.supertypes.clone();
        }
        BUILTIN_SUPERTYPES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, sups)| sups.iter().map(|s| s.to_string()).collect())
            .unwrap_or_default()
    }

    fn class_extends(&self, sub: &str, sup: &str) -> bool {
        let mut queue = VecDeque::from([sub.to_string()]);
        let mut seen = HashSet::new();
        while let Some(ty) = queue.pop_front() {
            if ty == sup {
                return true;
            }
            if seen.insert(ty.clone()) {
                queue.extend(self.direct_supertypes(&ty));
            }
        }
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Member {
    Field,
    EnumConstant,
}

fn collect_decls<'u>(types: &'u [TypeDecl], out: &mut Vec<&'u TypeDecl>) {
    for decl in types {
        out.push(decl);
        collect_decls(&decl.types, out);
    }
}

impl SemanticModel for SourceModel {
    fn symbol_of(&self, expr: &Expr) -> Option<Symbol> {
        self.symbols.get(&expr.strip_parens().span()).cloned()
    }

    fn type_of(&self, expr: &Expr) -> Option<JavaType> {
        self.expr_types.get(&expr.strip_parens().span()).cloned()
    }

    fn resolve_type(&self, ty: &TypeName) -> Option<JavaType> {
        type_from_name(ty)
    }

    fn is_enum_type(&self, ty: &JavaType) -> bool {
        match ty {
            JavaType::Class(name) => self.types.get(name).map(|t| t.kind == TypeKind::Enum).unwrap_or(false),
            _ => false,
        }
    }

    fn enum_constants_of(&self, ty: &JavaType) -> Vec<String> {
        match ty {
            JavaType::Class(name) => self.types.get(name).map(|t| t.enum_constants.clone()).unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    fn is_subtype(&self, sub: &JavaType, sup: &JavaType) -> bool {
        if sub == sup {
            return true;
        }
        match (sub, sup) {
            (JavaType::Primitive(a), JavaType::Primitive(b)) => a.widens_to(*b),
            (JavaType::Null, s) => s.is_reference(),
            (s, JavaType::Class(o)) if o == "Object" => s.is_reference(),
            (JavaType::Array(a), JavaType::Array(b)) => a.is_reference() && b.is_reference() && self.is_subtype(a, b),
            (JavaType::Array(_), JavaType::Class(n)) => n == "Cloneable" || n == "Serializable",
            (JavaType::Class(a), JavaType::Class(b)) => self.class_extends(a, b),
            _ => false,
        }
    }

    fn type_parameter_count(&self, ty: &TypeName) -> usize {
        if let Some(info) = self.types.get(&ty.name) {
            return info.type_params;
        }
        BUILTIN_TYPE_PARAMS
            .iter()
            .find(|(n, _)| *n == ty.name)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    fn constant_value(&self, expr: &Expr) -> Option<ConstValue> {
        self.constants.get(&expr.strip_parens().span()).cloned()
    }

    fn is_volatile(&self, symbol: &Symbol) -> bool {
        match symbol {
            Symbol::Field { owner, name } => self.field_info(owner, name).map(|f| f.is_volatile).unwrap_or(false),
            _ => false,
        }
    }

    fn is_suppressed(&self, span: Span, rule: &str) -> bool {
        self.suppressions
            .iter()
            .any(|(s, values)| s.contains(span) && values.iter().any(|v| v == rule || v == "all"))
    }
}

/// Declared type of a written type name; `None` for `var`.
pub fn type_from_name(ty: &TypeName) -> Option<JavaType> {
    if ty.is_var() || ty.name.is_empty() {
        return None;
    }
    let mut base = match ty.name.as_str() {
        "void" => JavaType::Void,
        name => match name.parse::<Primitive>() {
            Ok(p) => JavaType::Primitive(p),
            Err(_) => JavaType::Class(name.to_string()),
        },
    };
    for _ in 0..ty.array_dims {
        base = JavaType::Array(Box::new(base));
    }
    Some(base)
}

// -------------------------------------------------------------------
// Body walk
// -------------------------------------------------------------------

struct Local {
    name: String,
    symbol: Symbol,
    ty: Option<JavaType>,
    constant: Option<ConstValue>,
}

struct Walker<'m, 's> {
    model: &'m mut SourceModel,
    source: &'s str,
    scopes: Vec<Vec<Local>>,
    type_stack: Vec<String>,
}

impl<'m, 's> Walker<'m, 's> {
    fn type_decl(&mut self, decl: &TypeDecl) {
        self.type_stack.push(decl.name.clone());
        let saved = std::mem::take(&mut self.scopes);
        self.members(decl);
        self.scopes = saved;
        self.type_stack.pop();
    }

    /// Local and anonymous classes see the enclosing locals.
    fn local_type_decl(&mut self, decl: &TypeDecl) {
        self.model.collect_type(decl);
        self.model.fold_field_constants(std::slice::from_ref(decl), self.source);
        self.type_stack.push(decl.name.clone());
        self.scopes.push(Vec::new());
        self.members(decl);
        self.scopes.pop();
        self.type_stack.pop();
    }

    fn members(&mut self, decl: &TypeDecl) {
        for constant in &decl.enum_constants {
            for arg in &constant.args {
                self.expr(arg);
            }
        }
        for field in &decl.fields {
            for d in &field.declarators {
                if let Some(init) = &d.init {
                    self.expr(init);
                }
            }
        }
        for init in &decl.initializers {
            self.block(init);
        }
        for method in &decl.methods {
            self.scopes.push(Vec::new());
            for param in &method.params {
                self.declare_param(param);
            }
            if let Some(body) = &method.body {
                self.block(body);
            }
            self.scopes.pop();
        }
        for nested in &decl.types {
            self.type_decl(nested);
        }
    }

    fn declare(&mut self, name: &str, decl: Span, ty: Option<JavaType>, constant: Option<ConstValue>) {
        if self.scopes.is_empty() {
            self.scopes.push(Vec::new());
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.push(Local {
                name: name.to_string(),
                symbol: Symbol::Local { name: name.to_string(), decl },
                ty,
                constant,
            });
        }
    }

    fn declare_param(&mut self, param: &Param) {
        self.declare(&param.name, param.name_span, type_from_name(&param.ty), None);
    }

    fn block(&mut self, block: &Block) {
        self.scopes.push(Vec::new());
        for stmt in &block.stmts {
            self.stmt(stmt);
        }
        self.scopes.pop();
    }

    fn local_var(&mut self, decl: &LocalVarDecl) {
        let is_final = decl.modifiers.has("final");
        for d in &decl.declarators {
            if let Some(init) = &d.init {
                self.expr(init);
            }
            let ty = type_from_name(&d.declared_type(&decl.ty)).or_else(|| d.init.as_ref().and_then(|i| self.model.type_of(i)));
            let constant = if is_final {
                d.init.as_ref().and_then(|i| self.model.constant_value(i))
            } else {
                None
            };
            self.declare(&d.name, d.name_span, ty, constant);
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(b) => self.block(b),
            Stmt::If(s) => {
                self.expr(&s.condition);
                self.stmt(&s.then);
                if let Some(e) = &s.otherwise {
                    self.stmt(e);
                }
            }
            Stmt::Switch(s) => self.switch(s),
            Stmt::Expr(s) => self.expr(&s.expr),
            Stmt::LocalVar(d) => self.local_var(d),
            Stmt::Return(r) => {
                if let Some(v) = &r.value {
                    self.expr(v);
                }
            }
            Stmt::Throw(t) => self.expr(&t.value),
            Stmt::Yield(y) => self.expr(&y.value),
            Stmt::Loop(l) => {
                self.scopes.push(Vec::new());
                for e in &l.other_exprs {
                    self.expr(e);
                }
                for d in &l.decls {
                    self.local_var(d);
                }
                if let Some(c) = &l.condition {
                    self.expr(c);
                }
                self.stmt(&l.body);
                self.scopes.pop();
            }
            Stmt::Labeled(l) => self.stmt(&l.body),
            Stmt::Try(t) => {
                self.scopes.push(Vec::new());
                for r in &t.resources {
                    self.local_var(r);
                }
                self.block(&t.body);
                self.scopes.pop();
                for c in &t.catches {
                    self.scopes.push(Vec::new());
                    if let Some(p) = &c.param {
                        self.declare_param(p);
                    }
                    self.block(&c.body);
                    self.scopes.pop();
                }
                if let Some(f) = &t.finally {
                    self.block(f);
                }
            }
            Stmt::Synchronized(s) => {
                self.expr(&s.lock);
                self.block(&s.body);
            }
            Stmt::LocalClass(decl) => self.local_type_decl(decl),
            Stmt::Break(_) | Stmt::Continue(_) | Stmt::Empty(_) | Stmt::Other(_) => {}
        }
    }

    fn switch(&mut self, node: &SwitchNode) {
        self.expr(&node.selector);
        let enum_owner = match self.model.type_of(&node.selector) {
            Some(JavaType::Class(name)) if self.model.types.get(&name).map(|t| t.kind) == Some(TypeKind::Enum) => Some(name),
            _ => None,
        };

        for case in &node.cases {
            self.scopes.push(Vec::new());
            for label in &case.labels {
                match label {
                    CaseLabel::Expr(Expr::Name(n)) if enum_owner.is_some() => {
                        if let Some(owner) = &enum_owner {
                            self.model
                                .symbols
                                .insert(n.span, Symbol::EnumConstant { owner: owner.clone(), name: n.name.clone() });
                            self.model.expr_types.insert(n.span, JavaType::Class(owner.clone()));
                        }
                    }
                    CaseLabel::Expr(e) => self.expr(e),
                    CaseLabel::Pattern(Pattern { kind: PatternKind::Type { ty, binding: Some(b) }, .. }) => {
                        self.declare(&b.name, b.span, type_from_name(ty), None);
                    }
                    _ => {}
                }
            }
            if let Some(g) = &case.guard {
                self.expr(g);
            }
            for stmt in &case.body {
                self.stmt(stmt);
            }
            self.scopes.pop();
        }
    }

    fn lookup_local(&self, name: &str) -> Option<&Local> {
        self.scopes.iter().rev().flat_map(|s| s.iter().rev()).find(|l| l.name == name)
    }

    fn resolve_member(&mut self, owner: &str, name: &str, span: Span) {
        let Some((decl_owner, member)) = self.model.lookup_member(owner, name) else {
            return;
        };
        match member {
            Member::EnumConstant => {
                self.model
                    .symbols
                    .insert(span, Symbol::EnumConstant { owner: decl_owner.clone(), name: name.to_string() });
                self.model.expr_types.insert(span, JavaType::Class(decl_owner));
            }
            Member::Field => {
                let info = self.model.types.get(&decl_owner).and_then(|t| t.fields.get(name)).cloned();
                self.model
                    .symbols
                    .insert(span, Symbol::Field { owner: decl_owner, name: name.to_string() });
                if let Some(info) = info {
                    if let Some(ty) = info.ty {
                        self.model.expr_types.insert(span, ty);
                    }
                    if let Some(c) = info.constant.filter(|_| info.is_final) {
                        self.model.constants.insert(span, c);
                    }
                }
            }
        }
    }

    fn name(&mut self, n: &NameExpr) {
        if let Some(local) = self.lookup_local(&n.name) {
            let (symbol, ty, constant) = (local.symbol.clone(), local.ty.clone(), local.constant.clone());
            self.model.symbols.insert(n.span, symbol);
            if let Some(ty) = ty {
                self.model.expr_types.insert(n.span, ty);
            }
            if let Some(c) = constant {
                self.model.constants.insert(n.span, c);
            }
            return;
        }
        let owners: Vec<String> = self.type_stack.iter().rev().cloned().collect();
        for owner in owners {
            if self.model.lookup_member(&owner, &n.name).is_some() {
                self.resolve_member(&owner, &n.name, n.span);
                return;
            }
        }
        if self.model.types.contains_key(&n.name) || n.name.starts_with(|c: char| c.is_ascii_uppercase()) {
            self.model.symbols.insert(n.span, Symbol::Type(n.name.clone()));
        }
    }

    fn field_access(&mut self, fa: &FieldAccess) {
        self.expr(&fa.object);
        let object = fa.object.strip_parens();
        if let Expr::This(_) = object {
            if let Some(owner) = self.type_stack.last().cloned() {
                self.resolve_member(&owner, &fa.field, fa.span);
            }
            return;
        }
        if let Some(Symbol::Type(owner)) = self.model.symbol_of(object) {
            self.resolve_member(&owner, &fa.field, fa.span);
            return;
        }
        match self.model.type_of(object) {
            Some(JavaType::Class(owner)) => self.resolve_member(&owner, &fa.field, fa.span),
            Some(JavaType::Array(_)) if fa.field == "length" => {
                self.model.expr_types.insert(fa.span, JavaType::Primitive(Primitive::Int));
            }
            _ => {}
        }
    }

    fn call_type(&self, call: &CallExpr) -> Option<JavaType> {
        let owner = match &call.receiver {
            None => self.type_stack.last().cloned(),
            Some(r) => match self.model.type_of(r) {
                Some(JavaType::Class(c)) => Some(c),
                _ => match self.model.symbol_of(r) {
                    Some(Symbol::Type(t)) => Some(t),
                    _ => None,
                },
            },
        };
        if let Some(owner) = owner {
            if let Some(ret) = self.model.method_return(&owner, &call.name) {
                return ret;
            }
        }
        let p = |p: Primitive| Some(JavaType::Primitive(p));
        match call.name.as_str() {
            "hashCode" | "ordinal" | "length" | "size" | "intValue" | "compareTo" | "indexOf" => p(Primitive::Int),
            "charAt" => p(Primitive::Char),
            "equals" | "isEmpty" | "contains" | "startsWith" | "endsWith" | "equalsIgnoreCase" => p(Primitive::Boolean),
            "longValue" => p(Primitive::Long),
            "doubleValue" => p(Primitive::Double),
            "toString" | "name" | "trim" | "toLowerCase" | "toUpperCase" | "substring" => Some(JavaType::class("String")),
            _ => None,
        }
    }

    fn expr(&mut self, expr: &Expr) {
        let span = expr.span();
        let ty = match expr {
            Expr::Name(n) => {
                self.name(n);
                return;
            }
            Expr::Field(fa) => {
                self.field_access(fa);
                return;
            }
            Expr::This(_) => self.type_stack.last().map(|t| JavaType::Class(t.clone())),
            Expr::Literal(lit) => Some(literal_type(lit.kind)),
            Expr::Binary(b) => {
                self.expr(&b.left);
                self.expr(&b.right);
                binary_type(&b.op, self.model.type_of(&b.left), self.model.type_of(&b.right))
            }
            Expr::Unary(u) => {
                self.expr(&u.operand);
                let operand = self.model.type_of(&u.operand);
                match u.op.as_str() {
                    "!" => Some(JavaType::Primitive(Primitive::Boolean)),
                    "++" | "--" => operand,
                    _ => operand.and_then(|t| t.unboxed()).map(|p| JavaType::Primitive(promote(p))),
                }
            }
            Expr::InstanceOf(io) => {
                self.expr(&io.operand);
                if let InstanceOfTarget::Type { ty, binding: Some(b) } = &io.target {
                    self.declare(&b.name, b.span, type_from_name(ty), None);
                }
                Some(JavaType::Primitive(Primitive::Boolean))
            }
            Expr::Assign(a) => {
                self.expr(&a.target);
                self.expr(&a.value);
                self.model.type_of(&a.target)
            }
            Expr::Call(c) => {
                if let Some(r) = &c.receiver {
                    self.expr(r);
                }
                for arg in &c.args {
                    self.expr(arg);
                }
                self.call_type(c)
            }
            Expr::Paren(p) => {
                self.expr(&p.inner);
                self.model.type_of(&p.inner)
            }
            Expr::Switch(s) => {
                self.switch(s);
                None
            }
            Expr::Lambda(l) => {
                self.scopes.push(Vec::new());
                for p in &l.params {
                    self.declare(&p.name, p.span, None, None);
                }
                match &l.body {
                    LambdaBody::Expr(e) => self.expr(e),
                    LambdaBody::Block(b) => self.block(b),
                }
                self.scopes.pop();
                None
            }
            Expr::Cast(c) => {
                self.expr(&c.operand);
                type_from_name(&c.ty)
            }
            Expr::New(n) => {
                for arg in &n.args {
                    self.expr(arg);
                }
                if let Some(body) = &n.body {
                    self.local_type_decl(body);
                }
                type_from_name(&n.ty)
            }
            Expr::Conditional(c) => {
                self.expr(&c.condition);
                self.expr(&c.then);
                self.expr(&c.otherwise);
                match (self.model.type_of(&c.then), self.model.type_of(&c.otherwise)) {
                    (Some(a), Some(b)) if a == b => Some(a),
                    (Some(JavaType::Null), Some(t)) | (Some(t), Some(JavaType::Null)) => Some(t),
                    _ => None,
                }
            }
            Expr::Other(o) => {
                for child in &o.children {
                    self.expr(child);
                }
                None
            }
        };
        if let Some(ty) = ty {
            self.model.expr_types.insert(span, ty);
        }
        let folded = {
            let model = &*self.model;
            fold_node(expr, self.source, &|e| model.constant_value(e))
        };
        if let Some(value) = folded {
            self.model.constants.insert(span, value);
        }
    }
}

fn literal_type(kind: LiteralKind) -> JavaType {
    match kind {
        LiteralKind::Int => JavaType::Primitive(Primitive::Int),
        LiteralKind::Long => JavaType::Primitive(Primitive::Long),
        LiteralKind::Float => JavaType::Primitive(Primitive::Float),
        LiteralKind::Double => JavaType::Primitive(Primitive::Double),
        LiteralKind::Char => JavaType::Primitive(Primitive::Char),
        LiteralKind::Bool => JavaType::Primitive(Primitive::Boolean),
        LiteralKind::String => JavaType::class("String"),
        LiteralKind::Null => JavaType::Null,
    }
}

/// Unary numeric promotion.
fn promote(p: Primitive) -> Primitive {
    match p {
        Primitive::Byte | Primitive::Short | Primitive::Char => Primitive::Int,
        other => other,
    }
}

fn binary_type(op: &str, left: Option<JavaType>, right: Option<JavaType>) -> Option<JavaType> {
    let boolean = Some(JavaType::Primitive(Primitive::Boolean));
    match op {
        "==" | "!=" | "<" | ">" | "<=" | ">=" | "&&" | "||" => return boolean,
        "+" if left.as_ref().map(JavaType::is_string).unwrap_or(false)
            || right.as_ref().map(JavaType::is_string).unwrap_or(false) =>
        {
            return Some(JavaType::class("String"));
        }
        _ => {}
    }
    let l = left?.unboxed()?;
    if matches!(op, "<<" | ">>" | ">>>") {
        return Some(JavaType::Primitive(promote(l)));
    }
    let r = right?.unboxed()?;
    if l == Primitive::Boolean && r == Primitive::Boolean {
        return matches!(op, "&" | "|" | "^").then_some(JavaType::Primitive(Primitive::Boolean));
    }
    let widest = [Primitive::Double, Primitive::Float, Primitive::Long]
        .into_iter()
        .find(|p| l == *p || r == *p)
        .unwrap_or(Primitive::Int);
    Some(JavaType::Primitive(widest))
}

// -------------------------------------------------------------------
// Constant folding
// -------------------------------------------------------------------

/// Fold one node given a way to fold its operands. Names and field
/// accesses are resolved by the caller.
fn fold_node(expr: &Expr, source: &str, operand: &dyn Fn(&Expr) -> Option<ConstValue>) -> Option<ConstValue> {
    match expr {
        Expr::Literal(lit) => literal_value(lit, source),
        Expr::Paren(p) => operand(&p.inner),
        Expr::Unary(u) => unary_const(&u.op, operand(&u.operand)?),
        Expr::Binary(b) => binary_const(&b.op, operand(&b.left)?, operand(&b.right)?),
        Expr::Cast(c) => cast_const(&c.ty, operand(&c.operand)?),
        _ => None,
    }
}

fn literal_value(lit: &Literal, source: &str) -> Option<ConstValue> {
    let text = lit.span.text(source);
    match lit.kind {
        LiteralKind::Int => parse_integer(text).map(|v| ConstValue::Int(i64::from(v as i32))),
        LiteralKind::Long => parse_integer(text.trim_end_matches(['l', 'L'])).map(|v| ConstValue::Long(v as i64)),
        LiteralKind::Char => {
            let inner = text.strip_prefix('\'')?.strip_suffix('\'')?;
            let unescaped = unescape(inner)?;
            let mut chars = unescaped.chars();
            let c = chars.next()?;
            chars.next().is_none().then_some(ConstValue::Char(c as u32))
        }
        LiteralKind::String => {
            if text.starts_with("\"\"\"") {
                return None;
            }
            let inner = text.strip_prefix('"')?.strip_suffix('"')?;
            unescape(inner).map(ConstValue::Str)
        }
        LiteralKind::Bool => Some(ConstValue::Bool(text == "true")),
        LiteralKind::Float | LiteralKind::Double => Some(ConstValue::Float(text.to_string())),
        LiteralKind::Null => None,
    }
}

fn parse_integer(text: &str) -> Option<u64> {
    let cleaned = text.replace('_', "");
    let lower = cleaned.to_ascii_lowercase();
    let (digits, radix) = if let Some(hex) = lower.strip_prefix("0x") {
        (hex, 16)
    } else if let Some(bin) = lower.strip_prefix("0b") {
        (bin, 2)
    } else if lower.len() > 1 && lower.starts_with('0') {
        (&lower[1..], 8)
    } else {
        (lower.as_str(), 10)
    };
    u64::from_str_radix(digits, radix).ok()
}

fn unescape(text: &str) -> Option<String> {
    let mut out = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            's' => out.push(' '),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            '\\' => out.push('\\'),
            'u' => {
                while chars.peek() == Some(&'u') {
                    chars.next();
                }
                let hex: String = chars.by_ref().take(4).collect();
                out.push(char::from_u32(u32::from_str_radix(&hex, 16).ok()?)?);
            }
            d @ '0'..='7' => {
                let mut value = d.to_digit(8)?;
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(next) if value * 8 + next <= 0o377 => {
                            value = value * 8 + next;
                            chars.next();
                        }
                        _ => break,
                    }
                }
                out.push(char::from_u32(value)?);
            }
            _ => return None,
        }
    }
    Some(out)
}

fn concat_text(value: &ConstValue) -> Option<String> {
    match value {
        ConstValue::Int(v) | ConstValue::Long(v) => Some(v.to_string()),
        ConstValue::Char(c) => char::from_u32(*c).map(String::from),
        ConstValue::Bool(b) => Some(b.to_string()),
        ConstValue::Str(s) => Some(s.clone()),
        ConstValue::Float(_) => None,
    }
}

fn unary_const(op: &str, value: ConstValue) -> Option<ConstValue> {
    match (op, value) {
        ("!", ConstValue::Bool(b)) => Some(ConstValue::Bool(!b)),
        ("-", ConstValue::Long(v)) => Some(ConstValue::Long(v.wrapping_neg())),
        ("~", ConstValue::Long(v)) => Some(ConstValue::Long(!v)),
        ("+", ConstValue::Long(v)) => Some(ConstValue::Long(v)),
        (op, value) => {
            let v = value.as_integral()? as i32;
            let folded = match op {
                "-" => v.wrapping_neg(),
                "~" => !v,
                "+" => v,
                _ => return None,
            };
            Some(ConstValue::Int(i64::from(folded)))
        }
    }
}

fn binary_const(op: &str, left: ConstValue, right: ConstValue) -> Option<ConstValue> {
    if op == "+" && (matches!(left, ConstValue::Str(_)) || matches!(right, ConstValue::Str(_))) {
        return Some(ConstValue::Str(format!("{}{}", concat_text(&left)?, concat_text(&right)?)));
    }
    let long = matches!(left, ConstValue::Long(_)) || matches!(right, ConstValue::Long(_));
    let (a, b) = (left.as_integral()?, right.as_integral()?);
    if long {
        let shift = (b & 63) as u32;
        let v = match op {
            "+" => a.wrapping_add(b),
            "-" => a.wrapping_sub(b),
            "*" => a.wrapping_mul(b),
            "/" => a.checked_div(b)?,
            "%" => a.checked_rem(b)?,
            "&" => a & b,
            "|" => a | b,
            "^" => a ^ b,
            "<<" => a.wrapping_shl(shift),
            ">>" => a.wrapping_shr(shift),
            ">>>" => ((a as u64) >> shift) as i64,
            _ => return None,
        };
        return Some(ConstValue::Long(v));
    }
    let (a, b) = (a as i32, b as i32);
    let shift = (b & 31) as u32;
    let v = match op {
        "+" => a.wrapping_add(b),
        "-" => a.wrapping_sub(b),
        "*" => a.wrapping_mul(b),
        "/" => a.checked_div(b)?,
        "%" => a.checked_rem(b)?,
        "&" => a & b,
        "|" => a | b,
        "^" => a ^ b,
        "<<" => a.wrapping_shl(shift),
        ">>" => a.wrapping_shr(shift),
        ">>>" => ((a as u32) >> shift) as i32,
        _ => return None,
    };
    Some(ConstValue::Int(i64::from(v)))
}

fn cast_const(ty: &TypeName, value: ConstValue) -> Option<ConstValue> {
    if ty.array_dims > 0 {
        return None;
    }
    match ty.name.as_str() {
        "String" => matches!(value, ConstValue::Str(_)).then_some(value),
        "int" => Some(ConstValue::Int(i64::from(value.as_integral()? as i32))),
        "long" => Some(ConstValue::Long(value.as_integral()?)),
        "short" => Some(ConstValue::Int(i64::from(value.as_integral()? as i16))),
        "byte" => Some(ConstValue::Int(i64::from(value.as_integral()? as i8))),
        "char" => Some(ConstValue::Char(u32::from(value.as_integral()? as u16))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_string;
    use crate::tree::{walk, Node};

    fn parse(source: &str) -> crate::parser::ParsedFile {
        parse_string(source.to_string(), "Test.java".to_string()).expect("Should parse")
    }

    /// Every expression in method bodies whose text equals `needle`.
    fn find_exprs<'a>(parsed: &'a crate::parser::ParsedFile, needle: &str) -> Vec<&'a Expr> {
        let mut found = Vec::new();
        let mut decls = Vec::new();
        collect_decls(&parsed.unit.types, &mut decls);
        for decl in decls {
            for method in &decl.methods {
                let Some(body) = &method.body else { continue };
                for stmt in &body.stmts {
                    walk(Node::Stmt(stmt), &mut |n| {
                        if let Node::Expr(e) = n {
                            if e.span().text(&parsed.source) == needle {
                                found.push(e);
                            }
                        }
                        true
                    });
                }
            }
        }
        found
    }

    #[test]
    fn test_this_field_and_bare_field_share_symbol() {
        let parsed = parse("class A { int x; void f() { if (this.x == 1) {} if (x == 2) {} } }");
        let qualified = find_exprs(&parsed, "this.x")[0];
        let bare = find_exprs(&parsed, "x")[0];
        assert!(parsed.model.same_symbol(qualified, bare));
        assert_eq!(
            parsed.model.symbol_of(bare),
            Some(Symbol::Field { owner: "A".into(), name: "x".into() })
        );
    }

    #[test]
    fn test_local_shadows_field() {
        let parsed = parse("class A { int x; void f() { int x = 0; x++; } }");
        let uses = find_exprs(&parsed, "x");
        assert!(matches!(parsed.model.symbol_of(uses[0]), Some(Symbol::Local { .. })));
        assert_eq!(parsed.model.type_of(uses[0]), Some(JavaType::Primitive(Primitive::Int)));
    }

    #[test]
    fn test_enum_constants_and_case_labels() {
        let parsed = parse(
            "enum Color { RED, GREEN, BLUE }\n\
             class A { int f(Color c) { switch (c) { case RED -> { return 1; } default -> { return 2; } } } }",
        );
        let color = JavaType::class("Color");
        assert!(parsed.model.is_enum_type(&color));
        assert_eq!(parsed.model.enum_constants_of(&color), vec!["RED", "GREEN", "BLUE"]);
        let label = find_exprs(&parsed, "RED")[0];
        assert_eq!(
            parsed.model.symbol_of(label),
            Some(Symbol::EnumConstant { owner: "Color".into(), name: "RED".into() })
        );
    }

    #[test]
    fn test_qualified_enum_constant() {
        let parsed = parse("enum E { A, B }\nclass T { boolean f(E e) { return e == E.B; } }");
        let access = find_exprs(&parsed, "E.B")[0];
        assert_eq!(parsed.model.symbol_of(access), Some(Symbol::EnumConstant { owner: "E".into(), name: "B".into() }));
        assert_eq!(parsed.model.type_of(access), Some(JavaType::class("E")));
    }

    #[test]
    fn test_constant_folding() {
        let parsed = parse(
            "class A { static final int K = 2 * 3 + 1; static final String S = \"a\" + 'b' + K;\n\
             void f(int i) { if (i == K) {} if (i == 'a') {} if (i == -0x10) {} String s = S; } }",
        );
        let k = find_exprs(&parsed, "K")[0];
        assert_eq!(parsed.model.constant_value(k), Some(ConstValue::Int(7)));
        let ch = find_exprs(&parsed, "'a'")[0];
        assert_eq!(parsed.model.constant_value(ch).and_then(|c| c.as_integral()), Some(97));
        let neg = find_exprs(&parsed, "-0x10")[0];
        assert_eq!(parsed.model.constant_value(neg), Some(ConstValue::Int(-16)));
        let s = find_exprs(&parsed, "S")[0];
        assert_eq!(parsed.model.constant_value(s), Some(ConstValue::Str("ab7".into())));
    }

    #[test]
    fn test_escaped_char_constants() {
        let parsed = parse("class A { void f(int i) { if (i == '\\n') {} if (i == '\\u0041') {} } }");
        let newline = find_exprs(&parsed, "'\\n'")[0];
        assert_eq!(parsed.model.constant_value(newline).and_then(|c| c.as_integral()), Some(10));
        let unicode = find_exprs(&parsed, "'\\u0041'")[0];
        assert_eq!(parsed.model.constant_value(unicode).and_then(|c| c.as_integral()), Some(65));
    }

    #[test]
    fn test_local_and_anonymous_class_members() {
        let parsed = parse(
            "class A { void f() { enum E { X, Y } E e = E.Y;\n\
             Object o = new Object() { int k; void g() { k = 1; } }; } }",
        );
        assert!(parsed.model.is_enum_type(&JavaType::class("E")));
        let access = find_exprs(&parsed, "E.Y")[0];
        assert_eq!(parsed.model.symbol_of(access), Some(Symbol::EnumConstant { owner: "E".into(), name: "Y".into() }));

        let body = parsed.unit.types[0].methods[0].body.as_ref().expect("Should have a body");
        let Stmt::LocalVar(var) = &body.stmts[2] else { panic!("expected local var") };
        let Some(Expr::New(new)) = &var.declarators[0].init else { panic!("expected new") };
        let anon = new.body.as_ref().expect("Should lower the anonymous body");
        let g = anon.methods[0].body.as_ref().expect("Should have a body");
        let Stmt::Expr(stmt) = &g.stmts[0] else { panic!("expected expression statement") };
        let Expr::Assign(assign) = &stmt.expr else { panic!("expected assignment") };
        assert_eq!(
            parsed.model.symbol_of(&assign.target),
            Some(Symbol::Field { owner: anon.name.clone(), name: "k".into() })
        );
    }

    #[test]
    fn test_non_final_field_is_not_constant() {
        let parsed = parse("class A { static int K = 1; void f(int i) { if (i == K) {} } }");
        let k = find_exprs(&parsed, "K")[0];
        assert_eq!(parsed.model.constant_value(k), None);
    }

    #[test]
    fn test_subtyping() {
        let parsed = parse("class Shape {} class Circle extends Shape implements Comparable<Circle> {}");
        let model = &parsed.model;
        assert!(model.is_subtype(&JavaType::class("Circle"), &JavaType::class("Shape")));
        assert!(model.is_subtype(&JavaType::class("Circle"), &JavaType::class("Comparable")));
        assert!(model.is_subtype(&JavaType::class("Integer"), &JavaType::class("Number")));
        assert!(model.is_subtype(&JavaType::class("ArrayList"), &JavaType::class("Iterable")));
        assert!(model.is_subtype(&JavaType::class("Unknown"), &JavaType::class("Object")));
        assert!(!model.is_subtype(&JavaType::class("String"), &JavaType::class("Number")));
        assert!(!model.is_subtype(&JavaType::class("Shape"), &JavaType::class("Circle")));
        assert!(model.is_subtype(&JavaType::Primitive(Primitive::Char), &JavaType::Primitive(Primitive::Int)));
    }

    #[test]
    fn test_instanceof_binding_type() {
        let parsed = parse("class A { void f(Object o) { if (o instanceof String s && s.isEmpty()) {} } }");
        let s = find_exprs(&parsed, "s")[0];
        assert_eq!(parsed.model.type_of(s), Some(JavaType::class("String")));
        let call = find_exprs(&parsed, "s.isEmpty()")[0];
        assert_eq!(parsed.model.type_of(call), Some(JavaType::Primitive(Primitive::Boolean)));
    }

    #[test]
    fn test_volatile_and_suppression() {
        let parsed = parse(
            "class A { volatile int v; int w;\n\
             @SuppressWarnings(\"IfChainToSwitch\") void f() { v = 1; } void g() { w = 1; } }",
        );
        let model = &parsed.model;
        assert!(model.is_volatile(&Symbol::Field { owner: "A".into(), name: "v".into() }));
        assert!(!model.is_volatile(&Symbol::Field { owner: "A".into(), name: "w".into() }));
        let v = find_exprs(&parsed, "v")[0];
        let w = find_exprs(&parsed, "w")[0];
        assert!(model.is_suppressed(v.span(), "IfChainToSwitch"));
        assert!(!model.is_suppressed(v.span(), "RefactorSwitch"));
        assert!(!model.is_suppressed(w.span(), "IfChainToSwitch"));
    }

    #[test]
    fn test_type_parameter_count() {
        let parsed = parse("class Box<T> { java.util.List raw; }");
        let raw = &parsed.unit.types[0].fields[0].ty;
        assert_eq!(parsed.model.type_parameter_count(raw), 1);
        let boxed = TypeName { name: "Box".into(), type_args: None, array_dims: 0, span: Span::default() };
        assert_eq!(parsed.model.type_parameter_count(&boxed), 1);
    }

    #[test]
    fn test_parse_integer_radixes() {
        assert_eq!(parse_integer("1_000"), Some(1000));
        assert_eq!(parse_integer("0x1F"), Some(31));
        assert_eq!(parse_integer("0b101"), Some(5));
        assert_eq!(parse_integer("017"), Some(15));
        assert_eq!(parse_integer("0"), Some(0));
    }
}
