//! Semantic queries consumed by the rewrite rules
//!
//! The rules never inspect declarations directly; they ask a
//! [`SemanticModel`]. Every query may answer "unknown" (`None` / `false`)
//! and callers treat unknown as "do not rewrite".

use std::fmt;

use serde::Serialize;
use strum_macros::{Display, EnumString};

use crate::tree::{Expr, Span, TypeName};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize)]
#[strum(serialize_all = "lowercase")]
pub enum Primitive {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl Primitive {
    pub fn is_integral(self) -> bool {
        matches!(self, Primitive::Byte | Primitive::Short | Primitive::Char | Primitive::Int | Primitive::Long)
    }

    pub fn boxed_name(self) -> &'static str {
        match self {
            Primitive::Boolean => "Boolean",
            Primitive::Byte => "Byte",
            Primitive::Short => "Short",
            Primitive::Char => "Character",
            Primitive::Int => "Integer",
            Primitive::Long => "Long",
            Primitive::Float => "Float",
            Primitive::Double => "Double",
        }
    }

    /// Primitive widening: `self` converts to `to` without a cast.
    pub fn widens_to(self, to: Primitive) -> bool {
        use Primitive::*;
        if self == to {
            return true;
        }
        match self {
            Byte => matches!(to, Short | Int | Long | Float | Double),
            Short | Char => matches!(to, Int | Long | Float | Double),
            Int => matches!(to, Long | Float | Double),
            Long => matches!(to, Float | Double),
            Float => to == Double,
            Boolean | Double => false,
        }
    }
}

/// A resolved static type. Class types are identified by simple name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum JavaType {
    Primitive(Primitive),
    Class(String),
    Array(Box<JavaType>),
    Null,
    Void,
}

impl JavaType {
    pub fn class(name: &str) -> Self {
        JavaType::Class(name.to_string())
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, JavaType::Primitive(_))
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, JavaType::Class(_) | JavaType::Array(_) | JavaType::Null)
    }

    /// Unboxing conversion, also the identity for primitives.
    pub fn unboxed(&self) -> Option<Primitive> {
        match self {
            JavaType::Primitive(p) => Some(*p),
            JavaType::Class(name) => match name.as_str() {
                "Boolean" => Some(Primitive::Boolean),
                "Byte" => Some(Primitive::Byte),
                "Short" => Some(Primitive::Short),
                "Character" => Some(Primitive::Char),
                "Integer" => Some(Primitive::Int),
                "Long" => Some(Primitive::Long),
                "Float" => Some(Primitive::Float),
                "Double" => Some(Primitive::Double),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self, JavaType::Class(n) if n == "String")
    }
}

impl fmt::Display for JavaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JavaType::Primitive(p) => write!(f, "{}", p),
            JavaType::Class(n) => write!(f, "{}", n),
            JavaType::Array(inner) => write!(f, "{}[]", inner),
            JavaType::Null => write!(f, "null"),
            JavaType::Void => write!(f, "void"),
        }
    }
}

/// What a name resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Symbol {
    /// Local variable, parameter, pattern binding or lambda parameter,
    /// identified by its declaring span.
    Local { name: String, decl: Span },
    Field { owner: String, name: String },
    EnumConstant { owner: String, name: String },
    Type(String),
}

impl Symbol {
    pub fn simple_name(&self) -> &str {
        match self {
            Symbol::Local { name, .. } | Symbol::Field { name, .. } | Symbol::EnumConstant { name, .. } => name,
            Symbol::Type(name) => name,
        }
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Symbol::Local { .. } | Symbol::Field { .. })
    }
}

/// A folded compile-time constant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum ConstValue {
    Int(i64),
    Long(i64),
    Char(u32),
    Bool(bool),
    Str(String),
    /// Floating point values keep their source spelling.
    Float(String),
}

impl ConstValue {
    /// Integral view used to compare `'a'` with `97`.
    pub fn as_integral(&self) -> Option<i64> {
        match self {
            ConstValue::Int(v) | ConstValue::Long(v) => Some(*v),
            ConstValue::Char(c) => Some(i64::from(*c)),
            _ => None,
        }
    }

    /// Same value for the purposes of switch label uniqueness.
    pub fn same_label(&self, other: &ConstValue) -> bool {
        match (self.as_integral(), other.as_integral()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }
}

/// Read-only semantic queries over one compilation unit.
pub trait SemanticModel: Sync {
    fn symbol_of(&self, expr: &Expr) -> Option<Symbol>;

    fn same_symbol(&self, a: &Expr, b: &Expr) -> bool {
        match (self.symbol_of(a), self.symbol_of(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    fn type_of(&self, expr: &Expr) -> Option<JavaType>;

    fn resolve_type(&self, ty: &TypeName) -> Option<JavaType>;

    fn is_enum_type(&self, ty: &JavaType) -> bool;

    /// Enum constants in declaration order; empty when unknown.
    fn enum_constants_of(&self, ty: &JavaType) -> Vec<String>;

    /// Subtyping including primitive widening. Unknown types are
    /// unrelated to everything except themselves and `Object`.
    fn is_subtype(&self, sub: &JavaType, sup: &JavaType) -> bool;

    /// Number of type parameters a generic type declares, 0 if unknown.
    fn type_parameter_count(&self, ty: &TypeName) -> usize;

    fn constant_value(&self, expr: &Expr) -> Option<ConstValue>;

    fn is_volatile(&self, symbol: &Symbol) -> bool;

    /// `@SuppressWarnings("rule")` on an enclosing declaration.
    fn is_suppressed(&self, span: Span, rule: &str) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widening() {
        assert!(Primitive::Byte.widens_to(Primitive::Int));
        assert!(Primitive::Char.widens_to(Primitive::Int));
        assert!(!Primitive::Int.widens_to(Primitive::Char));
        assert!(!Primitive::Boolean.widens_to(Primitive::Int));
    }

    #[test]
    fn test_unboxed() {
        assert_eq!(JavaType::class("Integer").unboxed(), Some(Primitive::Int));
        assert_eq!(JavaType::class("Character").unboxed(), Some(Primitive::Char));
        assert_eq!(JavaType::class("Number").unboxed(), None);
    }

    #[test]
    fn test_const_same_label() {
        assert!(ConstValue::Char('a' as u32).same_label(&ConstValue::Int(97)));
        assert!(!ConstValue::Int(1).same_label(&ConstValue::Int(2)));
        assert!(ConstValue::Str("x".into()).same_label(&ConstValue::Str("x".into())));
    }

    #[test]
    fn test_primitive_display() {
        assert_eq!(Primitive::Int.to_string(), "int");
        assert_eq!(JavaType::Array(Box::new(JavaType::class("String"))).to_string(), "String[]");
    }
}
