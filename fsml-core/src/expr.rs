//! Expression model.
//!
//! Expressions form a single closed sum type. Integer and boolean forms only
//! differ at the leaves (`Literal`, `Ref`, `Neg`/`Not`); binary operators and
//! groups are shared and resolved by the typing rules in [`crate::infer`] and
//! [`crate::eval`].

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Static type of an attribute or expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Type {
    Int,
    Bool,
}

impl Type {
    /// Value an attribute of this type holds when it has no default.
    pub fn zero_value(self) -> Value {
        match self {
            Type::Int => Value::Int(0),
            Type::Bool => Value::Bool(false),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Type::Int => "int",
            Type::Bool => "bool",
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Type {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "int" => Ok(Type::Int),
            "bool" => Ok(Type::Bool),
            other => Err(CoreError::UnsupportedAttributeType {
                ty: other.to_string(),
            }),
        }
    }
}

/// Runtime value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Bool(bool),
}

impl Value {
    pub fn ty(&self) -> Type {
        match self {
            Value::Int(_) => Type::Int,
            Value::Bool(_) => Type::Bool,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Operator family, which decides the operand and result types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpClass {
    /// `int x int -> int`
    Arithmetic,
    /// `int x int -> bool`
    Relational,
    /// `T x T -> bool` for either type
    Equality,
    /// `bool x bool -> bool`
    Logical,
}

/// Binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinOp {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "&&")]
    And,
    #[serde(rename = "||")]
    Or,
}

impl BinOp {
    pub const ALL: [BinOp; 12] = [
        BinOp::Add,
        BinOp::Sub,
        BinOp::Mul,
        BinOp::Div,
        BinOp::Lt,
        BinOp::Gt,
        BinOp::Le,
        BinOp::Ge,
        BinOp::Eq,
        BinOp::Ne,
        BinOp::And,
        BinOp::Or,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }

    /// Looks up an operator by its source symbol.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.symbol() == symbol)
    }

    pub fn class(self) -> OpClass {
        match self {
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div => OpClass::Arithmetic,
            BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge => OpClass::Relational,
            BinOp::Eq | BinOp::Ne => OpClass::Equality,
            BinOp::And | BinOp::Or => OpClass::Logical,
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// An expression node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expr {
    /// Integer or boolean constant.
    Literal { value: Value },
    /// Reference to an attribute.
    Ref { name: String },
    /// Binary operation.
    Bin {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Integer negation (`-e`).
    Neg { operand: Box<Expr> },
    /// Boolean negation (`!e`).
    Not { operand: Box<Expr> },
    /// Source-level parentheses.
    Group { inner: Box<Expr> },
}

impl Expr {
    pub fn int(n: i64) -> Self {
        Expr::Literal {
            value: Value::Int(n),
        }
    }

    pub fn bool(b: bool) -> Self {
        Expr::Literal {
            value: Value::Bool(b),
        }
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Expr::Ref { name: name.into() }
    }

    pub fn bin(op: BinOp, left: Expr, right: Expr) -> Self {
        Expr::Bin {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn neg(operand: Expr) -> Self {
        Expr::Neg {
            operand: Box::new(operand),
        }
    }

    pub fn not(operand: Expr) -> Self {
        Expr::Not {
            operand: Box::new(operand),
        }
    }

    pub fn group(inner: Expr) -> Self {
        Expr::Group {
            inner: Box::new(inner),
        }
    }

    /// Returns true if the expression references no attribute.
    pub fn is_constant(&self) -> bool {
        match self {
            Expr::Literal { .. } => true,
            Expr::Ref { .. } => false,
            Expr::Bin { left, right, .. } => left.is_constant() && right.is_constant(),
            Expr::Neg { operand } | Expr::Not { operand } => operand.is_constant(),
            Expr::Group { inner } => inner.is_constant(),
        }
    }

    /// Collects the names of all referenced attributes, in source order.
    pub fn references(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_references(&mut names);
        names
    }

    fn collect_references<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expr::Literal { .. } => {}
            Expr::Ref { name } => names.push(name),
            Expr::Bin { left, right, .. } => {
                left.collect_references(names);
                right.collect_references(names);
            }
            Expr::Neg { operand } | Expr::Not { operand } => operand.collect_references(names),
            Expr::Group { inner } => inner.collect_references(names),
        }
    }
}

/// Renders the expression the way it would be written in a model.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal { value } => write!(f, "{}", value),
            Expr::Ref { name } => f.write_str(name),
            Expr::Bin { op, left, right } => write!(f, "{} {} {}", left, op, right),
            Expr::Neg { operand } => write!(f, "-{}", operand),
            Expr::Not { operand } => write!(f, "!{}", operand),
            Expr::Group { inner } => write!(f, "({})", inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_op_classes() {
        assert_eq!(BinOp::Div.class(), OpClass::Arithmetic);
        assert_eq!(BinOp::Ge.class(), OpClass::Relational);
        assert_eq!(BinOp::Ne.class(), OpClass::Equality);
        assert_eq!(BinOp::Or.class(), OpClass::Logical);
    }

    #[test]
    fn test_from_symbol() {
        for op in BinOp::ALL {
            assert_eq!(BinOp::from_symbol(op.symbol()), Some(op));
        }
        assert_eq!(BinOp::from_symbol("%"), None);
    }

    #[test]
    fn test_type_from_str() {
        assert_eq!("int".parse::<Type>().unwrap(), Type::Int);
        assert_eq!("bool".parse::<Type>().unwrap(), Type::Bool);
        assert!(matches!(
            "float".parse::<Type>(),
            Err(CoreError::UnsupportedAttributeType { ty }) if ty == "float"
        ));
    }

    #[test]
    fn test_is_constant() {
        let constant = Expr::bin(BinOp::Sub, Expr::int(20), Expr::int(7));
        assert!(constant.is_constant());

        let with_ref = Expr::bin(BinOp::Lt, Expr::reference("cnt"), constant);
        assert!(!with_ref.is_constant());
    }

    #[test]
    fn test_references_in_source_order() {
        let expr = Expr::bin(
            BinOp::Or,
            Expr::bin(BinOp::Gt, Expr::reference("a"), Expr::int(1)),
            Expr::group(Expr::not(Expr::reference("b"))),
        );
        assert_eq!(expr.references(), vec!["a", "b"]);
    }

    #[test]
    fn test_display() {
        let expr = Expr::bin(
            BinOp::Mul,
            Expr::int(20),
            Expr::group(Expr::bin(BinOp::Add, Expr::reference("cnt"), Expr::int(1))),
        );
        assert_eq!(expr.to_string(), "20 * (cnt + 1)");
        assert_eq!(Expr::not(Expr::bool(true)).to_string(), "!true");
    }

    #[test]
    fn test_serde_shape() {
        let expr = Expr::bin(BinOp::Lt, Expr::reference("count"), Expr::int(3));
        let json = serde_json::to_value(&expr).unwrap();
        assert_eq!(json["kind"], "bin");
        assert_eq!(json["op"], "<");
        assert_eq!(json["right"]["value"], 3);

        let back: Expr = serde_json::from_value(json).unwrap();
        assert_eq!(back, expr);
    }
}
