//! Static type inference.
//!
//! Mirrors the evaluator's typing rules without computing values. The only
//! place a value is computed is a constant divisor, which is evaluated on its
//! own to flag a guaranteed division by zero.

use crate::env::Environment;
use crate::error::ExprError;
use crate::eval::evaluate;
use crate::expr::{BinOp, Expr, OpClass, Type, Value};
use crate::model::Attribute;

/// Declared attribute types visible to an expression.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    attributes: &'a [Attribute],
    /// Attribute whose default is being typed; only earlier ones are visible.
    initializing: Option<&'a str>,
}

impl<'a> Scope<'a> {
    /// Scope for guards and actions: every attribute is visible.
    pub fn new(attributes: &'a [Attribute]) -> Self {
        Self {
            attributes,
            initializing: None,
        }
    }

    /// Scope for the default value of `attribute`.
    pub fn for_default(attributes: &'a [Attribute], attribute: &'a str) -> Self {
        Self {
            attributes,
            initializing: Some(attribute),
        }
    }

    fn lookup(&self, name: &str) -> Result<Type, ExprError> {
        let position = self
            .attributes
            .iter()
            .position(|a| a.name == name)
            .ok_or_else(|| ExprError::UnboundReference {
                name: name.to_string(),
            })?;

        if let Some(owner) = self.initializing {
            // An attribute missing from the list is treated as declared last.
            let owner_position = self
                .attributes
                .iter()
                .position(|a| a.name == owner)
                .unwrap_or(self.attributes.len());
            if position >= owner_position {
                return Err(ExprError::OutOfScopeReference {
                    name: name.to_string(),
                    attribute: owner.to_string(),
                });
            }
        }

        Ok(self.attributes[position].ty)
    }
}

/// Infers the static type of an expression.
pub fn infer_type(expr: &Expr, scope: &Scope<'_>) -> Result<Type, ExprError> {
    match expr {
        Expr::Literal { value } => Ok(value.ty()),
        Expr::Ref { name } => scope.lookup(name),
        Expr::Bin { op, left, right } => {
            let left_ty = infer_type(left, scope)?;
            let right_ty = infer_type(right, scope)?;
            if left_ty != right_ty {
                return Err(ExprError::TypeMismatch {
                    context: format!("operands of '{}'", op),
                    expected: left_ty,
                    found: right_ty,
                });
            }
            let ty = infer_binary(*op, left_ty)?;
            if *op == BinOp::Div && right.is_constant() {
                check_constant_divisor(right)?;
            }
            Ok(ty)
        }
        Expr::Neg { operand } => match infer_type(operand, scope)? {
            Type::Int => Ok(Type::Int),
            found => Err(ExprError::TypeMismatch {
                context: "operand of '-'".to_string(),
                expected: Type::Int,
                found,
            }),
        },
        Expr::Not { operand } => match infer_type(operand, scope)? {
            Type::Bool => Ok(Type::Bool),
            found => Err(ExprError::TypeMismatch {
                context: "operand of '!'".to_string(),
                expected: Type::Bool,
                found,
            }),
        },
        Expr::Group { inner } => infer_type(inner, scope),
    }
}

/// Result type of `op` applied to two operands of type `operand`.
fn infer_binary(op: BinOp, operand: Type) -> Result<Type, ExprError> {
    match (op.class(), operand) {
        (OpClass::Arithmetic, Type::Int) => Ok(Type::Int),
        (OpClass::Relational, Type::Int) => Ok(Type::Bool),
        (OpClass::Equality, _) => Ok(Type::Bool),
        (OpClass::Logical, Type::Bool) => Ok(Type::Bool),
        _ => Err(ExprError::UnrecognizedOperator { op, operand }),
    }
}

fn check_constant_divisor(divisor: &Expr) -> Result<(), ExprError> {
    match evaluate(divisor, &Environment::new())? {
        Value::Int(0) => Err(ExprError::DivisionByZero),
        _ => Ok(()),
    }
}
