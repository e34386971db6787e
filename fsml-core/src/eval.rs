//! Expression evaluation.
//!
//! Evaluation is strict: both operands of a binary operator are evaluated,
//! left before right, before the operator is applied. Integer arithmetic is
//! checked; overflow and division by zero are errors, never wrapped or
//! defaulted.

use crate::env::Environment;
use crate::error::ExprError;
use crate::expr::{BinOp, Expr, Type, Value};

/// Evaluates an expression against an environment.
pub fn evaluate(expr: &Expr, env: &Environment) -> Result<Value, ExprError> {
    match expr {
        Expr::Literal { value } => Ok(*value),
        Expr::Ref { name } => env
            .get(name)
            .ok_or_else(|| ExprError::UnboundReference { name: name.clone() }),
        Expr::Bin { op, left, right } => {
            let left = evaluate(left, env)?;
            let right = evaluate(right, env)?;
            evaluate_binary(*op, left, right)
        }
        Expr::Neg { operand } => match evaluate(operand, env)? {
            Value::Int(n) => n
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| ExprError::IntegerOverflow {
                    op: "-".to_string(),
                }),
            Value::Bool(_) => Err(ExprError::TypeMismatch {
                context: "operand of '-'".to_string(),
                expected: Type::Int,
                found: Type::Bool,
            }),
        },
        Expr::Not { operand } => match evaluate(operand, env)? {
            Value::Bool(b) => Ok(Value::Bool(!b)),
            Value::Int(_) => Err(ExprError::TypeMismatch {
                context: "operand of '!'".to_string(),
                expected: Type::Bool,
                found: Type::Int,
            }),
        },
        Expr::Group { inner } => evaluate(inner, env),
    }
}

/// Applies a binary operator to two already-evaluated operands.
pub fn evaluate_binary(op: BinOp, left: Value, right: Value) -> Result<Value, ExprError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => eval_int_binary(op, a, b),
        (Value::Bool(a), Value::Bool(b)) => eval_bool_binary(op, a, b),
        (l, r) => Err(ExprError::TypeMismatch {
            context: format!("operands of '{}'", op),
            expected: l.ty(),
            found: r.ty(),
        }),
    }
}

fn eval_int_binary(op: BinOp, a: i64, b: i64) -> Result<Value, ExprError> {
    let overflow = || ExprError::IntegerOverflow {
        op: op.symbol().to_string(),
    };

    match op {
        BinOp::Add => a.checked_add(b).map(Value::Int).ok_or_else(overflow),
        BinOp::Sub => a.checked_sub(b).map(Value::Int).ok_or_else(overflow),
        BinOp::Mul => a.checked_mul(b).map(Value::Int).ok_or_else(overflow),
        BinOp::Div => {
            if b == 0 {
                return Err(ExprError::DivisionByZero);
            }
            a.checked_div(b).map(Value::Int).ok_or_else(overflow)
        }
        BinOp::Lt => Ok(Value::Bool(a < b)),
        BinOp::Gt => Ok(Value::Bool(a > b)),
        BinOp::Le => Ok(Value::Bool(a <= b)),
        BinOp::Ge => Ok(Value::Bool(a >= b)),
        BinOp::Eq => Ok(Value::Bool(a == b)),
        BinOp::Ne => Ok(Value::Bool(a != b)),
        BinOp::And | BinOp::Or => Err(ExprError::UnrecognizedOperator {
            op,
            operand: Type::Int,
        }),
    }
}

fn eval_bool_binary(op: BinOp, a: bool, b: bool) -> Result<Value, ExprError> {
    match op {
        BinOp::Eq => Ok(Value::Bool(a == b)),
        BinOp::Ne => Ok(Value::Bool(a != b)),
        BinOp::And => Ok(Value::Bool(a && b)),
        BinOp::Or => Ok(Value::Bool(a || b)),
        _ => Err(ExprError::UnrecognizedOperator {
            op,
            operand: Type::Bool,
        }),
    }
}

/// Guard evaluation helpers.
pub struct GuardEvaluator;

impl GuardEvaluator {
    /// Evaluates a guard. The inner `Err` carries the type the guard
    /// produced when it was not a boolean.
    pub fn evaluate(guard: &Expr, env: &Environment) -> Result<Result<bool, Type>, ExprError> {
        let value = evaluate(guard, env)?;
        Ok(value.as_bool().ok_or(value.ty()))
    }

    /// Evaluates an optional guard (None = always true).
    pub fn evaluate_opt(
        guard: Option<&Expr>,
        env: &Environment,
    ) -> Result<Result<bool, Type>, ExprError> {
        match guard {
            Some(g) => Self::evaluate(g, env),
            None => Ok(Ok(true)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, Value)]) -> Environment {
        let mut env = Environment::new();
        for (name, value) in pairs {
            env.set(name, *value);
        }
        env
    }

    #[test]
    fn test_literals_and_refs() {
        let env = env(&[("count", Value::Int(4))]);
        assert_eq!(evaluate(&Expr::int(7), &env), Ok(Value::Int(7)));
        assert_eq!(evaluate(&Expr::bool(true), &env), Ok(Value::Bool(true)));
        assert_eq!(evaluate(&Expr::reference("count"), &env), Ok(Value::Int(4)));
    }

    #[test]
    fn test_unbound_reference() {
        let result = evaluate(&Expr::reference("missing"), &Environment::new());
        assert_eq!(
            result,
            Err(ExprError::UnboundReference {
                name: "missing".to_string()
            })
        );
    }

    #[test]
    fn test_arithmetic() {
        // cnt + 1 + 20*(cnt+1) with cnt = 89
        let env = env(&[("cnt", Value::Int(89))]);
        let expr = Expr::bin(
            BinOp::Add,
            Expr::bin(BinOp::Add, Expr::reference("cnt"), Expr::int(1)),
            Expr::bin(
                BinOp::Mul,
                Expr::int(20),
                Expr::group(Expr::bin(BinOp::Add, Expr::reference("cnt"), Expr::int(1))),
            ),
        );
        assert_eq!(evaluate(&expr, &env), Ok(Value::Int(1890)));
    }

    #[test]
    fn test_integer_division_truncates() {
        let expr = Expr::bin(BinOp::Div, Expr::int(-7), Expr::int(2));
        assert_eq!(evaluate(&expr, &Environment::new()), Ok(Value::Int(-3)));
    }

    #[test]
    fn test_division_by_zero() {
        let expr = Expr::bin(BinOp::Div, Expr::int(10), Expr::int(0));
        assert_eq!(
            evaluate(&expr, &Environment::new()),
            Err(ExprError::DivisionByZero)
        );
    }

    #[test]
    fn test_overflow() {
        let expr = Expr::bin(BinOp::Add, Expr::int(i64::MAX), Expr::int(1));
        assert!(matches!(
            evaluate(&expr, &Environment::new()),
            Err(ExprError::IntegerOverflow { .. })
        ));
        assert!(matches!(
            evaluate(&Expr::neg(Expr::int(i64::MIN)), &Environment::new()),
            Err(ExprError::IntegerOverflow { .. })
        ));
    }

    #[test]
    fn test_relational_and_equality() {
        let env = env(&[("a", Value::Int(3)), ("flag", Value::Bool(false))]);
        let lt = Expr::bin(BinOp::Lt, Expr::reference("a"), Expr::int(3));
        let le = Expr::bin(BinOp::Le, Expr::reference("a"), Expr::int(3));
        let eq = Expr::bin(BinOp::Eq, Expr::reference("flag"), Expr::bool(false));
        let ne = Expr::bin(BinOp::Ne, Expr::reference("a"), Expr::int(4));

        assert_eq!(evaluate(&lt, &env), Ok(Value::Bool(false)));
        assert_eq!(evaluate(&le, &env), Ok(Value::Bool(true)));
        assert_eq!(evaluate(&eq, &env), Ok(Value::Bool(true)));
        assert_eq!(evaluate(&ne, &env), Ok(Value::Bool(true)));
    }

    #[test]
    fn test_logical() {
        let expr = Expr::bin(
            BinOp::And,
            Expr::bool(true),
            Expr::group(Expr::bin(BinOp::Or, Expr::bool(false), Expr::bool(true))),
        );
        assert_eq!(evaluate(&expr, &Environment::new()), Ok(Value::Bool(true)));
    }

    #[test]
    fn test_mixed_operands_mismatch() {
        let expr = Expr::bin(BinOp::Eq, Expr::int(1), Expr::bool(true));
        assert!(matches!(
            evaluate(&expr, &Environment::new()),
            Err(ExprError::TypeMismatch { expected: Type::Int, found: Type::Bool, .. })
        ));
    }

    #[test]
    fn test_unrecognized_operator() {
        let and_ints = Expr::bin(BinOp::And, Expr::int(1), Expr::int(2));
        assert_eq!(
            evaluate(&and_ints, &Environment::new()),
            Err(ExprError::UnrecognizedOperator {
                op: BinOp::And,
                operand: Type::Int
            })
        );

        let add_bools = Expr::bin(BinOp::Add, Expr::bool(true), Expr::bool(true));
        assert_eq!(
            evaluate(&add_bools, &Environment::new()),
            Err(ExprError::UnrecognizedOperator {
                op: BinOp::Add,
                operand: Type::Bool
            })
        );
    }

    #[test]
    fn test_negations() {
        let env = Environment::new();
        assert_eq!(evaluate(&Expr::neg(Expr::int(5)), &env), Ok(Value::Int(-5)));
        assert_eq!(evaluate(&Expr::not(Expr::bool(true)), &env), Ok(Value::Bool(false)));
        assert!(matches!(
            evaluate(&Expr::neg(Expr::bool(true)), &env),
            Err(ExprError::TypeMismatch { .. })
        ));
        assert!(matches!(
            evaluate(&Expr::not(Expr::int(1)), &env),
            Err(ExprError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_guard_evaluator_helper() {
        let env = env(&[("ok", Value::Bool(true)), ("n", Value::Int(1))]);

        assert_eq!(GuardEvaluator::evaluate(&Expr::reference("ok"), &env), Ok(Ok(true)));
        assert_eq!(
            GuardEvaluator::evaluate(&Expr::reference("n"), &env),
            Ok(Err(Type::Int))
        );
        assert_eq!(GuardEvaluator::evaluate_opt(None, &env), Ok(Ok(true))); // None means always true
    }
}
