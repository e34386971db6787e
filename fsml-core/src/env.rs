//! Attribute environment.
//!
//! An `Environment` maps attribute names to their current values for one
//! validation run, interpretation session or generator pass. It is created
//! fresh by each of them and never shared between sessions.

use crate::error::ExprError;
use crate::eval::evaluate;
use crate::expr::Value;
use crate::model::Attribute;
use std::collections::HashMap;

/// Mutable mapping from attribute name to current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Environment {
    values: HashMap<String, Value>,
    /// Names in insertion order, for stable iteration.
    order: Vec<String>,
}

impl Environment {
    /// Creates an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an environment by initializing attributes in declaration order.
    ///
    /// Each default is evaluated against the environment built so far, so a
    /// default may only see attributes declared before it. Attributes without
    /// a default get their type's zero value.
    pub fn init(attributes: &[Attribute]) -> Result<Self, ExprError> {
        let mut env = Self::new();
        for attribute in attributes {
            let value = match &attribute.default {
                Some(expr) => {
                    let value = evaluate(expr, &env)?;
                    if value.ty() != attribute.ty {
                        return Err(ExprError::TypeMismatch {
                            context: format!("default value of '{}'", attribute.name),
                            expected: attribute.ty,
                            found: value.ty(),
                        });
                    }
                    value
                }
                None => attribute.ty.zero_value(),
            };
            env.set(&attribute.name, value);
        }
        Ok(env)
    }

    /// Returns the current value of an attribute.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.values.get(name).copied()
    }

    /// Stores a value. No type check happens here; types are checked upstream.
    pub fn set(&mut self, name: &str, value: Value) {
        if self.values.insert(name.to_string(), value).is_none() {
            self.order.push(name.to_string());
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterates over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Value)> + '_ {
        self.order
            .iter()
            .filter_map(|name| self.values.get(name).map(|v| (name.as_str(), *v)))
    }

    /// Returns a copy of the current values, in insertion order.
    pub fn snapshot(&self) -> Vec<(String, Value)> {
        self.iter().map(|(n, v)| (n.to_string(), v)).collect()
    }
}
