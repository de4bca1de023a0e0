//! Filter predicate expressions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A literal value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    /// Absent value
    Null,
    /// Boolean
    Bool(bool),
    /// Number
    Number(f64),
    /// Text
    Text(String),
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Number(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Literal::Number(f64::from(value))
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Number(value as f64)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Text(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::Text(value)
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    /// Equal
    #[serde(rename = "=")]
    Eq,
    /// Not equal
    #[serde(rename = "!=")]
    Ne,
    /// Less than
    #[serde(rename = "<")]
    Lt,
    /// Less than or equal
    #[serde(rename = "<=")]
    Le,
    /// Greater than
    #[serde(rename = ">")]
    Gt,
    /// Greater than or equal
    #[serde(rename = ">=")]
    Ge,
    /// Substring match
    #[serde(rename = "contains")]
    Contains,
}

impl CompareOp {
    /// Operator symbol
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Contains => "contains",
        }
    }

    /// True for `<`, `<=`, `>`, `>=`
    pub fn is_ordering(self) -> bool {
        matches!(self, Self::Lt | Self::Le | Self::Gt | Self::Ge)
    }
}

/// Boolean connectives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOp {
    /// Conjunction
    And,
    /// Disjunction
    Or,
}

/// A predicate expression evaluated against each element flowing into a
/// `filter`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "lowercase")]
pub enum Expression {
    /// A constant
    Value {
        /// The literal
        value: Literal,
    },
    /// An attribute of the current element
    Navigate {
        /// Attribute name
        path: String,
    },
    /// A binary comparison
    Compare {
        /// Operator
        op: CompareOp,
        /// Left operand
        left: Box<Expression>,
        /// Right operand
        right: Box<Expression>,
    },
    /// `and` / `or` over any number of operands
    Logical {
        /// Connective
        op: LogicalOp,
        /// Operands
        operands: Vec<Expression>,
    },
    /// Negation
    Not {
        /// Negated operand
        operand: Box<Expression>,
    },
}

impl Expression {
    /// A constant
    pub fn value(value: impl Into<Literal>) -> Self {
        Expression::Value {
            value: value.into(),
        }
    }

    /// An attribute reference
    pub fn navigate(path: impl Into<String>) -> Self {
        Expression::Navigate { path: path.into() }
    }

    /// A comparison
    pub fn compare(op: CompareOp, left: Expression, right: Expression) -> Self {
        Expression::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Conjunction
    pub fn and(operands: Vec<Expression>) -> Self {
        Expression::Logical {
            op: LogicalOp::And,
            operands,
        }
    }

    /// Disjunction
    pub fn or(operands: Vec<Expression>) -> Self {
        Expression::Logical {
            op: LogicalOp::Or,
            operands,
        }
    }

    /// Negation
    pub fn not(operand: Expression) -> Self {
        Expression::Not {
            operand: Box::new(operand),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => f.write_str("null"),
            Literal::Bool(value) => write!(f, "{value}"),
            Literal::Number(value) => write!(f, "{value}"),
            Literal::Text(value) => write!(f, "{value:?}"),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Value { value } => write!(f, "{value}"),
            Expression::Navigate { path } => f.write_str(path),
            Expression::Compare { op, left, right } => {
                write!(f, "{left} {} {right}", op.symbol())
            }
            Expression::Logical { op, operands } => {
                let sep = match op {
                    LogicalOp::And => " and ",
                    LogicalOp::Or => " or ",
                };
                f.write_str("(")?;
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        f.write_str(sep)?;
                    }
                    write!(f, "{operand}")?;
                }
                f.write_str(")")
            }
            Expression::Not { operand } => write!(f, "not({operand})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let expr = Expression::and(vec![
            Expression::compare(CompareOp::Ge, Expression::navigate("age"), Expression::value(18)),
            Expression::not(Expression::compare(
                CompareOp::Contains,
                Expression::navigate("name"),
                Expression::value("x"),
            )),
        ]);
        assert_eq!(expr.to_string(), r#"(age >= 18 and not(name contains "x"))"#);
    }

    #[test]
    fn test_json_layout() {
        let json = r#"{"name":"compare","op":">","left":{"name":"navigate","path":"age"},"right":{"name":"value","value":30}}"#;
        let expr: Expression = serde_json::from_str(json).unwrap();
        assert_eq!(
            expr,
            Expression::compare(CompareOp::Gt, Expression::navigate("age"), Expression::value(30))
        );

        let null: Expression = serde_json::from_str(r#"{"name":"value","value":null}"#).unwrap();
        assert_eq!(null, Expression::Value { value: Literal::Null });
    }
}
