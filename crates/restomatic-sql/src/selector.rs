//! Selector grammar: JSON-shaped boolean expressions compiled into a
//! parameterized SQL fragment.
//!
//! Wire format:
//!
//! ```text
//! ["column", "op", value?]            condition
//! {"and": [Selector, ...]}            conjunction
//! {"or":  [Selector, ...]}            disjunction
//! ```
//!
//! Values are never embedded in the generated SQL. Every value becomes one
//! positional `?` placeholder and is appended, in order, to a shared
//! parameter list, so nested groups share one placeholder stream.

use crate::error::{CompositorError, CompositorResult};
use crate::schema::{ProcessMode, TableSchema};
use crate::validate::{expect_array, expect_len_range, expect_str, exactly_one_of};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Comparison operator of a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Lt,
    Gt,
    Lte,
    Gte,
    In,
    NotIn,
    Like,
    IsNull,
    IsNotNull,
}

impl Operator {
    /// SQL spelling of the operator
    pub fn sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Lte => "<=",
            Self::Gte => ">=",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
            Self::Like => "LIKE",
            Self::IsNull => "IS NULL",
            Self::IsNotNull => "IS NOT NULL",
        }
    }

    /// Null checks take no comparison value
    pub fn takes_value(self) -> bool {
        !matches!(self, Self::IsNull | Self::IsNotNull)
    }

    /// `in`/`not in` compare against a list
    pub fn takes_list(self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }
}

impl FromStr for Operator {
    type Err = CompositorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s.trim().to_ascii_lowercase().as_str() {
            "eq" | "=" | "==" => Self::Eq,
            "lt" | "<" => Self::Lt,
            "gt" | ">" => Self::Gt,
            "lte" | "<=" => Self::Lte,
            "gte" | ">=" => Self::Gte,
            "in" => Self::In,
            "notin" | "not_in" | "not in" => Self::NotIn,
            "like" => Self::Like,
            "isnull" | "is_null" => Self::IsNull,
            "isnotnull" | "is_not_null" => Self::IsNotNull,
            _ => return Err(CompositorError::UnsupportedOperator(s.to_string())),
        };
        Ok(op)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql())
    }
}

/// Logical operator joining the children of a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn sql(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

/// A boolean expression over table columns
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub enum Selector {
    Condition {
        column: String,
        op: Operator,
        value: Option<Value>,
    },
    Group {
        op: LogicalOp,
        children: Vec<Selector>,
    },
}

/// Output of compiling a selector on its own
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSelector {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Selector {
    pub fn condition(column: impl Into<String>, op: Operator, value: Option<Value>) -> Self {
        Self::Condition {
            column: column.into(),
            op,
            value,
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::condition(column, Operator::Eq, Some(value.into()))
    }

    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::condition(column, Operator::Lt, Some(value.into()))
    }

    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::condition(column, Operator::Gt, Some(value.into()))
    }

    pub fn lte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::condition(column, Operator::Lte, Some(value.into()))
    }

    pub fn gte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::condition(column, Operator::Gte, Some(value.into()))
    }

    pub fn like(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::condition(column, Operator::Like, Some(Value::String(pattern.into())))
    }

    pub fn is_in<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let list = values.into_iter().map(Into::into).collect();
        Self::condition(column, Operator::In, Some(Value::Array(list)))
    }

    pub fn not_in<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let list = values.into_iter().map(Into::into).collect();
        Self::condition(column, Operator::NotIn, Some(Value::Array(list)))
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self::condition(column, Operator::IsNull, None)
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Self::condition(column, Operator::IsNotNull, None)
    }

    pub fn and(children: impl IntoIterator<Item = Selector>) -> Self {
        Self::Group {
            op: LogicalOp::And,
            children: children.into_iter().collect(),
        }
    }

    pub fn or(children: impl IntoIterator<Item = Selector>) -> Self {
        Self::Group {
            op: LogicalOp::Or,
            children: children.into_iter().collect(),
        }
    }

    /// Compile into a SQL boolean fragment, appending bound values to `params`.
    ///
    /// Columns are checked against `schema`, and any pre-processor the schema
    /// registers for a column runs (with `mode`) before its value is bound.
    pub fn compile(
        &self,
        schema: &TableSchema,
        mode: ProcessMode,
        params: &mut Vec<Value>,
    ) -> CompositorResult<String> {
        match self {
            Self::Group { op, children } => {
                if children.is_empty() {
                    return Err(CompositorError::InvalidInput(format!(
                        "{} group must contain at least one selector",
                        op.sql()
                    )));
                }
                let parts = children
                    .iter()
                    .map(|child| -> CompositorResult<String> {
                        Ok(format!("({})", child.compile(schema, mode, params)?))
                    })
                    .collect::<CompositorResult<Vec<_>>>()?;
                Ok(parts.join(&format!(" {} ", op.sql())))
            }
            Self::Condition { column, op, value } => {
                schema.check_column(column)?;
                compile_condition(schema, column, *op, value.as_ref(), mode, params)
            }
        }
    }

    /// Compile on a fresh parameter list
    pub fn to_clause(&self, schema: &TableSchema, mode: ProcessMode) -> CompositorResult<CompiledSelector> {
        let mut params = Vec::new();
        let sql = self.compile(schema, mode, &mut params)?;
        Ok(CompiledSelector { sql, params })
    }
}

fn compile_condition(
    schema: &TableSchema,
    column: &str,
    op: Operator,
    value: Option<&Value>,
    mode: ProcessMode,
    params: &mut Vec<Value>,
) -> CompositorResult<String> {
    let value = value.filter(|v| !v.is_null());

    if !op.takes_value() {
        if let Some(v) = value {
            return Err(CompositorError::InvalidInput(format!(
                "Operator {op} takes no value, got {v}"
            )));
        }
        return Ok(format!("\"{column}\" {}", op.sql()));
    }

    let Some(value) = value else {
        return Err(CompositorError::InvalidInput(format!(
            "Must provide a non-null value for comparison for operator {op}"
        )));
    };

    if op.takes_list() {
        let items = expect_array(value, &format!("value for {op} operator"))?;
        if items.is_empty() {
            return Err(CompositorError::InvalidInput(format!(
                "Operator {op} requires a non-empty list"
            )));
        }
        for item in items {
            expect_scalar(item, op)?;
            params.push(schema.preprocess(column, item.clone(), mode)?);
        }
        let placeholders = vec!["?"; items.len()].join(",");
        return Ok(format!("\"{column}\" {} ({placeholders})", op.sql()));
    }

    if op == Operator::Like {
        expect_str(value, "value for LIKE operator")?;
    } else {
        expect_scalar(value, op)?;
    }
    params.push(schema.preprocess(column, value.clone(), mode)?);
    Ok(format!("\"{column}\" {} ?", op.sql()))
}

fn expect_scalar(value: &Value, op: Operator) -> CompositorResult<()> {
    match value {
        Value::Null | Value::Array(_) | Value::Object(_) => Err(CompositorError::InvalidInput(
            format!("Operator {op} requires a non-null scalar value, got {value}"),
        )),
        _ => Ok(()),
    }
}

impl TryFrom<&Value> for Selector {
    type Error = CompositorError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => {
                let has_and = map.keys().any(|k| k.eq_ignore_ascii_case("and"));
                let has_or = map.keys().any(|k| k.eq_ignore_ascii_case("or"));
                if map.len() != 1 {
                    return Err(CompositorError::InvalidInput(
                        "Each nested selector must have only one logical operator: AND or OR"
                            .to_string(),
                    ));
                }
                let op = match exactly_one_of(&[("and", has_and), ("or", has_or)], "logical group")? {
                    "and" => LogicalOp::And,
                    _ => LogicalOp::Or,
                };
                let children = map
                    .values()
                    .next()
                    .map(|list| expect_array(list, "selector group"))
                    .transpose()?
                    .into_iter()
                    .flatten()
                    .map(|child| Selector::try_from(child))
                    .collect::<CompositorResult<Vec<_>>>()?;
                if children.is_empty() {
                    return Err(CompositorError::InvalidInput(format!(
                        "{} group must contain at least one selector",
                        op.sql()
                    )));
                }
                Ok(Self::Group { op, children })
            }
            Value::Array(parts) => {
                expect_len_range(parts.len(), 2, 3, "selector")?;
                let column = expect_str(&parts[0], "selector column")?;
                let op: Operator = expect_str(&parts[1], "selector operator")?.parse()?;
                Ok(Self::condition(column, op, parts.get(2).cloned()))
            }
            other => Err(CompositorError::InvalidInput(format!(
                "Selector must be a list or an object, got {other}"
            ))),
        }
    }
}

impl TryFrom<Value> for Selector {
    type Error = CompositorError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Selector::try_from(&value)
    }
}
