//! Equality predicates built from sample records
//!
//! A sample is a partially populated record: every scalar field that differs
//! from the type's default instance becomes an `column = value` term, and the
//! terms are joined with `AND`.

use crate::codec::{self, Value};
use crate::naming;
use crate::record::Record;
use crate::Result;

/// A conjunction of column equality terms
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    terms: Vec<(String, Value)>,
}

impl Predicate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `column = value` term
    pub fn eq(mut self, column: impl Into<String>, value: Value) -> Self {
        self.terms.push((column.into(), value));
        self
    }

    pub fn terms(&self) -> &[(String, Value)] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Render as a SQL condition with numbered parameters starting at `?{first}`.
    ///
    /// An empty predicate renders as `1`, which matches every row.
    pub fn to_sql(&self, first: usize) -> Result<(String, Vec<Value>)> {
        if self.terms.is_empty() {
            return Ok(("1".to_string(), Vec::new()));
        }

        let mut clauses = Vec::with_capacity(self.terms.len());
        let mut params = Vec::with_capacity(self.terms.len());
        for (column, value) in &self.terms {
            let column = naming::sql_identifier(column)?;
            if value.is_null() {
                clauses.push(format!("{} IS NULL", column));
            } else {
                params.push(value.clone());
                clauses.push(format!("{} = ?{}", column, first + params.len() - 1));
            }
        }
        Ok((clauses.join(" AND "), params))
    }
}

/// Build an equality predicate over the non-default scalar fields of `sample`.
///
/// Returns `None` when every field holds its default value.
pub fn build_equality_predicate(sample: &dyn Record) -> Result<Option<Predicate>> {
    let entity = sample.entity();
    let defaults = entity.instantiate();
    let mut predicate = Predicate::new();

    for field in entity.columns() {
        let Some(value) = sample.get(field.name) else {
            continue;
        };
        if defaults.get(field.name).as_ref() == Some(&value) {
            continue;
        }
        if let Some(encoded) = codec::encode_field(entity, field, &value)? {
            predicate = predicate.eq(field.column_name(), encoded);
        }
    }

    Ok((!predicate.is_empty()).then_some(predicate))
}
