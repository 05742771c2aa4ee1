//! Metadata filters used to narrow a similarity search.
//!
//! A [`Filter`] is a predicate tree over [`Metadata`]. Leaf nodes compare one
//! key against a value; `And`, `Or` and `Not` combine them.
//!
//! ```
//! use lodestone_retriever::filter::metadata_key;
//!
//! let filter = metadata_key("lang").is_equal_to("rust")
//!     .and(metadata_key("year").is_greater_than_or_equal_to(2020i64));
//! ```

use crate::error::{Result, RetrieverError};
use crate::metadata::{Metadata, MetadataValue};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    IsEqualTo { key: String, value: MetadataValue },
    IsNotEqualTo { key: String, value: MetadataValue },
    IsGreaterThan { key: String, value: MetadataValue },
    IsGreaterThanOrEqualTo { key: String, value: MetadataValue },
    IsLessThan { key: String, value: MetadataValue },
    IsLessThanOrEqualTo { key: String, value: MetadataValue },
    IsIn { key: String, values: Vec<MetadataValue> },
    IsNotIn { key: String, values: Vec<MetadataValue> },
    ContainsString { key: String, value: String },
    And(Box<Filter>, Box<Filter>),
    Or(Box<Filter>, Box<Filter>),
    Not(Box<Filter>),
}

/// Start a filter on `key`.
pub fn metadata_key(key: impl Into<String>) -> MetadataKey {
    MetadataKey { key: key.into() }
}

/// Entry point of the fluent filter syntax.
#[derive(Debug, Clone)]
pub struct MetadataKey {
    key: String,
}

impl MetadataKey {
    pub fn is_equal_to(self, value: impl Into<MetadataValue>) -> Filter {
        Filter::IsEqualTo {
            key: self.key,
            value: value.into(),
        }
    }

    pub fn is_not_equal_to(self, value: impl Into<MetadataValue>) -> Filter {
        Filter::IsNotEqualTo {
            key: self.key,
            value: value.into(),
        }
    }

    pub fn is_greater_than(self, value: impl Into<MetadataValue>) -> Filter {
        Filter::IsGreaterThan {
            key: self.key,
            value: value.into(),
        }
    }

    pub fn is_greater_than_or_equal_to(self, value: impl Into<MetadataValue>) -> Filter {
        Filter::IsGreaterThanOrEqualTo {
            key: self.key,
            value: value.into(),
        }
    }

    pub fn is_less_than(self, value: impl Into<MetadataValue>) -> Filter {
        Filter::IsLessThan {
            key: self.key,
            value: value.into(),
        }
    }

    pub fn is_less_than_or_equal_to(self, value: impl Into<MetadataValue>) -> Filter {
        Filter::IsLessThanOrEqualTo {
            key: self.key,
            value: value.into(),
        }
    }

    pub fn is_in<I, V>(self, values: I) -> Filter
    where
        I: IntoIterator<Item = V>,
        V: Into<MetadataValue>,
    {
        Filter::IsIn {
            key: self.key,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_not_in<I, V>(self, values: I) -> Filter
    where
        I: IntoIterator<Item = V>,
        V: Into<MetadataValue>,
    {
        Filter::IsNotIn {
            key: self.key,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains_string(self, value: impl Into<String>) -> Filter {
        Filter::ContainsString {
            key: self.key,
            value: value.into(),
        }
    }
}

/// Compare two values. Numbers compare across integer/float; everything else
/// only compares within its own type.
fn compare(left: &MetadataValue, right: &MetadataValue) -> Option<Ordering> {
    match (left, right) {
        (MetadataValue::String(a), MetadataValue::String(b)) => Some(a.cmp(b)),
        (MetadataValue::Boolean(a), MetadataValue::Boolean(b)) => Some(a.cmp(b)),
        (MetadataValue::Integer(a), MetadataValue::Integer(b)) => Some(a.cmp(b)),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
    }
}

fn equals(left: &MetadataValue, right: &MetadataValue) -> bool {
    compare(left, right) == Some(Ordering::Equal)
}

impl Filter {
    /// Evaluate the filter against `metadata`.
    pub fn test(&self, metadata: &Metadata) -> bool {
        match self {
            Filter::IsEqualTo { key, value } => {
                metadata.get(key).is_some_and(|actual| equals(actual, value))
            }
            Filter::IsNotEqualTo { key, value } => {
                metadata.get(key).is_none_or(|actual| !equals(actual, value))
            }
            Filter::IsGreaterThan { key, value } => metadata
                .get(key)
                .is_some_and(|actual| compare(actual, value) == Some(Ordering::Greater)),
            Filter::IsGreaterThanOrEqualTo { key, value } => {
                metadata.get(key).is_some_and(|actual| {
                    matches!(
                        compare(actual, value),
                        Some(Ordering::Greater | Ordering::Equal)
                    )
                })
            }
            Filter::IsLessThan { key, value } => metadata
                .get(key)
                .is_some_and(|actual| compare(actual, value) == Some(Ordering::Less)),
            Filter::IsLessThanOrEqualTo { key, value } => metadata.get(key).is_some_and(|actual| {
                matches!(
                    compare(actual, value),
                    Some(Ordering::Less | Ordering::Equal)
                )
            }),
            Filter::IsIn { key, values } => metadata
                .get(key)
                .is_some_and(|actual| values.iter().any(|v| equals(actual, v))),
            Filter::IsNotIn { key, values } => metadata
                .get(key)
                .is_none_or(|actual| !values.iter().any(|v| equals(actual, v))),
            Filter::ContainsString { key, value } => metadata
                .get_string(key)
                .is_some_and(|actual| actual.contains(value.as_str())),
            Filter::And(left, right) => left.test(metadata) && right.test(metadata),
            Filter::Or(left, right) => left.test(metadata) || right.test(metadata),
            Filter::Not(inner) => !inner.test(metadata),
        }
    }

    pub fn and(self, other: Filter) -> Filter {
        Filter::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Filter) -> Filter {
        Filter::Or(Box::new(self), Box::new(other))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Filter {
        Filter::Not(Box::new(self))
    }

    /// Parse a filter expression such as `lang=rust,year>=2020`.
    ///
    /// Clauses separated by `,` are ANDed together. Supported operators are
    /// `=`, `!=`, `>`, `>=`, `<`, `<=` and `~` (substring match).
    pub fn parse(expression: &str) -> Result<Filter> {
        let mut combined: Option<Filter> = None;

        for clause in expression.split(',').map(str::trim) {
            if clause.is_empty() {
                return Err(RetrieverError::Parse(format!(
                    "empty clause in filter expression '{expression}'"
                )));
            }
            let filter = parse_clause(clause)?;
            combined = Some(match combined {
                Some(existing) => existing.and(filter),
                None => filter,
            });
        }

        combined.ok_or_else(|| RetrieverError::Parse("empty filter expression".to_string()))
    }
}

fn parse_clause(clause: &str) -> Result<Filter> {
    // Two-character operators first so `>=` is not read as `>`
    const OPERATORS: [&str; 7] = ["!=", ">=", "<=", "=", ">", "<", "~"];

    let (position, operator) = OPERATORS
        .iter()
        .filter_map(|op| clause.find(op).map(|pos| (pos, *op)))
        .min_by_key(|(pos, op)| (*pos, std::cmp::Reverse(op.len())))
        .ok_or_else(|| {
            RetrieverError::Parse(format!("no operator in filter clause '{clause}'"))
        })?;

    let key = clause[..position].trim();
    let raw_value = clause[position + operator.len()..].trim();
    if key.is_empty() || raw_value.is_empty() {
        return Err(RetrieverError::Parse(format!(
            "filter clause '{clause}' needs both a key and a value"
        )));
    }

    let value = MetadataValue::parse_literal(raw_value);
    let key = metadata_key(key);
    Ok(match operator {
        "=" => key.is_equal_to(value),
        "!=" => key.is_not_equal_to(value),
        ">" => key.is_greater_than(value),
        ">=" => key.is_greater_than_or_equal_to(value),
        "<" => key.is_less_than(value),
        "<=" => key.is_less_than_or_equal_to(value),
        _ => key.contains_string(raw_value.trim_matches('"')),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Metadata {
        Metadata::new()
            .with("lang", "rust")
            .with("year", 2021i64)
            .with("rating", 4.5)
            .with("draft", false)
    }

    #[test]
    fn test_equality() {
        let metadata = sample();
        assert!(metadata_key("lang").is_equal_to("rust").test(&metadata));
        assert!(!metadata_key("lang").is_equal_to("go").test(&metadata));
        // Integer and float compare numerically
        assert!(metadata_key("year").is_equal_to(2021.0).test(&metadata));
        // A string never equals a number
        assert!(!metadata_key("year").is_equal_to("2021").test(&metadata));
        assert!(metadata_key("draft").is_equal_to(false).test(&metadata));
    }

    #[test]
    fn test_missing_key_semantics() {
        let metadata = sample();
        assert!(!metadata_key("author").is_equal_to("x").test(&metadata));
        assert!(!metadata_key("author").is_greater_than(1i64).test(&metadata));
        assert!(!metadata_key("author").is_in(["a", "b"]).test(&metadata));
        assert!(!metadata_key("author").contains_string("a").test(&metadata));
        assert!(metadata_key("author").is_not_equal_to("x").test(&metadata));
        assert!(metadata_key("author").is_not_in(["a"]).test(&metadata));
    }

    #[test]
    fn test_ordering() {
        let metadata = sample();
        assert!(metadata_key("year").is_greater_than(2020i64).test(&metadata));
        assert!(!metadata_key("year").is_greater_than(2021i64).test(&metadata));
        assert!(
            metadata_key("year")
                .is_greater_than_or_equal_to(2021i64)
                .test(&metadata)
        );
        assert!(metadata_key("rating").is_less_than(5i64).test(&metadata));
        assert!(metadata_key("rating").is_less_than_or_equal_to(4.5).test(&metadata));
        assert!(metadata_key("lang").is_less_than("zig").test(&metadata));
        // Incomparable types never order
        assert!(!metadata_key("lang").is_greater_than(1i64).test(&metadata));
    }

    #[test]
    fn test_membership_and_contains() {
        let metadata = sample();
        assert!(metadata_key("lang").is_in(["go", "rust"]).test(&metadata));
        assert!(!metadata_key("lang").is_not_in(["go", "rust"]).test(&metadata));
        assert!(metadata_key("year").is_in([2020i64, 2021i64]).test(&metadata));
        assert!(metadata_key("lang").contains_string("us").test(&metadata));
        assert!(!metadata_key("year").contains_string("20").test(&metadata));
    }

    #[test]
    fn test_combinators() {
        let metadata = sample();
        let rust = metadata_key("lang").is_equal_to("rust");
        let old = metadata_key("year").is_less_than(2000i64);

        assert!(!rust.clone().and(old.clone()).test(&metadata));
        assert!(rust.clone().or(old.clone()).test(&metadata));
        assert!(old.clone().not().test(&metadata));
        assert!(!rust.not().test(&metadata));
    }

    #[test]
    fn test_parse_expression() {
        let filter = Filter::parse("lang=rust, year>=2020").unwrap();
        assert_eq!(
            filter,
            metadata_key("lang")
                .is_equal_to("rust")
                .and(metadata_key("year").is_greater_than_or_equal_to(2020i64))
        );
        assert!(filter.test(&sample()));

        assert_eq!(
            Filter::parse("lang!=go").unwrap(),
            metadata_key("lang").is_not_equal_to("go")
        );
        assert_eq!(
            Filter::parse("rating<=4.5").unwrap(),
            metadata_key("rating").is_less_than_or_equal_to(4.5)
        );
        assert_eq!(
            Filter::parse("file_name~notes").unwrap(),
            metadata_key("file_name").contains_string("notes")
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(Filter::parse(""), Err(RetrieverError::Parse(_))));
        assert!(matches!(Filter::parse("lang"), Err(RetrieverError::Parse(_))));
        assert!(matches!(Filter::parse("=rust"), Err(RetrieverError::Parse(_))));
        assert!(matches!(
            Filter::parse("lang=rust,,year>1"),
            Err(RetrieverError::Parse(_))
        ));
    }
}
