/// Query and update descriptions for the document store
use crate::error::{ServiceError, ServiceResult};
use serde_json::{Map, Value};

/// Field filter
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Field equals the value (`null` matches absent fields)
    Eq(String, Value),
    /// Field equals any of the values
    In(String, Vec<Value>),
}

impl Filter {
    pub fn field(&self) -> &str {
        match self {
            Filter::Eq(field, _) | Filter::In(field, _) => field,
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Direction::Ascending => "ASC",
            Direction::Descending => "DESC",
        }
    }
}

/// Sort specification
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Collection query: equality filters, one sort field and an optional limit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<u32>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(field.to_string(), value.into()));
        self
    }

    pub fn filter_in<V: Into<Value>>(
        mut self,
        field: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.filters.push(Filter::In(
            field.to_string(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.to_string(),
            direction,
        });
        self
    }

    /// Sort by `created_at`, newest first
    pub fn newest_first(self) -> Self {
        self.order_by("created_at", Direction::Descending)
    }

    /// Cap the number of results; `Some(0)` means no cap
    pub fn limit(mut self, limit: Option<u32>) -> Self {
        self.limit = limit.filter(|&n| n > 0);
        self
    }
}

/// Partial document update
///
/// `set` fields are merged into the top level of the document; `append`
/// values are pushed onto the end of existing array fields. Both are applied
/// in one write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    pub set: Map<String, Value>,
    pub append: Vec<(String, Value)>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.set.insert(field.to_string(), value.into());
        self
    }

    pub fn append(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.append.push((field.to_string(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.append.is_empty()
    }
}

/// Check a field path before it is spliced into a JSON path expression
///
/// Accepts dotted paths of ASCII identifiers, e.g. `location.address`.
pub fn validate_field(field: &str) -> ServiceResult<()> {
    let valid = !field.is_empty()
        && field.split('.').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
                && !segment.starts_with(|c: char| c.is_ascii_digit())
        });

    if valid {
        Ok(())
    } else {
        Err(ServiceError::Validation(format!(
            "Invalid document field: {}",
            field
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_builder() {
        let query = Query::new()
            .filter_eq("citizen_id", "u1")
            .filter_in("role", ["admin", "municipal_officer"])
            .newest_first()
            .limit(Some(10));

        assert_eq!(query.filters.len(), 2);
        assert_eq!(query.filters[1].field(), "role");
        assert_eq!(
            query.order_by,
            Some(OrderBy {
                field: "created_at".to_string(),
                direction: Direction::Descending
            })
        );
        assert_eq!(query.limit, Some(10));
        assert_eq!(Query::new().limit(Some(0)).limit, None);
    }

    #[test]
    fn test_update_builder() {
        let update = Update::new()
            .set("status", "resolved")
            .append("comments", json!({"id": "c1"}));
        assert!(!update.is_empty());
        assert_eq!(update.set.get("status"), Some(&json!("resolved")));
        assert_eq!(update.append[0].0, "comments");
        assert!(Update::new().is_empty());
    }

    #[test]
    fn test_validate_field() {
        assert!(validate_field("created_at").is_ok());
        assert!(validate_field("location.address").is_ok());
        assert!(validate_field("").is_err());
        assert!(validate_field("a..b").is_err());
        assert!(validate_field("x'); DROP TABLE documents; --").is_err());
        assert!(validate_field("1abc").is_err());
    }
}
