/// SQLite-backed document store
///
/// Each document is one row of the `documents` table with its JSON body in a
/// text column. Filters and sorting go through `json_extract`.
use crate::{
    error::{ServiceError, ServiceResult},
    metrics,
    store::{query::validate_field, time, DocumentStore, Filter, Query, Update},
};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::{sqlite::SqliteArguments, Arguments, Row, SqlitePool};
use std::time::Instant;

/// SQL parameter derived from a JSON filter value
///
/// Mirrors the SQL types `json_extract` yields: booleans become integers,
/// strings stay text.
#[derive(Debug, Clone, PartialEq)]
enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    fn from_json(value: &Value) -> ServiceResult<Self> {
        match value {
            Value::Null => Ok(SqlValue::Null),
            Value::Bool(b) => Ok(SqlValue::Integer(*b as i64)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(SqlValue::Integer(i)),
                None => n
                    .as_f64()
                    .map(SqlValue::Real)
                    .ok_or_else(|| ServiceError::Validation(format!("Unsupported number: {}", n))),
            },
            Value::String(s) => Ok(SqlValue::Text(s.clone())),
            Value::Array(_) | Value::Object(_) => Err(ServiceError::Validation(
                "Filters only support scalar values".to_string(),
            )),
        }
    }

    fn add_to<'q>(self, args: &mut SqliteArguments<'q>) -> ServiceResult<()> {
        let result = match self {
            SqlValue::Null => args.add(Option::<String>::None),
            SqlValue::Integer(i) => args.add(i),
            SqlValue::Real(f) => args.add(f),
            SqlValue::Text(s) => args.add(s),
        };
        result.map_err(|e| ServiceError::Internal(format!("Failed to bind parameter: {}", e)))
    }
}

/// Document store over a SQLite pool
#[derive(Clone)]
pub struct SqliteDocumentStore {
    db: SqlitePool,
}

impl SqliteDocumentStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Build the WHERE clause and its parameters for a query
    fn where_clause(collection: &str, query: &Query) -> ServiceResult<(String, Vec<SqlValue>)> {
        let mut clause = String::from("WHERE collection = ?");
        let mut params = vec![SqlValue::Text(collection.to_string())];

        for filter in &query.filters {
            validate_field(filter.field())?;
            match filter {
                Filter::Eq(field, value) => {
                    clause.push_str(&format!(" AND json_extract(body, '$.{}') IS ?", field));
                    params.push(SqlValue::from_json(value)?);
                }
                Filter::In(_, values) if values.is_empty() => {
                    // Nothing can match an empty set
                    clause.push_str(" AND 0");
                }
                Filter::In(field, values) => {
                    let placeholders = vec!["?"; values.len()].join(", ");
                    clause.push_str(&format!(
                        " AND json_extract(body, '$.{}') IN ({})",
                        field, placeholders
                    ));
                    for value in values {
                        params.push(SqlValue::from_json(value)?);
                    }
                }
            }
        }

        Ok((clause, params))
    }

    fn arguments<'q>(params: Vec<SqlValue>) -> ServiceResult<SqliteArguments<'q>> {
        let mut args = SqliteArguments::default();
        for param in params {
            param.add_to(&mut args)?;
        }
        Ok(args)
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn create(&self, collection: &str, id: &str, body: Value) -> ServiceResult<()> {
        if !body.is_object() {
            return Err(ServiceError::Validation(
                "Documents must be JSON objects".to_string(),
            ));
        }

        let started = Instant::now();
        let now = time::format(&Utc::now());

        let result = sqlx::query(
            r#"
            INSERT INTO documents (collection, id, body, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(body.to_string())
        .bind(now.clone())
        .bind(now)
        .execute(&self.db)
        .await;

        metrics::record_store_operation("create", collection, started.elapsed().as_secs_f64());

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(
                ServiceError::Conflict(format!("Document {}/{} already exists", collection, id)),
            ),
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, collection: &str, id: &str) -> ServiceResult<Option<Value>> {
        let started = Instant::now();

        let row = sqlx::query("SELECT body FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        metrics::record_store_operation("get", collection, started.elapsed().as_secs_f64());

        match row {
            Some(row) => {
                let body: String = row.get("body");
                Ok(Some(serde_json::from_str(&body)?))
            }
            None => Ok(None),
        }
    }

    async fn update(&self, collection: &str, id: &str, update: Update) -> ServiceResult<()> {
        if update.is_empty() {
            return Err(ServiceError::Validation(format!(
                "Empty update for {}/{}",
                collection, id
            )));
        }

        let started = Instant::now();

        // Merge the `set` fields first, then push each appended value
        let mut expr = String::from("json_patch(body, ?)");
        let mut params = vec![SqlValue::Text(Value::Object(update.set).to_string())];
        for (field, value) in update.append {
            validate_field(&field)?;
            expr = format!("json_insert({}, '$.{}[#]', json(?))", expr, field);
            params.push(SqlValue::Text(value.to_string()));
        }
        params.push(SqlValue::Text(time::format(&Utc::now())));
        params.push(SqlValue::Text(collection.to_string()));
        params.push(SqlValue::Text(id.to_string()));

        let sql = format!(
            "UPDATE documents SET body = {}, updated_at = ? WHERE collection = ? AND id = ?",
            expr
        );

        let result = sqlx::query_with(&sql, Self::arguments(params)?)
            .execute(&self.db)
            .await?;

        metrics::record_store_operation("update", collection, started.elapsed().as_secs_f64());

        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound(format!(
                "Document {}/{} not found",
                collection, id
            )));
        }

        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> ServiceResult<bool> {
        let started = Instant::now();

        let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .execute(&self.db)
            .await?;

        metrics::record_store_operation("delete", collection, started.elapsed().as_secs_f64());

        Ok(result.rows_affected() > 0)
    }

    async fn query(&self, collection: &str, query: &Query) -> ServiceResult<Vec<Value>> {
        let started = Instant::now();
        let (clause, mut params) = Self::where_clause(collection, query)?;

        let mut sql = format!("SELECT body FROM documents {}", clause);
        match &query.order_by {
            Some(order) => {
                validate_field(&order.field)?;
                // Insertion order breaks ties between equal sort keys
                sql.push_str(&format!(
                    " ORDER BY json_extract(body, '$.{}') {dir}, seq {dir}",
                    order.field,
                    dir = order.direction.as_sql()
                ));
            }
            None => sql.push_str(" ORDER BY seq ASC"),
        }
        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            params.push(SqlValue::Integer(limit as i64));
        }

        tracing::debug!("Document query on {}: {}", collection, sql);

        let rows = sqlx::query_with(&sql, Self::arguments(params)?)
            .fetch_all(&self.db)
            .await?;

        metrics::record_store_operation("query", collection, started.elapsed().as_secs_f64());

        let mut documents = Vec::with_capacity(rows.len());
        for row in rows {
            let body: String = row.get("body");
            documents.push(serde_json::from_str(&body)?);
        }

        Ok(documents)
    }

    async fn count(&self, collection: &str, query: &Query) -> ServiceResult<u64> {
        let started = Instant::now();
        let (clause, params) = Self::where_clause(collection, query)?;
        let sql = format!("SELECT COUNT(*) AS total FROM documents {}", clause);

        let row = sqlx::query_with(&sql, Self::arguments(params)?)
            .fetch_one(&self.db)
            .await?;

        metrics::record_store_operation("count", collection, started.elapsed().as_secs_f64());

        let total: i64 = row.get("total");
        Ok(total as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, store::Direction};
    use serde_json::json;
    use std::sync::Arc;

    async fn create_test_store() -> Arc<dyn DocumentStore> {
        let pool = db::in_memory_pool().await.unwrap();
        Arc::new(SqliteDocumentStore::new(pool))
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = create_test_store().await;

        store
            .create("things", "t1", json!({"id": "t1", "name": "lamp"}))
            .await
            .unwrap();

        let doc = store.get("things", "t1").await.unwrap().unwrap();
        assert_eq!(doc["name"], "lamp");
        assert!(store.get("things", "missing").await.unwrap().is_none());
        assert!(store.get("other", "t1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_duplicate_conflicts() {
        let store = create_test_store().await;

        store.create("things", "t1", json!({"id": "t1"})).await.unwrap();
        let err = store.create("things", "t1", json!({"id": "t1"})).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_create_rejects_non_object() {
        let store = create_test_store().await;
        let err = store.create("things", "t1", json!([1, 2])).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_merges_and_appends() {
        let store = create_test_store().await;

        store
            .create(
                "things",
                "t1",
                json!({"id": "t1", "status": "new", "tags": [], "keep": 1}),
            )
            .await
            .unwrap();

        store
            .update(
                "things",
                "t1",
                Update::new()
                    .set("status", "done")
                    .append("tags", json!({"name": "a"}))
                    .append("tags", json!({"name": "b"})),
            )
            .await
            .unwrap();

        let doc = store.get("things", "t1").await.unwrap().unwrap();
        assert_eq!(doc["status"], "done");
        assert_eq!(doc["keep"], 1);
        assert_eq!(doc["tags"], json!([{"name": "a"}, {"name": "b"}]));
    }

    #[tokio::test]
    async fn test_update_missing_document() {
        let store = create_test_store().await;
        let err = store
            .update("things", "nope", Update::new().set("a", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_empty_update_rejected() {
        let store = create_test_store().await;
        store.create("things", "t1", json!({"id": "t1"})).await.unwrap();

        let err = store.update("things", "t1", Update::new()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_delete() {
        let store = create_test_store().await;
        store.create("things", "t1", json!({"id": "t1"})).await.unwrap();

        assert!(store.delete("things", "t1").await.unwrap());
        assert!(!store.delete("things", "t1").await.unwrap());
        assert!(store.get("things", "t1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_query_filters_sort_and_limit() {
        let store = create_test_store().await;

        for (id, owner, rank, read) in [
            ("a", "u1", 3, false),
            ("b", "u2", 1, true),
            ("c", "u1", 2, true),
            ("d", "u1", 5, false),
        ] {
            store
                .create(
                    "things",
                    id,
                    json!({"id": id, "owner": owner, "rank": rank, "read": read}),
                )
                .await
                .unwrap();
        }

        let owned = store
            .query(
                "things",
                &Query::new()
                    .filter_eq("owner", "u1")
                    .order_by("rank", Direction::Descending),
            )
            .await
            .unwrap();
        let ids: Vec<_> = owned.iter().map(|d| d["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["d", "a", "c"]);

        let unread = store
            .query(
                "things",
                &Query::new()
                    .filter_eq("owner", "u1")
                    .filter_eq("read", false)
                    .order_by("rank", Direction::Ascending)
                    .limit(Some(1)),
            )
            .await
            .unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0]["id"], "a");

        let count = store
            .count("things", &Query::new().filter_eq("read", true))
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_query_in_filter() {
        let store = create_test_store().await;

        for (id, role) in [("u1", "citizen"), ("u2", "admin"), ("u3", "municipal_officer")] {
            store
                .create("users", id, json!({"id": id, "role": role}))
                .await
                .unwrap();
        }

        let staff = store
            .query(
                "users",
                &Query::new().filter_in("role", ["admin", "municipal_officer"]),
            )
            .await
            .unwrap();
        assert_eq!(staff.len(), 2);

        let none = store
            .query("users", &Query::new().filter_in("role", Vec::<String>::new()))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_null_filter_matches_missing_field() {
        let store = create_test_store().await;
        store.create("things", "a", json!({"id": "a"})).await.unwrap();
        store
            .create("things", "b", json!({"id": "b", "assigned": "x"}))
            .await
            .unwrap();

        let unassigned = store
            .query("things", &Query::new().filter_eq("assigned", Value::Null))
            .await
            .unwrap();
        assert_eq!(unassigned.len(), 1);
        assert_eq!(unassigned[0]["id"], "a");
    }

    #[tokio::test]
    async fn test_query_rejects_bad_field() {
        let store = create_test_store().await;
        let err = store
            .query("things", &Query::new().filter_eq("a') OR 1=1 --", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
