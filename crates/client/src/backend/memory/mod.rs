//! In-process backend.
//!
//! Keeps every collection as a list of JSON objects and evaluates queries
//! the way the record API does: equality filters, ordering (nulls last),
//! limit, and embeds resolved through [`Collection::foreign_key_to`].
//!
//! Test support: every call is logged, and a failure can be injected for the
//! next call of a given operation on a given collection.

mod auth;

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use super::{BackendError, Collection, DataService, Field, Filter, OrderBy, Query};

type Row = Map<String, Value>;

/// Kind of data-service call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Insert,
    Update,
    Select,
    Delete,
}

impl Operation {
    /// Whether this call mutates records.
    #[must_use]
    pub const fn is_write(self) -> bool {
        !matches!(self, Self::Select)
    }
}

/// In-memory [`DataService`] and [`AuthService`](super::AuthService).
///
/// Clones share the same tables.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    data: Mutex<Tables>,
    auth: Mutex<auth::AuthTables>,
}

#[derive(Default)]
struct Tables {
    rows: HashMap<Collection, Vec<Row>>,
    next_id: HashMap<Collection, i64>,
    calls: Vec<(Operation, Collection)>,
    failures: Vec<(Operation, Collection)>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend").finish_non_exhaustive()
    }
}

impl MemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert rows directly, bypassing the call log and failure injection.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::InvalidQuery` if a row is not a JSON object.
    pub async fn seed(&self, collection: Collection, rows: Vec<Value>) -> Result<(), BackendError> {
        let mut tables = self.inner.data.lock().await;
        tables.insert_rows(collection, rows)?;
        Ok(())
    }

    /// Snapshot of every row in `collection`, in insertion order.
    pub async fn rows(&self, collection: Collection) -> Vec<Value> {
        let tables = self.inner.data.lock().await;
        tables
            .table(collection)
            .iter()
            .cloned()
            .map(Value::Object)
            .collect()
    }

    /// Every data-service call made so far.
    pub async fn calls(&self) -> Vec<(Operation, Collection)> {
        self.inner.data.lock().await.calls.clone()
    }

    /// Number of insert/update/delete calls made so far (failed ones included).
    pub async fn write_count(&self) -> usize {
        self.inner
            .data
            .lock()
            .await
            .calls
            .iter()
            .filter(|(op, _)| op.is_write())
            .count()
    }

    /// Make the next `operation` on `collection` fail with a 503.
    pub async fn fail_next(&self, operation: Operation, collection: Collection) {
        self.inner
            .data
            .lock()
            .await
            .failures
            .push((operation, collection));
    }
}

impl Tables {
    fn table(&self, collection: Collection) -> &[Row] {
        self.rows.get(&collection).map_or(&[], Vec::as_slice)
    }

    /// Log the call and consume a matching injected failure, if any.
    fn record(&mut self, operation: Operation, collection: Collection) -> Result<(), BackendError> {
        self.calls.push((operation, collection));
        if let Some(pos) = self
            .failures
            .iter()
            .position(|f| *f == (operation, collection))
        {
            self.failures.remove(pos);
            return Err(BackendError::Api {
                status: 503,
                code: None,
                message: format!("injected {operation:?} failure on {collection}"),
            });
        }
        Ok(())
    }

    /// Strictly increasing timestamps, so `created_at` ordering is stable.
    fn tick(&mut self) -> String {
        let mut now = Utc::now();
        if let Some(last) = self.last_timestamp
            && now <= last
        {
            now = last + TimeDelta::microseconds(1);
        }
        self.last_timestamp = Some(now);
        now.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn insert_rows(
        &mut self,
        collection: Collection,
        records: Vec<Value>,
    ) -> Result<Vec<Value>, BackendError> {
        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            let Value::Object(row) = record else {
                return Err(BackendError::InvalidQuery(
                    "records must be JSON objects".to_string(),
                ));
            };
            self.check_references(collection, &row)?;
            rows.push(row);
        }

        let now = self.tick();
        let mut created = Vec::with_capacity(rows.len());
        for mut row in rows {
            self.fill_defaults(collection, &mut row, &now);
            created.push(Value::Object(row.clone()));
            self.rows.entry(collection).or_default().push(row);
        }
        Ok(created)
    }

    /// Line items must point at an existing order.
    fn check_references(&self, collection: Collection, row: &Row) -> Result<(), BackendError> {
        if collection != Collection::OrderItems {
            return Ok(());
        }
        let order_id = row.get("order_id").unwrap_or(&Value::Null);
        let exists = self
            .table(Collection::Orders)
            .iter()
            .any(|order| value_matches(order.get("id"), order_id));
        if exists {
            Ok(())
        } else {
            Err(BackendError::Api {
                status: 409,
                code: Some("23503".to_string()),
                message: format!("order_items.order_id {order_id} is not present in orders"),
            })
        }
    }

    fn fill_defaults(&mut self, collection: Collection, row: &mut Row, now: &str) {
        if collection != Collection::Profiles && row.get("id").is_none_or(Value::is_null) {
            let next = self.next_id.entry(collection).or_insert(0);
            *next += 1;
            row.insert("id".to_string(), Value::from(*next));
        } else if let Some(id) = row.get("id").and_then(Value::as_i64) {
            let next = self.next_id.entry(collection).or_insert(0);
            *next = (*next).max(id);
        }

        if collection == Collection::Orders {
            let defaults = [
                ("status", Value::from("pending")),
                ("scheduled_date", Value::Null),
                ("payment_method", Value::Null),
                ("delivery_address", Value::Null),
                ("notes", Value::Null),
                ("created_at", Value::from(now)),
                ("updated_at", Value::from(now)),
            ];
            for (column, value) in defaults {
                row.entry(column).or_insert(value);
            }
        }
    }

    fn project(
        &self,
        collection: Collection,
        row: &Row,
        fields: &[Field],
    ) -> Result<Row, BackendError> {
        let mut out = Row::new();
        for field in fields {
            match field {
                Field::All => {
                    for (column, value) in row {
                        out.insert(column.clone(), value.clone());
                    }
                }
                Field::Column(column) => {
                    out.insert(
                        column.clone(),
                        row.get(column).cloned().unwrap_or(Value::Null),
                    );
                }
                Field::Embed {
                    collection: related,
                    fields,
                } => {
                    let value = self.embed(collection, row, *related, fields)?;
                    out.insert(related.table().to_string(), value);
                }
            }
        }
        Ok(out)
    }

    fn embed(
        &self,
        collection: Collection,
        row: &Row,
        related: Collection,
        fields: &[Field],
    ) -> Result<Value, BackendError> {
        // One-to-many: related rows point at this row.
        if let Some(fk) = related.foreign_key_to(collection) {
            let Some(id) = row.get("id") else {
                return Ok(Value::Array(Vec::new()));
            };
            let children = self
                .table(related)
                .iter()
                .filter(|child| value_matches(child.get(fk), id))
                .map(|child| self.project(related, child, fields).map(Value::Object))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Value::Array(children));
        }

        // Many-to-one: this row points at a related row.
        if let Some(fk) = collection.foreign_key_to(related) {
            let target = row
                .get(fk)
                .filter(|id| !id.is_null())
                .and_then(|id| {
                    self.table(related)
                        .iter()
                        .find(|candidate| value_matches(candidate.get("id"), id))
                });
            return match target {
                Some(target) => Ok(Value::Object(self.project(related, target, fields)?)),
                None => Ok(Value::Null),
            };
        }

        Err(BackendError::InvalidQuery(format!(
            "no relation between '{collection}' and '{related}'"
        )))
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Equality as the record API sees it: query values arrive as text, so
/// `5` matches `"5"`. A `null` expected value matches missing columns.
fn value_matches(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        None | Some(Value::Null) => expected.is_null(),
        Some(actual) => {
            actual == expected
                || scalar_text(actual).is_some_and(|a| scalar_text(expected).as_ref() == Some(&a))
        }
    }
}

fn matches_all(row: &Row, filters: &[Filter]) -> bool {
    filters
        .iter()
        .all(|filter| value_matches(row.get(&filter.column), &filter.value))
}

fn compare_present(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

/// Compare two rows by the sort keys. Nulls sort last in both directions.
fn compare_rows(a: &Row, b: &Row, ordering: &[OrderBy]) -> Ordering {
    for key in ordering {
        let x = a.get(&key.column).filter(|v| !v.is_null());
        let y = b.get(&key.column).filter(|v| !v.is_null());
        let ord = match (x, y) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(x), Some(y)) => {
                let ord = compare_present(x, y);
                if key.ascending { ord } else { ord.reverse() }
            }
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

#[async_trait]
impl DataService for MemoryBackend {
    async fn insert(
        &self,
        collection: Collection,
        records: Vec<Value>,
    ) -> Result<Vec<Value>, BackendError> {
        let mut tables = self.inner.data.lock().await;
        tables.record(Operation::Insert, collection)?;
        tables.insert_rows(collection, records)
    }

    async fn update(
        &self,
        collection: Collection,
        filters: &[Filter],
        fields: Value,
    ) -> Result<Vec<Value>, BackendError> {
        let mut tables = self.inner.data.lock().await;
        tables.record(Operation::Update, collection)?;

        let Value::Object(fields) = fields else {
            return Err(BackendError::InvalidQuery(
                "update fields must be a JSON object".to_string(),
            ));
        };
        if filters.is_empty() {
            return Err(BackendError::InvalidQuery(
                "refusing to update without filters".to_string(),
            ));
        }

        let mut updated = Vec::new();
        if let Some(rows) = tables.rows.get_mut(&collection) {
            for row in rows.iter_mut().filter(|row| matches_all(row, filters)) {
                for (column, value) in &fields {
                    row.insert(column.clone(), value.clone());
                }
                updated.push(Value::Object(row.clone()));
            }
        }
        Ok(updated)
    }

    async fn select(
        &self,
        collection: Collection,
        query: &Query,
    ) -> Result<Vec<Value>, BackendError> {
        let mut tables = self.inner.data.lock().await;
        tables.record(Operation::Select, collection)?;

        let mut rows: Vec<&Row> = tables
            .table(collection)
            .iter()
            .filter(|row| matches_all(row, query.filters()))
            .collect();
        rows.sort_by(|a, b| compare_rows(a, b, query.ordering()));
        if let Some(limit) = query.row_limit() {
            rows.truncate(limit);
        }

        rows.into_iter()
            .map(|row| {
                tables
                    .project(collection, row, query.fields())
                    .map(Value::Object)
            })
            .collect()
    }

    async fn delete(
        &self,
        collection: Collection,
        filters: &[Filter],
    ) -> Result<Vec<Value>, BackendError> {
        let mut tables = self.inner.data.lock().await;
        tables.record(Operation::Delete, collection)?;
        if filters.is_empty() {
            return Err(BackendError::InvalidQuery(
                "refusing to delete without filters".to_string(),
            ));
        }

        let Some(rows) = tables.rows.get_mut(&collection) else {
            return Ok(Vec::new());
        };
        let (deleted, kept): (Vec<Row>, Vec<Row>) = std::mem::take(rows)
            .into_iter()
            .partition(|row| matches_all(row, filters));
        *rows = kept;

        // Line items go with their order.
        if collection == Collection::Orders
            && let Some(items) = tables.rows.get_mut(&Collection::OrderItems)
        {
            items.retain(|item| {
                !deleted
                    .iter()
                    .any(|order| order.get("id").is_some_and(|id| value_matches(item.get("order_id"), id)))
            });
        }

        Ok(deleted.into_iter().map(Value::Object).collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    async fn seeded() -> MemoryBackend {
        let backend = MemoryBackend::new();
        backend
            .seed(
                Collection::MenuItems,
                vec![
                    json!({"id": 1, "name": "Nasi Kuning", "price": 15000, "category": "Nasi", "is_available": true}),
                    json!({"id": 2, "name": "Ayam Bakar", "price": 20000, "category": "Lauk", "is_available": false}),
                ],
            )
            .await
            .unwrap();
        backend
    }

    #[tokio::test]
    async fn test_insert_assigns_ids_and_order_defaults() {
        let backend = MemoryBackend::new();
        let created = backend
            .insert(
                Collection::Orders,
                vec![json!({"user_id": "u1", "total_amount": "50000"})],
            )
            .await
            .unwrap();

        assert_eq!(created[0]["id"], 1);
        assert_eq!(created[0]["status"], "pending");
        assert_eq!(created[0]["payment_method"], Value::Null);
        assert!(created[0]["created_at"].is_string());
        assert_eq!(backend.write_count().await, 1);
    }

    #[tokio::test]
    async fn test_seeded_ids_advance_counter() {
        let backend = seeded().await;
        let created = backend
            .insert(Collection::MenuItems, vec![json!({"name": "Soto", "price": 12000})])
            .await
            .unwrap();
        assert_eq!(created[0]["id"], 3);
    }

    #[tokio::test]
    async fn test_select_filters_orders_and_limits() {
        let backend = seeded().await;
        let query = Query::all()
            .eq("is_available", true)
            .order_by("name", true);
        let rows = backend.select(Collection::MenuItems, &query).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], "Nasi Kuning");

        let query = Query::all().order_by("price", false).limit(1);
        let rows = backend.select(Collection::MenuItems, &query).await.unwrap();
        assert_eq!(rows[0]["name"], "Ayam Bakar");
    }

    #[tokio::test]
    async fn test_filter_matches_numeric_text() {
        let backend = seeded().await;
        let rows = backend
            .select(Collection::MenuItems, &Query::all().eq("id", "2"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_embeds_resolve_both_directions() {
        let backend = seeded().await;
        let order = backend
            .insert(Collection::Orders, vec![json!({"user_id": "u1", "total_amount": "35000"})])
            .await
            .unwrap();
        let order_id = order[0]["id"].clone();
        backend
            .insert(
                Collection::OrderItems,
                vec![
                    json!({"order_id": order_id, "menu_item_id": 1, "quantity": 1, "price": "15000"}),
                    json!({"order_id": order_id, "menu_item_id": 2, "quantity": 1, "price": "20000"}),
                ],
            )
            .await
            .unwrap();

        let query = Query::select("id,order_items(quantity,menu_items(name))").unwrap();
        let rows = backend.select(Collection::Orders, &query).await.unwrap();
        assert_eq!(
            rows[0],
            json!({
                "id": 1,
                "order_items": [
                    {"quantity": 1, "menu_items": {"name": "Nasi Kuning"}},
                    {"quantity": 1, "menu_items": {"name": "Ayam Bakar"}}
                ]
            })
        );
    }

    #[tokio::test]
    async fn test_order_without_items_embeds_empty_array() {
        let backend = MemoryBackend::new();
        backend
            .insert(Collection::Orders, vec![json!({"user_id": "u1", "total_amount": "0"})])
            .await
            .unwrap();
        let rows = backend
            .select(Collection::Orders, &Query::select("*,order_items(*)").unwrap())
            .await
            .unwrap();
        assert_eq!(rows[0]["order_items"], json!([]));
    }

    #[tokio::test]
    async fn test_line_items_require_existing_order() {
        let backend = MemoryBackend::new();
        let result = backend
            .insert(
                Collection::OrderItems,
                vec![json!({"order_id": 99, "menu_item_id": 1, "quantity": 1, "price": "1"})],
            )
            .await;
        assert!(matches!(result, Err(BackendError::Api { status: 409, .. })));
        assert!(backend.rows(Collection::OrderItems).await.is_empty());
    }

    #[tokio::test]
    async fn test_update_merges_matching_rows() {
        let backend = MemoryBackend::new();
        backend
            .insert(Collection::Orders, vec![json!({"user_id": "u1", "total_amount": "1"})])
            .await
            .unwrap();

        let filters = [Filter::eq("id", 1), Filter::eq("status", "pending")];
        let updated = backend
            .update(Collection::Orders, &filters, json!({"status": "processing"}))
            .await
            .unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0]["status"], "processing");

        let again = backend
            .update(Collection::Orders, &filters, json!({"status": "processing"}))
            .await
            .unwrap();
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn test_delete_cascades_to_line_items() {
        let backend = MemoryBackend::new();
        backend
            .insert(Collection::Orders, vec![json!({"user_id": "u1", "total_amount": "1"})])
            .await
            .unwrap();
        backend
            .insert(
                Collection::OrderItems,
                vec![json!({"order_id": 1, "menu_item_id": 1, "quantity": 1, "price": "1"})],
            )
            .await
            .unwrap();

        let deleted = backend
            .delete(Collection::Orders, &[Filter::eq("id", 1)])
            .await
            .unwrap();
        assert_eq!(deleted.len(), 1);
        assert!(backend.rows(Collection::Orders).await.is_empty());
        assert!(backend.rows(Collection::OrderItems).await.is_empty());
    }

    #[tokio::test]
    async fn test_injected_failure_fires_once() {
        let backend = MemoryBackend::new();
        backend.fail_next(Operation::Insert, Collection::Orders).await;

        let first = backend
            .insert(Collection::Orders, vec![json!({"user_id": "u1", "total_amount": "1"})])
            .await;
        assert!(matches!(first, Err(BackendError::Api { status: 503, .. })));
        assert!(backend.rows(Collection::Orders).await.is_empty());

        let second = backend
            .insert(Collection::Orders, vec![json!({"user_id": "u1", "total_amount": "1"})])
            .await;
        assert!(second.is_ok());
        assert_eq!(backend.write_count().await, 2);
    }

    #[tokio::test]
    async fn test_timestamps_strictly_increase() {
        let backend = MemoryBackend::new();
        for _ in 0..3 {
            backend
                .insert(Collection::Orders, vec![json!({"user_id": "u1", "total_amount": "1"})])
                .await
                .unwrap();
        }
        let rows = backend.rows(Collection::Orders).await;
        let stamps: Vec<&str> = rows
            .iter()
            .map(|r| r["created_at"].as_str().unwrap())
            .collect();
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_nulls_sort_last_in_both_directions() {
        let a: Row = serde_json::from_value(json!({"d": null})).unwrap();
        let b: Row = serde_json::from_value(json!({"d": "2025-01-01"})).unwrap();
        let asc = [OrderBy { column: "d".into(), ascending: true }];
        let desc = [OrderBy { column: "d".into(), ascending: false }];
        assert_eq!(compare_rows(&a, &b, &asc), Ordering::Greater);
        assert_eq!(compare_rows(&a, &b, &desc), Ordering::Greater);
    }
}
