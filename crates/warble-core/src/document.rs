//! Document model
//!
//! Addressing, querying and batched writes for a hierarchical document store.
//! Paths alternate collection and document segments, so
//! `posts/{post}/replies/{reply}/likes/{user}` names the like record of one
//! user on one reply.
//!
//! Query evaluation lives here as pure functions so every store handler
//! orders and paginates identically.

use crate::effects::StoreError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

fn segment_is_valid(segment: &str) -> bool {
    !segment.is_empty() && !segment.contains('/')
}

fn validate_segments(segments: &[String]) -> Result<(), StoreError> {
    if let Some(bad) = segments.iter().find(|s| !segment_is_valid(s)) {
        return Err(StoreError::invalid_path(format!(
            "invalid path segment {bad:?} in {}",
            segments.join("/")
        )));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Paths
// ─────────────────────────────────────────────────────────────────────────────

/// Path of a collection: an odd number of segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CollectionPath {
    segments: Vec<String>,
}

impl CollectionPath {
    /// Top-level collection.
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            segments: vec![name.into()],
        }
    }

    /// Parse a slash separated collection path.
    pub fn parse(path: &str) -> Result<Self, StoreError> {
        let segments: Vec<String> = path.split('/').map(str::to_string).collect();
        validate_segments(&segments)?;
        if segments.len() % 2 == 0 {
            return Err(StoreError::invalid_path(format!(
                "{path} names a document, not a collection"
            )));
        }
        Ok(Self { segments })
    }

    /// Document `id` inside this collection.
    pub fn doc(&self, id: impl fmt::Display) -> DocumentPath {
        let mut segments = self.segments.clone();
        segments.push(id.to_string());
        DocumentPath { segments }
    }

    /// The document owning this collection, if it is a sub-collection.
    pub fn parent(&self) -> Option<DocumentPath> {
        if self.segments.len() < 3 {
            return None;
        }
        Some(DocumentPath {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Last segment.
    pub fn name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Raw segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Check segment validity.
    pub fn validate(&self) -> Result<(), StoreError> {
        validate_segments(&self.segments)
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

/// Path of a single document: an even, non-zero number of segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentPath {
    segments: Vec<String>,
}

impl DocumentPath {
    /// Parse a slash separated document path.
    pub fn parse(path: &str) -> Result<Self, StoreError> {
        let segments: Vec<String> = path.split('/').map(str::to_string).collect();
        validate_segments(&segments)?;
        if segments.len() % 2 != 0 {
            return Err(StoreError::invalid_path(format!(
                "{path} names a collection, not a document"
            )));
        }
        Ok(Self { segments })
    }

    /// Sub-collection `name` under this document.
    pub fn collection(&self, name: impl Into<String>) -> CollectionPath {
        let mut segments = self.segments.clone();
        segments.push(name.into());
        CollectionPath { segments }
    }

    /// The collection holding this document.
    pub fn parent(&self) -> CollectionPath {
        let end = self.segments.len().saturating_sub(1);
        CollectionPath {
            segments: self.segments[..end].to_vec(),
        }
    }

    /// Document id (last segment).
    pub fn id(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Raw segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// True when `self` lies strictly below `ancestor`.
    pub fn is_descendant_of(&self, ancestor: &DocumentPath) -> bool {
        self.segments.len() > ancestor.segments.len()
            && self.segments.starts_with(&ancestor.segments)
    }

    /// Check segment validity and shape.
    pub fn validate(&self) -> Result<(), StoreError> {
        validate_segments(&self.segments)?;
        if self.segments.is_empty() || self.segments.len() % 2 != 0 {
            return Err(StoreError::invalid_path(format!(
                "{self} is not a document path"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Documents
// ─────────────────────────────────────────────────────────────────────────────

/// A stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Where the document lives
    pub path: DocumentPath,
    /// Document body (always a JSON object for records written by Warble)
    pub data: Value,
}

impl Document {
    /// Create a document.
    pub fn new(path: DocumentPath, data: Value) -> Self {
        Self { path, data }
    }

    /// Document id.
    pub fn id(&self) -> &str {
        self.path.id()
    }

    /// Look up a field; dots address nested objects.
    pub fn field(&self, name: &str) -> Option<&Value> {
        name.split('.')
            .try_fold(&self.data, |value, part| value.get(part))
    }

    /// Decode the body into a typed record.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        serde_json::from_value(self.data.clone()).map_err(|e| {
            StoreError::serialization(format!("failed to decode {}: {e}", self.path))
        })
    }

    /// Pagination cursor positioned on this document.
    pub fn cursor(&self, order_field: &str) -> Cursor {
        Cursor {
            value: self.field(order_field).cloned().unwrap_or(Value::Null),
            document_id: self.id().to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Queries
// ─────────────────────────────────────────────────────────────────────────────

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Smallest first
    Ascending,
    /// Largest first
    Descending,
}

/// Ordering clause.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderBy {
    /// Field to order by
    pub field: String,
    /// Direction applied to the field and to the document-id tie-break
    pub direction: Direction,
}

/// Field filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    /// Field equals value
    Eq {
        /// Field name
        field: String,
        /// Expected value
        value: Value,
    },
    /// Field equals one of the values
    In {
        /// Field name
        field: String,
        /// Accepted values
        values: Vec<Value>,
    },
}

impl Filter {
    fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::Eq { field, value } => doc.field(field) == Some(value),
            Filter::In { field, values } => doc
                .field(field)
                .map(|v| values.contains(v))
                .unwrap_or(false),
        }
    }
}

/// Resume point for paginated queries: the order value and id of the last
/// document already seen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    /// Value of the order field on the last seen document
    pub value: Value,
    /// Id of the last seen document
    pub document_id: String,
}

/// Query over the direct documents of one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Collection being queried
    pub collection: CollectionPath,
    /// Conjunctive filters
    pub filters: Vec<Filter>,
    /// Optional ordering (document id ascending otherwise)
    pub order_by: Option<OrderBy>,
    /// Maximum number of results
    pub limit: Option<usize>,
    /// Skip everything up to and including this position
    pub start_after: Option<Cursor>,
}

impl Query {
    /// Query every document of a collection.
    pub fn collection(collection: CollectionPath) -> Self {
        Self {
            collection,
            filters: Vec::new(),
            order_by: None,
            limit: None,
            start_after: None,
        }
    }

    /// Add an equality filter.
    pub fn filter_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Add a membership filter.
    pub fn filter_in(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.filters.push(Filter::In {
            field: field.into(),
            values,
        });
        self
    }

    /// Order results.
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    /// Cap the number of results.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Resume after a cursor.
    pub fn start_after(mut self, cursor: Cursor) -> Self {
        self.start_after = Some(cursor);
        self
    }

    /// Whether `doc` belongs to the queried collection and passes every filter.
    pub fn matches(&self, doc: &Document) -> bool {
        doc.path.parent() == self.collection && self.filters.iter().all(|f| f.matches(doc))
    }

    /// Check the query is well formed.
    pub fn validate(&self) -> Result<(), StoreError> {
        self.collection.validate()?;
        if self.limit == Some(0) {
            return Err(StoreError::invalid_query("limit must be positive"));
        }
        if self.start_after.is_some() && self.order_by.is_none() {
            return Err(StoreError::invalid_query(
                "start_after requires an order_by clause",
            ));
        }
        Ok(())
    }

    fn sort_key<'a>(&self, doc: &'a Document) -> (&'a Value, &'a str) {
        let value = self
            .order_by
            .as_ref()
            .and_then(|o| doc.field(&o.field))
            .unwrap_or(&Value::Null);
        (value, doc.id())
    }

    fn compare_keys(&self, a: (&Value, &str), b: (&Value, &str)) -> Ordering {
        let ordering = compare_values(a.0, b.0).then_with(|| a.1.cmp(b.1));
        match self.order_by.as_ref().map(|o| o.direction) {
            Some(Direction::Descending) => ordering.reverse(),
            _ => ordering,
        }
    }

    /// Evaluate the query over a set of candidate documents.
    pub fn evaluate<'a, I>(&self, documents: I) -> Vec<Document>
    where
        I: IntoIterator<Item = &'a Document>,
    {
        let mut matched: Vec<&Document> =
            documents.into_iter().filter(|d| self.matches(d)).collect();
        matched.sort_by(|a, b| self.compare_keys(self.sort_key(a), self.sort_key(b)));

        let start = match &self.start_after {
            Some(cursor) => {
                let anchor = (&cursor.value, cursor.document_id.as_str());
                matched
                    .iter()
                    .position(|d| self.compare_keys(self.sort_key(d), anchor) == Ordering::Greater)
                    .unwrap_or(matched.len())
            }
            None => 0,
        };

        let end = match self.limit {
            Some(limit) => (start + limit).min(matched.len()),
            None => matched.len(),
        };

        matched[start..end].iter().map(|d| (*d).clone()).collect()
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values used for sorting and cursors.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                x.cmp(&y)
            } else if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                x.cmp(&y)
            } else {
                let x = x.as_f64().unwrap_or(f64::NAN);
                let y = y.as_f64().unwrap_or(f64::NAN);
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .iter()
            .zip(y.iter())
            .map(|(a, b)| compare_values(a, b))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Writes
// ─────────────────────────────────────────────────────────────────────────────

/// A single write inside a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Write {
    /// Create a document; the batch fails with `AlreadyExists` if it exists.
    Create {
        /// Target document
        path: DocumentPath,
        /// Body
        data: Value,
    },
    /// Create or overwrite a document.
    Set {
        /// Target document
        path: DocumentPath,
        /// Body
        data: Value,
    },
    /// Delete a document.
    Delete {
        /// Target document
        path: DocumentPath,
        /// Fail the batch with `NotFound` when the document is absent
        must_exist: bool,
    },
}

impl Write {
    /// Document touched by this write.
    pub fn path(&self) -> &DocumentPath {
        match self {
            Write::Create { path, .. } | Write::Set { path, .. } | Write::Delete { path, .. } => {
                path
            }
        }
    }
}

/// Ordered set of writes applied all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WriteBatch {
    writes: Vec<Write>,
}

impl WriteBatch {
    /// Empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `path`, failing if it already exists.
    pub fn create(mut self, path: DocumentPath, data: Value) -> Self {
        self.writes.push(Write::Create { path, data });
        self
    }

    /// Create or overwrite `path`.
    pub fn set(mut self, path: DocumentPath, data: Value) -> Self {
        self.writes.push(Write::Set { path, data });
        self
    }

    /// Delete `path` if present.
    pub fn delete(mut self, path: DocumentPath) -> Self {
        self.writes.push(Write::Delete {
            path,
            must_exist: false,
        });
        self
    }

    /// Delete `path`, failing if it is absent.
    pub fn delete_existing(mut self, path: DocumentPath) -> Self {
        self.writes.push(Write::Delete {
            path,
            must_exist: true,
        });
        self
    }

    /// Append a write.
    pub fn push(&mut self, write: Write) {
        self.writes.push(write);
    }

    /// Writes in order.
    pub fn writes(&self) -> &[Write] {
        &self.writes
    }

    /// Consume into writes.
    pub fn into_writes(self) -> Vec<Write> {
        self.writes
    }

    /// Number of writes.
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    /// True when nothing would be written.
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn doc(path: &str, data: Value) -> Document {
        Document::new(DocumentPath::parse(path).unwrap(), data)
    }

    #[test]
    fn test_path_shapes() {
        let posts = CollectionPath::root("posts");
        let post = posts.doc("p1");
        let likes = post.collection("likes");

        assert_eq!(likes.to_string(), "posts/p1/likes");
        assert_eq!(likes.parent(), Some(post.clone()));
        assert_eq!(post.parent(), posts);
        assert!(likes.doc("u1").is_descendant_of(&post));
        assert!(!post.is_descendant_of(&post));

        assert!(CollectionPath::parse("posts/p1").is_err());
        assert!(DocumentPath::parse("posts").is_err());
        assert!(DocumentPath::parse("posts//x").is_err());
    }

    #[test]
    fn test_query_orders_and_breaks_ties_by_id() {
        let docs = vec![
            doc("posts/a", json!({"created_at": 2})),
            doc("posts/b", json!({"created_at": 3})),
            doc("posts/c", json!({"created_at": 2})),
            doc("other/d", json!({"created_at": 9})),
        ];

        let query = Query::collection(CollectionPath::root("posts"))
            .order_by("created_at", Direction::Descending);
        let ids: Vec<_> = query
            .evaluate(&docs)
            .iter()
            .map(|d| d.id().to_string())
            .collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_query_filters_and_paginates() {
        let docs: Vec<Document> = (0..5)
            .map(|i| {
                doc(
                    &format!("posts/p{i}"),
                    json!({"created_at": i, "author": if i % 2 == 0 { "x" } else { "y" }}),
                )
            })
            .collect();

        let base = Query::collection(CollectionPath::root("posts"))
            .filter_in("author", vec![json!("x")])
            .order_by("created_at", Direction::Descending)
            .limit(2);

        let first = base.evaluate(&docs);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].id(), "p4");
        assert_eq!(first[1].id(), "p2");

        let second = base
            .clone()
            .start_after(first[1].cursor("created_at"))
            .evaluate(&docs);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id(), "p0");
    }

    #[test]
    fn test_query_validation() {
        let query = Query::collection(CollectionPath::root("posts")).start_after(Cursor {
            value: Value::Null,
            document_id: "x".into(),
        });
        assert!(query.validate().is_err());
        assert!(Query::collection(CollectionPath::root("posts"))
            .limit(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_nested_field_lookup() {
        let d = doc("users/u", json!({"profile": {"pseudo": "@bob"}}));
        assert_eq!(d.field("profile.pseudo"), Some(&json!("@bob")));
        assert_eq!(d.field("profile.bio"), None);
    }

    proptest! {
        #[test]
        fn prop_descending_query_is_sorted_and_bounded(
            stamps in prop::collection::vec(0u64..50, 0..20),
            limit in 1usize..8,
        ) {
            let docs: Vec<Document> = stamps
                .iter()
                .enumerate()
                .map(|(i, at)| doc(&format!("posts/p{i:02}"), json!({"created_at": at})))
                .collect();
            let query = Query::collection(CollectionPath::root("posts"))
                .order_by("created_at", Direction::Descending)
                .limit(limit);

            let page = query.evaluate(&docs);
            prop_assert_eq!(page.len(), stamps.len().min(limit));
            for pair in page.windows(2) {
                let (a, b) = (&pair[0], &pair[1]);
                let order = compare_values(&a.data["created_at"], &b.data["created_at"]);
                prop_assert_ne!(order, Ordering::Less);
                if order == Ordering::Equal {
                    prop_assert!(a.id() > b.id());
                }
            }
        }
    }
}
