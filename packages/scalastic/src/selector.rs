//! Partition selector
//!
//! Stamps a partition id onto a document body at a dotted field path.

use serde_json::{Map, Value};

use crate::error::{PartitionError, Result};

/// Writes one partition id at one field path
///
/// # Examples
///
/// ```rust
/// use scalastic::PartitionSelector;
/// use serde_json::json;
///
/// let selector = PartitionSelector::new("parent.child.partition_id", json!(5));
/// let mut body = json!({});
/// selector.apply_to(&mut body).unwrap();
/// assert_eq!(body, json!({"parent": {"child": {"partition_id": 5}}}));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionSelector {
    objects: Vec<String>,
    field: String,
    value: Value,
}

impl PartitionSelector {
    pub fn new(full_field_name: &str, value: Value) -> Self {
        let mut objects: Vec<String> = full_field_name.split('.').map(str::to_string).collect();
        let field = objects.pop().unwrap_or_default();
        Self {
            objects,
            field,
            value,
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Set the selector field on `body`
    ///
    /// Missing intermediate objects are created; sibling fields are kept.
    /// Fails when `body` or an intermediate field is not an object.
    pub fn apply_to<'a>(&self, body: &'a mut Value) -> Result<&'a mut Value> {
        let mut node: &mut Map<String, Value> = body
            .as_object_mut()
            .ok_or_else(|| PartitionError::invalid_argument("Document body must be an object"))?;

        for segment in &self.objects {
            node = node
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new()))
                .as_object_mut()
                .ok_or_else(|| {
                    PartitionError::invalid_argument(format!(
                        "Field '{}' must be an object to hold the partition selector",
                        segment
                    ))
                })?;
        }

        node.insert(self.field.clone(), self.value.clone());
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_flat_field() {
        let selector = PartitionSelector::new("scalastic_partition_id", json!(1));
        let mut body = json!({"field1": 1, "field2": 2});
        selector.apply_to(&mut body).unwrap();
        assert_eq!(
            body,
            json!({"field1": 1, "field2": 2, "scalastic_partition_id": 1})
        );
    }

    #[test]
    fn test_nested_field_on_empty_body() {
        let selector = PartitionSelector::new("parent.child.partition_id", json!(5));
        let mut body = json!({});
        selector.apply_to(&mut body).unwrap();
        assert_eq!(body, json!({"parent": {"child": {"partition_id": 5}}}));
    }

    #[test]
    fn test_keeps_siblings_on_path() {
        let selector = PartitionSelector::new("parent.child.partition_id", json!("a"));
        let mut body = json!({"parent": {"name": "p", "child": {"name": "c"}}, "top": true});
        selector.apply_to(&mut body).unwrap();
        assert_eq!(
            body,
            json!({
                "parent": {"name": "p", "child": {"name": "c", "partition_id": "a"}},
                "top": true
            })
        );
    }

    #[test]
    fn test_overwrites_previous_id() {
        let selector = PartitionSelector::new("pid", json!(2));
        let mut body = json!({"pid": 1});
        selector.apply_to(&mut body).unwrap();
        assert_eq!(body, json!({"pid": 2}));
    }

    #[test]
    fn test_returns_same_body_for_chaining() {
        let selector = PartitionSelector::new("a.pid", json!(3));
        let mut body = json!({});
        let stamped = selector.apply_to(&mut body).unwrap();
        stamped["extra"] = json!(1);
        assert_eq!(body, json!({"a": {"pid": 3}, "extra": 1}));
    }

    #[test]
    fn test_rejects_non_object_body() {
        let selector = PartitionSelector::new("pid", json!(1));
        assert!(selector.apply_to(&mut json!([1, 2])).is_err());
        assert!(selector.apply_to(&mut Value::Null).is_err());
    }

    #[test]
    fn test_rejects_scalar_on_path() {
        let selector = PartitionSelector::new("parent.pid", json!(1));
        let mut body = json!({"parent": "scalar"});
        assert!(selector.apply_to(&mut body).is_err());
    }

    proptest! {
        #[test]
        fn prop_apply_is_idempotent(
            path in proptest::collection::vec("[a-z]{1,6}", 1..4),
            id in 0i64..10_000,
            sibling in "[a-z]{1,6}",
        ) {
            let selector = PartitionSelector::new(&path.join("."), json!(id));
            let mut once = json!({});
            once[format!("{}_x", sibling)] = json!(sibling);
            selector.apply_to(&mut once).unwrap();
            let mut twice = once.clone();
            selector.apply_to(&mut twice).unwrap();
            prop_assert_eq!(twice, once);
        }
    }
}
