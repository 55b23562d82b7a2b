// src/value.rs

//! Dot-path helpers over structured values.
//!
//! A path such as `task.foo.baz` names a field nested inside JSON objects.
//! Removal stops quietly when a segment is missing or the value
//! at that point is not an object.

use serde_json::Value;

/// Split a dot-path into its segments.
fn segments(path: &str) -> Vec<&str> {
    path.split('.').collect()
}

/// Remove the field named by `path` from `value`.
///
/// Returns the removed value, or `None` if the path does not exist.
pub fn remove_path(value: &mut Value, path: &str) -> Option<Value> {
    let segments = segments(path);
    let (last, parents) = segments.split_last()?;

    let mut current = value;
    for segment in parents {
        current = current.as_object_mut()?.get_mut(*segment)?;
    }
    current.as_object_mut()?.shift_remove(*last)
}

