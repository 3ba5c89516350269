//! JSON canonicalization and the flattened structured view

use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

/// Parse and re-serialize with sorted keys and two-space indentation
pub fn canonicalize(text: &str) -> Result<String, serde_json::Error> {
    let value: Value = serde_json::from_str(text)?;
    serde_json::to_string_pretty(&value)
}

/// How a node differs between the two documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeChange {
    Unchanged,
    Added,
    Removed,
    Modified,
}

/// One row of the structured view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructuredRow {
    pub depth: usize,
    /// JSON pointer of the node; empty for the root
    pub path: String,
    /// Object key or array index; empty for the root
    pub key: String,
    pub change: NodeChange,
    /// Rendered value for leaves, or an opening bracket for containers
    pub text: String,
    /// Previous value for modified leaves
    pub old_text: Option<String>,
    /// Direct children of a container, counted on the newer side
    pub children: Option<usize>,
}

impl StructuredRow {
    pub fn is_container(&self) -> bool {
        self.children.is_some()
    }

    /// One-line stand-in for a collapsed container, e.g. `{ 2 properties }`
    pub fn summary(&self) -> Option<String> {
        let count = self.children?;
        Some(match (self.text.as_str(), count) {
            ("[", 1) => "[ 1 item ]".to_string(),
            ("[", n) => format!("[ {n} items ]"),
            (_, 1) => "{ 1 property }".to_string(),
            (_, n) => format!("{{ {n} properties }}"),
        })
    }
}

/// Flatten the merged tree of two JSON documents into rows
pub fn structured_rows(old: &str, new: &str) -> Result<Vec<StructuredRow>, serde_json::Error> {
    let old: Value = serde_json::from_str(old)?;
    let new: Value = serde_json::from_str(new)?;
    let mut rows = Vec::new();
    walk(Some(&old), Some(&new), Node::root(), &mut rows);
    Ok(rows)
}

/// Hide the descendants of collapsed containers.
///
/// A collapsed container keeps its row, with its bracket replaced by its
/// summary.
pub fn collapse_rows(rows: &[StructuredRow], collapsed: &HashSet<String>) -> Vec<StructuredRow> {
    let mut visible = Vec::with_capacity(rows.len());
    let mut hidden_below: Option<usize> = None;
    for row in rows {
        if let Some(depth) = hidden_below {
            if row.depth > depth {
                continue;
            }
            hidden_below = None;
        }
        let mut row = row.clone();
        if row.is_container() && collapsed.contains(&row.path) {
            hidden_below = Some(row.depth);
            if let Some(summary) = row.summary() {
                row.text = summary;
            }
        }
        visible.push(row);
    }
    visible
}

/// Where a node sits in the tree
struct Node {
    path: String,
    key: String,
    depth: usize,
}

impl Node {
    fn root() -> Self {
        Self {
            path: String::new(),
            key: String::new(),
            depth: 0,
        }
    }

    fn child(&self, key: String) -> Self {
        // RFC 6901 escaping
        let escaped = key.replace('~', "~0").replace('/', "~1");
        Self {
            path: format!("{}/{escaped}", self.path),
            key,
            depth: self.depth + 1,
        }
    }

    fn row(self, change: NodeChange, text: String) -> StructuredRow {
        StructuredRow {
            depth: self.depth,
            path: self.path,
            key: self.key,
            change,
            text,
            old_text: None,
            children: None,
        }
    }

    fn container(&self, change: NodeChange, bracket: &str, children: usize) -> StructuredRow {
        StructuredRow {
            depth: self.depth,
            path: self.path.clone(),
            key: self.key.clone(),
            change,
            text: bracket.to_string(),
            old_text: None,
            children: Some(children),
        }
    }
}

fn walk(old: Option<&Value>, new: Option<&Value>, node: Node, rows: &mut Vec<StructuredRow>) {
    match (old, new) {
        (Some(Value::Object(a)), Some(Value::Object(b))) => {
            rows.push(node.container(change_of(old, new), "{", b.len()));
            let mut keys: Vec<&String> = a.keys().chain(b.keys()).collect();
            keys.sort();
            keys.dedup();
            for k in keys {
                walk(a.get(k), b.get(k), node.child(k.clone()), rows);
            }
        }
        (Some(Value::Array(a)), Some(Value::Array(b))) => {
            rows.push(node.container(change_of(old, new), "[", b.len()));
            for idx in 0..a.len().max(b.len()) {
                walk(a.get(idx), b.get(idx), node.child(idx.to_string()), rows);
            }
        }
        (Some(a), Some(b)) if a == b => subtree(a, node, NodeChange::Unchanged, rows),
        (Some(a), Some(b)) => rows.push(StructuredRow {
            old_text: Some(leaf_text(a)),
            ..node.row(NodeChange::Modified, leaf_text(b))
        }),
        (Some(a), None) => subtree(a, node, NodeChange::Removed, rows),
        (None, Some(b)) => subtree(b, node, NodeChange::Added, rows),
        (None, None) => {}
    }
}

/// Emit a value that exists on one side only (or identically on both)
fn subtree(value: &Value, node: Node, change: NodeChange, rows: &mut Vec<StructuredRow>) {
    match value {
        Value::Object(map) => {
            rows.push(node.container(change, "{", map.len()));
            for (k, v) in map {
                subtree(v, node.child(k.clone()), change, rows);
            }
        }
        Value::Array(items) => {
            rows.push(node.container(change, "[", items.len()));
            for (idx, v) in items.iter().enumerate() {
                subtree(v, node.child(idx.to_string()), change, rows);
            }
        }
        leaf => rows.push(node.row(change, leaf_text(leaf))),
    }
}

fn change_of(old: Option<&Value>, new: Option<&Value>) -> NodeChange {
    if old == new {
        NodeChange::Unchanged
    } else {
        NodeChange::Modified
    }
}

fn leaf_text(value: &Value) -> String {
    match value {
        Value::Object(_) => "{…}".to_string(),
        Value::Array(_) => "[…]".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_sorts_keys() {
        assert_eq!(
            canonicalize(r#"{"z": [1, 2], "a": null}"#).unwrap(),
            "{\n  \"a\": null,\n  \"z\": [\n    1,\n    2\n  ]\n}"
        );
    }

    #[test]
    fn test_structured_rows_classify_nodes() {
        let rows = structured_rows(
            r#"{"name": "a", "gone": 1, "list": [1, 2]}"#,
            r#"{"name": "b", "list": [1, 2], "fresh": {"x": true}}"#,
        )
        .unwrap();

        let find = |key: &str| rows.iter().find(|r| r.key == key).unwrap();
        assert_eq!(rows[0].change, NodeChange::Modified);
        assert_eq!(find("name").change, NodeChange::Modified);
        assert_eq!(find("name").old_text.as_deref(), Some("\"a\""));
        assert_eq!(find("gone").change, NodeChange::Removed);
        assert_eq!(find("list").change, NodeChange::Unchanged);
        assert_eq!(find("fresh").change, NodeChange::Added);
        assert_eq!(find("x").change, NodeChange::Added);
        assert_eq!(find("x").depth, 2);
    }

    #[test]
    fn test_rows_carry_paths_and_child_counts() {
        let rows = structured_rows(
            r#"{"a/b": {"x": 1, "y": 2}, "list": [1]}"#,
            r#"{"a/b": {"x": 1}, "list": [1, 2, 3]}"#,
        )
        .unwrap();
        let paths: Vec<&str> = rows.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["", "/a~1b", "/a~1b/x", "/a~1b/y", "/list", "/list/0", "/list/1", "/list/2"]
        );
        assert_eq!(rows[0].summary().as_deref(), Some("{ 2 properties }"));
        assert_eq!(rows[1].summary().as_deref(), Some("{ 1 property }"));
        assert_eq!(rows[4].summary().as_deref(), Some("[ 3 items ]"));
        assert_eq!(rows[2].summary(), None);
    }

    #[test]
    fn test_collapse_rows_hides_descendants() {
        let rows = structured_rows(
            r#"{"a": {"b": {"c": 1}}, "z": 2}"#,
            r#"{"a": {"b": {"c": 2}}, "z": 2}"#,
        )
        .unwrap();
        assert_eq!(rows.len(), 5);

        let collapsed: HashSet<String> = ["/a".to_string()].into();
        let visible = collapse_rows(&rows, &collapsed);
        let shown: Vec<(&str, &str)> = visible
            .iter()
            .map(|r| (r.path.as_str(), r.text.as_str()))
            .collect();
        assert_eq!(
            shown,
            vec![("", "{"), ("/a", "{ 1 property }"), ("/z", "2")]
        );
        assert_eq!(visible[1].change, NodeChange::Modified);

        // Collapsing a leaf path does nothing
        let collapsed: HashSet<String> = ["/z".to_string()].into();
        assert_eq!(collapse_rows(&rows, &collapsed), rows);
    }

    #[test]
    fn test_type_change_is_modified_leaf() {
        let rows = structured_rows(r#"{"v": [1]}"#, r#"{"v": 1}"#).unwrap();
        let v = rows.iter().find(|r| r.key == "v").unwrap();
        assert_eq!(v.change, NodeChange::Modified);
        assert_eq!(v.old_text.as_deref(), Some("[…]"));
    }
}
