use super::{WriteError, MAX_WRITE_INDEX};
use crate::path::tree::{Segment, TreePath};
use serde_json::{Map, Value};

pub(super) fn write(
    path: &TreePath,
    root: &mut Value,
    value: Option<&str>,
    repeat_index: Option<usize>,
) -> Result<(), WriteError> {
    if path.segments().is_empty() {
        return Err(WriteError::conflict(path.as_str(), "the document root cannot be replaced"));
    }

    let mut current = root;
    for segment in path.segments() {
        current = match segment {
            Segment::Child(name) => {
                if current.is_null() {
                    *current = Value::Object(Map::new());
                }
                match current {
                    Value::Object(map) => map.entry(name.clone()).or_insert(Value::Null),
                    other => {
                        return Err(WriteError::conflict(
                            path.as_str(),
                            format!("expected an object before '{}', found {}", name, kind(other)),
                        ))
                    }
                }
            }
            Segment::Index(_) | Segment::Repeat => {
                let index = match segment {
                    Segment::Index(index) => usize::try_from(*index).map_err(|_| {
                        WriteError::conflict(path.as_str(), "negative index")
                    })?,
                    _ => repeat_index.unwrap_or(0),
                };
                if index > MAX_WRITE_INDEX {
                    return Err(WriteError::conflict(
                        path.as_str(),
                        format!("index {} exceeds the maximum of {}", index, MAX_WRITE_INDEX),
                    ));
                }
                if current.is_null() {
                    *current = Value::Array(Vec::new());
                }
                match current {
                    Value::Array(items) => {
                        if items.len() <= index {
                            items.resize(index + 1, Value::Null);
                        }
                        &mut items[index]
                    }
                    other => {
                        return Err(WriteError::conflict(
                            path.as_str(),
                            format!("expected an array, found {}", kind(other)),
                        ))
                    }
                }
            }
            Segment::Wildcard | Segment::Descendant(_) | Segment::Filter(_) => {
                return Err(WriteError::conflict(
                    path.as_str(),
                    "selectors cannot address a write target",
                ))
            }
        };
    }

    *current = value.map_or(Value::Null, |text| Value::String(text.to_string()));
    Ok(())
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn put(doc: &mut Value, path: &str, value: Option<&str>, index: Option<usize>) -> Result<(), WriteError> {
        write(&TreePath::parse_destination(path).unwrap(), doc, value, index)
    }

    #[test]
    fn test_auto_vivifies_objects_and_arrays() {
        let mut doc = json!({});
        put(&mut doc, "$.order.lines[2].sku", Some("x"), None).unwrap();
        assert_eq!(doc, json!({"order": {"lines": [null, null, {"sku": "x"}]}}));
    }

    #[test]
    fn test_repeat_marker_uses_repeat_index() {
        let mut doc = json!({});
        put(&mut doc, "$.phones[*].number", Some("1"), Some(0)).unwrap();
        put(&mut doc, "$.phones[*].number", Some("2"), Some(1)).unwrap();
        put(&mut doc, "$.phones[].kind", Some("home"), Some(1)).unwrap();
        assert_eq!(
            doc,
            json!({"phones": [{"number": "1"}, {"number": "2", "kind": "home"}]})
        );
    }

    #[test]
    fn test_last_write_wins_and_null_leaf() {
        let mut doc = json!({"name": "old"});
        put(&mut doc, "$.name", Some("new"), None).unwrap();
        put(&mut doc, "$.nickname", None, None).unwrap();
        assert_eq!(doc, json!({"name": "new", "nickname": null}));
    }

    #[test]
    fn test_conflict_with_existing_scalar() {
        let mut doc = json!({"name": "Ann"});
        let err = put(&mut doc, "$.name.first", Some("x"), None).unwrap_err();
        assert!(matches!(err, WriteError::Conflict { .. }));

        let err = put(&mut doc, "$.name[0]", Some("x"), None).unwrap_err();
        assert!(matches!(err, WriteError::Conflict { .. }));
        assert_eq!(doc, json!({"name": "Ann"}));
    }

    #[test]
    fn test_root_cannot_be_replaced() {
        let mut doc = json!({});
        assert!(put(&mut doc, "$", Some("x"), None).is_err());
    }
}
