use super::{WriteError, MAX_WRITE_INDEX};
use crate::document::XmlElement;
use crate::path::ElementPath;

pub(super) fn write(
    path: &ElementPath,
    root: &mut XmlElement,
    value: Option<&str>,
    repeat_index: Option<usize>,
) -> Result<(), WriteError> {
    let Some((first, rest)) = path.steps().split_first() else {
        return Err(WriteError::conflict(path.as_str(), "no element step"));
    };

    if first.name != root.name {
        return Err(WriteError::RootMismatch {
            path: path.as_str().to_string(),
            expected: first.name.clone(),
            actual: root.name.clone(),
        });
    }
    if first.repeat || first.position.map_or(false, |p| p != 1) {
        return Err(WriteError::conflict(path.as_str(), "the root element cannot repeat"));
    }

    let implicit_slot = if path.has_repeat() {
        None
    } else {
        implicit_append_depth(rest.len(), path.attribute().is_some())
    };

    let positions: Vec<usize> = rest
        .iter()
        .enumerate()
        .map(|(depth, step)| match repeat_index {
            Some(index) if step.repeat || implicit_slot == Some(depth) => index,
            _ => step.position.map_or(0, |p| p - 1),
        })
        .collect();
    if let Some(position) = positions.iter().find(|p| **p > MAX_WRITE_INDEX) {
        return Err(WriteError::conflict(
            path.as_str(),
            format!("index {} exceeds the maximum of {}", position, MAX_WRITE_INDEX),
        ));
    }

    let mut current = root;
    for (step, position) in rest.iter().zip(positions) {
        current = current.ensure_child(&step.name, position);
    }

    match (path.attribute(), value) {
        (Some(name), Some(text)) => current.set_attribute(name, text),
        (Some(_), None) => {}
        (None, text) => current.set_text(text.unwrap_or_default()),
    }
    Ok(())
}

/// Depth (below the root) of the element that repeats when a path carries no
/// marker: the element owning an attribute, the parent of a text leaf, or the
/// leaf itself when it sits directly under the root.
fn implicit_append_depth(steps: usize, has_attribute: bool) -> Option<usize> {
    match steps {
        0 => None,
        1 => Some(0),
        n if has_attribute => Some(n - 1),
        n => Some(n - 2),
    }
}
