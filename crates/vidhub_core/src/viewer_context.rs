/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::entity_store::{get_path, json_type, stored_identifier, Document};
use crate::error::{ViewError, ViewResult};
use serde_json::Value;
use vidhub_protocol::Identifier;

/// Writes `into = true` when some element of the joined array `of` has
/// `actor_field` equal to the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MembershipFlag {
    pub of: &'static str,
    pub actor_field: &'static str,
    pub into: &'static str,
}

pub fn apply(graph: &mut Document, flags: &[MembershipFlag], viewer: Option<&Identifier>) -> ViewResult<()> {
    for flag in flags {
        let value = contains_viewer(graph, flag, viewer)?;
        graph.insert(flag.into.to_string(), Value::Bool(value));
    }
    Ok(())
}

pub fn apply_all(
    graphs: &mut [Document],
    flags: &[MembershipFlag],
    viewer: Option<&Identifier>,
) -> ViewResult<()> {
    graphs.iter_mut().try_for_each(|g| apply(g, flags, viewer))
}

/// An anonymous viewer is never a member.
pub fn contains_viewer(graph: &Document, flag: &MembershipFlag, viewer: Option<&Identifier>) -> ViewResult<bool> {
    let Some(viewer) = viewer else {
        return Ok(false);
    };
    let items = match graph.get(flag.of) {
        None | Some(Value::Null) => return Ok(false),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(ViewError::Shape(format!(
                "`{}` holds {} where an array was expected",
                flag.of,
                json_type(other)
            )))
        }
    };
    for item in items {
        let row = item.as_object().ok_or_else(|| {
            ViewError::Shape(format!("`{}` holds {} where a document was expected", flag.of, json_type(item)))
        })?;
        match get_path(row, flag.actor_field) {
            Some(Value::String(raw)) => {
                if stored_identifier(raw, flag.actor_field)? == *viewer {
                    return Ok(true);
                }
            }
            Some(other) => {
                return Err(ViewError::Shape(format!(
                    "`{}.{}` holds {}",
                    flag.of,
                    flag.actor_field,
                    json_type(other)
                )))
            }
            None => {
                return Err(ViewError::Shape(format!("`{}.{}` is missing", flag.of, flag.actor_field)))
            }
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::new_identifier;
    use serde_json::json;

    const LIKED: MembershipFlag = MembershipFlag { of: "likes", actor_field: "actor", into: "isLiked" };

    #[test]
    fn flags_follow_the_viewer() {
        let a = new_identifier();
        let b = new_identifier();
        let stranger = new_identifier();
        let mut g = json!({"likes": [{"actor": a.to_hex()}, {"actor": b.to_hex()}]})
            .as_object()
            .unwrap()
            .clone();

        apply(&mut g, &[LIKED], Some(&b)).unwrap();
        assert_eq!(g["isLiked"], true);
        apply(&mut g, &[LIKED], Some(&stranger)).unwrap();
        assert_eq!(g["isLiked"], false);
        apply(&mut g, &[LIKED], None).unwrap();
        assert_eq!(g["isLiked"], false);
    }

    #[test]
    fn missing_array_is_false_and_bad_actor_is_shape() {
        let viewer = new_identifier();
        let mut empty = Document::new();
        apply(&mut empty, &[LIKED], Some(&viewer)).unwrap();
        assert_eq!(empty["isLiked"], false);

        let bad = json!({"likes": [{"actor": 7}]}).as_object().unwrap().clone();
        assert!(matches!(contains_viewer(&bad, &LIKED, Some(&viewer)), Err(ViewError::Shape(_))));
        // No viewer means nothing to compare, so the malformed row is never read.
        assert!(!contains_viewer(&bad, &LIKED, None).unwrap());
    }
}
