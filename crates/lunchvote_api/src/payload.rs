//! JSON request body decoding for vote submissions.
//!
//! Decoding is lenient on purpose: absent, null or mistyped fields become
//! `None`/`NotInteger` so the core validator decides which rejection applies
//! and in which order.

use lunchvote_core::{BatchEntry, PointsInput, SubmissionMode, VoteRequest};
use serde_json::Value;

/// Builds the core vote request from the build-version signal and body.
pub fn vote_request(build_version: Option<&str>, body: &Value) -> VoteRequest {
    match SubmissionMode::from_build_version(build_version) {
        Some(SubmissionMode::Single) => VoteRequest::Single {
            menu_id: id_field(body, "menu_id"),
            employee_id: id_field(body, "employee_id"),
        },
        Some(SubmissionMode::Batch) => VoteRequest::Batch {
            employee_id: id_field(body, "employee_id"),
            entries: body
                .get("votes")
                .and_then(Value::as_array)
                .map(|votes| votes.iter().map(batch_entry).collect())
                .unwrap_or_default(),
        },
        None => VoteRequest::Unsupported {
            build_version: build_version.map(str::to_string),
        },
    }
}

fn batch_entry(vote: &Value) -> BatchEntry {
    BatchEntry {
        menu_id: id_field(vote, "menu_id"),
        points: points_field(vote),
    }
}

/// Reads an integer id; numeric strings are accepted as form-encoded ids.
fn id_field(body: &Value, key: &str) -> Option<i64> {
    match body.get(key)? {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn points_field(vote: &Value) -> Option<PointsInput> {
    match vote.get("points")? {
        Value::Null => None,
        Value::Number(number) => Some(
            number
                .as_i64()
                .map_or(PointsInput::NotInteger, PointsInput::Integer),
        ),
        _ => Some(PointsInput::NotInteger),
    }
}

#[cfg(test)]
mod tests {
    use super::vote_request;
    use lunchvote_core::{BatchEntry, PointsInput, VoteRequest};
    use serde_json::json;

    #[test]
    fn old_build_decodes_single_vote() {
        let request = vote_request(Some("old"), &json!({"menu_id": 4, "employee_id": "7"}));
        assert_eq!(request, VoteRequest::single(4, 7));
    }

    #[test]
    fn new_build_decodes_batch_entries() {
        let request = vote_request(
            Some("new"),
            &json!({
                "employee_id": 7,
                "votes": [
                    {"menu_id": 1, "points": 1},
                    {"menu_id": 2, "points": 2.5},
                    {"menu_id": 3, "points": "3"},
                    {"points": null},
                    "junk"
                ]
            }),
        );
        let VoteRequest::Batch {
            employee_id,
            entries,
        } = request
        else {
            panic!("expected batch request");
        };
        assert_eq!(employee_id, Some(7));
        assert_eq!(entries[0], BatchEntry::new(1, 1));
        assert_eq!(entries[1].points, Some(PointsInput::NotInteger));
        assert_eq!(entries[2].points, Some(PointsInput::NotInteger));
        assert_eq!(entries[3], BatchEntry::default());
        assert_eq!(entries[4], BatchEntry::default());
    }

    #[test]
    fn batch_without_vote_list_has_no_entries() {
        let request = vote_request(Some("new"), &json!({"employee_id": 7, "votes": "all"}));
        assert!(matches!(request, VoteRequest::Batch { entries, .. } if entries.is_empty()));
    }

    #[test]
    fn unknown_build_is_unsupported() {
        let request = vote_request(Some("beta"), &json!({}));
        assert_eq!(
            request,
            VoteRequest::Unsupported {
                build_version: Some("beta".to_string())
            }
        );
        assert!(matches!(
            vote_request(None, &json!({})),
            VoteRequest::Unsupported { build_version: None }
        ));
    }
}
