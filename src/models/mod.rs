pub mod timestamp;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Courses created without an explicit start date are given this one
/// (2030-01-01T00:00:00Z) by the LMS.
pub const DEFAULT_START_TIMESTAMP: i64 = 1_893_456_000;

/// Django `DATE_FORMAT` as used for `start_display`, e.g. "July 17, 2015".
const START_DISPLAY_FORMAT: &str = "%B %-d, %Y";

// ─── Courses ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartType {
    String,
    Timestamp,
    Empty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub name: Option<String>,
    pub number: Option<String>,
    pub org: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub course_image: Option<String>,
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub start_type: Option<StartType>,
    #[serde(default)]
    pub start_display: Option<String>,
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    pub end: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    pub enrollment_start: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    pub enrollment_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub blocks_url: Option<String>,
    /// Free-text start ("Spring 2016") set by course staff.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advertised_start: Option<String>,
}

impl Course {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unnamed course")
    }

    /// A course is completed once its end date has passed.
    pub fn is_completed(&self, now: DateTime<Utc>) -> bool {
        self.end.is_some_and(|end| end < now)
    }

    /// Start type and display text. Server-provided values win; otherwise
    /// they are derived the way the Course API derives them.
    pub fn start_info(&self) -> (StartType, Option<String>) {
        if let Some(kind) = self.start_type {
            if kind == StartType::Empty || self.start_display.is_some() {
                return (kind, self.start_display.clone());
            }
        }

        if let Some(ref advertised) = self.advertised_start {
            return (StartType::String, Some(advertised.clone()));
        }
        match self.start {
            Some(start) if start.timestamp() != DEFAULT_START_TIMESTAMP => (
                StartType::Timestamp,
                Some(start.format(START_DISPLAY_FORMAT).to_string()),
            ),
            _ => (StartType::Empty, None),
        }
    }
}

// ─── Course discovery ───────────────────────────────────────────────────────

/// One course discovery hit. Only the two date fields are interpreted; the
/// rest is handed to the result template untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    pub enrollment_start: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub data: ResultRecord,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchHit>,
    #[serde(default)]
    pub total: u64,
}

// ─── Certificate whitelist ──────────────────────────────────────────────────

/// Body returned by the bulk certificate exception endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkWhitelistResponse {
    #[serde(default)]
    pub success: Vec<String>,
    #[serde(default)]
    pub general_errors: Vec<String>,
    /// Per-category row failures, e.g. `user_not_exist: ["row 3"]`.
    #[serde(default)]
    pub row_errors: BTreeMap<String, Vec<String>>,
}

impl BulkWhitelistResponse {
    pub fn row_error_count(&self) -> usize {
        self.row_errors.values().map(Vec::len).sum()
    }

    pub fn summary(&self) -> String {
        let mut parts = vec![format!("{} learner(s) added", self.success.len())];
        let rows = self.row_error_count();
        if rows > 0 {
            parts.push(format!("{rows} row(s) skipped"));
        }
        if !self.general_errors.is_empty() {
            parts.push(self.general_errors.join("; "));
        }
        parts.join(", ")
    }
}

// ─── Pagination ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaginationLinks {
    pub next: Option<String>,
    pub previous: Option<String>,
    pub count: Option<u64>,
    pub num_pages: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Paginated<T> {
    pub results: Vec<T>,
    #[serde(default)]
    pub pagination: PaginationLinks,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn toy_course() -> Course {
        serde_json::from_value(serde_json::json!({
            "blocks_url": "/api/courses/v1/blocks/?course_id=edX%2Ftoy%2F2012_Fall",
            "course_image": "/c4x/edX/toy/asset/just_a_test.jpg",
            "description": "A course about toys.",
            "end": "2015-09-19T18:00:00Z",
            "enrollment_end": "2015-07-15T00:00:00Z",
            "enrollment_start": "2015-06-15T00:00:00Z",
            "id": "edX/toy/2012_Fall",
            "name": "Toy Course",
            "number": "toy",
            "org": "edX",
            "start": "2015-07-17T12:00:00Z",
            "start_display": "July 17, 2015",
            "start_type": "timestamp"
        }))
        .unwrap()
    }

    #[test]
    fn course_api_payload_deserializes() {
        let course = toy_course();
        assert_eq!(course.display_name(), "Toy Course");
        assert_eq!(
            course.enrollment_start,
            Some(Utc.with_ymd_and_hms(2015, 6, 15, 0, 0, 0).unwrap())
        );
        assert_eq!(
            course.start_info(),
            (StartType::Timestamp, Some("July 17, 2015".into()))
        );
    }

    #[test]
    fn start_display_is_derived_when_missing() {
        let mut course = toy_course();
        course.start_type = None;
        course.start_display = None;
        assert_eq!(
            course.start_info(),
            (StartType::Timestamp, Some("July 17, 2015".into()))
        );

        course.advertised_start = Some("Spring 2016".into());
        assert_eq!(
            course.start_info(),
            (StartType::String, Some("Spring 2016".into()))
        );

        course.advertised_start = None;
        course.start = DateTime::from_timestamp(DEFAULT_START_TIMESTAMP, 0);
        assert_eq!(course.start_info(), (StartType::Empty, None));
    }

    #[test]
    fn completion_depends_on_end_date() {
        let course = toy_course();
        let before = Utc.with_ymd_and_hms(2015, 9, 1, 0, 0, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2015, 10, 1, 0, 0, 0).unwrap();
        assert!(!course.is_completed(before));
        assert!(course.is_completed(after));
    }

    #[test]
    fn result_record_keeps_opaque_fields() {
        let record: ResultRecord = serde_json::from_value(serde_json::json!({
            "start": "2023-01-05T23:30:00+00:00",
            "enrollment_start": null,
            "display_name": "Toy Course",
            "org": "edX"
        }))
        .unwrap();
        assert!(record.enrollment_start.is_none());
        assert_eq!(record.extra["display_name"], "Toy Course");
        assert_eq!(record.extra.len(), 2);
    }

    #[test]
    fn one_bad_date_does_not_sink_a_search() {
        let resp: SearchResponse = serde_json::from_str(
            r#"{"total": 2, "results": [
                {"data": {"start": "2023-01-05T23:30:00Z", "org": "edX"}},
                {"data": {"start": "TBD", "enrollment_start": "soon", "org": "MITx"}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(resp.results.len(), 2);
        assert_eq!(
            resp.results[0].data.start,
            Some(Utc.with_ymd_and_hms(2023, 1, 5, 23, 30, 0).unwrap())
        );
        let second = &resp.results[1].data;
        assert!(second.start.is_none());
        assert!(second.enrollment_start.is_none());
        assert_eq!(second.extra["org"], "MITx");
    }

    #[test]
    fn course_with_unreadable_end_is_kept() {
        let course: Course = serde_json::from_value(serde_json::json!({
            "id": "edX/toy/2012_Fall",
            "name": "Toy Course",
            "number": "toy",
            "org": "edX",
            "end": "whenever"
        }))
        .unwrap();
        assert!(course.end.is_none());
        assert!(!course.is_completed(Utc::now()));
    }

    #[test]
    fn whitelist_response_tolerates_missing_fields() {
        let resp: BulkWhitelistResponse = serde_json::from_str(
            r#"{"success": ["a", "b"], "row_errors": {"user_not_exist": ["row 3"]}}"#,
        )
        .unwrap();
        assert!(resp.general_errors.is_empty());
        assert_eq!(resp.summary(), "2 learner(s) added, 1 row(s) skipped");
    }
}
