use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use serde_json::Value;

use super::ViewError;
use crate::models::ResultRecord;
use crate::page::Document;
use crate::template::{load_template, Template};

pub const TEMPLATE_NAME: &str = "result_item";
/// Matches what an en-US browser prints for `toLocaleDateString()`.
pub const DEFAULT_DATE_FORMAT: &str = "%-m/%-d/%Y";

/// Wall-clock reading of a UTC instant, with the zone dropped.
///
/// The result carries the UTC year/month/day/hour/minute/second as if they
/// were local fields, so formatting it gives the date a UTC observer sees no
/// matter where the viewer is. Sub-second precision is discarded.
pub fn utc_clock_reading(ts: DateTime<Utc>) -> NaiveDateTime {
    let naive = ts.naive_utc();
    naive.with_nanosecond(0).unwrap_or(naive)
}

/// Renders one course discovery hit.
#[derive(Debug, Clone)]
pub struct ResultItemView {
    template: Template,
    date_format: String,
}

impl ResultItemView {
    pub fn new(doc: &Document, date_format: &str) -> Result<Self, ViewError> {
        if StrftimeItems::new(date_format).any(|item| matches!(item, Item::Error)) {
            return Err(ViewError::InvalidDateFormat(date_format.to_string()));
        }
        Ok(Self {
            template: load_template(doc, TEMPLATE_NAME)?,
            date_format: date_format.to_string(),
        })
    }

    fn format_date(&self, ts: Option<DateTime<Utc>>) -> Value {
        Value::String(
            ts.map(|ts| utc_clock_reading(ts).format(&self.date_format).to_string())
                .unwrap_or_default(),
        )
    }

    /// Markup for one `<li class="courses-listing-item">`. Pure in `record`.
    pub fn render(&self, record: &ResultRecord) -> String {
        let mut data = record.extra.clone();
        data.insert("start".into(), self.format_date(record.start));
        data.insert(
            "enrollment_start".into(),
            self.format_date(record.enrollment_start),
        );
        format!(
            "<li class=\"courses-listing-item\">{}</li>",
            self.template.render(&data)
        )
    }
}

/// A page of discovery hits.
#[derive(Debug, Clone)]
pub struct ResultListView {
    item: ResultItemView,
}

impl ResultListView {
    pub fn new(item: ResultItemView) -> Self {
        Self { item }
    }

    pub fn render(&self, records: &[ResultRecord], total: u64) -> String {
        let mut html = format!(
            "<div class=\"search-status-label\">Showing {} of {total} results</div>\n\
             <ul class=\"courses-listing\">\n",
            records.len()
        );
        for record in records {
            html.push_str(&self.item.render(record));
            html.push('\n');
        }
        html.push_str("</ul>");
        html
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};
    use serde_json::json;

    fn view(template: &str) -> ResultItemView {
        let mut doc = Document::default();
        doc.add_template("#result_item-tpl", template);
        ResultItemView::new(&doc, DEFAULT_DATE_FORMAT).unwrap()
    }

    fn record(value: serde_json::Value) -> ResultRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn late_utc_evening_keeps_its_utc_date() {
        let v = view("<%- start %>|<%- enrollment_start %>");
        let r = record(json!({
            "start": "2023-01-05T23:30:00Z",
            "enrollment_start": "2022-12-31T23:59:59Z"
        }));
        assert_eq!(v.render(&r), "<li class=\"courses-listing-item\">1/5/2023|12/31/2022</li>");
    }

    #[test]
    fn clock_reading_ignores_viewer_offset() {
        // The same instant seen from UTC-8 and UTC+9 still reads as the UTC clock.
        let west = FixedOffset::west_opt(8 * 3600)
            .unwrap()
            .with_ymd_and_hms(2023, 1, 5, 15, 30, 0)
            .unwrap();
        let east = FixedOffset::east_opt(9 * 3600)
            .unwrap()
            .with_ymd_and_hms(2023, 1, 6, 8, 30, 0)
            .unwrap();
        for ts in [west.with_timezone(&Utc), east.with_timezone(&Utc)] {
            let reading = utc_clock_reading(ts);
            assert_eq!(reading.format("%Y-%m-%d %H:%M:%S").to_string(), "2023-01-05 23:30:00");
        }
    }

    #[test]
    fn sub_seconds_are_dropped() {
        let ts = Utc.with_ymd_and_hms(2023, 1, 5, 23, 30, 1).unwrap()
            + chrono::Duration::milliseconds(750);
        assert_eq!(utc_clock_reading(ts).nanosecond(), 0);
    }

    #[test]
    fn rendering_is_pure() {
        let v = view("<%- content.display_name %> starts <%- start %>");
        let r = record(json!({
            "start": "2015-07-17T12:00:00Z",
            "content": {"display_name": "Toy Course"}
        }));
        let first = v.render(&r);
        assert_eq!(first, v.render(&r));
        assert!(first.contains("Toy Course starts 7/17/2015"));
        // The record itself is untouched.
        assert_eq!(r.start, Some(Utc.with_ymd_and_hms(2015, 7, 17, 12, 0, 0).unwrap()));
    }

    #[test]
    fn missing_dates_render_empty() {
        let v = view("[<%- start %>]");
        assert_eq!(v.render(&ResultRecord::default()), "<li class=\"courses-listing-item\">[]</li>");
    }

    #[test]
    fn custom_date_format_is_used() {
        let mut doc = Document::default();
        doc.add_template("#result_item-tpl", "<%- start %>");
        let v = ResultItemView::new(&doc, "%Y-%m-%d").unwrap();
        let r = record(json!({"start": "2023-01-05T23:30:00Z"}));
        assert!(v.render(&r).contains("2023-01-05"));
    }

    #[test]
    fn bad_date_format_is_rejected() {
        let mut doc = Document::default();
        doc.add_template("#result_item-tpl", "");
        assert_eq!(
            ResultItemView::new(&doc, "%Q").unwrap_err(),
            ViewError::InvalidDateFormat("%Q".into())
        );
    }

    #[test]
    fn list_wraps_items_with_summary() {
        let list = ResultListView::new(view("<%- org %>"));
        let html = list.render(&[record(json!({"org": "edX"}))], 12);
        assert!(html.starts_with("<div class=\"search-status-label\">Showing 1 of 12 results</div>"));
        assert!(html.contains("<li class=\"courses-listing-item\">edX</li>"));
    }

    #[test]
    fn bundled_template_renders() {
        let doc = Document::dashboard(&[], &[], "/x");
        let v = ResultItemView::new(&doc, DEFAULT_DATE_FORMAT).unwrap();
        let html = v.render(&record(json!({
            "course": "course-v1:edX+toy+2012",
            "org": "edX",
            "start": "2023-01-05T23:30:00Z",
            "content": {"display_name": "Toy Course", "number": "toy"}
        })));
        assert!(html.contains("href=\"/courses/course-v1:edX+toy+2012/about\""));
        assert!(html.contains("Starts: 1/5/2023"));
    }
}
