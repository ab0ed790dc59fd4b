//! The host page the views render into.
//!
//! Elements are addressed by the selector strings the views use
//! (`#wrapper-course-tabs`, `.upload-csv-button`, ...). Templates live
//! alongside them under `#<name>-tpl`. Views never mount their own root
//! containers; a missing selector is a host page contract violation.

use std::collections::{BTreeMap, BTreeSet};

use crate::models::Course;
use crate::template::escape_html;
use crate::views::ViewError;

const RESULT_ITEM_TEMPLATE: &str = include_str!("../templates/result_item.underscore");
const BULK_WHITE_LIST_TEMPLATE: &str =
    include_str!("../templates/certificate-bulk-white-list.underscore");

pub const COURSE_TABS_ROOT: &str = "#wrapper-course-tabs";
pub const BULK_EXCEPTION: &str = ".bulk-white-list-exception";
pub const BULK_EXCEPTION_FORM: &str = "form#bulk-white-list-exception-form";
pub const UPLOAD_CSV_BUTTON: &str = ".upload-csv-button";
pub const BROWSE_FILE: &str = ".browse-file";
pub const UPLOAD_STATUS: &str = ".upload-status";

pub const DISABLED: &str = "is-disabled";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub html: String,
    pub classes: BTreeSet<String>,
    pub attrs: BTreeMap<String, String>,
    /// Form control value (`$el.val()`).
    pub value: String,
}

impl Element {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.add_class(class);
        self
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    pub fn add_class(&mut self, class: &str) {
        self.classes.insert(class.to_string());
    }

    pub fn remove_class(&mut self, class: &str) {
        self.classes.remove(class);
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    elements: BTreeMap<String, Element>,
    templates: BTreeMap<String, String>,
}

impl Document {
    pub fn mount(&mut self, selector: &str, element: Element) -> &mut Self {
        self.elements.insert(selector.to_string(), element);
        self
    }

    pub fn add_template(&mut self, selector: &str, text: &str) -> &mut Self {
        self.templates.insert(selector.to_string(), text.to_string());
        self
    }

    pub fn contains(&self, selector: &str) -> bool {
        self.elements.contains_key(selector)
    }

    pub fn element(&self, selector: &str) -> Result<&Element, ViewError> {
        self.elements
            .get(selector)
            .ok_or_else(|| ViewError::MissingElement(selector.to_string()))
    }

    pub fn element_mut(&mut self, selector: &str) -> Result<&mut Element, ViewError> {
        self.elements
            .get_mut(selector)
            .ok_or_else(|| ViewError::MissingElement(selector.to_string()))
    }

    pub fn template_text(&self, selector: &str) -> Result<&str, ViewError> {
        self.templates
            .get(selector)
            .map(String::as_str)
            .ok_or_else(|| ViewError::MissingTemplate(selector.to_string()))
    }

    /// The learner dashboard plus the instructor certificate panel, with
    /// course lists rendered server-side into their templates.
    pub fn dashboard(active: &[Course], completed: &[Course], bulk_exception_url: &str) -> Self {
        let mut doc = Document::default();
        doc.mount(COURSE_TABS_ROOT, Element::new())
            .mount(BULK_EXCEPTION, Element::new().with_class("bulk-white-list-exception"))
            .mount(
                BULK_EXCEPTION_FORM,
                Element::new()
                    .with_attr("action", bulk_exception_url)
                    .with_attr("method", "POST")
                    .with_attr("enctype", "multipart/form-data"),
            )
            .mount(
                UPLOAD_CSV_BUTTON,
                Element::new().with_class("upload-csv-button").with_class(DISABLED),
            )
            .mount(BROWSE_FILE, Element::new().with_class("browse-file"))
            .mount(UPLOAD_STATUS, Element::new().with_class("upload-status"));

        doc.add_template("#result_item-tpl", RESULT_ITEM_TEMPLATE)
            .add_template("#certificate-bulk-white-list-tpl", BULK_WHITE_LIST_TEMPLATE)
            .set_course_lists(active, completed);
        doc
    }

    /// Replace the server-rendered course list templates. Tab panels pick up
    /// the new markup on their next render.
    pub fn set_course_lists(&mut self, active: &[Course], completed: &[Course]) -> &mut Self {
        self.add_template(
            "#active-courses-tpl",
            &course_list_markup(active, "You are not enrolled in any active courses."),
        )
        .add_template(
            "#completed-courses-tpl",
            &course_list_markup(completed, "You have not completed any courses yet."),
        )
    }
}

fn course_list_markup(courses: &[Course], empty_message: &str) -> String {
    if courses.is_empty() {
        return format!("<p class=\"empty-dashboard-message\">{empty_message}</p>");
    }

    let mut html = String::from("<ul class=\"listing-courses\">\n");
    for course in courses {
        let (_, start) = course.start_info();
        html.push_str(&format!(
            "<li class=\"course-item\"><article class=\"course\">\
             <h3 class=\"course-title\">{}</h3>\
             <div class=\"course-info\"><span class=\"info-university\">{}</span> \
             <span class=\"info-course-id\">{}</span> \
             <span class=\"info-date-block\">{}</span></div></article></li>\n",
            escape_html(course.display_name()),
            escape_html(course.org.as_deref().unwrap_or("")),
            escape_html(course.number.as_deref().unwrap_or("")),
            escape_html(&start.map(|s| format!("Starts {s}")).unwrap_or_default()),
        ));
    }
    html.push_str("</ul>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(name: &str) -> Course {
        serde_json::from_value(serde_json::json!({
            "id": format!("edX/{name}/2012_Fall"),
            "name": name,
            "number": "101",
            "org": "edX",
            "start": "2015-07-17T12:00:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn dashboard_mounts_every_host_selector() {
        let doc = Document::dashboard(&[], &[], "/bulk_whitelist");
        for sel in [
            COURSE_TABS_ROOT,
            BULK_EXCEPTION,
            BULK_EXCEPTION_FORM,
            UPLOAD_CSV_BUTTON,
            BROWSE_FILE,
            UPLOAD_STATUS,
        ] {
            assert!(doc.contains(sel), "missing {sel}");
        }
        assert!(doc.element(UPLOAD_CSV_BUTTON).unwrap().has_class(DISABLED));
        assert_eq!(
            doc.element(BULK_EXCEPTION_FORM).unwrap().attr("action"),
            Some("/bulk_whitelist")
        );
        assert!(doc.template_text("#result_item-tpl").is_ok());
    }

    #[test]
    fn course_templates_are_server_rendered() {
        let doc = Document::dashboard(&[course("Toys & Games")], &[], "/x");
        let active = doc.template_text("#active-courses-tpl").unwrap();
        assert!(active.contains("Toys &amp; Games"));
        assert!(active.contains("Starts July 17, 2015"));

        let completed = doc.template_text("#completed-courses-tpl").unwrap();
        assert!(completed.contains("empty-dashboard-message"));
    }

    #[test]
    fn course_lists_can_be_replaced() {
        let mut doc = Document::dashboard(&[], &[], "/x");
        doc.set_course_lists(&[], &[course("Retired")]);
        let completed = doc.template_text("#completed-courses-tpl").unwrap();
        assert!(completed.contains("Retired"));
        assert!(doc
            .template_text("#active-courses-tpl")
            .unwrap()
            .contains("not enrolled"));
    }

    #[test]
    fn missing_selectors_are_reported() {
        let mut doc = Document::default();
        assert!(matches!(
            doc.element_mut("#nowhere"),
            Err(ViewError::MissingElement(sel)) if sel == "#nowhere"
        ));
    }
}
