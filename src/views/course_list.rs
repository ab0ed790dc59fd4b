use super::{Panel, ViewError};
use crate::page::Document;

/// One list of courses. The markup is copied verbatim from a template the
/// server has already filled in; nothing is bound client-side.
#[derive(Debug, Clone)]
pub struct CourseListPanel {
    template: String,
    html: String,
}

impl CourseListPanel {
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
            html: String::new(),
        }
    }

    pub fn render(&mut self, doc: &Document) -> Result<&mut Self, ViewError> {
        self.html = doc.template_text(&self.template)?.to_string();
        Ok(self)
    }
}

impl Panel for CourseListPanel {
    fn render(&mut self, doc: &Document) -> Result<(), ViewError> {
        CourseListPanel::render(self, doc).map(|_| ())
    }

    fn html(&self) -> &str {
        &self.html
    }
}
