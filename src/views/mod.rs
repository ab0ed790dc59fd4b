pub mod bulk_whitelist;
pub mod course_list;
pub mod course_tabs;
pub mod factory;
pub mod result_item;
pub mod tabbed;

use crate::page::Document;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViewError {
    #[error("Unknown tab \"{0}\"")]
    UnknownTab(String),
    #[error("Host page has no element matching {0}")]
    MissingElement(String),
    #[error("Host page has no template {0}")]
    MissingTemplate(String),
    #[error("Tab index {0} is out of range")]
    TabOutOfRange(usize),
    #[error("Choose a CSV file before uploading")]
    NoFileChosen,
    #[error("An upload is already in progress")]
    UploadInProgress,
    #[error("Invalid date format {0:?}")]
    InvalidDateFormat(String),
}

/// Anything a tab can show.
pub trait Panel: std::fmt::Debug {
    fn render(&mut self, doc: &Document) -> Result<(), ViewError>;
    fn html(&self) -> &str;
}
