use serde_json::{Map, Value};
use std::path::PathBuf;

use super::ViewError;
use crate::api::{decode_json, LmsError, MultipartSubmitter, UploadRequest};
use crate::models::BulkWhitelistResponse;
use crate::page::{
    Document, BROWSE_FILE, BULK_EXCEPTION, BULK_EXCEPTION_FORM, DISABLED, UPLOAD_CSV_BUTTON,
    UPLOAD_STATUS,
};
use crate::template::load_template;

pub const TEMPLATE_NAME: &str = "certificate-bulk-white-list";

/// A change event from the file input.
#[derive(Debug, Clone, Default)]
pub struct FileInputChange {
    /// The input's displayed value; browsers report a full (often fake) path.
    pub value: String,
    pub files: Vec<PathBuf>,
}

impl FileInputChange {
    pub fn single(path: &str) -> Self {
        Self {
            value: path.to_string(),
            files: vec![PathBuf::from(path)],
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error(transparent)]
    View(#[from] ViewError),
    #[error("Upload failed: {0}")]
    Request(#[from] LmsError),
    #[error("Upload rejected: {}", .0.general_errors.join("; "))]
    Rejected(BulkWhitelistResponse),
}

/// Text after the last `\` or `/`.
pub fn base_name(path: &str) -> &str {
    path.rsplit(['\\', '/']).next().unwrap_or(path)
}

/// The instructor's bulk certificate exception form.
#[derive(Debug, Clone)]
pub struct BulkWhitelistForm {
    bulk_exception_url: String,
    csrf_token: String,
    chosen: Option<(PathBuf, String)>,
    in_flight: bool,
}

impl BulkWhitelistForm {
    pub fn new(bulk_exception_url: &str, csrf_token: &str) -> Self {
        Self {
            bulk_exception_url: bulk_exception_url.to_string(),
            csrf_token: csrf_token.to_string(),
            chosen: None,
            in_flight: false,
        }
    }

    pub fn chosen_file_name(&self) -> Option<&str> {
        self.chosen.as_ref().map(|(_, name)| name.as_str())
    }

    pub fn is_uploading(&self) -> bool {
        self.in_flight
    }

    pub fn render(&self, doc: &mut Document) -> Result<(), ViewError> {
        let template = load_template(doc, TEMPLATE_NAME)?;
        let mut data = Map::new();
        data.insert(
            "bulk_exception_url".into(),
            Value::String(self.bulk_exception_url.clone()),
        );
        doc.element_mut(BULK_EXCEPTION)?.html = template.render(&data);
        Ok(())
    }

    /// Accept a file selection. Only a single file is taken; any other count
    /// leaves the form as it was and returns `false`.
    pub fn choose_file(
        &mut self,
        doc: &mut Document,
        event: &FileInputChange,
    ) -> Result<bool, ViewError> {
        let [file] = event.files.as_slice() else {
            tracing::debug!(count = event.files.len(), "ignoring file selection");
            return Ok(false);
        };
        doc.element(BROWSE_FILE)?;

        let name = match base_name(&event.value) {
            "" => file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            name => name.to_string(),
        };

        doc.element_mut(UPLOAD_CSV_BUTTON)?.remove_class(DISABLED);
        doc.element_mut(BROWSE_FILE)?.value = name.clone();
        self.chosen = Some((file.clone(), name));
        Ok(true)
    }

    /// First half of an upload click: validate, lock the button and build the
    /// request. Exactly one request comes out of each successful call.
    pub fn begin_upload(&mut self, doc: &mut Document) -> Result<UploadRequest, ViewError> {
        if self.in_flight {
            return Err(ViewError::UploadInProgress);
        }
        let Some((file, file_name)) = self.chosen.clone() else {
            show_status(doc, &ViewError::NoFileChosen.to_string(), "error")?;
            return Err(ViewError::NoFileChosen);
        };

        // Check every element this touches before changing any of them.
        doc.element(UPLOAD_CSV_BUTTON)?;
        doc.element(UPLOAD_STATUS)?;
        let form = doc.element(BULK_EXCEPTION_FORM)?;
        let url = form
            .attr("action")
            .unwrap_or(self.bulk_exception_url.as_str())
            .to_string();
        let method = form.attr("method").unwrap_or("POST").to_string();

        doc.element_mut(UPLOAD_CSV_BUTTON)?.add_class(DISABLED);
        show_status(doc, &format!("Uploading {file_name}…"), "pending")?;
        self.in_flight = true;

        Ok(UploadRequest {
            method,
            url,
            file,
            file_name,
            csrf_token: self.csrf_token.clone(),
        })
    }

    /// Second half: report the outcome on the page and unlock the form.
    pub fn complete_upload(
        &mut self,
        doc: &mut Document,
        result: Result<String, LmsError>,
    ) -> Result<BulkWhitelistResponse, UploadError> {
        self.in_flight = false;
        if self.chosen.is_some() {
            doc.element_mut(UPLOAD_CSV_BUTTON)?.remove_class(DISABLED);
        }

        let outcome = result
            .and_then(|body| decode_json::<BulkWhitelistResponse>(200, &body))
            .map_err(UploadError::from)
            .and_then(|resp| {
                if resp.general_errors.is_empty() {
                    Ok(resp)
                } else {
                    Err(UploadError::Rejected(resp))
                }
            });

        match &outcome {
            Ok(resp) => {
                tracing::info!(added = resp.success.len(), "bulk whitelist uploaded");
                show_status(doc, &resp.summary(), "success")?;
            }
            Err(e) => {
                tracing::warn!(error = %e, "bulk whitelist upload failed");
                show_status(doc, &e.to_string(), "error")?;
            }
        }
        outcome
    }

    /// Submit the chosen CSV and wait for the outcome.
    pub async fn upload_csv<S: MultipartSubmitter>(
        &mut self,
        doc: &mut Document,
        submitter: &S,
    ) -> Result<BulkWhitelistResponse, UploadError> {
        let request = self.begin_upload(doc)?;
        let result = submitter.submit_multipart(request).await;
        self.complete_upload(doc, result)
    }
}

fn show_status(doc: &mut Document, message: &str, class: &str) -> Result<(), ViewError> {
    let status = doc.element_mut(UPLOAD_STATUS)?;
    for old in ["pending", "success", "error"] {
        status.remove_class(old);
    }
    status.add_class(class);
    status.html = message.to_string();
    Ok(())
}
