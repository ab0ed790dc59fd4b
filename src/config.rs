use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::views::result_item::DEFAULT_DATE_FORMAT;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub lms_url: String,
    #[serde(default)]
    pub username: String,
    /// Value of the LMS `sessionid` cookie.
    #[serde(default)]
    pub session_id: String,
    pub csrf_token: String,
    /// Course whose certificate exceptions the upload form manages.
    #[serde(default)]
    pub course_id: Option<String>,
    /// Overrides the upload endpoint derived from `course_id`.
    #[serde(default)]
    pub bulk_exception_url: Option<String>,
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default = "default_search_page_size")]
    pub search_page_size: usize,
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

fn default_search_page_size() -> usize {
    20
}

impl Config {
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::config_path() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        let lms_url = std::env::var("LMS_URL")
            .with_context(|| "LMS_URL not set. Create a config file or set the env var.")?;
        let csrf_token = std::env::var("LMS_CSRF_TOKEN")
            .with_context(|| "LMS_CSRF_TOKEN not set. Create a config file or set the env var.")?;

        Ok(Self {
            lms_url,
            username: std::env::var("LMS_USERNAME").unwrap_or_default(),
            session_id: std::env::var("LMS_SESSION_ID").unwrap_or_default(),
            csrf_token,
            course_id: std::env::var("LMS_COURSE_ID").ok(),
            bulk_exception_url: None,
            date_format: default_date_format(),
            search_page_size: default_search_page_size(),
        })
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn generate_default() -> Result<PathBuf> {
        let path = Self::config_path().with_context(|| "Could not determine config directory")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let default = Config {
            lms_url: "https://lms.example.edu".into(),
            username: "your-username".into(),
            session_id: "your-sessionid-cookie".into(),
            csrf_token: "your-csrftoken-cookie".into(),
            course_id: Some("course-v1:edX+DemoX+Demo_Course".into()),
            bulk_exception_url: None,
            date_format: default_date_format(),
            search_page_size: default_search_page_size(),
        };

        let toml_str = toml::to_string_pretty(&default)?;
        std::fs::write(&path, toml_str)?;
        Ok(path)
    }

    /// Where the certificate exception CSV is posted.
    pub fn bulk_exception_url(&self) -> Option<String> {
        self.bulk_exception_url.clone().or_else(|| {
            self.course_id.as_ref().map(|id| {
                format!("/courses/{id}/instructor/api/generate_bulk_certificate_exceptions")
            })
        })
    }

    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("lms-dashboard").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_file_gets_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "lms_url = \"https://lms.example.edu\"\ncsrf_token = \"tok\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.lms_url, "https://lms.example.edu");
        assert_eq!(config.date_format, DEFAULT_DATE_FORMAT);
        assert_eq!(config.search_page_size, 20);
        assert!(config.session_id.is_empty());
        assert_eq!(config.bulk_exception_url(), None);
    }

    #[test]
    fn bulk_url_derives_from_course() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "lms_url = \"https://lms.example.edu\"\ncsrf_token = \"tok\"\n\
             course_id = \"course-v1:edX+toy+2012\"\n",
        )
        .unwrap();

        let mut config = Config::load_from(&path).unwrap();
        assert_eq!(
            config.bulk_exception_url().as_deref(),
            Some("/courses/course-v1:edX+toy+2012/instructor/api/generate_bulk_certificate_exceptions")
        );

        config.bulk_exception_url = Some("/bulk_whitelist".into());
        assert_eq!(config.bulk_exception_url().as_deref(), Some("/bulk_whitelist"));
    }

    #[test]
    fn broken_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "lms_url = ").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(format!("{err}").contains("config.toml"));
    }
}
