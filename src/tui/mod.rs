pub mod event;
pub mod ui;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use std::path::Path;
use tokio::sync::oneshot;

use crate::api::{LmsClient, LmsError, MultipartSubmitter};
use crate::cache::{save_cache, CacheData};
use crate::config::Config;
use crate::models::{Course, ResultRecord, SearchResponse};
use crate::page::Document;
use crate::router::Router;
use crate::views::bulk_whitelist::{BulkWhitelistForm, FileInputChange};
use crate::views::course_tabs::CourseListTabbedView;
use crate::views::factory::{mount_course_tabs, MountedDashboard};
use crate::views::result_item::{ResultItemView, ResultListView};
use crate::views::ViewError;

// ─── Navigation ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Dashboard,
    Discover,
    Certificates,
}

impl Screen {
    pub const ALL: [Screen; 3] = [Screen::Dashboard, Screen::Discover, Screen::Certificates];

    pub fn title(&self) -> &'static str {
        match self {
            Screen::Dashboard => "My Courses",
            Screen::Discover => "Discover",
            Screen::Certificates => "Certificates",
        }
    }

    pub fn next(&self) -> Screen {
        let idx = Screen::ALL.iter().position(|s| s == self).unwrap_or(0);
        Screen::ALL[(idx + 1) % Screen::ALL.len()]
    }

    pub fn prev(&self) -> Screen {
        let idx = Screen::ALL.iter().position(|s| s == self).unwrap_or(0);
        if idx == 0 {
            Screen::ALL[Screen::ALL.len() - 1]
        } else {
            Screen::ALL[idx - 1]
        }
    }
}

/// What the one-line prompt is collecting, if anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Fragment,
    Search,
    FilePath,
}

impl InputMode {
    pub fn prompt(&self) -> &'static str {
        match self {
            Self::Normal => "",
            Self::Fragment => "Go to #",
            Self::Search => "Search courses: ",
            Self::FilePath => "CSV file: ",
        }
    }
}

// ─── Background results ─────────────────────────────────────────────────────

pub struct FetchResult {
    pub courses: Vec<Course>,
    pub fetched_at: DateTime<Utc>,
    /// Non-fatal error message to show in the status bar.
    pub error: Option<String>,
}

pub struct SearchResult {
    pub query: String,
    pub outcome: Result<SearchResponse, LmsError>,
}

// ─── App State ──────────────────────────────────────────────────────────────

pub struct App {
    pub client: LmsClient,
    pub config: Config,
    pub running: bool,
    pub screen: Screen,

    // Host page and the views mounted on it
    pub doc: Document,
    pub course_tabs: CourseListTabbedView,
    /// Why the startup fragment was not honoured, if it was not.
    pub route_error: Option<ViewError>,
    pub whitelist: Option<BulkWhitelistForm>,
    pub results_view: ResultListView,

    // Data
    pub courses: Vec<Course>,
    pub results: Vec<ResultRecord>,
    pub results_total: u64,
    pub results_html: String,
    pub last_query: Option<String>,

    // Prompt
    pub input_mode: InputMode,
    pub input: String,

    // Status
    pub status_message: String,
    pub loading: bool,
    pub needs_refresh: bool,
    pub cached_at: Option<DateTime<Utc>>,
    pub scroll: u16,

    // Background task channels
    pub fetch_rx: Option<oneshot::Receiver<FetchResult>>,
    pub search_rx: Option<oneshot::Receiver<SearchResult>>,
    pub upload_rx: Option<oneshot::Receiver<Result<String, LmsError>>>,

    // Incremented each frame; drives the loading spinner.
    pub frame_count: u64,
}

impl App {
    /// Mount every view on a fresh host page. `location` is the initial
    /// fragment handed to the course tab router.
    pub fn new(client: LmsClient, config: Config, location: &str) -> Result<Self> {
        let bulk_url = config.bulk_exception_url();
        let mut doc = Document::dashboard(&[], &[], bulk_url.as_deref().unwrap_or_default());

        let MountedDashboard { view, route_error } =
            mount_course_tabs(&mut doc, Router::new(), location)?;

        let whitelist = bulk_url.map(|url| BulkWhitelistForm::new(&url, &config.csrf_token));
        if let Some(ref form) = whitelist {
            form.render(&mut doc)?;
        }

        let results_view = ResultListView::new(ResultItemView::new(&doc, &config.date_format)?);

        Ok(Self {
            client,
            config,
            running: true,
            screen: Screen::Dashboard,
            doc,
            course_tabs: view,
            route_error: route_error.clone(),
            whitelist,
            results_view,
            courses: Vec::new(),
            results: Vec::new(),
            results_total: 0,
            results_html: String::new(),
            last_query: None,
            input_mode: InputMode::Normal,
            input: String::new(),
            status_message: route_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Loading...".into()),
            loading: true,
            needs_refresh: false,
            cached_at: None,
            scroll: 0,
            fetch_rx: None,
            search_rx: None,
            upload_rx: None,
            frame_count: 0,
        })
    }

    /// Populate the dashboard from a previously saved course listing.
    pub fn load_from_cache(&mut self, cache: CacheData) {
        self.apply_courses(cache.courses);
        self.cached_at = Some(cache.cached_at);
        self.loading = false;
        let synced = cache
            .cached_at
            .with_timezone(&chrono::Local)
            .format("%b %d %H:%M");
        self.status_message = format!("Showing cached courses from {synced}. Press r to refresh.");
    }

    /// Split courses into the Active and Completed lists and redraw the tabs.
    fn apply_courses(&mut self, courses: Vec<Course>) {
        let now = Utc::now();
        let (completed, active): (Vec<Course>, Vec<Course>) =
            courses.iter().cloned().partition(|c| c.is_completed(now));
        self.doc.set_course_lists(&active, &completed);
        self.courses = courses;
        if let Err(e) = self.course_tabs.render(&mut self.doc) {
            self.status_message = format!("Dashboard error: {e}");
        }
    }

    // ── Course listing ──────────────────────────────────────────────────

    /// Fetch the course listing in the background. No-ops while a fetch is
    /// already running.
    pub fn start_fetch(&mut self) {
        if self.fetch_rx.is_some() {
            return;
        }
        let client = self.client.clone();
        let username = self.config.username.clone();
        let (tx, rx) = oneshot::channel();
        self.fetch_rx = Some(rx);
        self.loading = true;
        self.status_message = "Syncing in background…".into();
        tokio::spawn(async move {
            let result = fetch_courses(client, username).await;
            let _ = tx.send(result);
        });
    }

    pub fn poll_fetch_result(&mut self) -> bool {
        let result = match poll_channel(&mut self.fetch_rx) {
            Polled::Pending => return false,
            Polled::Ready(result) => result,
            Polled::Dropped => {
                tracing::error!("course sync task ended without a result");
                self.loading = false;
                self.status_message = "Sync error: background sync stopped unexpectedly".into();
                return true;
            }
        };
        self.loading = false;
        if let Some(err) = result.error {
            self.status_message = format!("Sync error: {err}");
            return true;
        }
        self.apply_courses(result.courses);
        self.cached_at = Some(result.fetched_at);
        let synced = result
            .fetched_at
            .with_timezone(&chrono::Local)
            .format("%b %d %H:%M");
        self.status_message = format!("{} courses loaded. Synced {synced}.", self.courses.len());
        true
    }

    // ── Course tabs ─────────────────────────────────────────────────────

    /// Feed a fragment to the course tab router and report what happened.
    pub fn navigate(&mut self, fragment: &str) {
        self.scroll = 0;
        let target = crate::router::normalize_fragment(fragment);
        if self.course_tabs.router().fragment() == Some(target) {
            self.status_message = self.already_at(target);
            return;
        }
        self.status_message = match self.course_tabs.handle_navigation(&mut self.doc, fragment) {
            Ok(Some(index)) => {
                let title = self
                    .course_tabs
                    .tabs()
                    .get(index)
                    .map(|t| t.title.as_str())
                    .unwrap_or_default();
                format!("Showing {title} courses")
            }
            Ok(None) => format!("No course tab for #{}", crate::router::normalize_fragment(fragment)),
            Err(e) => e.to_string(),
        };
    }

    /// Status for a navigation to the fragment already in place.
    fn already_at(&self, target: &str) -> String {
        let bare = target.trim_end_matches('/');
        match self.course_tabs.tabs().get(self.course_tabs.active_index()) {
            Some(tab) if tab.url.trim_start_matches('/') == bare => {
                format!("Already showing {} courses", tab.title)
            }
            _ => format!("Already at #{target}"),
        }
    }

    // ── Discovery ───────────────────────────────────────────────────────

    pub fn start_search(&mut self, query: String) {
        if self.search_rx.is_some() {
            self.status_message = "A search is already running.".into();
            return;
        }
        let client = self.client.clone();
        let page_size = self.config.search_page_size;
        let (tx, rx) = oneshot::channel();
        self.search_rx = Some(rx);
        self.status_message = format!("Searching for \"{query}\"…");
        tokio::spawn(async move {
            let outcome = client.search_courses(&query, page_size, 0).await;
            let _ = tx.send(SearchResult { query, outcome });
        });
    }

    pub fn poll_search_result(&mut self) -> bool {
        let result = match poll_channel(&mut self.search_rx) {
            Polled::Pending => return false,
            Polled::Ready(result) => result,
            Polled::Dropped => {
                tracing::error!("search task ended without a result");
                self.status_message = "Search failed: background search stopped unexpectedly".into();
                return true;
            }
        };
        match result.outcome {
            Ok(found) => {
                self.results = found.results.into_iter().map(|hit| hit.data).collect();
                self.results_total = found.total;
                self.results_html = self.results_view.render(&self.results, self.results_total);
                self.scroll = 0;
                self.status_message = format!(
                    "{} result(s) for \"{}\"",
                    self.results_total, result.query
                );
            }
            Err(e) => self.status_message = format!("Search failed: {e}"),
        }
        self.last_query = Some(result.query);
        true
    }

    // ── Certificate exceptions ──────────────────────────────────────────

    pub fn choose_file(&mut self, path: &str) {
        let Some(form) = self.whitelist.as_mut() else {
            self.status_message = "No course configured for certificate exceptions.".into();
            return;
        };
        let path = path.trim();
        if !Path::new(path).is_file() {
            self.status_message = format!("No such file: {path}");
            return;
        }
        self.status_message = match form.choose_file(&mut self.doc, &FileInputChange::single(path)) {
            Ok(true) => format!(
                "Selected {}. Press u to upload.",
                form.chosen_file_name().unwrap_or_default()
            ),
            Ok(false) => "Select exactly one file.".into(),
            Err(e) => e.to_string(),
        };
    }

    pub fn start_upload(&mut self) {
        let Some(form) = self.whitelist.as_mut() else {
            self.status_message = "No course configured for certificate exceptions.".into();
            return;
        };
        let request = match form.begin_upload(&mut self.doc) {
            Ok(request) => request,
            Err(e) => {
                self.status_message = e.to_string();
                return;
            }
        };
        let client = self.client.clone();
        let (tx, rx) = oneshot::channel();
        self.upload_rx = Some(rx);
        self.status_message = format!("Uploading {}…", request.file_name);
        tokio::spawn(async move {
            let result = client.submit_multipart(request).await;
            let _ = tx.send(result);
        });
    }

    pub fn poll_upload_result(&mut self) -> bool {
        let result = match poll_channel(&mut self.upload_rx) {
            Polled::Pending => return false,
            Polled::Ready(result) => result,
            Polled::Dropped => {
                tracing::error!("upload task ended without a result");
                Err(LmsError::Other(anyhow!("upload stopped before the server replied")))
            }
        };
        let Some(form) = self.whitelist.as_mut() else {
            return true;
        };
        self.status_message = match form.complete_upload(&mut self.doc, result) {
            Ok(resp) => format!("Upload complete: {}", resp.summary()),
            Err(e) => e.to_string(),
        };
        true
    }
}

/// Outcome of a non-blocking check on a background task.
enum Polled<T> {
    Pending,
    Ready(T),
    /// The task ended without sending a result.
    Dropped,
}

/// Non-blocking receive. Clears the slot once the sender has finished.
fn poll_channel<T>(slot: &mut Option<oneshot::Receiver<T>>) -> Polled<T> {
    let Some(rx) = slot.as_mut() else {
        return Polled::Pending;
    };
    match rx.try_recv() {
        Ok(value) => {
            *slot = None;
            Polled::Ready(value)
        }
        Err(oneshot::error::TryRecvError::Empty) => Polled::Pending,
        Err(oneshot::error::TryRecvError::Closed) => {
            *slot = None;
            Polled::Dropped
        }
    }
}

// ─── Background fetch (runs in a spawned task) ───────────────────────────────

async fn fetch_courses(client: LmsClient, username: String) -> FetchResult {
    let mut result = FetchResult {
        courses: Vec::new(),
        fetched_at: Utc::now(),
        error: None,
    };

    match client.list_courses(&username).await {
        Ok(courses) => result.courses = courses,
        Err(e) => {
            result.error = Some(format!("fetching courses: {e}"));
            return result;
        }
    }
    result.fetched_at = Utc::now();

    // Save from within the task so the UI thread never blocks on disk.
    let cache = CacheData {
        cached_at: result.fetched_at,
        courses: result.courses.clone(),
    };
    if let Err(e) = save_cache(&cache) {
        tracing::warn!("saving cache: {e:#}");
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{BROWSE_FILE, COURSE_TABS_ROOT, DISABLED, UPLOAD_CSV_BUTTON, UPLOAD_STATUS};

    fn config(course_id: Option<&str>) -> Config {
        Config {
            lms_url: "http://127.0.0.1:9".into(),
            username: "honor".into(),
            session_id: String::new(),
            csrf_token: "tok".into(),
            course_id: course_id.map(str::to_string),
            bulk_exception_url: None,
            date_format: "%-m/%-d/%Y".into(),
            search_page_size: 20,
        }
    }

    fn app(location: &str) -> App {
        let cfg = config(Some("course-v1:edX+toy+2012"));
        let client = LmsClient::new(&cfg.lms_url, "", "tok").unwrap();
        App::new(client, cfg, location).unwrap()
    }

    fn course(name: &str, end: &str) -> Course {
        serde_json::from_value(serde_json::json!({
            "id": format!("edX/{name}/1"),
            "name": name,
            "number": name,
            "org": "edX",
            "end": end
        }))
        .unwrap()
    }

    #[test]
    fn screens_cycle() {
        assert_eq!(Screen::Dashboard.next(), Screen::Discover);
        assert_eq!(Screen::Dashboard.prev(), Screen::Certificates);
        assert_eq!(Screen::Certificates.next(), Screen::Dashboard);
    }

    #[test]
    fn courses_split_into_tabs() {
        let mut app = app("");
        app.apply_courses(vec![
            course("Future", "2999-01-01T00:00:00Z"),
            course("Past", "2001-01-01T00:00:00Z"),
        ]);
        let root = &app.doc.element(COURSE_TABS_ROOT).unwrap().html;
        assert!(root.contains("Future"));
        assert!(!root.contains("Past"));

        app.navigate("completed-courses");
        assert_eq!(app.course_tabs.active_index(), 1);
        assert_eq!(app.status_message, "Showing Completed courses");
        assert!(app.doc.element(COURSE_TABS_ROOT).unwrap().html.contains("Past"));
    }

    #[test]
    fn unknown_fragment_is_reported() {
        let mut app = app("");
        app.navigate("foo-courses");
        assert_eq!(app.status_message, "Unknown tab \"foo\"");
        app.navigate("somewhere");
        assert_eq!(app.status_message, "No course tab for #somewhere");
    }

    #[test]
    fn repeating_a_tab_key_reports_current_tab() {
        let mut app = app("");
        app.navigate("active-courses");
        assert_eq!(app.status_message, "Showing Active courses");
        app.navigate("active-courses");
        assert_eq!(app.status_message, "Already showing Active courses");
        assert_eq!(app.course_tabs.active_index(), 0);
    }

    #[test]
    fn starting_route_counts_as_current() {
        let mut app = app("completed-courses");
        assert_eq!(app.course_tabs.active_index(), 1);
        app.navigate("#completed-courses");
        assert_eq!(app.status_message, "Already showing Completed courses");
        app.navigate("active-courses");
        assert_eq!(app.status_message, "Showing Active courses");
    }

    #[test]
    fn bad_initial_route_lands_in_status() {
        let app = app("#foo-courses");
        assert_eq!(app.status_message, "Unknown tab \"foo\"");
        assert_eq!(app.course_tabs.active_index(), 0);
    }

    #[test]
    fn choosing_missing_file_is_reported() {
        let mut app = app("");
        app.choose_file("/definitely/not/here.csv");
        assert!(app.status_message.starts_with("No such file"));
        assert_eq!(app.doc.element(BROWSE_FILE).unwrap().value, "");
    }

    #[test]
    fn upload_without_file_is_reported() {
        let mut app = app("");
        app.start_upload();
        assert_eq!(app.status_message, "Choose a CSV file before uploading");
        assert!(app.upload_rx.is_none());
        assert!(app.doc.element(UPLOAD_STATUS).unwrap().has_class("error"));
    }

    #[test]
    fn vanished_upload_task_unlocks_the_form() {
        let mut app = app("");
        let form = app.whitelist.as_mut().unwrap();
        form.choose_file(&mut app.doc, &FileInputChange::single("roster.csv"))
            .unwrap();
        form.begin_upload(&mut app.doc).unwrap();

        let (tx, rx) = oneshot::channel::<Result<String, LmsError>>();
        drop(tx);
        app.upload_rx = Some(rx);

        assert!(app.poll_upload_result());
        assert!(app.upload_rx.is_none());
        assert!(!app.whitelist.as_ref().unwrap().is_uploading());
        assert!(app.status_message.contains("upload stopped before the server replied"));
        let status = app.doc.element(UPLOAD_STATUS).unwrap();
        assert!(status.has_class("error"));
        assert!(!app.doc.element(UPLOAD_CSV_BUTTON).unwrap().has_class(DISABLED));
    }

    #[test]
    fn vanished_search_task_is_reported() {
        let mut app = app("");
        let (tx, rx) = oneshot::channel::<SearchResult>();
        drop(tx);
        app.search_rx = Some(rx);
        assert!(app.poll_search_result());
        assert!(app.search_rx.is_none());
        assert!(app.status_message.starts_with("Search failed"));
    }

    #[test]
    fn certificates_need_a_course() {
        let cfg = config(None);
        let client = LmsClient::new(&cfg.lms_url, "", "tok").unwrap();
        let mut app = App::new(client, cfg, "").unwrap();
        assert!(app.whitelist.is_none());
        app.start_upload();
        assert!(app.status_message.contains("No course configured"));
    }
}
