use super::course_list::CourseListPanel;
use super::tabbed::{Tab, TabbedView};
use super::ViewError;
use crate::page::{Document, COURSE_TABS_ROOT};
use crate::router::{RouteMatch, RoutePattern, Router};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TabDescriptor {
    pub key: &'static str,
    pub title: &'static str,
    pub template: &'static str,
    pub url: &'static str,
    pub index: usize,
}

pub const COURSE_TABS: [TabDescriptor; 2] = [
    TabDescriptor {
        key: "active",
        title: "Active",
        template: "#active-courses-tpl",
        url: "/active-courses",
        index: 0,
    },
    TabDescriptor {
        key: "completed",
        title: "Completed",
        template: "#completed-courses-tpl",
        url: "/completed-courses",
        index: 1,
    },
];

/// Screen readers jump to `#content`; that must not be taken as a tab route.
pub const IN_PAGE_ANCHOR: &str = "content";
pub const TAB_ROUTE: &str = r"^([a-z]+-courses)/?$";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardRoute {
    InPageAnchor,
    Tab,
}

pub fn descriptor(key: &str) -> Option<&'static TabDescriptor> {
    COURSE_TABS.iter().find(|d| d.key == key)
}

/// Active/Completed course tabs driven by the location fragment.
#[derive(Debug)]
pub struct CourseListTabbedView {
    main: TabbedView,
    router: Router<DashboardRoute>,
}

impl CourseListTabbedView {
    /// Build the panels and register the dashboard routes on `router`.
    pub fn new(mut router: Router<DashboardRoute>) -> Self {
        let tabs = COURSE_TABS
            .iter()
            .map(|d| Tab {
                title: d.title.to_string(),
                url: d.url.to_string(),
                panel: Box::new(CourseListPanel::new(d.template)),
            })
            .collect();

        router
            .route(RoutePattern::literal(IN_PAGE_ANCHOR), DashboardRoute::InPageAnchor)
            .route(
                RoutePattern::regex(TAB_ROUTE).expect("tab route regex must compile"),
                DashboardRoute::Tab,
            );

        Self {
            main: TabbedView::new(tabs),
            router,
        }
    }

    pub fn active_index(&self) -> usize {
        self.main.active_index()
    }

    pub fn tabs(&self) -> &[Tab] {
        self.main.tabs()
    }

    pub fn router(&self) -> &Router<DashboardRoute> {
        &self.router
    }

    /// Start observing navigation from `location`. Returns the selected tab
    /// index if the location named one.
    pub fn start(&mut self, doc: &mut Document, location: &str) -> Result<Option<usize>, ViewError> {
        let matched = self.router.start(location);
        self.apply(doc, matched)
    }

    /// Feed a navigation event (a user-entered or link fragment).
    pub fn handle_navigation(
        &mut self,
        doc: &mut Document,
        fragment: &str,
    ) -> Result<Option<usize>, ViewError> {
        let matched = self.router.navigate(fragment, true);
        self.apply(doc, matched)
    }

    fn apply(
        &mut self,
        doc: &mut Document,
        matched: Option<RouteMatch<DashboardRoute>>,
    ) -> Result<Option<usize>, ViewError> {
        match matched {
            Some(RouteMatch {
                action: DashboardRoute::Tab,
                params,
            }) => {
                let tab = params.first().map(String::as_str).unwrap_or_default();
                self.activate_tab(doc, tab).map(Some)
            }
            Some(RouteMatch {
                action: DashboardRoute::InPageAnchor,
                ..
            })
            | None => Ok(None),
        }
    }

    /// Switch to the tab named by a `<key>-courses` fragment.
    ///
    /// The view is rendered before selecting so the selection lands on an
    /// attached subtree. An unrecognised key leaves everything untouched.
    pub fn activate_tab(&mut self, doc: &mut Document, tab_name: &str) -> Result<usize, ViewError> {
        let key = tab_name.split('-').next().unwrap_or_default();
        let Some(desc) = descriptor(key) else {
            tracing::warn!(tab = tab_name, "navigation to unknown course tab");
            return Err(ViewError::UnknownTab(key.to_string()));
        };

        self.render(doc)?;
        let url = self.main.set_active_tab(doc, desc.index)?.to_string();
        self.router.navigate(&url, false);
        tracing::debug!(tab = desc.key, "course tab selected");
        Ok(desc.index)
    }

    pub fn render(&mut self, doc: &mut Document) -> Result<&mut Self, ViewError> {
        self.main.set_element(COURSE_TABS_ROOT).render(doc)?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::Document;

    fn page() -> Document {
        let mut doc = Document::dashboard(&[], &[], "/bulk_whitelist");
        doc.add_template("#active-courses-tpl", "<p>active list</p>")
            .add_template("#completed-courses-tpl", "<p>completed list</p>");
        doc
    }

    fn root_html(doc: &Document) -> String {
        doc.element(COURSE_TABS_ROOT).unwrap().html.clone()
    }

    #[test]
    fn defaults_to_active_tab() {
        let mut doc = page();
        let mut view = CourseListTabbedView::new(Router::new());
        assert_eq!(view.start(&mut doc, "").unwrap(), None);
        view.render(&mut doc).unwrap();
        assert_eq!(view.active_index(), 0);
        assert!(root_html(&doc).contains("active list"));
    }

    #[test]
    fn fragments_select_tabs() {
        let mut doc = page();
        let mut view = CourseListTabbedView::new(Router::new());
        view.start(&mut doc, "").unwrap();

        assert_eq!(view.handle_navigation(&mut doc, "completed-courses").unwrap(), Some(1));
        assert!(root_html(&doc).contains("completed list"));

        assert_eq!(view.handle_navigation(&mut doc, "#active-courses/").unwrap(), Some(0));
        assert!(root_html(&doc).contains("active list"));
    }

    #[test]
    fn initial_location_selects_tab() {
        let mut doc = page();
        let mut view = CourseListTabbedView::new(Router::new());
        assert_eq!(view.start(&mut doc, "#completed-courses").unwrap(), Some(1));
        assert!(root_html(&doc).contains("completed list"));
    }

    #[test]
    fn unknown_tab_is_an_error_and_changes_nothing() {
        let mut doc = page();
        let mut view = CourseListTabbedView::new(Router::new());
        view.start(&mut doc, "completed-courses").unwrap();
        let before = root_html(&doc);

        let err = view.handle_navigation(&mut doc, "foo-courses").unwrap_err();
        assert_eq!(err, ViewError::UnknownTab("foo".into()));
        assert_eq!(view.active_index(), 1);
        assert_eq!(root_html(&doc), before);
    }

    #[test]
    fn in_page_anchor_is_ignored() {
        let mut doc = page();
        let mut view = CourseListTabbedView::new(Router::new());
        view.start(&mut doc, "").unwrap();
        assert_eq!(view.handle_navigation(&mut doc, "content").unwrap(), None);
        assert_eq!(root_html(&doc), "");
    }

    #[test]
    fn selection_is_recorded_in_history() {
        let mut doc = page();
        let mut view = CourseListTabbedView::new(Router::new());
        view.start(&mut doc, "").unwrap();
        view.activate_tab(&mut doc, "completed-courses").unwrap();
        assert_eq!(view.router().fragment(), Some("completed-courses"));
    }

    #[test]
    fn activation_requires_root_container() {
        let mut doc = Document::default();
        let mut view = CourseListTabbedView::new(Router::new());
        assert_eq!(
            view.activate_tab(&mut doc, "active-courses").unwrap_err(),
            ViewError::MissingElement(COURSE_TABS_ROOT.into())
        );
    }

    #[test]
    fn double_render_is_idempotent() {
        let mut doc = page();
        let mut view = CourseListTabbedView::new(Router::new());
        view.render(&mut doc).unwrap();
        let first = root_html(&doc);
        view.render(&mut doc).unwrap();
        assert_eq!(root_html(&doc), first);
    }
}
