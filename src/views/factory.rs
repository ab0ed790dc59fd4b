use super::course_tabs::{CourseListTabbedView, DashboardRoute};
use super::ViewError;
use crate::page::Document;
use crate::router::Router;

pub struct MountedDashboard {
    pub view: CourseListTabbedView,
    /// Set when the initial location named a tab that does not exist. The
    /// view is still mounted on its default tab.
    pub route_error: Option<ViewError>,
}

/// Create the course tabs on page load and render them.
///
/// Host page problems (missing root or template) abort the mount; a bad
/// initial fragment does not.
pub fn mount_course_tabs(
    doc: &mut Document,
    router: Router<DashboardRoute>,
    location: &str,
) -> Result<MountedDashboard, ViewError> {
    let mut view = CourseListTabbedView::new(router);
    let route_error = match view.start(doc, location) {
        Ok(_) => None,
        Err(e @ ViewError::UnknownTab(_)) => Some(e),
        Err(e) => return Err(e),
    };
    view.render(doc)?;
    Ok(MountedDashboard { view, route_error })
}
