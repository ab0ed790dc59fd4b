use super::{Panel, ViewError};
use crate::page::Document;
use crate::template::escape_html;

#[derive(Debug)]
pub struct Tab {
    pub title: String,
    pub url: String,
    pub panel: Box<dyn Panel>,
}

/// A strip of tabs over a single content area that shows the active tab's
/// panel. Defaults to the first tab.
#[derive(Debug)]
pub struct TabbedView {
    tabs: Vec<Tab>,
    active: usize,
    root: Option<String>,
}

impl TabbedView {
    pub fn new(tabs: Vec<Tab>) -> Self {
        Self {
            tabs,
            active: 0,
            root: None,
        }
    }

    pub fn set_element(&mut self, selector: &str) -> &mut Self {
        self.root = Some(selector.to_string());
        self
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active_tab(&self) -> Option<&Tab> {
        self.tabs.get(self.active)
    }

    /// Rebuild the whole subtree under the root element. Calling it again
    /// without a selection change produces the same markup.
    pub fn render(&mut self, doc: &mut Document) -> Result<&mut Self, ViewError> {
        let root = self
            .root
            .clone()
            .ok_or_else(|| ViewError::MissingElement("<tabbed view root>".into()))?;
        // Fail before touching any panel if the root is not on the page.
        doc.element(&root)?;

        if let Some(tab) = self.tabs.get_mut(self.active) {
            tab.panel.render(doc)?;
        }
        let markup = self.markup();
        doc.element_mut(&root)?.html = markup;
        Ok(self)
    }

    /// Select a tab and redraw. Returns the selected tab's URL so the caller
    /// can record it in history.
    pub fn set_active_tab(&mut self, doc: &mut Document, index: usize) -> Result<&str, ViewError> {
        if index >= self.tabs.len() {
            return Err(ViewError::TabOutOfRange(index));
        }
        let previous = self.active;
        self.active = index;
        let rendered = self.render(doc).map(|_| ());
        if let Err(e) = rendered {
            self.active = previous;
            return Err(e);
        }
        Ok(&self.tabs[index].url)
    }

    fn markup(&self) -> String {
        let mut html = String::from(
            "<div class=\"page-content-nav\"><nav class=\"nav-items\" role=\"tablist\">",
        );
        for (i, tab) in self.tabs.iter().enumerate() {
            let selected = i == self.active;
            html.push_str(&format!(
                "<a class=\"nav-item tab{}\" href=\"{}\" role=\"tab\" data-index=\"{i}\" \
                 aria-selected=\"{selected}\" tabindex=\"{}\">{}</a>",
                if selected { " is-active" } else { "" },
                escape_html(&tab.url),
                if selected { 0 } else { -1 },
                escape_html(&tab.title),
            ));
        }
        html.push_str("</nav></div><div class=\"page-content-main\">");
        if let Some(tab) = self.active_tab() {
            html.push_str(&format!(
                "<div class=\"tabpanel\" id=\"tabpanel-{}\" role=\"tabpanel\">{}</div>",
                self.active,
                tab.panel.html()
            ));
        }
        html.push_str("</div>");
        html
    }
}
