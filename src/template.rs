//! Underscore-style template interpolation.
//!
//! Only the two interpolation tags are understood: `<%= path %>` inserts the
//! value as-is and `<%- path %>` inserts it HTML-escaped. Paths may be dotted
//! (`content.display_name`). Evaluation blocks (`<% ... %>`) are not
//! supported and pass through as text.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

use crate::page::Document;
use crate::views::ViewError;

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"<%([=-])\s*([A-Za-z_][A-Za-z0-9_.]*)\s*%>")
            .expect("template placeholder regex must compile")
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Raw(String),
    Escaped(String),
}

/// A compiled template: a function from a data record to markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn compile(source: &str) -> Self {
        let mut segments = Vec::new();
        let mut last = 0;
        for caps in placeholder().captures_iter(source) {
            let Some(whole) = caps.get(0) else { continue };
            if whole.start() > last {
                segments.push(Segment::Text(source[last..whole.start()].to_string()));
            }
            let path = caps[2].to_string();
            segments.push(if &caps[1] == "=" {
                Segment::Raw(path)
            } else {
                Segment::Escaped(path)
            });
            last = whole.end();
        }
        if last < source.len() {
            segments.push(Segment::Text(source[last..].to_string()));
        }
        Self { segments }
    }

    /// Render against a record. Missing paths render as empty text.
    pub fn render(&self, data: &Map<String, Value>) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Raw(path) => out.push_str(&lookup(data, path).map(value_text).unwrap_or_default()),
                Segment::Escaped(path) => out.push_str(&escape_html(
                    &lookup(data, path).map(value_text).unwrap_or_default(),
                )),
            }
        }
        out
    }
}

/// The host page keeps template text under `#<name>-tpl`.
pub fn template_selector(name: &str) -> String {
    format!("#{name}-tpl")
}

/// Look a template up by name on the host page and compile it.
pub fn load_template(doc: &Document, name: &str) -> Result<Template, ViewError> {
    let text = doc.template_text(&template_selector(name))?;
    Ok(Template::compile(text))
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '`' => out.push_str("&#x60;"),
            _ => out.push(ch),
        }
    }
    out
}

fn lookup<'a>(data: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = data.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
