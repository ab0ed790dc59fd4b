use ratatui::{
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs, Wrap},
    Frame,
};

use super::{App, InputMode, Screen};
use crate::page::{BROWSE_FILE, BULK_EXCEPTION, DISABLED, UPLOAD_CSV_BUTTON, UPLOAD_STATUS};
use chrono::{Local, Utc};

const ACCENT: Color = Color::Cyan;
const HEADER_BG: Color = Color::DarkGray;
const DIM: Color = Color::DarkGray;
const GOOD: Color = Color::Green;
const WARN: Color = Color::Yellow;
const BAD: Color = Color::Red;

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

// ─── Main render ────────────────────────────────────────────────────────────

pub fn render(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(f.area());

    render_tabs(f, app, chunks[0]);
    render_clock(f, chunks[0]);

    match app.screen {
        Screen::Dashboard => render_dashboard(f, app, chunks[1]),
        Screen::Discover => render_discover(f, app, chunks[1]),
        Screen::Certificates => render_certificates(f, app, chunks[1]),
    }

    if app.input_mode == InputMode::Normal {
        render_status_bar(f, app, chunks[2]);
    } else {
        render_prompt(f, app, chunks[2]);
    }
}

fn titled_block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_style(Style::default().fg(ACCENT))
}

// ─── Screen Bar ─────────────────────────────────────────────────────────────

fn render_tabs(f: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = Screen::ALL
        .iter()
        .enumerate()
        .map(|(i, screen)| {
            Line::from(vec![
                Span::styled(format!(" {} ", i + 1), Style::default().fg(DIM)),
                Span::styled(format!("{} ", screen.title()), Style::default().fg(Color::White)),
            ])
        })
        .collect();

    let selected = Screen::ALL
        .iter()
        .position(|s| *s == app.screen)
        .unwrap_or(0);

    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .borders(Borders::BOTTOM)
                .title(" LMS Dashboard ")
                .title_style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)),
        )
        .select(selected)
        .highlight_style(
            Style::default()
                .fg(ACCENT)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        );

    f.render_widget(tabs, area);
}

// ─── Clock ──────────────────────────────────────────────────────────────────

fn render_clock(f: &mut Frame, tab_area: Rect) {
    let time_str = format!(" {} ", Local::now().format("%a %b %d  %H:%M:%S"));
    let clock_width = time_str.len() as u16;
    let clock_area = Rect {
        x: tab_area.right().saturating_sub(clock_width),
        y: tab_area.y,
        width: clock_width.min(tab_area.width),
        height: 1,
    };
    f.render_widget(
        Paragraph::new(time_str).style(Style::default().fg(ACCENT)),
        clock_area,
    );
}

// ─── Status Bar ─────────────────────────────────────────────────────────────

fn key_hints(screen: Screen) -> &'static str {
    match screen {
        Screen::Dashboard => "a:active  c:completed  ::go to",
        Screen::Discover => "/:search",
        Screen::Certificates => "o:open csv  u:upload",
    }
}

fn render_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let sync_hint = app
        .cached_at
        .map(|t| format!("  synced {}", t.with_timezone(&Local).format("%b %d %H:%M")))
        .unwrap_or_default();

    let spinner = if app.loading {
        let idx = (app.frame_count / 2) as usize % SPINNER.len();
        format!("{} ", SPINNER[idx])
    } else {
        String::new()
    };

    let status = Paragraph::new(Line::from(vec![
        Span::styled(" ", Style::default()),
        Span::styled(spinner, Style::default().fg(WARN)),
        Span::styled(
            &app.status_message,
            Style::default().fg(if app.loading { WARN } else { Color::White }),
        ),
        Span::styled(
            format!(
                "  q:quit  Tab:switch  {}  r:refresh{}  ",
                key_hints(app.screen),
                sync_hint
            ),
            Style::default().fg(DIM),
        ),
    ]))
    .style(Style::default().bg(HEADER_BG));

    f.render_widget(status, area);
}

fn render_prompt(f: &mut Frame, app: &App, area: Rect) {
    let prompt = app.input_mode.prompt();
    let line = Paragraph::new(Line::from(vec![
        Span::styled(format!(" {prompt}"), Style::default().fg(ACCENT)),
        Span::styled(&app.input, Style::default().fg(Color::White)),
    ]))
    .style(Style::default().bg(HEADER_BG));
    f.render_widget(line, area);

    let x = area.x + 1 + (prompt.chars().count() + app.input.chars().count()) as u16;
    f.set_cursor_position(Position::new(x.min(area.right().saturating_sub(1)), area.y));
}

// ─── Dashboard ──────────────────────────────────────────────────────────────

fn render_dashboard(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let now = Utc::now();
    let completed = app.courses.iter().filter(|c| c.is_completed(now)).count();
    let active = app.courses.len() - completed;

    let titles: Vec<Line> = app
        .course_tabs
        .tabs()
        .iter()
        .map(|tab| {
            let count = if tab.title == "Completed" { completed } else { active };
            Line::from(format!(" {} ({count}) ", tab.title))
        })
        .collect();

    let strip = Tabs::new(titles)
        .block(titled_block(" Courses "))
        .select(app.course_tabs.active_index())
        .style(Style::default().fg(DIM))
        .highlight_style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD));
    f.render_widget(strip, chunks[0]);

    let body = app
        .course_tabs
        .tabs()
        .get(app.course_tabs.active_index())
        .map(|tab| strip_html(tab.panel.html()))
        .unwrap_or_default();

    let panel = Paragraph::new(body)
        .wrap(Wrap { trim: true })
        .scroll((app.scroll, 0))
        .block(titled_block(" Enrolled "));
    f.render_widget(panel, chunks[1]);
}

// ─── Discover ───────────────────────────────────────────────────────────────

fn render_discover(f: &mut Frame, app: &App, area: Rect) {
    let title = match &app.last_query {
        Some(q) => format!(" Results for \"{q}\" "),
        None => " Course Discovery ".to_string(),
    };

    let body = if app.results_html.is_empty() {
        Paragraph::new(Line::from(Span::styled(
            "  Press / to search the course catalog.",
            Style::default().fg(DIM),
        )))
    } else {
        Paragraph::new(strip_html(&app.results_html))
            .wrap(Wrap { trim: true })
            .scroll((app.scroll, 0))
    };
    f.render_widget(body.block(titled_block(&title)), area);
}

// ─── Certificates ───────────────────────────────────────────────────────────

fn render_certificates(f: &mut Frame, app: &App, area: Rect) {
    let Some(form) = app.whitelist.as_ref() else {
        let msg = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "  Set course_id in config.toml to manage certificate exceptions.",
                Style::default().fg(DIM),
            )),
        ])
        .block(titled_block(" Certificate Exceptions "));
        f.render_widget(msg, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(6)])
        .split(area);

    let intro = app
        .doc
        .element(BULK_EXCEPTION)
        .map(|el| strip_html(&el.html))
        .unwrap_or_default();
    f.render_widget(
        Paragraph::new(intro)
            .wrap(Wrap { trim: true })
            .scroll((app.scroll, 0))
            .block(titled_block(" Certificate Exceptions ")),
        chunks[0],
    );

    let chosen = app
        .doc
        .element(BROWSE_FILE)
        .map(|el| el.value.clone())
        .unwrap_or_default();
    let enabled = app
        .doc
        .element(UPLOAD_CSV_BUTTON)
        .map(|el| !el.has_class(DISABLED))
        .unwrap_or(false);
    let (status_text, status_color) = match app.doc.element(UPLOAD_STATUS) {
        Ok(el) if el.has_class("error") => (el.html.clone(), BAD),
        Ok(el) if el.has_class("success") => (el.html.clone(), GOOD),
        Ok(el) if el.has_class("pending") => (el.html.clone(), WARN),
        _ => (String::new(), DIM),
    };

    let button = if form.is_uploading() {
        Span::styled("[ Uploading… ]", Style::default().fg(WARN))
    } else if enabled {
        Span::styled(
            "[ Upload CSV ]",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled("[ Upload CSV ]", Style::default().fg(DIM))
    };

    let controls = Paragraph::new(vec![
        Line::from(vec![
            Span::styled("  File:   ", Style::default().fg(DIM)),
            if chosen.is_empty() {
                Span::styled("(none, press o)", Style::default().fg(DIM))
            } else {
                Span::styled(chosen, Style::default().fg(Color::White))
            },
        ]),
        Line::from(vec![Span::raw("  "), button]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Status: ", Style::default().fg(DIM)),
            Span::styled(status_text, Style::default().fg(status_color)),
        ]),
    ])
    .block(titled_block(" Upload "));
    f.render_widget(controls, chunks[1]);
}

// ─── Markup ─────────────────────────────────────────────────────────────────

const BLOCK_TAGS: &[&str] = &[
    "br", "div", "h1", "h2", "h3", "h4", "h5", "h6", "li", "nav", "p", "section", "ul", "ol",
    "form", "label", "article",
];

/// Plain text for the terminal. Block-level tags end a line; everything
/// else collapses to a space. Blank lines are dropped.
fn strip_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut tag = String::new();
    let mut in_tag = false;
    for ch in input.chars() {
        match ch {
            '<' => {
                in_tag = true;
                tag.clear();
            }
            '>' if in_tag => {
                in_tag = false;
                let name: String = tag
                    .trim_start_matches('/')
                    .chars()
                    .take_while(|c| c.is_ascii_alphanumeric())
                    .collect::<String>()
                    .to_ascii_lowercase();
                out.push(if BLOCK_TAGS.contains(&name.as_str()) { '\n' } else { ' ' });
            }
            _ if in_tag => tag.push(ch),
            _ => out.push(ch),
        }
    }

    out.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_tags_break_lines() {
        let html = "<ul><li><h3>Toy &amp; Games</h3><span>edX</span> <span>101</span></li>\
                    <li>Second</li></ul>";
        assert_eq!(strip_html(html), "Toy & Games\nedX 101\nSecond");
    }

    #[test]
    fn inline_tags_become_spaces() {
        assert_eq!(strip_html("Starts:<b>1/5/2023</b>"), "Starts: 1/5/2023");
    }

    #[test]
    fn entities_decode_once() {
        assert_eq!(strip_html("a &amp;lt; b"), "a &lt; b");
    }

    #[test]
    fn every_screen_has_hints() {
        for screen in Screen::ALL {
            assert!(!key_hints(screen).is_empty());
        }
    }
}
