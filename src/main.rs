mod api;
mod cache;
mod config;
mod logging;
mod models;
mod page;
mod router;
mod template;
mod tui;
mod views;

use anyhow::{Context, Result};
use crossterm::{
    event::{Event, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::time::Duration;

use api::LmsClient;
use config::Config;
use page::Document;
use tui::App;
use views::bulk_whitelist::{BulkWhitelistForm, FileInputChange};

fn print_help() {
    println!("lms-dashboard — A terminal dashboard for an Open edX style LMS");
    println!();
    println!("USAGE:");
    println!("  lms-dashboard                     Start the TUI");
    println!("  lms-dashboard --route <fragment>  Start on a course tab, e.g. completed-courses");
    println!("  lms-dashboard --upload <csv>      Upload certificate exceptions and exit");
    println!("  lms-dashboard --init              Generate a default config file");
    println!();
    println!("CONFIG:");
    println!("  File: ~/.config/lms-dashboard/config.toml");
    println!("  Or set env vars: LMS_URL, LMS_CSRF_TOKEN, LMS_SESSION_ID,");
    println!("                   LMS_USERNAME and LMS_COURSE_ID");
    println!();
    println!("KEYBINDINGS:");
    println!("  Tab / Shift+Tab   Switch screens");
    println!("  1-3               Jump to screen");
    println!("  a / c             Active / Completed courses");
    println!("  :                 Go to a #fragment");
    println!("  /                 Search the course catalog");
    println!("  o / u             Choose / upload an exceptions CSV");
    println!("  j / k / g         Scroll");
    println!("  r                 Refresh");
    println!("  q / Ctrl+C        Quit");
}

/// Value following `flag`, if present.
fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--init") {
        let path = Config::generate_default()?;
        println!("Generated config file at: {}", path.display());
        println!("Edit it with your LMS URL and session cookies, then run lms-dashboard.");
        return Ok(());
    }

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    if let Err(e) = logging::init() {
        eprintln!("Logging disabled: {e}");
    }

    let config = Config::load().with_context(|| {
        "Failed to load configuration.\n\
         Run `lms-dashboard --init` to generate a config file,\n\
         or set LMS_URL and LMS_CSRF_TOKEN environment variables."
    })?;

    let client = LmsClient::new(&config.lms_url, &config.session_id, &config.csrf_token)?;

    if let Some(csv) = flag_value(&args, "--upload") {
        return upload_headless(&client, &config, csv).await;
    }

    let location = flag_value(&args, "--route").unwrap_or_default().to_string();
    let mut app = App::new(client, config, &location)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        tracing::error!("{e:#}");
        eprintln!("Error: {e:#}");
    }

    Ok(())
}

/// Post one exceptions CSV without starting the TUI.
async fn upload_headless(client: &LmsClient, config: &Config, csv: &str) -> Result<()> {
    let url = config
        .bulk_exception_url()
        .context("Set course_id (or bulk_exception_url) to upload certificate exceptions")?;

    let mut doc = Document::dashboard(&[], &[], &url);
    let mut form = BulkWhitelistForm::new(&url, &config.csrf_token);
    form.render(&mut doc)?;
    form.choose_file(&mut doc, &FileInputChange::single(csv))?;

    let resp = form
        .upload_csv(&mut doc, client)
        .await
        .with_context(|| format!("Uploading {csv}"))?;

    println!("{}", resp.summary());
    for (row, errors) in &resp.row_errors {
        for error in errors {
            println!("  {row}: {error}");
        }
    }
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    // Show cached courses instantly, then kick off a background sync.
    let cached = cache::load_cache();
    let has_cache = cached.is_some();
    if let Some(cached) = cached {
        app.load_from_cache(cached);
    }
    app.start_fetch();
    if has_cache {
        app.status_message = "Showing cached courses — syncing in background…".into();
    }
    if let Some(e) = &app.route_error {
        app.status_message = e.to_string();
    }

    loop {
        app.frame_count = app.frame_count.wrapping_add(1);
        terminal.draw(|f| tui::ui::render(f, app))?;

        if let Some(Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        })) = tui::event::poll_event(Duration::from_millis(100))?
        {
            tui::event::handle_key(app, code, modifiers);
        }

        if !app.running {
            break;
        }

        // Apply completed background results without blocking.
        app.poll_fetch_result();
        app.poll_search_result();
        app.poll_upload_result();

        if app.needs_refresh {
            app.needs_refresh = false;
            app.start_fetch();
        }
    }

    Ok(())
}
