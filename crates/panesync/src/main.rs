//! panesync CLI - three-pane diff viewer with synchronized scrolling

mod app;
mod config;
mod ui;
mod views;

use anyhow::{Context, Result};
use app::{App, Inputs, Settings};
use clap::Parser;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind,
        KeyModifiers, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use panesync_core::{ChangeList, DiffAlgorithm, Granularity, ViewKind};
use ratatui::prelude::*;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(name = "panesync")]
#[command(author, version, about = "A three-pane diff viewer with synchronized scrolling")]
struct Args {
    /// Old file
    old: Option<PathBuf>,

    /// New file
    new: Option<PathBuf>,

    /// Diff granularity: char, word, line, sentence, json or patch
    #[arg(short, long)]
    granularity: Option<Granularity>,

    /// Result view for json granularity
    #[arg(long, value_enum)]
    view: Option<CliView>,

    /// Load a JSON change list instead of diffing two files
    #[arg(long, value_name = "FILE", conflicts_with_all = ["old", "new"])]
    changes: Option<PathBuf>,

    /// Print the change list and alignment table as JSON and exit
    #[arg(long)]
    dump_alignment: bool,

    /// Start with scroll sync turned off
    #[arg(long)]
    no_sync: bool,

    /// Wrap long lines
    #[arg(short, long)]
    wrap: bool,

    /// Diff algorithm
    #[arg(long, value_enum)]
    algorithm: Option<CliAlgorithm>,

    /// Give up when more tokens than this changed
    #[arg(long)]
    max_edit_length: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum CliView {
    Text,
    #[value(alias = "tree")]
    Structured,
}

impl From<CliView> for ViewKind {
    fn from(view: CliView) -> Self {
        match view {
            CliView::Text => ViewKind::Text,
            CliView::Structured => ViewKind::Structured,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum CliAlgorithm {
    Histogram,
    Myers,
    #[value(alias = "minimal")]
    MyersMinimal,
}

impl From<CliAlgorithm> for DiffAlgorithm {
    fn from(algorithm: CliAlgorithm) -> Self {
        match algorithm {
            CliAlgorithm::Histogram => DiffAlgorithm::Histogram,
            CliAlgorithm::Myers => DiffAlgorithm::Myers,
            CliAlgorithm::MyersMinimal => DiffAlgorithm::MyersMinimal,
        }
    }
}

fn read_input(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read: {}", path.display()))
}

fn load_inputs(args: &Args) -> Result<Inputs> {
    if let Some(path) = &args.changes {
        let json = read_input(path)?;
        let changes = ChangeList::from_json(&json)
            .with_context(|| format!("Invalid change list: {}", path.display()))?;
        let name = path.display().to_string();
        return Ok(Inputs {
            old_name: name.clone(),
            new_name: name,
            old: changes.old_text(),
            new: changes.new_text(),
            changes: Some(changes),
        });
    }

    match (&args.old, &args.new) {
        (Some(old), Some(new)) => Ok(Inputs {
            old_name: old.display().to_string(),
            new_name: new.display().to_string(),
            old: read_input(old)?,
            new: read_input(new)?,
            changes: None,
        }),
        _ => anyhow::bail!(
            "Usage: panesync <old_file> <new_file>\n\
             \n\
             Or: panesync --changes <change_list.json>"
        ),
    }
}

/// Merge config with CLI flags; flags win
fn settings(args: &Args, config: &config::Config) -> Settings {
    let mut engine = config.engine();
    if let Some(algorithm) = args.algorithm {
        engine = engine.with_algorithm(algorithm.into());
    }
    if args.max_edit_length.is_some() {
        engine = engine.with_max_edit_length(args.max_edit_length);
    }

    let mut sync = config.sync.sync.clone();
    if args.no_sync {
        sync.enabled = false;
    }

    Settings {
        granularity: args
            .granularity
            .or_else(|| config.parse_granularity())
            .unwrap_or_default(),
        view: args
            .view
            .map(ViewKind::from)
            .or_else(|| config.parse_view())
            .unwrap_or_default(),
        engine,
        sync,
        line_wrap: args.wrap || config.ui.line_wrap,
        line_numbers: config.ui.line_numbers,
        frame: Duration::from_millis(config.sync.frame_ms.max(1)),
    }
}

fn dump_alignment(app: &App) -> Result<()> {
    let (added, removed) = app.stats();
    let dump = serde_json::json!({
        "granularity": app.granularity,
        "view": app.view(),
        "stats": { "added": added, "removed": removed },
        "changes": app.coordinator.changes(),
        "alignment": app.coordinator.alignment(),
    });
    println!("{}", serde_json::to_string_pretty(&dump)?);
    Ok(())
}

fn main() -> Result<()> {
    if std::env::var_os("RUST_LOG").is_some() {
        env_logger::init();
    }

    let args = Args::parse();
    let config = config::Config::load();
    let inputs = load_inputs(&args)?;
    let settings = settings(&args, &config);
    let mut app = App::new(inputs, settings)?;

    if args.dump_alignment {
        return dump_alignment(&app);
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        eprintln!("Error: {err:#}");
        return Err(err);
    }

    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(app.frame)? {
            match event::read()? {
                Event::Mouse(me) => match me.kind {
                    MouseEventKind::ScrollUp => app.mouse_scroll(me.column, me.row, -3.0),
                    MouseEventKind::ScrollDown => app.mouse_scroll(me.column, me.row, 3.0),
                    _ => {}
                },
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    handle_key(app, key.code, key.modifiers);
                }
                _ => {}
            }
        }

        app.tick(Instant::now());

        if app.should_quit {
            return Ok(());
        }
    }
}

fn handle_key(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    if app.show_help {
        // Any key closes the help popover
        app.show_help = false;
        return;
    }
    match code {
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
        }
        KeyCode::Down | KeyCode::Char('j') => app.scroll_down(1),
        KeyCode::Up | KeyCode::Char('k') => app.scroll_up(1),
        KeyCode::Char('d') => app.scroll_half_page_down(),
        KeyCode::Char('u') => app.scroll_half_page_up(),
        KeyCode::PageDown | KeyCode::Char(' ') => app.scroll_page_down(),
        KeyCode::PageUp => app.scroll_page_up(),
        KeyCode::Home | KeyCode::Char('g') => app.goto_start(),
        KeyCode::End | KeyCode::Char('G') => app.goto_end(),
        KeyCode::Tab => app.focus_next(),
        KeyCode::BackTab => app.focus_prev(),
        KeyCode::Char('m') => app.cycle_granularity(),
        KeyCode::Char('v') => app.toggle_view(),
        KeyCode::Enter | KeyCode::Char('z') => app.toggle_node(),
        KeyCode::Char('Z') => app.toggle_expand_all(),
        KeyCode::Char('w') => app.toggle_line_wrap(),
        KeyCode::Char('n') => app.toggle_line_numbers(),
        KeyCode::Char('s') => app.toggle_sync(),
        KeyCode::Char('?') => app.toggle_help(),
        _ => {}
    }
}
