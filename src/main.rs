use std::fs::File;
use std::io::stdout;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::info;
use ratatui::{backend::CrosstermBackend, Terminal};
use simplelog::{Config, LevelFilter, WriteLogger};

use digestrat::app::{run_app, App};
use digestrat::digest::load_archive;
use digestrat::event_source::KeyboardEventSource;
use digestrat::panic_handler;
use digestrat::saved::SavedStore;
use digestrat::settings;
use digestrat::speech::{CommandSpeech, NullSpeech, SpeechEngine};
use digestrat::theme::{self, ThemeId};

#[derive(Parser, Debug)]
#[command(name = "digestrat", about = "A terminal reader for daily tech digest archives")]
struct Cli {
    /// Directory of rendered digest pages (one YYYY-MM-DD.html per day)
    #[arg(default_value = "archive")]
    archive: PathBuf,

    /// Directory exported documents are written to
    #[arg(long, default_value = ".")]
    export_dir: PathBuf,

    /// Log file location
    #[arg(long, default_value = "digestrat.log")]
    log_file: PathBuf,

    /// Verbose logging
    #[arg(long)]
    debug: bool,

    /// Disable the text-to-speech reader
    #[arg(long)]
    no_speech: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    panic_handler::initialize_panic_handler();

    let log_level = if cli.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    WriteLogger::init(
        log_level,
        Config::default(),
        File::create(&cli.log_file)
            .with_context(|| format!("Failed to create log file {}", cli.log_file.display()))?,
    )?;

    info!("Starting digestrat");

    settings::load_settings();
    theme::set_theme(ThemeId::from_name(&settings::get_theme_name()));

    let days = load_archive(&cli.archive)?;
    if days.is_empty() {
        bail!(
            "No digest pages found in {}. Expected files named YYYY-MM-DD.html",
            cli.archive.display()
        );
    }
    info!("Loaded {} digest days", days.len());

    let saved_path = settings::data_dir().map(|dir| dir.join("saved_articles.json"));
    let saved = SavedStore::load_or_ephemeral(saved_path.as_deref());

    let speech: Box<dyn SpeechEngine> = if cli.no_speech {
        Box::new(NullSpeech)
    } else {
        match CommandSpeech::detect() {
            Some(engine) => Box::new(engine),
            None => Box::new(NullSpeech),
        }
    };

    // The reference date for relative filters is captured once here and
    // never refreshed while the app runs.
    let today = chrono::Local::now().date_naive();

    // Terminal initialization
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(days, saved, speech, cli.export_dir, today);
    let mut events = KeyboardEventSource;
    let res = run_app(&mut terminal, &mut app, &mut events);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        log::error!("Application error: {:?}", err);
        println!("{err:?}");
    }

    info!("Shutting down digestrat");
    Ok(())
}
