use std::{
    fs::File,
    io::{self, stdin, BufWriter},
    path::PathBuf,
};

use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tracing::{error, info, warn};
use typetest::{
    app::App,
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    corpus::Difficulty,
    error::{AppError, Result},
    history::{BlobStore, FileBlobStore, HistoryStore, MemoryBlobStore},
    logging::init_file_logging,
    render::history_lines,
    runtime::{Action, AppEvent, CrosstermEventSource, EventSource, FixedTicker, Runner, Ticker},
    session::SystemClock,
};

/// sixty-second paragraph typing test
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Type a random paragraph against a sixty second clock. Shows live mistakes and accuracy, scores words per minute and keeps your last ten results."
)]
pub struct Cli {
    /// difficulty tier to pick paragraphs from (defaults to the last one used)
    #[clap(short = 'd', long, value_enum)]
    difficulty: Option<Difficulty>,

    /// directory holding the score history
    #[clap(long)]
    data_dir: Option<PathBuf>,

    /// keep the score history in memory only
    #[clap(long)]
    no_persist: bool,

    /// print the score history and exit
    #[clap(long)]
    show_history: bool,

    /// delete the score history and exit
    #[clap(long)]
    clear_history: bool,

    /// write the score history as CSV to the given file and exit
    #[clap(long, value_name = "PATH")]
    export_history: Option<PathBuf>,
}

impl Cli {
    fn blob_store(&self) -> Box<dyn BlobStore> {
        if self.no_persist {
            return Box::new(MemoryBlobStore::new());
        }
        let dir = self
            .data_dir
            .clone()
            .or_else(AppDirs::state_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        Box::new(FileBlobStore::with_dir(dir))
    }

    fn is_one_shot(&self) -> bool {
        self.show_history || self.clear_history || self.export_history.is_some()
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = AppDirs::log_dir().and_then(|dir| match init_file_logging(&dir) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("logging disabled: {e}");
            None
        }
    });

    let config_store = FileConfigStore::new();
    let config = config_store.load();
    let mut history = HistoryStore::new(cli.blob_store());

    if cli.is_one_shot() {
        return run_one_shot(&cli, &mut history);
    }

    if !stdin().is_tty() {
        return Err(AppError::Terminal("stdin must be a tty".to_string()));
    }

    let difficulty = cli.difficulty.unwrap_or(config.difficulty);
    let mut app = App::new(history, difficulty, SystemClock);
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(config.tick_interval()),
    );

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let outcome = start_tui(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    let updated = Config {
        difficulty: app.difficulty(),
        ..config
    };
    if let Err(e) = config_store.save(&updated) {
        warn!(error = %e, "could not save config");
    }

    if let Err(e) = &outcome {
        error!(error = %e, "terminal session failed");
    }
    outcome
}

fn run_one_shot<S: BlobStore>(cli: &Cli, history: &mut HistoryStore<S>) -> Result<()> {
    if let Some(path) = &cli.export_history {
        let rows = history.export_csv(BufWriter::new(File::create(path)?))?;
        info!(rows, path = %path.display(), "history exported");
        println!("exported {rows} result(s) to {}", path.display());
    }
    if cli.show_history {
        for line in history_lines(&history.read_all()) {
            println!("{line}");
        }
    }
    // clearing runs last so an export in the same call still sees the data
    if cli.clear_history {
        history.clear()?;
        println!("history cleared");
    }
    Ok(())
}

fn start_tui<B, S, E, T>(
    terminal: &mut Terminal<B>,
    app: &mut App<S, SystemClock>,
    runner: &Runner<E, T>,
) -> Result<()>
where
    B: Backend,
    S: BlobStore,
    E: EventSource,
    T: Ticker,
{
    loop {
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;

        match runner.step() {
            AppEvent::Tick => app.on_tick(),
            AppEvent::Resize => {}
            AppEvent::Key(key) => {
                if let Some(action) = Action::from_key(key) {
                    if !app.apply(action) {
                        break;
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::tempdir;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["typetest"]);

        assert_eq!(cli.difficulty, None);
        assert_eq!(cli.data_dir, None);
        assert!(!cli.no_persist);
        assert!(!cli.is_one_shot());
    }

    #[test]
    fn test_cli_difficulty() {
        let cli = Cli::parse_from(["typetest", "-d", "hard"]);
        assert_eq!(cli.difficulty, Some(Difficulty::Hard));

        let cli = Cli::parse_from(["typetest", "--difficulty", "medium"]);
        assert_eq!(cli.difficulty, Some(Difficulty::Medium));

        assert!(Cli::try_parse_from(["typetest", "-d", "brutal"]).is_err());
    }

    #[test]
    fn test_cli_history_commands() {
        let cli = Cli::parse_from(["typetest", "--show-history"]);
        assert!(cli.is_one_shot());

        let cli = Cli::parse_from(["typetest", "--export-history", "out.csv"]);
        assert_eq!(cli.export_history, Some(PathBuf::from("out.csv")));
        assert!(cli.is_one_shot());
    }

    #[test]
    fn test_one_shot_export_and_clear() {
        let dir = tempdir().unwrap();
        let csv_path = dir.path().join("scores.csv");
        let cli = Cli::parse_from([
            "typetest".to_string(),
            "--data-dir".to_string(),
            dir.path().display().to_string(),
            "--export-history".to_string(),
            csv_path.display().to_string(),
            "--clear-history".to_string(),
        ]);

        let mut history = HistoryStore::new(cli.blob_store());
        let mut app = App::new(HistoryStore::new(cli.blob_store()), Difficulty::Easy, SystemClock);
        app.finish();
        assert_eq!(history.read_all().len(), 1);

        run_one_shot(&cli, &mut history).unwrap();
        assert!(history.read_all().is_empty());
        let exported = std::fs::read_to_string(&csv_path).unwrap();
        assert!(exported.starts_with("date,wpm,accuracy,time,difficulty"));
        assert_eq!(exported.lines().count(), 2);
    }
}
