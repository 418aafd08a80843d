use contest_practice::app::{App, QuestionPool};
use contest_practice::config::Config;
use contest_practice::contest::{Contest, ContestLibrary};
use contest_practice::error::{PracticeError, Result};
use contest_practice::stats_store::{JsonFileStore, PersistenceWorker, StatsCache, StatsStore};
use contest_practice::types::AppMode;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::sync::Arc;
use std::{
    env, io,
    time::{Duration, Instant},
};
use tokio::sync::mpsc;

use tracing::{debug, error, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

fn setup_logging(config: &Config) -> Result<()> {
    let file_appender = RollingFileAppender::new(
        Rotation::DAILY,
        &config.log_dir,
        "contest_practice.log",
    );

    // RUST_LOG wins; otherwise debug builds log debug and higher
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(file_appender)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .init();

    info!("Logging system initialized");
    debug!("Debug logging {}", if cfg!(debug_assertions) { "enabled" } else { "disabled" });

    Ok(())
}

fn load_pool(config: &Config) -> Result<QuestionPool> {
    let library = ContestLibrary::new(&config.contest_dir);
    let pool = if config.contest.is_sequence() {
        QuestionPool::Sequence(library.load_sequences(config.contest)?)
    } else {
        QuestionPool::Standard(library.load_questions(config.contest)?)
    };
    Ok(pool)
}

fn main() -> Result<()> {
    let config = Config::from_env().apply_args(env::args().skip(1));
    setup_logging(&config)?;
    info!(config = ?config, "Starting contest practice");

    let pool = match load_pool(&config) {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to load contest: {}", e);
            let known: Vec<&str> = Contest::ALL.iter().map(|c| c.slug()).collect();
            eprintln!("Error: {}", e);
            eprintln!(
                "Expected {{contest}}_questions.json in {} (contests: {})",
                config.contest_dir.display(),
                known.join(", ")
            );
            return Err(e);
        }
    };

    let runtime = tokio::runtime::Runtime::new()?;
    let local: Arc<dyn StatsStore> = Arc::new(JsonFileStore::new(&config.stats_dir));
    let (tx, rx) = mpsc::unbounded_channel();
    let worker = runtime.spawn(PersistenceWorker::new(local.clone(), None, rx).run());
    let stats = StatsCache::new(local, None, tx);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(&config, pool, stats);

    let tick_rate = Duration::from_millis(250);
    let res = run_app(&mut terminal, &mut app, tick_rate);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    // Closing the queue lets the worker flush and stop.
    drop(app);
    match runtime.block_on(worker) {
        Ok(applied) => info!(applied = applied, "Stats persisted"),
        Err(e) => error!("Persistence worker failed: {}", e),
    }

    if let Err(err) = res {
        error!("Application error: {}", err);
        println!("Error: {}", err);
    }

    info!("Application terminated");
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    tick_rate: Duration,
) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal
            .draw(|f| app.render(f))
            .map_err(|e| PracticeError::Terminal(e.to_string()))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char(c) => {
                        if app.state.mode == AppMode::Ready {
                            app.handle_input(c)
                        }
                    }
                    KeyCode::Enter => {
                        app.handle_enter()?;
                    }
                    KeyCode::Backspace => {
                        if app.state.mode == AppMode::Ready {
                            app.state.input_buffer.pop();
                        }
                    }
                    KeyCode::F(2) => {
                        app.reset_stats();
                    }
                    KeyCode::Esc => {
                        app.should_quit = true;
                    }
                    _ => {}
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
