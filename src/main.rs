use clap::{Parser, ValueEnum};
use ratatui::crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use ratatui::crossterm::execute;
use std::io::stdout;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

mod controller;
mod domain;
mod inputter;
mod logging;
mod model;
mod pipeline;
mod record;
mod ui;

use controller::Controller;
use domain::{BVConfig, BVError};
use model::{Model, Status};
use record::Dataset;
use ui::TableUI;

/// Browse a bike model catalog with search and column sorting.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Catalog file (json, csv, parquet or arrow)
    #[arg(default_value = "data/bikes.json")]
    path: String,
    /// Terminal event poll interval in milliseconds
    #[arg(long = "poll-ms", default_value_t = BVConfig::default().event_poll_time)]
    poll_ms: u64,
    /// Maximum width of a table column
    #[arg(long, default_value_t = BVConfig::default().max_column_width)]
    max_column_width: usize,
    /// Write a log to the given file
    #[arg(long, value_name = "PATH")]
    log_file: Option<String>,
    /// Log level, overrides RUST_LOG
    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

fn main() -> ExitCode {
    match run(Args::parse()) {
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn expand_path(path: &str) -> Result<PathBuf, BVError> {
    let expanded = shellexpand::full(path)
        .map_err(|e| BVError::LoadingFailed(format!("invalid path {path}: {e}")))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

fn run(args: Args) -> Result<(), BVError> {
    if let Some(log_file) = &args.log_file {
        logging::init(expand_path(log_file)?, args.log_level.map(Into::into))?;
    }

    let cfg = BVConfig::default()
        .with_event_poll_time(args.poll_ms)
        .with_max_column_width(args.max_column_width);
    info!("Starting with {cfg:?}");

    // Loading happens before the terminal is taken over so errors stay readable.
    let dataset = Dataset::load_file(expand_path(&args.path)?)?;

    let mut terminal = ratatui::init();
    execute!(stdout(), EnableMouseCapture)?;
    let result = (|| -> Result<(), BVError> {
        let size = terminal.size()?;
        let mut model = Model::init(&cfg, dataset, size.width as usize, size.height as usize)?;
        let mut ui = TableUI::new(&cfg);
        let controller = Controller::new(&cfg);

        while model.status != Status::QUITTING {
            terminal.draw(|f| ui.draw(&model, f))?;
            let message = controller.handle_event(&model, &ui)?;
            model.update(message)?;
        }
        Ok(())
    })();
    execute!(stdout(), DisableMouseCapture)?;
    ratatui::restore();
    result
}
