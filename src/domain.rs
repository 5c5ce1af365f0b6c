use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;
use std::fmt;
use std::io::Error;

use crate::record::Field;

pub const HELP_TEXT: &str = "\
Search
  /        edit search query
  Enter    run search (while editing)
  Esc      stop editing
  c        clear search results

Sorting
  1-6      sort by Make, Model, Year, Displacement, Price, Terrain
  s        sort by the selected column
  click    sort by the clicked header
  (selecting the active column again flips the direction)

Navigation
  ↑ ↓ k j  move selection
  PgUp PgDn Home End
  ← → h l  select column
  Enter    show record details
  y        copy record to clipboard

  ?        this help
  Esc      close popup
  q        quit";

#[derive(Debug)]
pub enum BVError {
    IoError(Error),
    PolarsError(PolarsError),
    JsonError(serde_json::Error),
    LoadingFailed(String),
    LoggingFailed(String),
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
    EmptyQuery,
}

impl fmt::Display for BVError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BVError::IoError(e) => write!(f, "io error: {e}"),
            BVError::PolarsError(e) => write!(f, "could not read table: {e}"),
            BVError::JsonError(e) => write!(f, "could not parse json: {e}"),
            BVError::LoadingFailed(reason) => write!(f, "loading failed: {reason}"),
            BVError::LoggingFailed(reason) => write!(f, "could not initialize logging: {reason}"),
            BVError::FileNotFound => write!(f, "file not found"),
            BVError::PermissionDenied => write!(f, "permission denied"),
            BVError::UnknownFileType => write!(f, "unknown file type"),
            BVError::EmptyQuery => write!(f, "Please populate the search box."),
        }
    }
}

impl std::error::Error for BVError {}

impl From<Error> for BVError {
    fn from(err: Error) -> Self {
        BVError::IoError(err)
    }
}

impl From<PolarsError> for BVError {
    fn from(err: PolarsError) -> Self {
        BVError::PolarsError(err)
    }
}

impl From<serde_json::Error> for BVError {
    fn from(err: serde_json::Error) -> Self {
        BVError::JsonError(err)
    }
}

#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct BVConfig {
    pub event_poll_time: u64,
    pub max_column_width: usize,
}

impl Default for BVConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            max_column_width: 24,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    MoveLeft,
    MoveRight,
    EditSearch,
    Search,
    ClearSearch,
    SortBy(Field),
    SortSelectedColumn,
    CopyRecord,
    Enter,
    Exit,
    Help,
    Resize(usize, usize),
    RawKey(KeyEvent),
}
