//! User-facing progress and failure messages.
//!
//! This is separate from `tracing`: diagnostics go to the log, while a
//! [`Notifier`] carries the handful of lines a person running the installer
//! is meant to read ("Downloading…", "installed successfully", failures that
//! were absorbed instead of raised).

use console::style;
use std::sync::Mutex;

pub trait Notifier: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
}

/// Writes styled lines to stderr.
#[derive(Debug, Default, Clone)]
pub struct ConsoleNotifier {
    quiet: bool,
}

impl ConsoleNotifier {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl Notifier for ConsoleNotifier {
    fn info(&self, message: &str) {
        if !self.quiet {
            eprintln!("{}", style(message).green());
        }
    }

    fn error(&self, message: &str) {
        eprintln!("{}", style(message).red().bold());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
}

/// Keeps every message in memory, for callers that inspect output programmatically.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default()
    }

    pub fn infos(&self) -> Vec<String> {
        self.notices()
            .into_iter()
            .filter_map(|n| match n {
                Notice::Info(m) => Some(m),
                Notice::Error(_) => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.notices()
            .into_iter()
            .filter_map(|n| match n {
                Notice::Error(m) => Some(m),
                Notice::Info(_) => None,
            })
            .collect()
    }

    fn push(&self, notice: Notice) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(notice);
        }
    }
}

impl Notifier for RecordingNotifier {
    fn info(&self, message: &str) {
        self.push(Notice::Info(message.to_string()));
    }

    fn error(&self, message: &str) {
        self.push(Notice::Error(message.to_string()));
    }
}
