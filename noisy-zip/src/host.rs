//! Capability hooks provided by the embedding front-end.
//!
//! The core never talks to a terminal or a GUI directly; progress and
//! per-entry diagnostics flow through a [Host], and so does the question of
//! what counts as a hidden file (the answer is platform lore the core has
//! no business knowing).

use std::path::Path;

/// Called after each processed item as `(done, total, name)`.
pub type ProgressFn = dyn Fn(u64, u64, &str) + Send + Sync;

/// Receives one human-readable diagnostic line per call.
pub type LogFn = dyn Fn(&str) + Send + Sync;

/// Decides whether a path is hidden on the host platform.
pub type HiddenFn = dyn Fn(&Path) -> bool + Send + Sync;

/// The hooks a front-end hands to [build][crate::build()] and
/// [recover][crate::recover()].
pub struct Host {
    on_progress: Option<Box<ProgressFn>>,
    on_log: Option<Box<LogFn>>,
    is_hidden: Box<HiddenFn>,
}

impl Default for Host {
    fn default() -> Self {
        Self {
            on_progress: None,
            on_log: None,
            is_hidden: Box::new(dot_prefixed),
        }
    }
}

// Unix convention; Windows front-ends override with an attribute check.
fn dot_prefixed(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

impl Host {
    /// A host that reports nothing and treats dot-files as hidden.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a progress callback.
    pub fn with_progress(mut self, f: impl Fn(u64, u64, &str) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    /// Install a diagnostics callback.
    pub fn with_log(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_log = Some(Box::new(f));
        self
    }

    /// Replace the hidden-file predicate.
    pub fn with_hidden(mut self, f: impl Fn(&Path) -> bool + Send + Sync + 'static) -> Self {
        self.is_hidden = Box::new(f);
        self
    }

    pub(crate) fn progress(&self, done: u64, total: u64, name: &str) {
        if let Some(f) = &self.on_progress {
            f(done, total, name);
        }
    }

    pub(crate) fn log(&self, message: &str) {
        if let Some(f) = &self.on_log {
            f(message);
        }
    }

    pub(crate) fn hidden(&self, path: &Path) -> bool {
        (self.is_hidden)(path)
    }
}
