use crate::sync::{read, write};
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// Action label recorded when the store is created.
pub const INIT_ACTION: &str = "@@INIT";
/// Action label used for updates that were not given one.
pub const ANONYMOUS_ACTION: &str = "anonymous";

/// Configuration for transition recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevtoolsConfig {
    /// Record transitions at all. Defaults to on in debug builds only.
    pub enabled: bool,
    /// Label attached to every emitted event.
    pub name: String,
    /// Keep a `Debug` rendering of the state after each transition.
    pub trace: bool,
    /// Oldest transitions are dropped past this many entries.
    pub max_entries: usize,
}

impl Default for DevtoolsConfig {
    fn default() -> Self {
        Self {
            enabled: cfg!(debug_assertions),
            name: "store".to_string(),
            trace: true,
            max_entries: 50,
        }
    }
}

impl DevtoolsConfig {
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }
}

/// One recorded state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Monotonic sequence number, starting at 0 for [`INIT_ACTION`].
    pub seq: u64,
    pub action: String,
    /// `Debug` rendering of the resulting state, when tracing is on.
    pub state: Option<String>,
}

/// Records labelled transitions into a bounded timeline.
pub(crate) struct Devtools {
    config: DevtoolsConfig,
    seq: AtomicU64,
    timeline: RwLock<VecDeque<Transition>>,
}

impl Devtools {
    /// Returns `None` when the configuration disables recording.
    pub(crate) fn new(config: DevtoolsConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        Some(Self {
            config,
            seq: AtomicU64::new(0),
            timeline: RwLock::new(VecDeque::new()),
        })
    }

    pub(crate) fn record<S: fmt::Debug>(&self, action: &str, state: &S) {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let rendered = self.config.trace.then(|| format!("{state:?}"));

        tracing::debug!(
            target: "larder::devtools",
            store = %self.config.name,
            seq,
            action,
            "state transition"
        );

        let mut timeline = write(&self.timeline);
        while timeline.len() >= self.config.max_entries {
            timeline.pop_front();
        }
        timeline.push_back(Transition {
            seq,
            action: action.to_string(),
            state: rendered,
        });
    }

    pub(crate) fn transitions(&self) -> Vec<Transition> {
        read(&self.timeline).iter().cloned().collect()
    }

    pub(crate) fn clear(&self) {
        write(&self.timeline).clear();
    }
}
