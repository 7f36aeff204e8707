//! Structured event stream for cooldown transitions.
//!
//! Each transition (cooldown started, ended, command blocked, penalty
//! applied) is serialized as a single JSON line carrying a monotonically
//! increasing sequence number.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::host::ParticipantId;

// ---------------------------------------------------------------------------
// End reasons
// ---------------------------------------------------------------------------

/// Why a cooldown stopped being tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The deadline passed while the participant was connected.
    Expired,
    /// The participant disconnected while in cooldown.
    Disconnected,
    /// The participant disconnected holding the bypass permission.
    Exempt,
    /// The participant disconnected and was punished.
    Penalized,
    /// A stale entry for a departed participant was swept by the reconciler.
    Collected,
}

impl EndReason {
    /// Stable lowercase name, used as a metrics label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Expired => "expired",
            Self::Disconnected => "disconnected",
            Self::Exempt => "exempt",
            Self::Penalized => "penalized",
            Self::Collected => "collected",
        }
    }

    /// Whether the participant is told their cooldown has ended.
    #[must_use]
    pub const fn notifies(self) -> bool {
        matches!(self, Self::Expired)
    }
}

impl std::fmt::Display for EndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// A discrete event emitted by the combat tracker.
///
/// Tagged with `"type"` when serialized so consumers can dispatch on kind.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// The background reconciler started.
    TrackerStarted {
        /// When the tracker started.
        timestamp: DateTime<Utc>,
        /// Configured cooldown length in milliseconds.
        cooldown_ms: u64,
        /// Reconciler period in milliseconds.
        tick_interval_ms: u64,
    },

    /// The background reconciler stopped.
    TrackerStopped {
        /// When the tracker stopped.
        timestamp: DateTime<Utc>,
        /// Cooldowns still tracked at shutdown.
        active: usize,
    },

    /// A combat event started or refreshed a cooldown.
    CooldownStarted {
        /// When the combat event was handled.
        timestamp: DateTime<Utc>,
        /// Participant entering (or staying in) cooldown.
        participant: ParticipantId,
        /// Time until the new deadline, in milliseconds.
        expires_in_ms: u64,
        /// `true` when the participant was already in cooldown.
        refreshed: bool,
    },

    /// A cooldown stopped being tracked.
    CooldownEnded {
        /// When the cooldown ended.
        timestamp: DateTime<Utc>,
        /// Participant leaving cooldown.
        participant: ParticipantId,
        /// Why it ended.
        reason: EndReason,
    },

    /// A command was cancelled.
    CommandBlocked {
        /// When the command was cancelled.
        timestamp: DateTime<Utc>,
        /// Sender of the command.
        participant: ParticipantId,
        /// Normalized base command (no arguments).
        command: String,
    },

    /// A disconnect penalty was applied.
    PenaltyApplied {
        /// When the penalty was applied.
        timestamp: DateTime<Utc>,
        /// Participant that left mid-cooldown.
        participant: ParticipantId,
        /// Punishment label (`"none"`, `"kill"`, `"damage"`).
        punishment: &'static str,
        /// Health before the penalty, when the host reports it.
        health_before: Option<f64>,
        /// Health after the penalty, when it changed.
        health_after: Option<f64>,
    },
}

impl Event {
    /// Returns the `"type"` tag of this event.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::TrackerStarted { .. } => "TrackerStarted",
            Self::TrackerStopped { .. } => "TrackerStopped",
            Self::CooldownStarted { .. } => "CooldownStarted",
            Self::CooldownEnded { .. } => "CooldownEnded",
            Self::CommandBlocked { .. } => "CommandBlocked",
            Self::PenaltyApplied { .. } => "PenaltyApplied",
        }
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct EventEnvelope {
    sequence: u64,
    #[serde(flatten)]
    event: Event,
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Thread-safe, buffered JSONL event writer.
///
/// Serialization and I/O failures are dropped; a broken event sink never
/// interrupts cooldown bookkeeping.
pub struct EventEmitter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    sequence: AtomicU64,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter that writes to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            sequence: AtomicU64::new(0),
        }
    }

    /// Creates an emitter that writes to stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    /// Creates an emitter that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates an emitter that discards all events.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Creates an emitter that writes to a file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Emits an event as a single JSONL line.
    pub fn emit(&self, event: Event) {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let envelope = EventEnvelope {
            sequence: seq,
            event,
        };

        if let Ok(mut w) = self.writer.lock()
            && let Ok(line) = serde_json::to_string(&envelope)
        {
            let _ = writeln!(w, "{line}");
            let _ = w.flush();
        }
    }

    /// Returns the number of events emitted so far.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}
