//! Authoritative display state and the operations that mutate it.
//!
//! All mutations validate and apply behind one mutex. Fan-out to display
//! feeds happens after the lock is released, against the snapshot captured
//! while it was held, so a slow or dead display cannot stall commands.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    command::Command,
    config::AppConfig,
    error::CoreError,
    models::{Phase, RunState, Snapshot, Timetable},
    registry::{
        self, BroadcastReport, DisplayFeed, DisplayInfo, DisplayRegistry, DisplayUpdate,
        OpenOptions,
    },
};

/// Run-state half of a sync push.
///
/// Both fields are optional: the original driving application sends `{}`
/// when it has no cursor to report, and may send only one half.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RtUpdate {
    /// Station index to apply, clamped into the new timetable's bounds.
    #[serde(default)]
    pub idx: Option<i64>,
    /// Phase to apply (0 = arrived, 1 = departed).
    #[serde(default)]
    pub state: Option<i64>,
}

impl RtUpdate {
    /// True when the push carries no run-state information at all.
    pub fn is_empty(&self) -> bool {
        self.idx.is_none() && self.state.is_none()
    }
}

/// Result of a committed sync or control operation.
#[derive(Debug)]
pub struct Mutation {
    /// State as committed by this operation.
    pub snapshot: Snapshot,
    /// Delivery outcome of the post-commit fan-out.
    pub broadcast: BroadcastReport,
    /// False when the operation was a boundary no-op.
    pub changed: bool,
}

struct Inner {
    timetable: Timetable,
    run: RunState,
    synced_at: Option<DateTime<Utc>>,
    registry: DisplayRegistry,
}

impl Inner {
    fn snapshot(&self) -> Snapshot {
        Snapshot {
            timetable: self.timetable.clone(),
            run: self.run,
            synced_at: self.synced_at,
        }
    }
}

/// Process-wide authoritative state: timetable, run state, and registry.
///
/// Constructed once per process (or per test) and shared by reference;
/// there are no ambient globals.
pub struct PidsState {
    inner: Mutex<Inner>,
    default_width: u32,
    default_height: u32,
}

impl PidsState {
    /// Fresh state with no line loaded and no displays open.
    pub fn new(config: &AppConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                timetable: Timetable::default(),
                run: RunState::default(),
                synced_at: None,
                registry: DisplayRegistry::new(config.feed_capacity),
            }),
            default_width: config.default_width,
            default_height: config.default_height,
        }
    }

    /// Read-only copy of the published state.
    ///
    /// Reads never observe a partially applied sync.
    pub fn snapshot(&self) -> Snapshot {
        self.inner.lock().snapshot()
    }

    /// Atomically replace the timetable and (optionally) the run state,
    /// then republish to every open display.
    ///
    /// Validation happens before any mutation: a malformed timetable, a
    /// negative index, or an out-of-enum phase rejects the whole push.
    /// An index that was valid against the previous, longer timetable is
    /// clamped instead — the driving application may push state updates
    /// slightly out of order with timetable updates.
    pub fn sync(&self, timetable: Timetable, rt: Option<RtUpdate>) -> Result<Mutation, CoreError> {
        timetable.validate()?;
        let rt = rt.filter(|rt| !rt.is_empty());
        let phase = match rt.and_then(|rt| rt.state) {
            Some(raw) => Some(Phase::try_from(raw)?),
            None => None,
        };
        if let Some(idx) = rt.and_then(|rt| rt.idx) {
            if idx < 0 {
                return Err(CoreError::OutOfRange {
                    idx,
                    len: timetable.len(),
                });
            }
        }

        let (snapshot, feeds) = {
            let mut inner = self.inner.lock();
            let len = timetable.len();
            inner.timetable = timetable;
            match rt {
                Some(rt) => {
                    if let Some(idx) = rt.idx {
                        inner.run.idx = (idx as usize).min(len.saturating_sub(1));
                    } else {
                        inner.run.clamp(len);
                    }
                    if let Some(phase) = phase {
                        inner.run.state = phase;
                    }
                }
                None => inner.run.clamp(len),
            }
            inner.synced_at = Some(Utc::now());
            (inner.snapshot(), inner.registry.feeds())
        };

        info!(
            line = %snapshot.timetable.line_name,
            stations = snapshot.timetable.len(),
            idx = snapshot.run.idx,
            "timetable replaced"
        );
        let broadcast = registry::fan_out(
            &feeds,
            &DisplayUpdate::State {
                snapshot: snapshot.clone(),
                signal: None,
            },
        );
        Ok(Mutation {
            snapshot,
            broadcast,
            changed: true,
        })
    }

    /// Apply an operator command and republish the result.
    ///
    /// Navigation at the ends of the line is a no-op success, reported
    /// via [`Mutation::changed`]; it still republishes so displays that
    /// missed earlier pushes converge.
    pub fn control(&self, command: &Command) -> Mutation {
        let (snapshot, feeds, changed, signal) = {
            let mut inner = self.inner.lock();
            let len = inner.timetable.len();
            let (changed, signal) = match command {
                Command::Next => (inner.run.advance(len), None),
                Command::Prev => (inner.run.retreat(), None),
                Command::Arrive => {
                    inner.run.arrive();
                    (true, None)
                }
                Command::Depart => {
                    inner.run.depart();
                    (true, None)
                }
                Command::Key(code) => (true, Some(code.clone())),
            };
            (inner.snapshot(), inner.registry.feeds(), changed, signal)
        };

        debug!(
            command = command.tag(),
            idx = snapshot.run.idx,
            phase = snapshot.run.state.as_u8(),
            changed,
            "command applied"
        );
        let broadcast = registry::fan_out(
            &feeds,
            &DisplayUpdate::State {
                snapshot: snapshot.clone(),
                signal,
            },
        );
        Mutation {
            snapshot,
            broadcast,
            changed,
        }
    }

    /// Open a display, falling back to the configured default geometry,
    /// and deliver the current state to its feed straight away.
    pub fn open_display(&self, mut opts: OpenOptions) -> Result<DisplayFeed, CoreError> {
        opts.width = opts.width.or(Some(self.default_width));
        opts.height = opts.height.or(Some(self.default_height));

        let mut inner = self.inner.lock();
        let feed = inner.registry.open(opts)?;
        let snapshot = inner.snapshot();
        let _ = inner.registry.deliver(
            &feed.id,
            DisplayUpdate::State {
                snapshot,
                signal: None,
            },
        );
        info!(id = %feed.id, "display opened");
        Ok(feed)
    }

    /// Close the named display, or all displays when `id` is `None`.
    pub fn close_display(&self, id: Option<&str>) -> Result<Vec<String>, CoreError> {
        let closed = self.inner.lock().registry.close(id)?;
        info!(closed = closed.len(), "displays closed");
        Ok(closed)
    }

    /// Merge a configuration payload into the named display.
    pub fn edit_display(&self, id: &str, data: Value) -> Result<(), CoreError> {
        self.inner.lock().registry.edit(id, data)?;
        info!(id, "display configuration updated");
        Ok(())
    }

    /// Attributes of every open display, in open order.
    pub fn display_status(&self) -> Vec<DisplayInfo> {
        self.inner.lock().registry.status()
    }
}
