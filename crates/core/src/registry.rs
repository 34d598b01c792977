//! Display registry: open rendering targets and best-effort fan-out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::warn;

use crate::{error::CoreError, models::Snapshot};

/// Update delivered to a display feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DisplayUpdate {
    /// Newly published state, with an optional raw key signal attached.
    State {
        /// State snapshot as of the triggering mutation.
        snapshot: Snapshot,
        /// Raw key code forwarded by a `key` command, uninterpreted.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signal: Option<String>,
    },
    /// Replacement display configuration produced by an edit.
    Configure {
        /// The merged configuration payload.
        data: Value,
    },
}

/// Receiving half of a display feed, handed to the embedder on open.
///
/// Dropping the receiver marks the display as unreachable; subsequent
/// broadcasts report its id as failed until it is closed.
#[derive(Debug)]
pub struct DisplayFeed {
    /// Id assigned to the opened display.
    pub id: String,
    /// Channel the registry delivers updates into.
    pub updates: mpsc::Receiver<DisplayUpdate>,
}

/// Identity and geometry options for opening a display.
#[derive(Debug, Clone, Default)]
pub struct OpenOptions {
    /// Caller-supplied id; a `display-N` id is generated when absent.
    pub id: Option<String>,
    /// Window width; the configured default applies when absent.
    pub width: Option<u32>,
    /// Window height; the configured default applies when absent.
    pub height: Option<u32>,
    /// Horizontal window position.
    pub x: Option<i32>,
    /// Vertical window position.
    pub y: Option<i32>,
}

/// Attributes of one open display, as reported by status queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayInfo {
    /// Unique display id within the registry.
    pub id: String,
    /// Window width, if set.
    pub width: Option<u32>,
    /// Window height, if set.
    pub height: Option<u32>,
    /// Horizontal window position, if set.
    pub x: Option<i32>,
    /// Vertical window position, if set.
    pub y: Option<i32>,
    /// When the display was opened.
    pub opened_at: DateTime<Utc>,
}

/// Outcome of a fan-out attempt across open displays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BroadcastReport {
    /// Number of displays the update was offered to.
    pub attempted: usize,
    /// Ids whose feed rejected the update (closed or full).
    pub failed: Vec<String>,
}

impl BroadcastReport {
    /// True when every open display received the update.
    pub fn all_delivered(&self) -> bool {
        self.failed.is_empty()
    }
}

struct DisplayInstance {
    info: DisplayInfo,
    data: Value,
    feed: mpsc::Sender<DisplayUpdate>,
}

/// Owns every open display instance and the delivery handles to their feeds.
///
/// Kept as a vector so status reports preserve open order.
pub struct DisplayRegistry {
    displays: Vec<DisplayInstance>,
    feed_capacity: usize,
    next_id: u64,
}

impl DisplayRegistry {
    /// Empty registry whose feeds buffer `feed_capacity` updates each.
    pub fn new(feed_capacity: usize) -> Self {
        Self {
            displays: Vec::new(),
            feed_capacity: feed_capacity.max(1),
            next_id: 0,
        }
    }

    /// Number of open displays.
    pub fn len(&self) -> usize {
        self.displays.len()
    }

    /// True when no display is open.
    pub fn is_empty(&self) -> bool {
        self.displays.is_empty()
    }

    fn contains(&self, id: &str) -> bool {
        self.displays.iter().any(|display| display.info.id == id)
    }

    fn allocate_id(&mut self) -> String {
        loop {
            self.next_id += 1;
            let id = format!("display-{}", self.next_id);
            if !self.contains(&id) {
                return id;
            }
        }
    }

    /// Register a new display and hand back its feed.
    pub fn open(&mut self, opts: OpenOptions) -> Result<DisplayFeed, CoreError> {
        let id = match opts.id {
            Some(id) => {
                let id = id.trim().to_string();
                if id.is_empty() {
                    return Err(CoreError::Validation(
                        "displayId must not be blank".to_string(),
                    ));
                }
                if self.contains(&id) {
                    return Err(CoreError::DuplicateId(id));
                }
                id
            }
            None => self.allocate_id(),
        };

        let (feed, updates) = mpsc::channel(self.feed_capacity);
        self.displays.push(DisplayInstance {
            info: DisplayInfo {
                id: id.clone(),
                width: opts.width,
                height: opts.height,
                x: opts.x,
                y: opts.y,
                opened_at: Utc::now(),
            },
            data: Value::Object(serde_json::Map::new()),
            feed,
        });

        Ok(DisplayFeed { id, updates })
    }

    /// Close the named display, or every display when `id` is `None`.
    ///
    /// Closing all with an empty registry is a no-op success; closing an
    /// unknown id is not. Returns the ids actually closed.
    pub fn close(&mut self, id: Option<&str>) -> Result<Vec<String>, CoreError> {
        match id {
            Some(id) => {
                let pos = self
                    .displays
                    .iter()
                    .position(|display| display.info.id == id)
                    .ok_or_else(|| CoreError::NotFound(id.to_string()))?;
                let removed = self.displays.remove(pos);
                Ok(vec![removed.info.id])
            }
            None => Ok(self
                .displays
                .drain(..)
                .map(|display| display.info.id)
                .collect()),
        }
    }

    /// Merge `data` into the named display's configuration and push the
    /// result to its feed best-effort.
    ///
    /// Object payloads merge top-level keys; anything else replaces the
    /// stored configuration wholesale.
    pub fn edit(&mut self, id: &str, data: Value) -> Result<(), CoreError> {
        let inst = self
            .displays
            .iter_mut()
            .find(|display| display.info.id == id)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;

        merge_config(&mut inst.data, data);

        let update = DisplayUpdate::Configure {
            data: inst.data.clone(),
        };
        if inst.feed.try_send(update).is_err() {
            warn!(id = %inst.info.id, "display missed a configure update");
        }
        Ok(())
    }

    /// Offer an update to a single display, reporting delivery success.
    pub fn deliver(&self, id: &str, update: DisplayUpdate) -> Result<bool, CoreError> {
        let inst = self
            .displays
            .iter()
            .find(|display| display.info.id == id)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;

        match inst.feed.try_send(update) {
            Ok(()) => Ok(true),
            Err(_) => {
                warn!(id = %inst.info.id, "display missed an update");
                Ok(false)
            }
        }
    }

    /// Attributes of every open display, in open order.
    pub fn status(&self) -> Vec<DisplayInfo> {
        self.displays
            .iter()
            .map(|display| display.info.clone())
            .collect()
    }

    /// Clone the delivery handles so the fan-out can run without the
    /// state lock held.
    pub(crate) fn feeds(&self) -> Vec<(String, mpsc::Sender<DisplayUpdate>)> {
        self.displays
            .iter()
            .map(|display| (display.info.id.clone(), display.feed.clone()))
            .collect()
    }
}

/// Offer `update` to every feed, collecting the ids that missed it.
pub(crate) fn fan_out(
    feeds: &[(String, mpsc::Sender<DisplayUpdate>)],
    update: &DisplayUpdate,
) -> BroadcastReport {
    let mut report = BroadcastReport {
        attempted: feeds.len(),
        failed: Vec::new(),
    };
    for (id, feed) in feeds {
        if feed.try_send(update.clone()).is_err() {
            warn!(id = %id, "display missed a broadcast");
            report.failed.push(id.clone());
        }
    }
    report
}

fn merge_config(current: &mut Value, incoming: Value) {
    match (current.as_object_mut(), incoming) {
        (Some(target), Value::Object(fields)) => {
            for (key, value) in fields {
                target.insert(key, value);
            }
        }
        (_, incoming) => *current = incoming,
    }
}
