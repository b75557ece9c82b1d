//! Optional live-tuning panel.
//!
//! The panel UI itself belongs to the host. A panel receives the current
//! configuration as JSON and reports edits as JSON patches through a
//! [`ChangeSink`]; the system applies pending patches at the start of the
//! next `update`, the same way `set_props` would.
//!
//! ```ignore
//! struct PrintPanel;
//!
//! impl DebugPanel for PrintPanel {
//!     fn render(&mut self, initial: &Value, on_change: ChangeSink) {
//!         println!("{initial}");
//!         on_change.send(json!({ "speed": [2.0, 3.0] }));
//!     }
//!     fn update(&mut self, _values: &Value, _on_change: ChangeSink) {}
//!     fn destroy(&mut self) {}
//! }
//!
//! system.attach_debug_panel(Box::new(PrintPanel));
//! ```

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use serde_json::{Map, Value};

/// Host-provided tuning panel.
pub trait DebugPanel: Send {
    /// Show the panel with the configuration it starts from.
    fn render(&mut self, initial: &Value, on_change: ChangeSink);

    /// The configuration changed from outside the panel.
    fn update(&mut self, values: &Value, on_change: ChangeSink);

    /// Tear the panel down. Called once when it is detached.
    fn destroy(&mut self);
}

/// Cloneable handle a panel reports edits through.
#[derive(Debug, Clone)]
pub struct ChangeSink {
    sender: Sender<Value>,
}

impl ChangeSink {
    /// Queue a configuration patch. Dropped with a debug log once the
    /// panel has been detached.
    pub fn send(&self, patch: Value) {
        if self.sender.send(patch).is_err() {
            log::debug!("debug panel change dropped; panel is detached");
        }
    }
}

/// A panel together with the channel its edits arrive on.
pub(crate) struct AttachedPanel {
    panel: Box<dyn DebugPanel>,
    sender: Sender<Value>,
    receiver: Receiver<Value>,
}

impl AttachedPanel {
    /// Attach and render a panel.
    pub(crate) fn attach(mut panel: Box<dyn DebugPanel>, initial: &Value) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        panel.render(
            initial,
            ChangeSink {
                sender: sender.clone(),
            },
        );
        Self {
            panel,
            sender,
            receiver,
        }
    }

    /// Forward an external configuration change to the panel.
    pub(crate) fn notify(&mut self, values: &Value) {
        self.panel.update(
            values,
            ChangeSink {
                sender: self.sender.clone(),
            },
        );
    }

    /// Merge every pending patch into one, later keys winning.
    pub(crate) fn drain(&self) -> Option<Value> {
        let mut merged = Map::new();
        loop {
            match self.receiver.try_recv() {
                Ok(Value::Object(patch)) => merged.extend(patch),
                Ok(other) => log::warn!("ignoring debug panel change that is not an object: {other}"),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        if merged.is_empty() {
            None
        } else {
            Some(Value::Object(merged))
        }
    }

    /// Destroy the panel.
    pub(crate) fn detach(mut self) {
        self.panel.destroy();
    }
}
