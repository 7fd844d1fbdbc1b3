// ============================================================================
// TOOL-STATE NOTIFICATION — one-way feed for an options panel
// ============================================================================

use std::sync::mpsc;

/// What an options panel shows about the selection.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct ToolStateUpdate {
    pub present: bool,
    pub floating: bool,
    /// Whole-percent scale, `(x, y)`.
    pub scale_pct: (f32, f32),
    /// Total rotation in degrees, `[0, 360)`.
    pub rotation_deg: f32,
}

/// Fire-and-forget receiver of tool-state changes.
pub trait ToolStateObserver {
    fn tool_state_changed(&mut self, update: &ToolStateUpdate);
}

/// For headless use.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullObserver;

impl ToolStateObserver for NullObserver {
    fn tool_state_changed(&mut self, _update: &ToolStateUpdate) {}
}

/// Forwards updates over a channel to whichever thread owns the UI.
/// A dropped receiver is ignored.
pub struct ChannelObserver {
    sender: mpsc::Sender<ToolStateUpdate>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::Receiver<ToolStateUpdate>) {
        let (sender, receiver) = mpsc::channel();
        (Self { sender }, receiver)
    }
}

impl ToolStateObserver for ChannelObserver {
    fn tool_state_changed(&mut self, update: &ToolStateUpdate) {
        let _ = self.sender.send(*update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn channel_delivers_and_survives_dropped_receiver() {
        let (mut obs, rx) = ChannelObserver::new();
        let update = ToolStateUpdate { present: true, floating: true, scale_pct: (150.0, 150.0), rotation_deg: 45.0 };
        obs.tool_state_changed(&update);
        assert_eq!(rx.try_recv().ok(), Some(update));
        drop(rx);
        obs.tool_state_changed(&update);
    }
}
