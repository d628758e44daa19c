//! Typed representations of i3/Sway `SUBSCRIBE` event payloads.
//!
//! These stay close to the wire shape (raw `serde_json::Value` for
//! sub-trees) rather than the richer `i3pm_types::Window`/`Workspace`; the
//! state store is responsible for projecting these into domain types since
//! it alone knows which fields matter for scoping and matching.

use serde::Deserialize;
use serde_json::Value;

use crate::protocol::{EventType, Frame};

#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceEventPayload {
    pub change: String,
    pub current: Option<Value>,
    pub old: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WindowEventPayload {
    pub change: String,
    pub container: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputEventPayload {
    pub change: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModeEventPayload {
    pub change: String,
    #[serde(default)]
    pub pango_markup: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TickEventPayload {
    pub first: bool,
    pub payload: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShutdownEventPayload {
    pub change: String,
}

/// A decoded compositor event, or a client-synthesized reconnect marker.
///
/// `Reconnected` never arrives over the wire; the client emits it after
/// re-establishing a dropped event connection so consumers know their
/// cached tree may be stale and should re-fetch via `get_tree`.
#[derive(Debug, Clone)]
pub enum CompositorEvent {
    Workspace(WorkspaceEventPayload),
    Window(WindowEventPayload),
    Output(OutputEventPayload),
    Mode(ModeEventPayload),
    BindingModeUpdate(Value),
    Shutdown(ShutdownEventPayload),
    Tick(TickEventPayload),
    Reconnected,
}

/// Decodes a raw IPC frame known to carry the event bit into a typed event.
///
/// # Errors
///
/// Returns an error if the frame's type code isn't a recognized event type
/// or the payload doesn't match that event's expected shape.
pub fn decode_event(frame: &Frame) -> Result<CompositorEvent, crate::error::IpcError> {
    let event_type = frame
        .event_type()
        .ok_or(crate::error::IpcError::NotAnEvent(frame.type_code))?;

    Ok(match event_type {
        EventType::Workspace => CompositorEvent::Workspace(serde_json::from_slice(&frame.payload)?),
        EventType::Window => CompositorEvent::Window(serde_json::from_slice(&frame.payload)?),
        EventType::Output => CompositorEvent::Output(serde_json::from_slice(&frame.payload)?),
        EventType::Mode => CompositorEvent::Mode(serde_json::from_slice(&frame.payload)?),
        EventType::Binding => CompositorEvent::BindingModeUpdate(serde_json::from_slice(&frame.payload)?),
        EventType::Shutdown => CompositorEvent::Shutdown(serde_json::from_slice(&frame.payload)?),
        EventType::Tick => CompositorEvent::Tick(serde_json::from_slice(&frame.payload)?),
        EventType::BarConfigUpdate => CompositorEvent::BindingModeUpdate(serde_json::from_slice(&frame.payload)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_window_event() {
        let frame = Frame {
            type_code: 0x8000_0003,
            payload: br#"{"change":"focus","container":{"id":1}}"#.to_vec(),
        };
        let event = decode_event(&frame).unwrap();
        assert!(matches!(event, CompositorEvent::Window(ref w) if w.change == "focus"));
    }
}
