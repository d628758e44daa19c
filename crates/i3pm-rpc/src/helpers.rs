//! Conversions between domain events and JSON-RPC notifications.
//!
//! `i3pm_types::CoreEvent` is a `#[serde(tag = "type")]` enum; the wire
//! notification instead carries the tag as the JSON-RPC `method` name and
//! the remaining fields as `params`. These helpers move the tag between the
//! two shapes.

use i3pm_types::CoreEvent;
use serde_json::Value;

use crate::protocol::Notification;

/// Builds a JSON-RPC notification from a domain event, moving the event's
/// `type` tag into the notification's `method`.
///
/// # Panics
///
/// Panics if `event` doesn't serialize to a JSON object, which would mean
/// `CoreEvent`'s `Serialize` impl no longer produces an internally-tagged
/// object.
#[must_use]
pub fn event_to_notification(event: &CoreEvent) -> Notification {
    let mut value = serde_json::to_value(event).expect("CoreEvent always serializes");
    let object = value
        .as_object_mut()
        .expect("CoreEvent serializes as a tagged object");
    let method = object
        .remove("type")
        .and_then(|v| v.as_str().map(str::to_string))
        .expect("CoreEvent object always carries a type tag");

    Notification::new(method, Some(Value::Object(object.clone())))
}

/// Reconstructs a domain event from a notification, reinserting the method
/// name as the `type` tag before deserializing.
///
/// # Errors
///
/// Returns an error if the method name isn't a known `CoreEvent` variant or
/// the params don't match that variant's shape.
pub fn notification_to_event(notification: &Notification) -> Result<CoreEvent, serde_json::Error> {
    let mut object = notification
        .params
        .clone()
        .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
    if let Some(map) = object.as_object_mut() {
        map.insert("type".to_string(), Value::String(notification.method.clone()));
    }
    serde_json::from_value(object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use i3pm_types::CoreEvent;

    #[test]
    fn roundtrips_project_switched_event() {
        let event = CoreEvent::ProjectSwitched {
            from: Some("alpha".into()),
            to: "beta".into(),
        };
        let notification = event_to_notification(&event);
        assert_eq!(notification.method, "project_switched");

        let recovered = notification_to_event(&notification).unwrap();
        assert_eq!(recovered, event);
    }
}
