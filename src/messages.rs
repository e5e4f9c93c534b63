//! Typed SafeFace server events.
//!
//! The connection manager delivers inbound payloads unparsed; this module is
//! the consumer-side typing of the `{ "type": ..., "data": ... }` JSON
//! envelope the SafeFace backend pushes over the realtime feed.

use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

/// A server-pushed event, tagged by the envelope's `type` field.
///
/// Unrecognized event types deserialize to [`ServerEvent::Unknown`] rather
/// than failing, so a newer backend never breaks an older client.
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A face-recognition event from a camera.
    DetectionAlert(DetectionAlert),
    /// A generic system notification with a severity level.
    Notification(Notification),
    /// An event type this client version does not know about.
    #[serde(other)]
    Unknown,
}

impl ServerEvent {
    /// Parse one inbound payload as a server event.
    pub fn parse(payload: &str) -> Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }

    /// Try to view this event as a detection alert.
    #[must_use]
    pub fn as_detection_alert(&self) -> Option<&DetectionAlert> {
        match self {
            Self::DetectionAlert(alert) => Some(alert),
            _ => None,
        }
    }

    /// Try to view this event as a system notification.
    #[must_use]
    pub fn as_notification(&self) -> Option<&Notification> {
        match self {
            Self::Notification(notification) => Some(notification),
            _ => None,
        }
    }
}

/// A face-recognition event from a camera.
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize, Builder)]
pub struct DetectionAlert {
    /// Identifier of the camera that produced the detection
    pub camera_id: i64,
    /// Human-readable camera name
    pub camera_name: String,
    /// Identifier of the recognized person, absent for unknown faces
    #[serde(default)]
    pub person_id: Option<i64>,
    /// Name of the recognized person, absent for unknown faces
    #[serde(default)]
    pub person_name: Option<String>,
    /// Recognition confidence in `[0.0, 1.0]`
    pub confidence: f64,
    /// When the detection occurred
    pub timestamp: DateTime<Utc>,
    /// URL of the captured frame, when the backend stored one
    #[serde(default)]
    pub snapshot_url: Option<String>,
}

/// A generic system notification.
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize, Builder)]
pub struct Notification {
    /// Human-readable notification text
    pub message: String,
    /// Severity level
    pub level: Severity,
}

/// Notification severity level.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Success,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_alert_round_trips_from_envelope() {
        let payload = r#"{
            "type": "detection_alert",
            "data": {
                "camera_id": 3,
                "camera_name": "Lobby East",
                "person_id": 42,
                "person_name": "Ada Lovelace",
                "confidence": 0.97,
                "timestamp": "2026-08-26T09:14:03Z",
                "snapshot_url": "https://api.safeface.io/frames/8841.jpg"
            }
        }"#;

        let event = ServerEvent::parse(payload).expect("valid detection alert");
        let alert = event.as_detection_alert().expect("should be an alert");

        assert_eq!(alert.camera_id, 3);
        assert_eq!(alert.person_name.as_deref(), Some("Ada Lovelace"));
        assert!(alert.confidence > 0.9, "confidence should survive parsing");
        assert!(event.as_notification().is_none());
    }

    #[test]
    fn unknown_faces_omit_person_fields() {
        let payload = r#"{
            "type": "detection_alert",
            "data": {
                "camera_id": 1,
                "camera_name": "Parking",
                "confidence": 0.51,
                "timestamp": "2026-08-26T22:40:00Z"
            }
        }"#;

        let event = ServerEvent::parse(payload).expect("valid alert without person");
        let alert = event.as_detection_alert().expect("should be an alert");

        assert_eq!(alert.person_id, None);
        assert_eq!(alert.person_name, None);
        assert_eq!(alert.snapshot_url, None);
    }

    #[test]
    fn notification_severity_parses_lowercase() {
        let payload = r#"{
            "type": "notification",
            "data": { "message": "Camera 2 went offline", "level": "warning" }
        }"#;

        let event = ServerEvent::parse(payload).expect("valid notification");
        let notification = event.as_notification().expect("should be a notification");

        assert_eq!(notification.level, Severity::Warning);
        assert_eq!(notification.message, "Camera 2 went offline");
    }

    #[test]
    fn unrecognized_type_maps_to_unknown() {
        let payload = r#"{ "type": "firmware_update", "data": { "version": "2.1" } }"#;

        let event = ServerEvent::parse(payload).expect("unknown types must not fail");
        assert!(matches!(event, ServerEvent::Unknown));
    }

    #[test]
    fn malformed_payload_is_an_error() {
        assert!(
            ServerEvent::parse("not json").is_err(),
            "garbage must not silently parse"
        );
    }
}
