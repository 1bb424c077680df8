use serde::{Deserialize, Serialize};

use super::HandlerError;

/// Kind of a subscription event as carried in `event.type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    Subscribed,
    Unsubscribed,
    SubscribedCompensate,
    UnsubscribedCompensate,
    /// Any kind this service does not know. Never matches a handler.
    #[serde(other)]
    Unknown,
}

impl EventKind {
    /// Kind of the event that undoes this one, if any
    pub fn compensation(self) -> Option<EventKind> {
        match self {
            EventKind::Subscribed => Some(EventKind::SubscribedCompensate),
            EventKind::Unsubscribed => Some(EventKind::UnsubscribedCompensate),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventHeader {
    #[serde(rename = "type")]
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventData {
    pub email: String,
}

/// `{"event": {"type": ...}, "data": {"email": ...}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionEvent {
    pub event: EventHeader,
    pub data: EventData,
}

impl SubscriptionEvent {
    pub fn new(kind: EventKind, email: &str) -> Self {
        Self {
            event: EventHeader { kind },
            data: EventData {
                email: email.to_owned(),
            },
        }
    }

    pub fn kind(&self) -> EventKind {
        self.event.kind
    }

    pub fn email(&self) -> &str {
        &self.data.email
    }

    pub fn decode(body: &[u8]) -> Result<Self, HandlerError> {
        serde_json::from_slice(body).map_err(HandlerError::Decode)
    }

    pub fn encode(&self) -> Result<Vec<u8>, HandlerError> {
        serde_json::to_vec(self).map_err(HandlerError::Encode)
    }

    /// The event that rolls this one back, for the same email
    pub fn compensation(&self) -> Option<SubscriptionEvent> {
        self.kind()
            .compensation()
            .map(|kind| SubscriptionEvent::new(kind, self.email()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_compensation_event() {
        let body = br#"{"event":{"type":"subscribed-compensate"},"data":{"email":"a@x.com"}}"#;
        let event = SubscriptionEvent::decode(body).unwrap();

        assert_eq!(event.kind(), EventKind::SubscribedCompensate);
        assert_eq!(event.email(), "a@x.com");
    }

    #[test]
    fn unknown_kind_decodes_as_unknown() {
        let body = br#"{"event":{"type":"other"},"data":{"email":"a@x.com"}}"#;
        assert_eq!(SubscriptionEvent::decode(body).unwrap().kind(), EventKind::Unknown);
    }

    #[test]
    fn missing_email_is_a_decode_error() {
        let body = br#"{"event":{"type":"subscribed"},"data":{}}"#;
        assert!(matches!(
            SubscriptionEvent::decode(body),
            Err(HandlerError::Decode(_))
        ));
    }

    #[test]
    fn encodes_wire_names() {
        let body = SubscriptionEvent::new(EventKind::UnsubscribedCompensate, "b@x.com")
            .encode()
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(value["event"]["type"], "unsubscribed-compensate");
        assert_eq!(value["data"]["email"], "b@x.com");
    }

    #[test]
    fn only_forward_events_have_compensations() {
        let event = SubscriptionEvent::new(EventKind::Subscribed, "a@x.com");
        assert_eq!(
            event.compensation(),
            Some(SubscriptionEvent::new(EventKind::SubscribedCompensate, "a@x.com"))
        );
        assert_eq!(EventKind::SubscribedCompensate.compensation(), None);
    }
}
