//! Session bookkeeping for connected RPC clients.

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub id: SessionId,
    pub subscribed_to_events: bool,
}

impl ClientInfo {
    #[must_use]
    pub fn new(id: SessionId) -> Self {
        Self { id, subscribed_to_events: false }
    }
}

/// A connected client's role: every connection starts `Pending` and is
/// promoted to `Subscriber` the first time it issues an
/// `events.subscribe` request; it can still issue ordinary RPC requests
/// either way.
#[derive(Debug, Clone)]
pub enum Session {
    Pending(ClientInfo),
    Subscriber(ClientInfo),
}

impl Session {
    #[must_use]
    pub fn id(&self) -> &SessionId {
        match self {
            Session::Pending(info) | Session::Subscriber(info) => &info.id,
        }
    }

    #[must_use]
    pub fn is_subscriber(&self) -> bool {
        matches!(self, Session::Subscriber(_))
    }

    pub fn promote_to_subscriber(&mut self) {
        if let Session::Pending(info) = self {
            info.subscribed_to_events = true;
            *self = Session::Subscriber(info.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn pending_session_promotes_to_subscriber() {
        let mut session = Session::Pending(ClientInfo::new(SessionId::new()));
        assert!(!session.is_subscriber());
        session.promote_to_subscriber();
        assert!(session.is_subscriber());
    }

    #[test]
    fn promoting_preserves_session_id() {
        let id = SessionId::new();
        let mut session = Session::Pending(ClientInfo::new(id.clone()));
        session.promote_to_subscriber();
        assert_eq!(session.id(), &id);
    }
}
