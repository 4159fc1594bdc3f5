use serde::Serialize;

/// Countdown notification pushed toward the presentation layer.
/// Subscribers receive events for every session and filter by id; a
/// subscription ends when the receiver is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct SessionEvent {
    pub(crate) session_id: String,
    #[serde(flatten)]
    pub(crate) kind: SessionEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub(crate) enum SessionEventKind {
    Tick { seconds_left: u64 },
    Expired,
}

impl SessionEvent {
    pub(crate) fn tick(session_id: &str, seconds_left: u64) -> Self {
        Self {
            session_id: session_id.to_string(),
            kind: SessionEventKind::Tick { seconds_left },
        }
    }

    pub(crate) fn expired(session_id: &str) -> Self {
        Self { session_id: session_id.to_string(), kind: SessionEventKind::Expired }
    }
}
