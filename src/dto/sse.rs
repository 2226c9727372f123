use serde::Serialize;

use crate::dto::notice::SessionNotice;

#[derive(Clone, Debug, PartialEq, Eq)]
/// Labelled JSON frame handed to text transports (SSE, stdout, bridges).
pub struct ServerEvent {
    /// Event label, see [`SessionNotice::event_name`].
    pub event: Option<String>,
    /// JSON payload.
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

impl TryFrom<&SessionNotice> for ServerEvent {
    type Error = serde_json::Error;

    fn try_from(notice: &SessionNotice) -> Result<Self, Self::Error> {
        Self::json(notice.event_name().to_owned(), notice)
    }
}
