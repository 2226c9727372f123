use time::{OffsetDateTime, format_description::well_known::Rfc3339};

pub mod notice;
pub mod phase;
pub mod sse;
pub mod view;

fn format_timestamp(time: OffsetDateTime) -> String {
    time.format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
