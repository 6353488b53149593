use chrono::{DateTime, SecondsFormat, Utc};

/// Renders `now` as an RFC 3339 timestamp with millisecond precision, with the
/// characters that are awkward in object paths (`:` and `.`) replaced by `-`.
pub fn backup_path_segment(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-")
}
