use chrono::{DateTime, FixedOffset, NaiveDateTime};
use log::LevelFilter;

/// Timestamp layout Mantis uses for "last modified" cells and bugnote labels.
pub const TIME_FMT: &str = "%Y-%m-%d %H:%M";

/// Korea Standard Time, the tracker's wall clock. No DST.
pub const KST_OFFSET_HOURS: i32 = 9;

pub const KST: FixedOffset = match FixedOffset::east_opt(KST_OFFSET_HOURS * 3600) {
    Some(tz) => tz,
    None => panic!("KST offset out of range"),
};

/// Timed `pretty_env_logger` at `info` unless `RUST_LOG` says otherwise.
pub fn init_logger() {
    pretty_env_logger::formatted_timed_builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();
}

pub fn offset_hours(hours: i32) -> Option<FixedOffset> {
    FixedOffset::east_opt(hours.checked_mul(3600)?)
}

/// Parses a naive wall-clock string and pins it to `tz`.
pub fn parse_local(time_str: &str, fmt: &str, tz: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let naive = match NaiveDateTime::parse_from_str(time_str.trim(), fmt) {
        Ok(t) => t,
        Err(e) => {
            tracing::debug!(target: "time-converter", "{time_str:?} does not match {fmt:?}: {e}");
            return None;
        }
    };
    let date = naive.and_local_timezone(tz).single();
    tracing::debug!(target: "time-converter", "{time_str:?} -> {date:?}");

    date
}

/// RSS `pubDate` (RFC 2822).
pub fn parse_pub_date(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc2822(s.trim()).ok()
}
