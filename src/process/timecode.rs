use std::time::Duration;

/// Snapshot offset for a video of `duration` seconds.
///
/// `None` (probe missing or failed) and anything up to five seconds map to the first frame.
pub fn snapshot_timecode(duration: Option<f64>) -> &'static str {
    let Some(secs) = duration.filter(|d| d.is_finite()) else {
        return "00:00";
    };
    const MIN: f64 = 60.0;
    match secs {
        s if s >= 60.0 * MIN => "10:00",
        s if s >= 30.0 * MIN => "05:00",
        s if s >= 15.0 * MIN => "03:00",
        s if s >= 5.0 * MIN => "02:00",
        s if s > MIN => "00:30",
        s if s > 30.0 => "00:10",
        s if s > 5.0 => "00:02",
        _ => "00:00",
    }
}

/// `MM:SS` below one hour, `HH:MM:SS` from there on.
pub fn format_timecode(d: Duration) -> String {
    let secs = d.as_secs();
    let (h, m, s) = (secs / 3600, secs / 60 % 60, secs % 60);
    if h > 0 {
        format!("{h:02}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}
