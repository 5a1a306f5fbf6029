//! Parsing of ffmpeg `-progress` output.
//!
//! With `-progress pipe:1` ffmpeg writes blocks of `key=value` lines to
//! stdout. The encoded position appears as `out_time=HH:MM:SS.micro` and as
//! `out_time_us` / `out_time_ms`, both in microseconds. Before the first
//! frame the values are `N/A`.

/// Encoded position in seconds from one progress line.
pub fn parse_out_time(line: &str) -> Option<f64> {
    let (key, value) = line.trim().split_once('=')?;
    let value = value.trim();
    match key.trim() {
        "out_time" => parse_timestamp(value),
        "out_time_us" | "out_time_ms" => value
            .parse::<i64>()
            .ok()
            .filter(|us| *us >= 0)
            .map(|us| us as f64 / 1_000_000.0),
        _ => None,
    }
}

/// Parse `[-]HH:MM:SS[.fraction]`. Negative times are rejected.
fn parse_timestamp(value: &str) -> Option<f64> {
    if value.starts_with('-') {
        return None;
    }
    let mut parts = value.split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || !seconds.is_finite() {
        return None;
    }
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Keeps reported progress monotonic.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    last: Option<f64>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the new position when `line` advances it.
    pub fn update(&mut self, line: &str) -> Option<f64> {
        let value = parse_out_time(line)?;
        match self.last {
            Some(last) if value <= last => None,
            _ => {
                self.last = Some(value);
                Some(value)
            }
        }
    }

    pub fn last(&self) -> Option<f64> {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_out_time_forms() {
        assert_eq!(parse_out_time("out_time=00:01:02.500000"), Some(62.5));
        assert_eq!(parse_out_time("out_time_us=1500000"), Some(1.5));
        assert_eq!(parse_out_time("out_time_ms=2000000"), Some(2.0));
        assert_eq!(parse_out_time("out_time=N/A"), None);
        assert_eq!(parse_out_time("out_time_us=N/A"), None);
        assert_eq!(parse_out_time("out_time=-00:00:00.023"), None);
        assert_eq!(parse_out_time("frame=120"), None);
        assert_eq!(parse_out_time("progress=end"), None);
    }

    #[test]
    fn tracker_only_moves_forward() {
        let mut tracker = ProgressTracker::new();
        assert_eq!(tracker.update("out_time_us=N/A"), None);
        assert_eq!(tracker.update("out_time=00:00:01.000000"), Some(1.0));
        assert_eq!(tracker.update("out_time_us=1000000"), None);
        assert_eq!(tracker.update("out_time_us=500000"), None);
        assert_eq!(tracker.update("out_time=00:00:03.000000"), Some(3.0));
        assert_eq!(tracker.last(), Some(3.0));
    }
}
