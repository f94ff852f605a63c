//! Human-readable lockout durations.

use super::clock::Clock;

const MINUTE_MS: i64 = 60_000;

/// Render the time left until `expiry_ms` for display to the user.
///
/// Remaining time is rounded up to the next whole minute, so a block that is
/// about to lift never reads as zero minutes.
pub fn format_block_time(expiry_ms: i64, now_ms: i64) -> String {
    let remaining = expiry_ms.saturating_sub(now_ms).max(0);
    let minutes = remaining / MINUTE_MS + i64::from(remaining % MINUTE_MS != 0);

    if minutes < 60 {
        return match minutes {
            1 => "1 minuto".to_string(),
            n => format!("{} minutos", n),
        };
    }

    let hours = minutes / 60;
    let rest = minutes % 60;
    match (hours, rest) {
        (1, 0) => "1 hora".to_string(),
        (h, 0) => format!("{} horas", h),
        (h, m) => format!("{}h {}min", h, m),
    }
}

/// Render the time left until `expiry_ms` as seen by `clock`.
pub fn format_block_time_with(clock: &dyn Clock, expiry_ms: i64) -> String {
    format_block_time(expiry_ms, clock.now_millis())
}

/// The notice shown to a caller who is locked out.
pub fn blocked_message(expiry_ms: i64, now_ms: i64) -> String {
    format!(
        "Muitas tentativas. Tente novamente em {}.",
        format_block_time(expiry_ms, now_ms)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::ManualClock;

    const NOW: i64 = 1_700_000_000_000;

    #[test]
    fn test_minutes_round_up() {
        assert_eq!(format_block_time(NOW + 90_000, NOW), "2 minutos");
        assert_eq!(format_block_time(NOW + 1, NOW), "1 minuto");
        assert_eq!(format_block_time(NOW + MINUTE_MS, NOW), "1 minuto");
        assert_eq!(format_block_time(NOW + MINUTE_MS + 1, NOW), "2 minutos");
        assert_eq!(format_block_time(NOW + 59 * MINUTE_MS, NOW), "59 minutos");
    }

    #[test]
    fn test_whole_hours() {
        assert_eq!(format_block_time(NOW + 3_600_000, NOW), "1 hora");
        assert_eq!(format_block_time(NOW + 2 * 3_600_000, NOW), "2 horas");
    }

    #[test]
    fn test_hours_and_minutes() {
        assert_eq!(format_block_time(NOW + 5_400_000, NOW), "1h 30min");
        // 59m59s rounds up to a full hour
        assert_eq!(format_block_time(NOW + 3_599_000, NOW), "1 hora");
        assert_eq!(format_block_time(NOW + 3_600_001, NOW), "1h 1min");
    }

    #[test]
    fn test_far_future_expiry() {
        let minutes = i64::MAX / MINUTE_MS + 1;
        let expected = format!("{}h {}min", minutes / 60, minutes % 60);
        assert_eq!(format_block_time(i64::MAX, 0), expected);
        assert!(format_block_time(i64::MAX, i64::MIN).ends_with("min"));
    }

    #[test]
    fn test_past_expiry() {
        assert_eq!(format_block_time(NOW - 5_000, NOW), "0 minutos");
    }

    #[test]
    fn test_with_clock() {
        let clock = ManualClock::new(NOW);
        assert_eq!(format_block_time_with(&clock, NOW + 20 * MINUTE_MS), "20 minutos");

        clock.advance(19 * MINUTE_MS + 30_000);
        assert_eq!(format_block_time_with(&clock, NOW + 20 * MINUTE_MS), "1 minuto");
    }

    #[test]
    fn test_blocked_message() {
        assert_eq!(
            blocked_message(NOW + 30 * MINUTE_MS, NOW),
            "Muitas tentativas. Tente novamente em 30 minutos."
        );
    }
}
