/// Wall-clock helpers.
///
/// All timestamps in the crate are Unix milliseconds (`i64`), matching the
/// `updated_at` conflict tie-break used during restore.

/// Returns the current Unix timestamp in milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_millis_is_reasonable() {
        let ts = now_millis();
        // Should be after 2024-01-01 in millis
        assert!(ts > 1_704_067_200_000, "Timestamp {} is too old", ts);
        // Should be before 2100-01-01 in millis
        assert!(ts < 4_102_444_800_000, "Timestamp {} is too far in future", ts);
    }
}
