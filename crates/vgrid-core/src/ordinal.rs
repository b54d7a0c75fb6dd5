//! Worker-name encoding.
//!
//! Workers are addressed as `<pool>-<ordinal>`, where the ordinal is a
//! non-negative decimal with no leading zeros. Decoding tolerates arbitrary
//! suffixes: a name that does not parse yields a sentinel ordinal so the
//! caller can filter the placement out instead of failing.

/// Sentinel returned when a worker name carries no parseable ordinal.
pub const INVALID_ORDINAL: i32 = i32::MAX;

/// Build the worker name for `ordinal` within `pool`.
pub fn worker_name(pool: &str, ordinal: i32) -> String {
    format!("{pool}-{ordinal}")
}

/// Extract the ordinal from a worker name.
///
/// Everything after the final `-` is parsed as a decimal ordinal. Returns
/// [`INVALID_ORDINAL`] when there is no `-` or the suffix does not parse.
pub fn ordinal_from_worker_name(worker_name: &str) -> i32 {
    match worker_name.rsplit_once('-') {
        Some((_, suffix)) => suffix.parse().unwrap_or(INVALID_ORDINAL),
        None => INVALID_ORDINAL,
    }
}

/// Extract the pool name from a worker name, i.e. everything before the
/// final `-`. A name without a `-` is returned unchanged.
pub fn pool_name(worker_name: &str) -> &str {
    match worker_name.rsplit_once('-') {
        Some((pool, _)) => pool,
        None => worker_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_name_round_trip() {
        assert_eq!(worker_name("pool", 0), "pool-0");
        assert_eq!(worker_name("pool", 12), "pool-12");
        assert_eq!(ordinal_from_worker_name("pool-0"), 0);
        assert_eq!(ordinal_from_worker_name("pool-12"), 12);
    }

    #[test]
    fn ordinal_survives_dashes_in_pool_name() {
        assert_eq!(ordinal_from_worker_name("my-pool-name-7"), 7);
        assert_eq!(pool_name("my-pool-name-7"), "my-pool-name");
    }

    #[test]
    fn unparseable_names_yield_sentinel() {
        assert_eq!(ordinal_from_worker_name("pool"), INVALID_ORDINAL);
        assert_eq!(ordinal_from_worker_name("pool-"), INVALID_ORDINAL);
        assert_eq!(ordinal_from_worker_name("pool-abc"), INVALID_ORDINAL);
        assert_eq!(ordinal_from_worker_name(""), INVALID_ORDINAL);
    }

    #[test]
    fn pool_name_keeps_single_digit_ordinals_intact() {
        // Strips exactly at the final dash, nothing more.
        assert_eq!(pool_name("pool-0"), "pool");
        assert_eq!(pool_name("p-1"), "p");
        assert_eq!(pool_name("plain"), "plain");
    }
}
