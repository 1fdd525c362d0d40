//! Small utilities shared across crates.

/// Current UTC timestamp in milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Current UTC timestamp in whole seconds (share-token math uses seconds).
pub fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Time-ordered i64 id for bookings, quotes, invoices and payments.
///
/// 53 bits total, so ids survive a round trip through JSON consumers
/// that read numbers as doubles. High 41 bits are milliseconds since the
/// 2024-01-01 epoch; low 12 bits are random, which is plenty of headroom
/// for the handful of documents a back office creates per millisecond.
pub fn snowflake_id() -> i64 {
    use rand::Rng;
    // Epoch: 2024-01-01 00:00:00 UTC
    const EPOCH_MS: i64 = 1_704_067_200_000;
    let now = now_millis();
    let ts = (now - EPOCH_MS) & 0x1FF_FFFF_FFFF;
    let rand_bits: i64 = rand::thread_rng().gen_range(0..0x1000);
    (ts << 12) | rand_bits
}

/// Base-36 alphabet used for booking reference suffixes.
pub const BASE36_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Random base-36 string of the given length (uppercase).
pub fn random_base36(len: usize) -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| BASE36_ALPHABET[rng.gen_range(0..BASE36_ALPHABET.len())] as char)
        .collect()
}
