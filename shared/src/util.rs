/// Current UTC timestamp in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a short uppercase alphanumeric suffix.
///
/// Used for transaction ids (`CRD-12345678-A1B2`); 4 characters give
/// 36^4 values per millisecond bucket, collision-free at store scale.
pub fn rand_suffix(len: usize) -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}
