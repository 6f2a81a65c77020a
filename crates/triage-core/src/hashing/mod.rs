use blake3::Hasher;

/// Hex digest of the UTF-8 bytes of `text`.
///
/// Used as the embedding-cache key. The same text always produces the same
/// key, so truncation must happen before hashing.
#[inline]
pub fn hash_text(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

/// Computes a 64-bit hash of the input data using BLAKE3, truncated from 256 bits.
///
/// 64 bits is plenty for cache keys: the birthday bound sits at ~4.3 billion
/// entries and a rare collision costs a stale decision-cache hit, not data
/// corruption. This hash is never used for cryptographic verification.
#[inline]
pub fn hash_to_u64(data: &[u8]) -> u64 {
    let hash = blake3::hash(data);
    let bytes: [u8; 8] = hash.as_bytes()[0..8]
        .try_into()
        .expect("BLAKE3 always produces at least 8 bytes");
    u64::from_le_bytes(bytes)
}

/// Key for the routing-decision cache: `question` plus the optional entity
/// type, separated so `("ab", "c")` and `("a", "bc")` never collide.
#[inline]
pub fn hash_decision_key(question: &str, entity_type: Option<&str>) -> u64 {
    let mut hasher = Hasher::new();
    hasher.update(question.as_bytes());
    hasher.update(b"|");
    hasher.update(entity_type.unwrap_or("").as_bytes());

    let hash = hasher.finalize();
    let bytes: [u8; 8] = hash.as_bytes()[0..8]
        .try_into()
        .expect("BLAKE3 always produces at least 8 bytes");
    u64::from_le_bytes(bytes)
}
