use blake3::Hasher;

/// Lowercases, strips punctuation and collapses whitespace.
///
/// Two claims that differ only in casing or punctuation normalize to the same string, which is
/// what duplicate detection wants from spoken transcripts.
pub fn normalize_claim_text(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Computes a 64-bit hash of the input data using BLAKE3, truncated from 256 bits.
///
/// Collisions are tolerable for duplicate flagging: a false positive only marks a claim as a
/// duplicate, it is still verified.
#[inline]
pub fn hash_to_u64(data: &[u8]) -> u64 {
    let hash = blake3::hash(data);
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[0..8]);
    u64::from_le_bytes(bytes)
}

/// Hex fingerprint of a claim's normalized text.
#[inline]
pub fn claim_fingerprint(text: &str) -> String {
    format!("{:016x}", hash_to_u64(normalize_claim_text(text).as_bytes()))
}

/// Derives a stable video identifier from raw audio bytes.
pub fn audio_video_id(audio: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(b"audio|");
    hasher.update(audio);
    let hex = hasher.finalize().to_hex();
    format!("vid-{}", &hex.as_str()[..16])
}
