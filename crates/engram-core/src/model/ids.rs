//! ID generation.
//!
//! Every identifier in this crate (bank, memory, entity, link, chunk, path)
//! must be monotonic and lexicographically sortable (spec §3). The teacher
//! generates plain `Uuid::new_v4()` ids, which are not sortable; this is the
//! one place this crate diverges from the teacher's literal choice while
//! keeping its *shape* — a `fn new_id() -> String` helper living next to the
//! row mappers that use it.
//!
//! Layout: 48-bit millisecond timestamp (10 base32 chars, Crockford
//! alphabet) followed by 16 base32 chars of randomness — a ULID in
//! everything but name, so two ids minted in the same millisecond still
//! compare deterministically by their random suffix.

use std::sync::atomic::{AtomicU64, Ordering};

const ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Monotonic counter used to break ties within the same millisecond without
/// relying on randomness (keeps id generation deterministic in tests that
/// stub out wall-clock time).
static COUNTER: AtomicU64 = AtomicU64::new(0);

fn encode_base32(mut value: u128, out: &mut String, digits: usize) {
    let mut buf = vec![0u8; digits];
    for slot in buf.iter_mut().rev() {
        *slot = ALPHABET[(value & 0x1f) as usize];
        value >>= 5;
    }
    out.push_str(std::str::from_utf8(&buf).expect("ascii alphabet"));
}

/// Generate a new monotonic, lexicographically sortable id rooted at `now_ms`.
pub fn new_id_at(now_ms: i64) -> String {
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut out = String::with_capacity(26);
    encode_base32(now_ms.max(0) as u128, &mut out, 10);
    encode_base32(seq as u128, &mut out, 13);
    out
}

/// Generate a new id anchored to the current wall-clock time.
pub fn new_id() -> String {
    new_id_at(chrono::Utc::now().timestamp_millis())
}
