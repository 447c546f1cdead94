//! Identifier space and arc arithmetic (component A).
//!
//! The ring is `[0, ring_size)`. Hashing reduces a SHA-1 digest down into
//! that space; `between` is the half-open `(a, b]` predicate every routing
//! and ownership decision in this crate is built on.

use std::fmt;

use sha1::{Digest, Sha1};

/// `m`/`ring_size` as loaded once at process start.
///
/// Cheap to copy; threaded through every node and bucket-store operation
/// rather than stored as a global, so tests can build multiple rings with
/// different parameters in the same process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingParams {
    /// Number of fingers per node; also bounds `find_successor` recursion.
    pub m: u32,
    /// Size of the identifier space. Need not be `2^m`, though it usually is.
    pub ring_size: u64,
}

impl RingParams {
    pub const fn new(m: u32, ring_size: u64) -> Self {
        Self { m, ring_size }
    }
}

impl Default for RingParams {
    /// `m = 3`, `ring_size = 8`: a small ring, convenient for walking join
    /// and stabilization by hand.
    fn default() -> Self {
        Self::new(3, 8)
    }
}

/// Compact identifier for a node or bucket on the ring.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Id(pub u64);

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hashes `s` into `[0, ring_size)`.
///
/// Takes a SHA-1 digest of `s`, interprets the leading 8 bytes as a
/// big-endian `u64`, and reduces modulo `ring_size`. Collisions are possible
/// when `ring_size` is small; callers that must detect a collision (join)
/// do so by comparing the resulting `Id`, not by inspecting this function.
pub fn hash(s: &str, params: &RingParams) -> Id {
    let digest = Sha1::digest(s.as_bytes());
    let mut leading = [0u8; 8];
    leading.copy_from_slice(&digest[..8]);
    Id(u64::from_be_bytes(leading) % params.ring_size)
}

/// The half-open arc predicate `(a, b]` on the circle.
///
/// - If `a < b`: true iff `a < x <= b`.
/// - If `a >= b` (the arc wraps past zero): true iff `x > a OR x <= b`.
pub fn between(x: Id, a: Id, b: Id) -> bool {
    if a < b {
        x > a && x <= b
    } else {
        x > a || x <= b
    }
}

/// `(id + 2^(finger_index)) mod ring_size`, the ideal target for finger
/// `finger_index` (zero-based; finger 0 chases `id + 2^0`).
pub fn finger_target(id: Id, finger_index: u32, params: &RingParams) -> Id {
    let offset = 1u64.wrapping_shl(finger_index);
    Id((id.0.wrapping_add(offset)) % params.ring_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn between_non_wrapping() {
        assert!(between(Id(4), Id(2), Id(6)));
        assert!(between(Id(6), Id(2), Id(6)));
        assert!(!between(Id(2), Id(2), Id(6)));
        assert!(!between(Id(7), Id(2), Id(6)));
    }

    #[test]
    fn between_wrapping() {
        // arc (6, 2] on an 8-ring wraps through 0.
        assert!(between(Id(7), Id(6), Id(2)));
        assert!(between(Id(0), Id(6), Id(2)));
        assert!(between(Id(1), Id(6), Id(2)));
        assert!(between(Id(2), Id(6), Id(2)));
        assert!(!between(Id(6), Id(6), Id(2)));
        assert!(!between(Id(3), Id(6), Id(2)));
    }

    #[test]
    fn hash_is_deterministic_and_in_range() {
        let params = RingParams::default();
        let a = hash("node6", &params);
        let b = hash("node6", &params);
        assert_eq!(a, b);
        assert!(a.0 < params.ring_size);
    }

    #[test]
    fn hash_distinct_strings_usually_differ() {
        let params = RingParams::new(3, 8);
        let n0 = hash("node6", &params);
        let n1 = hash("node7", &params);
        let n2 = hash("node2", &params);
        assert_ne!(n0, n1);
        assert_ne!(n1, n2);
    }

    #[test]
    fn finger_target_wraps() {
        let params = RingParams::new(3, 8);
        assert_eq!(finger_target(Id(6), 0, &params), Id(7));
        assert_eq!(finger_target(Id(6), 1, &params), Id(0));
        assert_eq!(finger_target(Id(6), 2, &params), Id(2));
    }
}
