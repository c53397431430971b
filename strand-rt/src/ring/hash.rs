//! 32-bit placement hashing.
//!
//! Ring positions are unsigned 32-bit CRC32 values. `crc32fast` picks the
//! hardware-accelerated implementation where the CPU supports it and falls
//! back to a table-driven one otherwise, so placement is identical across
//! hosts.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use crc32fast::Hasher;

// Layer 3: Internal module imports
// (none)

/// Separator byte between composite key components.
///
/// Keeps `("ab", "c")` and `("a", "bc")` at distinct ring positions without
/// allocating a joined string.
const KEY_SEPARATOR: u8 = 0x1f;

/// Hash an actor key to its ring position.
///
/// Streams `actor_type`, the separator, and `actor_id` through one hasher.
///
/// # Example
/// ```rust
/// use strand_rt::ring::actor_placement_hash;
///
/// let h1 = actor_placement_hash("Counter", "c1");
/// let h2 = actor_placement_hash("Counter", "c1");
/// assert_eq!(h1, h2); // deterministic
/// ```
pub fn actor_placement_hash(actor_type: &str, actor_id: &str) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(actor_type.as_bytes());
    hasher.update(&[KEY_SEPARATOR]);
    hasher.update(actor_id.as_bytes());
    hasher.finalize()
}

/// Hash the `index`-th virtual node of a silo to its ring position.
///
/// The index is fed as little-endian bytes, again avoiding string joins.
pub fn virtual_node_hash(silo_id: &str, index: u32) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(silo_id.as_bytes());
    hasher.update(&[KEY_SEPARATOR]);
    hasher.update(&index.to_le_bytes());
    hasher.finalize()
}
