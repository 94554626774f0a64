// Shared ring arithmetic and wire messages.
pub mod messages;

use sha1::{Digest, Sha1};

/// Position on the ring, always reduced into `[0, 2^bits)`.
pub type Id = u64;

/// Mask selecting the low `bits` bits of an identifier.
pub fn id_mask(bits: u8) -> Id {
    ((1u128 << bits) - 1) as Id
}

/// Hash arbitrary bytes onto the ring: SHA-1 truncated to 64 bits and
/// reduced modulo the ring size.
pub fn hash(data: &[u8], bits: u8) -> Id {
    let digest = Sha1::digest(data);
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    Id::from_be_bytes(prefix) & id_mask(bits)
}

// Checks whether walking clockwise from `a` (exclusive) to `b` (inclusive)
// passes through `x`. When `a == b` the arc is the whole ring, so every `x`
// is inside it; the sole ring member owns everything.
pub fn in_arc(a: Id, b: Id, x: Id) -> bool {
    if a == b {
        return true;
    }
    if a < b {
        a < x && x <= b
    } else {
        // Arc wraps past zero (b < a numerically).
        x > a || x <= b
    }
}
