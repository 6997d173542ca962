//! Fixed prime table backing the dimension encoding
//!
//! Each base dimension is identified by a distinct prime, so the product of
//! primes over a dimension list uniquely determines the multiset of base
//! dimensions (unique factorization). The table is fixed at the first 168
//! primes, which bounds the number of base dimensions a single session can
//! declare.

/// All primes below 1000, in ascending order.
pub const PRIME_TABLE: [u64; 168] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37,
    41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89,
    97, 101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151,
    157, 163, 167, 173, 179, 181, 191, 193, 197, 199, 211, 223,
    227, 229, 233, 239, 241, 251, 257, 263, 269, 271, 277, 281,
    283, 293, 307, 311, 313, 317, 331, 337, 347, 349, 353, 359,
    367, 373, 379, 383, 389, 397, 401, 409, 419, 421, 431, 433,
    439, 443, 449, 457, 461, 463, 467, 479, 487, 491, 499, 503,
    509, 521, 523, 541, 547, 557, 563, 569, 571, 577, 587, 593,
    599, 601, 607, 613, 617, 619, 631, 641, 643, 647, 653, 659,
    661, 673, 677, 683, 691, 701, 709, 719, 727, 733, 739, 743,
    751, 757, 761, 769, 773, 787, 797, 809, 811, 821, 823, 827,
    829, 839, 853, 857, 859, 863, 877, 881, 883, 887, 907, 911,
    919, 929, 937, 941, 947, 953, 967, 971, 977, 983, 991, 997,
];

/// Hands out primes in ascending order, one per base dimension.
///
/// Allocated primes are never reused while the owning registry is alive.
/// The allocator is owned by the session's `DimensionRegistry`, not stored
/// in any process-wide static.
#[derive(Debug, Default)]
pub struct PrimeAllocator {
    next: usize,
}

impl PrimeAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next unused prime, or `None` once the table is exhausted.
    pub fn allocate(&mut self) -> Option<u64> {
        let prime = PRIME_TABLE.get(self.next).copied()?;
        self.next += 1;
        Some(prime)
    }

    /// Number of primes handed out so far.
    pub fn allocated(&self) -> usize {
        self.next
    }

    /// Total table capacity.
    pub const fn capacity() -> usize {
        PRIME_TABLE.len()
    }
}
