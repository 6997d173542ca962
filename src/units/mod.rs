//! Dimension encoding for the Newton language
//!
//! This module implements the prime-product dimension model:
//! - Base dimensions with unique prime identities
//! - Physics quantities as numerator/denominator dimension ratios
//! - The fixed prime table backing the encoding

pub mod dimension;
pub mod physics;
pub mod primes;

pub use dimension::{Dimension, DimensionId, DimensionRegistry};
pub use physics::{Physics, PhysicsId, PhysicsTable, ProductOverflow};
pub use primes::{PrimeAllocator, PRIME_TABLE};
