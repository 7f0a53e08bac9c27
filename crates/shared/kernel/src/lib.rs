//! Kernel utilities shared across feature crates.
//! Keep this crate lightweight: config loading, retry/backoff and ID generation.
//!
//! ## ID generation
//! Use `safe_nanoid!` for container names and other unambiguous IDs:
//! ```rust
//! # use pgpack_kernel::safe_nanoid;
//! let id = safe_nanoid!();
//! assert_eq!(id.len(), 12);
//! ```
pub mod config;
pub mod retry;

// Lowercase-only alphabet: Docker container names are case sensitive but humans
// retype them, and visually ambiguous characters (0/o, 1/l) are excluded.
pub const SAFE_ALPHABET: &[char; 32] = &[
    '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k',
    'm', 'n', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

pub use nanoid::nanoid;

/// Generates an unambiguous lowercase `NanoID`.
#[macro_export]
macro_rules! safe_nanoid {
    () => {
        $crate::nanoid!(12, $crate::SAFE_ALPHABET)
    };
    ($size:expr) => {
        $crate::nanoid!($size, $crate::SAFE_ALPHABET)
    };
}
