//! Physics module: canonical serialization and hashing.
//!
//! Everything the kernel's determinism invariants depend on lives here.
//! No I/O, no randomness, no wall-clock reads.
pub mod canonical;
pub mod hashing;
