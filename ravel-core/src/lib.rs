//! Ravel Core Library
//!
//! Foundational types for the ravel solver host: the error taxonomy,
//! the three-way invocation outcome, and request-identity newtypes.
//!
//! # Overview
//!
//! Ravel drives an opaque puzzle-solver WebAssembly module from native
//! code. A request is identified by a [`Selector`] (which computation
//! the module should run) plus raw input text; the module answers with
//! a message that is either a result or a human-readable failure. This
//! crate defines how those answers are represented on the host side:
//!
//! - [`Outcome`]: `Success` / `Failure` / `Fault`, keeping a module
//!   *trap* distinct from a module-*reported* failure
//! - [`RavelError`]: strongly-typed host errors with stable codes
//! - [`PuzzleIndex`]: one logical puzzle, fanned out to two selectors

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod outcome;
pub mod types;

// Re-export key types at crate root for convenience
pub use error::{RavelError, Result};
pub use outcome::Outcome;
pub use types::{Arm, PuzzleIndex, Selector};
