//! Ravel Host - Solver module execution engine.
//!
//! This crate drives an opaque puzzle-solver WebAssembly module from
//! native code:
//!
//! - **SolverRuntime**: Wasmtime engine, module compilation and cache
//! - **SolverInstance**: one instantiated module and the marshaling
//!   protocol over its private linear memory
//! - **Channel**: one instance on a dedicated worker thread, driven
//!   through a serialized job queue
//! - **Coordinator**: fans one logical request out to two channels and
//!   joins their settlements
//!
//! # Solver Module ABI Contract
//!
//! Solver modules must export:
//!
//! ```text
//! memory: Memory
//! alloc(size: u32) -> u32            // Allocate buffer, return address
//! dealloc(ptr: u32, size: u32)       // Return buffer to the free pool
//! solve(selector: u32, descriptor: u32) -> i32  // Entry point
//! ```
//!
//! `solve` receives the address of an 8-byte descriptor: two
//! little-endian u32 fields, the input buffer's address and byte
//! count. It overwrites both fields with the result buffer before
//! returning. A non-zero return means the message is a result; zero
//! means it is a failure reason. Either way the message is UTF-8.
//!
//! # Buffer ownership
//!
//! | Buffer     | Allocated by | Released by |
//! |:-----------|:-------------|:------------|
//! | descriptor | host         | host        |
//! | input      | host         | module (takes ownership at `solve`) |
//! | result     | module       | host (after decoding)               |
//!
//! # Example
//!
//! ```ignore
//! use ravel_host::prelude::*;
//! use std::sync::Arc;
//!
//! let runtime = Arc::new(SolverRuntime::with_defaults()?);
//! let wasm_bytes = std::fs::read("solver.wasm")?;
//! let coordinator = Coordinator::for_module(runtime, wasm_bytes)?;
//!
//! let pair = coordinator
//!     .solve_pair(PuzzleIndex::new(5), &input, &NullSink)
//!     .await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod channel;
pub mod coordinator;
pub mod instance;
pub mod memory;
pub mod observability;
pub mod runtime;

#[cfg(test)]
pub(crate) mod testing;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::channel::{Channel, ChannelConfig};
    pub use crate::coordinator::{Coordinator, NullSink, PairOutcome, Sink};
    pub use crate::instance::SolverInstance;
    pub use crate::memory::{Descriptor, MemoryBridge, WasmPtr};
    pub use crate::observability::{init_tracing, LogFormat, TracingConfig};
    pub use crate::runtime::{CompiledModule, RuntimeConfig, SolverRuntime};
    pub use ravel_core::{Arm, Outcome, PuzzleIndex, RavelError, Result, Selector};
}
