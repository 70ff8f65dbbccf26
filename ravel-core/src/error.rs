//! Error types for ravel.
//!
//! This module provides strongly-typed errors with actionable context.
//! Every variant carries the identifiers needed to tell *which* module,
//! channel, or memory region was involved.
//!
//! The taxonomy keeps three failure classes apart:
//!
//! - a module that ran and *reported* failure is not an error at all
//!   (see [`crate::outcome::Outcome::Failure`]);
//! - a module whose entry point *trapped* is [`RavelError::ModuleTrap`];
//! - a channel whose worker never answered is a transport error.

use crate::types::Selector;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for ravel operations.
#[derive(Error, Debug)]
pub enum RavelError {
    // =========================================================================
    // Module Errors (E001-E099)
    // =========================================================================
    /// Failed to load or compile a solver module.
    #[error("E001: Failed to load solver module '{module}': {cause}")]
    ModuleLoad {
        /// The module that failed to load.
        module: String,
        /// Reason for the load failure.
        cause: String,
    },

    /// A required export is missing or has the wrong signature.
    #[error("E002: Solver module missing export '{export}': {cause}")]
    MissingExport {
        /// The export name that was expected.
        export: String,
        /// Reason the export could not be used.
        cause: String,
    },

    /// The module's entry point faulted during execution.
    ///
    /// Distinct from a module-reported failure: the computation never
    /// produced a message, the module itself aborted.
    #[error("E003: Solver trapped on {selector}: {cause}")]
    ModuleTrap {
        /// The selector that was being executed.
        selector: Selector,
        /// The trap reason as reported by the runtime.
        cause: String,
    },

    // =========================================================================
    // Linear-Memory Errors (E101-E199)
    // =========================================================================
    /// Allocation inside the module's linear memory failed.
    ///
    /// Fatal to the current invocation; there is no out-of-memory
    /// recovery path. The channel stays usable for the next invocation.
    #[error("E101: Module memory allocation failed: requested {requested} bytes")]
    MemoryAlloc {
        /// Number of bytes requested.
        requested: u64,
    },

    /// A read or write fell outside the module's linear memory.
    #[error("E102: Out-of-bounds module memory access: offset={offset}, len={len}")]
    MemoryAccess {
        /// Offset of the attempted access.
        offset: u32,
        /// Length of the attempted access.
        len: u32,
    },

    /// A result buffer did not contain valid UTF-8.
    #[error("E103: Result buffer is not valid UTF-8: {cause}")]
    InvalidUtf8 {
        /// The decode error.
        cause: String,
    },

    /// Releasing a region back to the module's allocator faulted.
    #[error("E104: Failed to release module memory at offset={offset}, len={len}: {cause}")]
    MemoryRelease {
        /// Offset of the region being released.
        offset: u32,
        /// Length of the region being released.
        len: u32,
        /// The fault reported by the runtime.
        cause: String,
    },

    // =========================================================================
    // Channel/Dispatch Errors (E201-E299)
    // =========================================================================
    /// The channel's worker is gone: the job queue is closed or a reply
    /// was dropped before being sent.
    #[error("E201: Channel '{channel}' worker is gone; invocation cannot settle")]
    ChannelClosed {
        /// The channel whose worker disappeared.
        channel: String,
    },

    /// A dual dispatch was requested while one is already in flight.
    #[error("E202: Coordinator busy: a dispatch is already in flight")]
    CoordinatorBusy,

    // =========================================================================
    // I/O Errors (E901-E999)
    // =========================================================================
    /// File I/O error.
    #[error("E901: I/O error at {path}: {cause}")]
    Io {
        /// The path where the I/O error occurred.
        path: PathBuf,
        /// Description of the I/O error.
        cause: String,
    },
}

impl RavelError {
    /// Get the error code (e.g., "E001").
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::ModuleLoad { .. } => "E001",
            Self::MissingExport { .. } => "E002",
            Self::ModuleTrap { .. } => "E003",
            Self::MemoryAlloc { .. } => "E101",
            Self::MemoryAccess { .. } => "E102",
            Self::InvalidUtf8 { .. } => "E103",
            Self::MemoryRelease { .. } => "E104",
            Self::ChannelClosed { .. } => "E201",
            Self::CoordinatorBusy => "E202",
            Self::Io { .. } => "E901",
        }
    }

    /// Check if this error is a module trap (the entry point faulted).
    #[must_use]
    pub fn is_trap(&self) -> bool {
        matches!(self, Self::ModuleTrap { .. })
    }

    /// Check if this error is a transport failure (the worker never
    /// answered), as opposed to a fault inside the module.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::ChannelClosed { .. })
    }

    /// Check if this error is fatal to a single invocation but leaves
    /// the channel usable for the next one.
    #[must_use]
    pub fn is_invocation_fatal(&self) -> bool {
        matches!(
            self,
            Self::ModuleTrap { .. } | Self::MemoryAlloc { .. } | Self::MemoryAccess { .. }
        )
    }
}

/// Result type alias using `RavelError`.
pub type Result<T> = std::result::Result<T, RavelError>;
