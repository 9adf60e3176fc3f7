//! synthfs: a transactional filesystem batch executor.
//!
//! Assembles a batch of filesystem mutations (create/copy/move/delete,
//! archive/unarchive), resolves their dependencies into a deterministic
//! execution order, and runs them with optional restorable rollback.

pub mod archive;
pub mod backup;
pub mod batch;
pub mod checksum;
pub mod config;
pub mod error;
pub mod executor;
pub mod factory;
pub mod fs_backend;
pub mod item;
pub mod logging;
pub mod operation;
pub mod pipeline;
pub mod prereq;
pub mod state;

pub use batch::{default_factory, Batch};
pub use error::{Error, Result};
pub use item::{ArchiveFormat, FsItem};
