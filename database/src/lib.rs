//! File-backed persistence for the orchestrator.
//!
//! Implements [`orchestrator_core::persistence::PersistenceStore`] over the
//! local filesystem: one JSON envelope file per key, written atomically via
//! a temp-file-then-rename. No database engine, no connection pool — every
//! component that needs durable state gets one [`FileStore`] rooted at its
//! own directory (`<data_dir>/state/` for general orchestrator state,
//! `<data_dir>/workflows/` for checkpoints).
//!
//! # Usage
//!
//! ```no_run
//! use orchestrator_database::FileStore;
//!
//! # async fn run() -> std::io::Result<()> {
//! let store = FileStore::new("/var/lib/orchestrator/state").await?;
//! # Ok(())
//! # }
//! ```

mod file_store;

pub use file_store::FileStore;
