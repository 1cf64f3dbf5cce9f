//! Synchronization with the external ledger.
//!
//! - **Ledger**: read-only access to the desktop application's database
//! - **Import**: ledger project labels → local `projects` rows
//! - **File**: atomic whole-file replacement used when persisting the store
//!
//! The ledger is never written. The local store is only ever written as a
//! whole through [`file::atomic_replace`].

pub mod file;
pub mod import;
pub mod ledger;

pub use file::{atomic_replace, atomic_write, file_size};
pub use import::{ImportStats, ProjectImporter, import_projects_from, open_ledger};
pub use ledger::{LabelSource, Ledger};
