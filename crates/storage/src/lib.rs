// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! portico-storage: persistence for agents, signals, and sessions

mod event;
mod journal;
mod memory;
mod snapshot;
mod state;
mod store;
mod wal;

pub use event::StoreEvent;
pub use journal::{JournalStore, DEFAULT_CHECKPOINT_INTERVAL};
pub use memory::MemoryStore;
pub use snapshot::{load_snapshot, snapshot_path, Snapshot, SnapshotError, SNAPSHOT_VERSION};
pub use state::MaterializedState;
pub use store::{Store, StoreError};
pub use wal::{Wal, WalEntry, WalError};
