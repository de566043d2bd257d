pub mod dump;
pub mod flaky;
pub mod loader;

pub use dump::DumpBuilder;
pub use flaky::FlakyStore;
pub use loader::{Snapshot, TestLoader};
