pub mod database;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod store;

pub use store::Store;
