//! Kernel module - server infrastructure and dependencies.

pub mod server_kernel;
pub mod test_dependencies;
pub mod traits;

pub use server_kernel::ServerKernel;
pub use test_dependencies::{NoopDispatcher, RecordingDispatcher};
pub use traits::*;
