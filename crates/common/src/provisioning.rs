mod in_memory_registry;
mod provisioning_file;

pub use in_memory_registry::*;
pub use provisioning_file::*;
