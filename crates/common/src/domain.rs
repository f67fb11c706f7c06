mod device;
mod measurement;
mod result;

pub use device::*;
pub use measurement::*;
pub use result::*;
