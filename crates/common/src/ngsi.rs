mod client;
mod payload;

pub use client::*;
pub use payload::*;
