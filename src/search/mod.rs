pub mod client;
pub mod results;

pub use client::*;
pub use results::*;
