pub mod input;
pub mod output;
pub mod snapshot;

pub use input::*;
pub use output::*;
pub use snapshot::*;
