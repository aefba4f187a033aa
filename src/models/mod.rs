pub mod outcome;
pub mod record;
pub mod table;

pub use outcome::*;
pub use record::*;
pub use table::*;
