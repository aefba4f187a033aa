pub mod country;
pub mod scoring;
pub mod snippet;

pub use country::*;
pub use scoring::*;
pub use snippet::*;
