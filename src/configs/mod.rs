pub mod base;
pub mod logging;
pub mod sources;

pub use base::*;
pub use logging::*;
pub use sources::*;
