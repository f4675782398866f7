pub mod cookies;
pub mod errors;
pub mod http;
pub mod logger;
pub mod types;

pub use errors::*;
pub use http::*;
pub use types::*;
