pub mod entities;
pub mod errors;
pub mod imaging;
pub mod ports;

pub use entities::*;
pub use errors::{DomainError, Result};
