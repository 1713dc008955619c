pub mod error;
pub mod model;
pub mod politeness;
pub mod utils;

pub use error::WireError;
pub use model::*;
pub use politeness::{Politeness, politeness};
