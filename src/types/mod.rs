mod kinds;
mod models;

pub use kinds::*;
pub use models::*;
