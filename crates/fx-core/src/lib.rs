pub mod error;
pub mod tracker;
pub mod traits;
pub mod types;

pub use error::*;
pub use tracker::*;
pub use traits::*;
pub use types::*;
