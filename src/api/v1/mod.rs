//! V1 API handlers.

mod reviews;
mod servers;
mod system;


pub use reviews::*;
pub use servers::*;
pub use system::*;
