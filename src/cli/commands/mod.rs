pub mod install;
pub mod reviews;
pub mod servers;
