// vidmark shared type definitions
// Each submodule defines records and errors used across the stores, services and router.

pub mod bookmark;
pub mod errors;
pub mod export;
pub mod settings;
