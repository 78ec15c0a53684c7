pub mod common;
pub mod compression;
pub mod global;
