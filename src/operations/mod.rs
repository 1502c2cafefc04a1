pub mod compression;
pub mod preview;
