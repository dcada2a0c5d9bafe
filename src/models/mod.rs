pub mod common;
pub mod defaults;
pub mod image;

pub use common::*;
pub use defaults::*;
pub use image::*;
