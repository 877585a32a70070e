//! Setting handlers for different configuration patterns.

pub mod boolean;
pub mod number;
pub mod text;

pub use boolean::*;
pub use number::*;
pub use text::*;
