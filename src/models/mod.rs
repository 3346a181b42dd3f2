pub mod exam;
pub mod share;

pub use exam::*;
pub use share::*;
