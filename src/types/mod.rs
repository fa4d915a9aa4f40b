pub mod market;
pub mod trading;

pub use market::*;
pub use trading::*;
