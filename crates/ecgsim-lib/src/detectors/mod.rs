pub mod qrs;

pub use qrs::*;
