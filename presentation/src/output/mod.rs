//! Final result output

pub mod console;
