pub mod availability;
pub mod replacement;
