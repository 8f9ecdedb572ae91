pub mod company;
pub mod job;
pub mod preorder;
pub mod product;
pub mod schedule;
pub mod unit;
