//! Product catalog entries and pick-priority rules.

pub mod catalog;
pub mod product;

pub use catalog::ProductCatalog;
pub use product::{BatchNumber, Product, TaskPriority};
