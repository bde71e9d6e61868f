pub mod category;
pub mod comparison;
pub mod snapshot;
