pub mod audit;
pub mod me;
pub mod releases;
