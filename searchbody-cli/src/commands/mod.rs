pub mod build;
pub mod defaults;
