// Re-export model types for ease of use

pub mod resource;

pub use resource::{Property, Resource};
