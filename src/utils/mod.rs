//! Utility helpers: JSON serialization.
pub mod serialization;

pub use serialization::JsonSerializer;
pub use serialization::Serializer;
