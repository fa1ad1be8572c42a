pub mod serialization;

pub use serialization::{EdgeKind, SerializationGraph};
