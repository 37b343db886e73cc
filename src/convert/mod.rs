//! Conversion of decoded value trees into native values
//!
//! This module turns the generic [`AvroValue`](crate::AvroValue) tree into
//! caller-facing [`NativeValue`]s, optionally recording the named types it
//! meets in a [`TypeRegistry`].

mod native;
mod registry;
mod walk;

pub use native::NativeValue;
pub use registry::{NamedKind, NamedType, TypeRegistry};
pub use walk::to_native;
