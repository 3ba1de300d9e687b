//! Core value types and backend seams for inferpool.
//!
//! This crate has no execution logic of its own: it defines the tensor
//! descriptor, model signature, device provider, and the `Backend` /
//! `BackendModel` traits that loaders implement and the runtime drives.

pub mod backend;
pub mod device;
pub mod error;
pub mod signature;
pub mod source;
pub mod tensor;

pub use backend::*;
pub use device::*;
pub use error::*;
pub use signature::*;
pub use source::*;
pub use tensor::*;
