//! Adapters facing the embedding application: the mountable element and the
//! JSON event output used by the command-line demo.

pub mod element;
pub mod json;
