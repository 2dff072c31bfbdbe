//! Domain layer: value types, payloads, the error taxonomy and the ports
//! through which the core talks to the page and the hosted-fields SDK.

pub mod error_code;
pub mod fields;
pub mod payload;
pub mod ports;
pub mod types;
