//! Application layer: loads the SDK, drives the initialization lifecycle and
//! normalizes everything the SDK reports back.
//!
//! The [`orchestrator::Orchestrator`] owns the state machine. It relies on the
//! [`script_loader::ScriptLoader`] for page-wide script injection, the
//! [`initializer::SdkInitializer`] for instance creation, and [`form`] plus
//! [`normalizer`] for building the form and translating its callbacks.

pub mod form;
pub mod initializer;
pub mod normalizer;
pub mod orchestrator;
pub mod script_loader;
