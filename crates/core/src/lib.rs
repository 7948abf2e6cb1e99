//! Core types for the HQ client.
//!
//! Everything here is transport- and UI-agnostic: the domain model, the error
//! taxonomy and the traits the controller uses to reach its collaborators
//! (remote service, session gate, audio device, view).

pub mod audio;
pub mod error;
pub mod model;
pub mod remote;
pub mod session;
pub mod view;

pub use error::{HqError, Result};
