//! HQ Client Library Crate
//!
//! This library contains the interaction controller and the pipelines it
//! drives (chat, quiz, audio capture, score submission), together with the
//! concrete collaborators: the HTTP remote service, the cpal microphone and
//! the console view. The `hq` binary is a thin wrapper around this library.

pub mod audio_utils;
pub mod capture;
pub mod chat;
pub mod config;
pub mod console;
pub mod controller;
pub mod http;
pub mod quiz;
pub mod score;

#[cfg(test)]
mod testing;
