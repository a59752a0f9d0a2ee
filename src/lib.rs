//! Interrupt-driven sensor node firmware for the ATmega328P
//!
//! A debounced button toggles a periodic LED action, and a hardware watchdog
//! resets the node if the main loop ever stops acknowledging it. The core in
//! this crate is hardware-agnostic; register-level drivers are compiled only
//! for AVR targets.
#![cfg_attr(not(test), no_std)]

pub mod callback;
pub mod config;
pub mod drivers;
pub mod error;
pub mod hal;
pub mod orchestrator;
pub mod predictor;

pub use error::Error;
pub use orchestrator::{Orchestrator, Phase};
