#![no_std]

// Shared logic for the ADC → PWM feedback controller.
//
// This crate stays portable across MCU firmware and host tooling by avoiding the
// Rust standard library and exposing the collaborator traits the other crates
// implement: the firmware backs them with real peripherals, the emulator and the
// tests with the models in [`sim`].

pub mod actuation;
pub mod config;
pub mod control;
pub mod extrema;
pub mod interrupt;
pub mod pulse;
pub mod sample;
pub mod sampling;
pub mod sim;
pub mod status;
pub mod telemetry;
pub mod temperature;
pub mod trigger;
