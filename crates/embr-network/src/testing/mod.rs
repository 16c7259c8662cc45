//! Test doubles for the network layer.

mod sim_radio;

pub use sim_radio::{RecordingHook, SimRadio, SimRadioProbe};
