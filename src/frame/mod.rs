//! # Frame Module
//!
//! Text frame handling for the LoRa receiver link.
//!
//! This module handles:
//! - Locating the payload (marker or quoted form)
//! - Charset validation of the payload
//! - Lenient padding/truncation to the frame width
//! - All-or-nothing numeric conversion
//! - Assembling link bytes into lines

pub mod protocol;
pub mod decoder;
pub mod line;
