//! Declare a trait, let a language model implement it.
//!
//! `#[ai_interface]` turns a trait into a proxy type whose methods describe
//! themselves to a chat model and decode the answer back into the declared
//! return type. `#[derive(Transcode)]` makes structs and enums usable as
//! parameters and return values.

extern crate self as interfaice;

pub mod adapter;
pub mod client;
pub mod core;
pub mod dispatch;
pub mod factory;
pub mod transcode;
pub mod utils;

pub use adapter::*;
pub use client::*;
pub use core::*;
pub use dispatch::*;
pub use factory::*;
pub use transcode::*;
pub use utils::*;

pub use interfaice_macros::{Transcode, ai_interface};
