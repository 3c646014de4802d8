//! Prompt construction.
//!
//! The dispatcher hands a [`MethodDescriptor`](crate::MethodDescriptor) to the
//! [`PromptBuilder`], which asks the transcoder for the response format and
//! encodes every argument.

pub mod prompt;

pub use prompt::{Prompt, PromptBuilder};
