//! Button input: debounce, queue, key mapping.

pub mod buttons;
pub mod debounce;
pub mod pipeline;
