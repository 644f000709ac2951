//! Core data structures for the protocell virtual CPU.

pub mod fault;
pub mod genome;
pub mod head;
pub mod state;
