//! Games built on the loop

pub mod bubbles;

pub use bubbles::{BUBBLE_POOL_SIZE, Bubble, BubbleField, BubbleGame};
