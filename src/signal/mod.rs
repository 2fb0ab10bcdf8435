// src/signal/mod.rs
//! Recording data model shared by every pipeline stage

pub mod buffer;
pub mod marker;
pub mod selection;

pub use buffer::SignalBuffer;
pub use marker::Marker;
pub use selection::ChannelSelection;
