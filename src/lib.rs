//! A [sans-I/O](https://sans-io.readthedocs.io/how-to-sans-io.html)
//! decoder for the message protocol of the SPADIC 1.0 readout ASIC,
//! as produced by its front-end firmware onto a 16-bit-word trace
//! link. This crate never performs I/O itself: callers hand it
//! buffers of words from wherever they came from (a DAQ link, a file,
//! a test fixture) and it hands back structured [`Message`] values and
//! the buffers it is done with.
//!
//! Common abbreviations:
//!
//! - SOM/EOM/BOM/EPM/TSW/RDA/EXD/INF/CON: the nine 16-bit word kinds,
//!   see [`WordKind`];
//! - ADC: analog-to-digital converter, the source of sample data;
//! - FIFO: first-in-first-out queue.

mod buffer_queue;
mod samples;

pub mod message;
pub mod reader;
pub mod word;

pub use message::Message;
pub use reader::Reader;
pub use word::{HitType, InfoType, StopType, WordKind};
