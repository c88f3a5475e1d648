//! `sluice-buffer`
//!
//! Buffering primitives that bridge a push-based downloader to a pull-based
//! demuxer:
//!
//! - [`RingBuffer`]: growable byte FIFO holding decoder-ready stream bytes
//! - [`EdgeBufferStore`]: cached head/tail regions used during container probing
//! - [`FlowController`]: watermark-based pause/resume signalling
//!
//! All types are single-owner and never block; backpressure is advisory
//! (signals through [`DownloaderControl`]), not a blocking call.

#![forbid(unsafe_code)]

mod edge;
mod error;
mod flow;
mod ring;

pub use edge::{EdgeBufferStore, EdgeRegion, EdgeTag};
pub use error::BufferError;
pub use flow::{DownloaderControl, FlowController, FlowSignal, HIGH_WATERMARK, LOW_WATERMARK};
pub use ring::{DEFAULT_FIFO_CAPACITY, GROW_STEP, RingBuffer};
