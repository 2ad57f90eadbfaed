//! Streaming multipart demultiplexer.
//!
//! The transport layer turns a `multipart/form-data` body into an ordered stream of
//! [`ChunkEvent`]s, each tagged with the field it belongs to. This crate re-assembles those
//! chunks into [`CompletedPart`]s under explicit consumer demand, while never requesting more
//! upstream chunks than the consumer can absorb.
//!
//! ```no_run
//! use futures::StreamExt;
//! use micro_multipart::{MultipartConfig, StreamingBodyProcessor, chunk_channel};
//!
//! # async fn run() {
//! let (publisher, source) = chunk_channel(8);
//! // hand `publisher` to the connection, which calls `publisher.pump(chunks)`
//! # drop(publisher);
//! let mut parts = StreamingBodyProcessor::new(source, MultipartConfig::default());
//! while let Some(part) = parts.next().await {
//!     match part {
//!         Ok(part) => println!("{}: {} bytes", part.name(), part.len()),
//!         Err(e) => eprintln!("body failed: {}", e),
//!     }
//! }
//! # }
//! ```

mod accumulator;
mod chunk;
mod config;
mod demand;
mod error;
mod part;
mod processor;
mod source;

pub use accumulator::PartAccumulator;
pub use chunk::{BufferTracker, ChunkBuf, ChunkEvent, CountingTracker, PartHeader, PartKind};
pub use config::{DEFAULT_MAX_FILE_SIZE, DEFAULT_MAX_REQUEST_SIZE, MultipartConfig};
pub use demand::DemandBridge;
pub use error::BodyError;
pub use part::{CompletedAttribute, CompletedFileUpload, CompletedPart};
pub use processor::StreamingBodyProcessor;
pub use source::{ChannelChunkSource, ChunkPublisher, ChunkSource, DemandSignal, chunk_channel};
