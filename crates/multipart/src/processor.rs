use crate::accumulator::PartAccumulator;
use crate::chunk::ChunkEvent;
use crate::config::MultipartConfig;
use crate::demand::DemandBridge;
use crate::error::BodyError;
use crate::part::CompletedPart;
use crate::source::ChunkSource;
use futures::Stream;
use futures::stream::FusedStream;
use std::collections::HashMap;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use tracing::{debug, trace, warn};

/// Demultiplexes one request body: chunks in, completed parts out, under explicit demand.
///
/// # Protocol
///
/// - the consumer grants demand with [`request`](Self::request); polling the [`Stream`]
///   while nothing is owed implicitly requests one part
/// - at most as many parts are emitted as were requested
/// - the stream terminates exactly once: with completion (`None`), or with one error
///   followed by `None`
/// - [`cancel`](Self::cancel), and dropping the processor, cancel the upstream subscription
///   and release every in-flight accumulator; a second cancel is a no-op
///
/// Zero-payload chunks are bookkeeping only: they never count as parts on their own and
/// never move the demand counters. The one exception is an empty chunk flagged as final:
/// it is the marker that completes a field which already holds bytes, so the part it seals
/// is emitted and counted against the demand like any other. A field that is still incomplete when the upstream completes is
/// dropped without error; a consumer that receives fewer parts than expected is looking at
/// a truncated body.
pub struct StreamingBodyProcessor<S: ChunkSource> {
    source: S,
    config: MultipartConfig,
    bridge: DemandBridge,
    accumulators: HashMap<String, PartAccumulator>,
    received_size: u64,
    completed_parts: usize,
    terminated: bool,
}

impl<S: ChunkSource> StreamingBodyProcessor<S> {
    pub fn new(source: S, config: MultipartConfig) -> Self {
        Self {
            source,
            config,
            bridge: DemandBridge::new(),
            accumulators: HashMap::new(),
            received_size: 0,
            completed_parts: 0,
            terminated: false,
        }
    }

    pub fn get_ref(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &MultipartConfig {
        &self.config
    }

    /// parts requested by the consumer and not yet emitted
    pub fn parts_owed(&self) -> u64 {
        self.bridge.parts_owed()
    }

    /// fields that received chunks but no final chunk yet
    pub fn in_flight_parts(&self) -> usize {
        self.accumulators.len()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Requests `n` more parts.
    pub fn request(&mut self, n: u64) {
        if self.terminated {
            return;
        }

        let chunks = self.bridge.on_demand(n);
        if chunks > 0 {
            debug!(parts = n, chunks, "request chunks from upstream");
            self.source.request(chunks);
        }
    }

    /// Cancels the body stream. Idempotent.
    pub fn cancel(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;
        debug!(in_flight = self.accumulators.len(), "multipart body cancelled");
        self.source.cancel();
        self.accumulators.clear();
    }

    /// Polls the next completed part.
    pub fn poll_part(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<CompletedPart, BodyError>>> {
        if self.terminated {
            return Poll::Ready(None);
        }

        if !self.config.enabled {
            return Poll::Ready(Some(Err(self.fail(BodyError::Disabled))));
        }

        if self.bridge.parts_owed() == 0 {
            self.request(1);
        }

        loop {
            match ready!(self.source.poll_chunk(cx)) {
                Some(Ok(event)) => match self.on_chunk(event) {
                    Ok(Some(part)) => return Poll::Ready(Some(Ok(part))),
                    Ok(None) => continue,
                    Err(e) => return Poll::Ready(Some(Err(self.fail(e)))),
                },
                Some(Err(e)) => return Poll::Ready(Some(Err(self.fail(e)))),
                None => {
                    self.finish();
                    return Poll::Ready(None);
                }
            }
        }
    }

    fn on_chunk(&mut self, event: ChunkEvent) -> Result<Option<CompletedPart>, BodyError> {
        if !self.bridge.on_chunk() {
            return Err(BodyError::upstream("received chunk without demand"));
        }

        let (header, data, last) = event.into_parts();
        trace!(field = header.name(), size = data.len(), last, "receive chunk");

        let completed = if data.is_empty() {
            data.release();
            // an empty chunk never forms a part, but its final flag still seals the field
            if last { self.seal(header.name())? } else { None }
        } else {
            self.received_size += data.len() as u64;
            if self.received_size > self.config.max_request_size {
                return Err(BodyError::request_too_large(self.received_size, self.config.max_request_size));
            }

            match self.accumulators.get_mut(header.name()) {
                Some(accumulator) if accumulator.header() != &header => {
                    return Err(BodyError::malformed(format!("field '{}' changed its kind mid-part", header.name())));
                }
                Some(accumulator) => accumulator.append(data)?,
                None => {
                    let mut accumulator = PartAccumulator::new(header.clone(), self.config.max_file_size);
                    accumulator.append(data)?;
                    self.accumulators.insert(header.name().to_owned(), accumulator);
                }
            }

            if last { self.seal(header.name())? } else { None }
        };

        let chunks = self.bridge.after_chunk();
        if chunks > 0 {
            self.source.request(chunks);
        }

        Ok(completed)
    }

    fn seal(&mut self, name: &str) -> Result<Option<CompletedPart>, BodyError> {
        let Some(accumulator) = self.accumulators.remove(name) else {
            return Ok(None);
        };

        if let Some(max_parts) = self.config.max_parts
            && self.completed_parts >= max_parts
        {
            return Err(BodyError::too_many_parts(max_parts));
        }

        if !self.bridge.on_part() {
            return Err(BodyError::upstream("completed part without demand"));
        }

        self.completed_parts += 1;
        let part = accumulator.complete();
        trace!(field = part.name(), size = part.len(), file = part.is_file(), "emit completed part");
        Ok(Some(part))
    }

    fn fail(&mut self, error: BodyError) -> BodyError {
        debug!(cause = %error, "multipart body failed, cancel upstream");
        self.terminated = true;
        self.source.cancel();
        self.accumulators.clear();
        error
    }

    fn finish(&mut self) {
        self.terminated = true;
        if !self.accumulators.is_empty() {
            let fields = self.accumulators.keys().cloned().collect::<Vec<_>>();
            warn!(?fields, "body completed before these parts, dropping them");
            self.accumulators.clear();
        }
        debug!(parts = self.completed_parts, "multipart body completed");
    }
}

impl<S: ChunkSource> fmt::Debug for StreamingBodyProcessor<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingBodyProcessor")
            .field("bridge", &self.bridge)
            .field("in_flight", &self.accumulators.len())
            .field("received_size", &self.received_size)
            .field("completed_parts", &self.completed_parts)
            .field("terminated", &self.terminated)
            .finish_non_exhaustive()
    }
}

impl<S: ChunkSource> Drop for StreamingBodyProcessor<S> {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl<S: ChunkSource + Unpin> Stream for StreamingBodyProcessor<S> {
    type Item = Result<CompletedPart, BodyError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().poll_part(cx)
    }
}

impl<S: ChunkSource + Unpin> FusedStream for StreamingBodyProcessor<S> {
    fn is_terminated(&self) -> bool {
        self.terminated
    }
}
