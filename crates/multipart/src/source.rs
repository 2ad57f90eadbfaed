//! Upstream chunk sources.
//!
//! A [`ChunkSource`] is the demand-driven producer of [`ChunkEvent`]s the
//! [`StreamingBodyProcessor`](crate::StreamingBodyProcessor) subscribes to: it delivers at
//! most as many chunks as were requested, and terminates with completion (`None`) or one
//! error.
//!
//! [`chunk_channel`] builds the source used between a transport connection and the
//! processor. It mirrors the body channel of the connection layer:
//!
//! - the source sends [`DemandSignal`]s over an unbounded signal channel
//! - the [`ChunkPublisher`] only sends chunks while it holds credit
//! - dropping or completing the publisher completes the stream

use crate::chunk::ChunkEvent;
use crate::error::BodyError;
use futures::channel::mpsc;
use futures::{FutureExt, SinkExt, Stream, StreamExt};
use std::task::{Context, Poll};
use tracing::{debug, error, info};

/// A producer of chunk events that requires explicit demand.
pub trait ChunkSource: Send {
    /// Grants demand for `n` more chunks.
    fn request(&mut self, n: u64);

    /// Stops the subscription; no chunk is delivered afterwards. Must be idempotent.
    fn cancel(&mut self);

    /// Polls the next chunk: `Some(Ok(_))` a chunk, `Some(Err(_))` the terminal error,
    /// `None` completion.
    fn poll_chunk(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<ChunkEvent, BodyError>>>;
}

impl<S: ChunkSource + ?Sized> ChunkSource for Box<S> {
    fn request(&mut self, n: u64) {
        (**self).request(n);
    }

    fn cancel(&mut self) {
        (**self).cancel();
    }

    fn poll_chunk(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<ChunkEvent, BodyError>>> {
        (**self).poll_chunk(cx)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemandSignal {
    Request(u64),
    Cancel,
}

/// Creates a connected publisher/source pair; `capacity` bounds the chunks in flight.
pub fn chunk_channel(capacity: usize) -> (ChunkPublisher, ChannelChunkSource) {
    let (signal_sender, signal_receiver) = mpsc::unbounded();
    let (data_sender, data_receiver) = mpsc::channel(capacity);

    (
        ChunkPublisher { signal_receiver, data_sender, credit: 0, cancelled: false },
        ChannelChunkSource { signal_sender, data_receiver, cancelled: false },
    )
}

/// The processor side of a [`chunk_channel`].
#[derive(Debug)]
pub struct ChannelChunkSource {
    signal_sender: mpsc::UnboundedSender<DemandSignal>,
    data_receiver: mpsc::Receiver<Result<ChunkEvent, BodyError>>,
    cancelled: bool,
}

impl ChunkSource for ChannelChunkSource {
    fn request(&mut self, n: u64) {
        if self.cancelled || n == 0 {
            return;
        }

        if let Err(e) = self.signal_sender.unbounded_send(DemandSignal::Request(n)) {
            debug!("publisher has gone, drop request signal: {}", e);
        }
    }

    fn cancel(&mut self) {
        if self.cancelled {
            return;
        }
        self.cancelled = true;

        if let Err(e) = self.signal_sender.unbounded_send(DemandSignal::Cancel) {
            debug!("publisher has gone, drop cancel signal: {}", e);
        }

        // release whatever the publisher already buffered
        self.data_receiver.close();
        while let Some(Some(_item)) = self.data_receiver.next().now_or_never() {}
    }

    fn poll_chunk(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<ChunkEvent, BodyError>>> {
        if self.cancelled {
            return Poll::Ready(None);
        }
        self.data_receiver.poll_next_unpin(cx)
    }
}

/// The transport side of a [`chunk_channel`].
#[derive(Debug)]
pub struct ChunkPublisher {
    signal_receiver: mpsc::UnboundedReceiver<DemandSignal>,
    data_sender: mpsc::Sender<Result<ChunkEvent, BodyError>>,
    credit: u64,
    cancelled: bool,
}

impl ChunkPublisher {
    /// chunks the publisher may still send without further demand
    pub fn credit(&self) -> u64 {
        self.credit
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    fn apply(&mut self, signal: DemandSignal) {
        match signal {
            DemandSignal::Request(n) => self.credit = self.credit.saturating_add(n),
            DemandSignal::Cancel => self.cancelled = true,
        }
    }

    async fn await_credit(&mut self) -> Result<(), BodyError> {
        // signals that are already queued win, so a pending cancel is seen before sending
        loop {
            match self.signal_receiver.next().now_or_never() {
                Some(Some(signal)) => self.apply(signal),
                Some(None) => {
                    self.cancelled = true;
                    break;
                }
                None => break,
            }
        }

        while !self.cancelled && self.credit == 0 {
            match self.signal_receiver.next().await {
                Some(signal) => self.apply(signal),
                None => self.cancelled = true,
            }
        }

        if self.cancelled { Err(BodyError::Cancelled) } else { Ok(()) }
    }

    /// Sends one chunk, waiting for demand first.
    ///
    /// Fails with [`BodyError::Cancelled`] once the source cancelled; the chunk is released.
    pub async fn send(&mut self, event: ChunkEvent) -> Result<(), BodyError> {
        self.await_credit().await?;

        if self.data_sender.send(Ok(event)).await.is_err() {
            self.cancelled = true;
            return Err(BodyError::Cancelled);
        }
        self.credit -= 1;
        Ok(())
    }

    /// Terminates the stream with `error`. Terminal signals need no demand.
    pub async fn fail(mut self, error: BodyError) {
        if let Err(e) = self.data_sender.send(Err(error)).await {
            debug!("source has gone, drop terminal error: {}", e);
        }
    }

    /// Completes the stream.
    pub fn complete(self) {}

    /// Publishes every chunk of a transport stream under demand.
    ///
    /// When the source cancels, the rest of the transport stream is drained so the
    /// connection stays usable, and [`BodyError::Cancelled`] is returned. A transport error
    /// is forwarded as the terminal error and returned.
    pub async fn pump<St>(mut self, mut stream: St) -> Result<(), BodyError>
    where
        St: Stream<Item = Result<ChunkEvent, BodyError>> + Unpin,
    {
        while let Some(item) = stream.next().await {
            match item {
                Ok(event) => {
                    if let Err(e) = self.send(event).await {
                        skip_chunks(&mut stream).await;
                        return Err(e);
                    }
                }
                Err(e) => {
                    error!(cause = %e, "failed to read chunk from transport");
                    self.fail(e.clone()).await;
                    return Err(e);
                }
            }
        }

        self.complete();
        Ok(())
    }
}

async fn skip_chunks<St>(stream: &mut St)
where
    St: Stream<Item = Result<ChunkEvent, BodyError>> + Unpin,
{
    let mut size: usize = 0;
    while let Some(Ok(event)) = stream.next().await {
        size += event.data().len();
    }

    if size > 0 {
        info!(size = size, "skip multipart body");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{ChunkBuf, CountingTracker};
    use bytes::Bytes;
    use futures::task::noop_waker_ref;

    fn attribute(name: &str, data: &'static [u8], last: bool) -> ChunkEvent {
        ChunkEvent::attribute(name, ChunkBuf::new(Bytes::from_static(data)), last)
    }

    #[tokio::test]
    async fn publisher_waits_for_demand() {
        let (mut publisher, mut source) = chunk_channel(4);
        let mut cx = Context::from_waker(noop_waker_ref());

        {
            let send = publisher.send(attribute("a", b"x", true));
            tokio::pin!(send);
            assert!(send.as_mut().now_or_never().is_none());
        }
        assert!(matches!(source.poll_chunk(&mut cx), Poll::Pending));

        source.request(1);
        publisher.send(attribute("a", b"x", true)).await.unwrap();
        assert_eq!(publisher.credit(), 0);

        match source.poll_chunk(&mut cx) {
            Poll::Ready(Some(Ok(event))) => assert_eq!(event.name(), "a"),
            other => panic!("unexpected poll result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn dropping_publisher_completes() {
        let (publisher, mut source) = chunk_channel(4);
        publisher.complete();

        let mut cx = Context::from_waker(noop_waker_ref());
        assert!(matches!(source.poll_chunk(&mut cx), Poll::Ready(None)));
    }

    #[tokio::test]
    async fn failure_is_delivered_without_demand() {
        let (publisher, mut source) = chunk_channel(4);
        publisher.fail(BodyError::malformed("bad boundary")).await;

        let mut cx = Context::from_waker(noop_waker_ref());
        match source.poll_chunk(&mut cx) {
            Poll::Ready(Some(Err(e))) => assert_eq!(e, BodyError::malformed("bad boundary")),
            other => panic!("unexpected poll result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn cancel_stops_publisher_and_releases_buffered_chunks() {
        let tracker = CountingTracker::new();
        let (mut publisher, mut source) = chunk_channel(4);

        source.request(2);
        publisher.send(ChunkEvent::attribute("a", ChunkBuf::tracked(Bytes::from_static(b"ab"), tracker.clone()), false)).await.unwrap();

        source.cancel();
        source.cancel();
        assert!(tracker.is_balanced());

        let result = publisher.send(ChunkEvent::attribute("a", ChunkBuf::tracked(Bytes::from_static(b"cd"), tracker.clone()), true)).await;
        assert_eq!(result, Err(BodyError::Cancelled));
        assert!(publisher.is_cancelled());
        assert!(tracker.is_balanced());
    }

    #[tokio::test]
    async fn pump_drains_transport_after_cancel() {
        let tracker = CountingTracker::new();
        let events = (0..4)
            .map(|i| Ok(ChunkEvent::attribute("a", ChunkBuf::tracked(Bytes::from(vec![i; 3]), tracker.clone()), i == 3)))
            .collect::<Vec<_>>();
        let (publisher, mut source) = chunk_channel(4);

        source.request(1);
        let pump = tokio::spawn(publisher.pump(futures::stream::iter(events)));

        let first = futures::future::poll_fn(|cx| source.poll_chunk(cx)).await;
        assert!(matches!(first, Some(Ok(_))));
        drop(first);
        source.cancel();

        assert_eq!(pump.await.unwrap(), Err(BodyError::Cancelled));
        assert_eq!(tracker.acquired_count(), 4);
        assert!(tracker.is_balanced());
    }
}
