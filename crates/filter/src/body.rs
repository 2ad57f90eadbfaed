use crate::error::{BoxError, FilterError};
use bytes::Bytes;
use futures::TryStreamExt;
use http_body::Body as HttpBody;
use http_body::{Frame, SizeHint};
use http_body_util::combinators::UnsyncBoxBody;
use micro_multipart::{BodyError, ChunkSource, CompletedPart, StreamingBodyProcessor};
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::Mutex;

/// The part stream of a multipart request body.
pub type MultipartBody = StreamingBodyProcessor<Box<dyn ChunkSource>>;

/// A request body that can be consumed once, by whichever filter or handler gets to it first.
///
/// Clones share the same body.
#[derive(Clone)]
pub struct RequestBody {
    inner: Arc<Mutex<Option<Kind>>>,
}

enum Kind {
    Empty,
    Once(Bytes),
    Multipart(MultipartBody),
}

impl RequestBody {
    fn new(kind: Kind) -> Self {
        Self { inner: Arc::new(Mutex::new(Some(kind))) }
    }

    pub fn empty() -> Self {
        Self::new(Kind::Empty)
    }

    pub fn once(bytes: Bytes) -> Self {
        Self::new(Kind::Once(bytes))
    }

    pub fn multipart(parts: MultipartBody) -> Self {
        Self::new(Kind::Multipart(parts))
    }

    pub async fn can_consume(&self) -> bool {
        let guard = self.inner.lock().await;
        guard.is_some()
    }

    pub async fn is_multipart(&self) -> bool {
        let guard = self.inner.lock().await;
        matches!(*guard, Some(Kind::Multipart(_)))
    }

    /// Takes the whole body as bytes. A multipart body is left untouched.
    pub async fn bytes(&self) -> Result<Bytes, FilterError> {
        let mut guard = self.inner.lock().await;
        match guard.take() {
            None => Err(FilterError::BodyConsumed),
            Some(Kind::Empty) => Ok(Bytes::new()),
            Some(Kind::Once(bytes)) => Ok(bytes),
            Some(kind @ Kind::Multipart(_)) => {
                *guard = Some(kind);
                Err(BodyError::malformed("multipart body can't be read as bytes").into())
            }
        }
    }

    /// Takes the part stream of a multipart body; the caller drives its demand.
    pub async fn parts(&self) -> Result<MultipartBody, FilterError> {
        let mut guard = self.inner.lock().await;
        match guard.take() {
            None => Err(FilterError::BodyConsumed),
            Some(Kind::Multipart(parts)) => Ok(parts),
            Some(kind) => {
                *guard = Some(kind);
                Err(BodyError::malformed("request body is not multipart").into())
            }
        }
    }

    /// Collects every completed part of a multipart body.
    pub async fn collect_parts(&self) -> Result<Vec<CompletedPart>, FilterError> {
        let parts = self.parts().await?;
        Ok(parts.try_collect().await?)
    }
}

impl Default for RequestBody {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Bytes> for RequestBody {
    fn from(bytes: Bytes) -> Self {
        Self::once(bytes)
    }
}

impl From<String> for RequestBody {
    fn from(value: String) -> Self {
        Self::once(Bytes::from(value))
    }
}

impl From<MultipartBody> for RequestBody {
    fn from(parts: MultipartBody) -> Self {
        Self::multipart(parts)
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBody").finish_non_exhaustive()
    }
}

pub struct ResponseBody {
    inner: ResponseKind,
}

enum ResponseKind {
    Once(Option<Bytes>),
    Stream(UnsyncBoxBody<Bytes, BoxError>),
}

impl ResponseBody {
    pub fn empty() -> Self {
        Self { inner: ResponseKind::Once(None) }
    }

    pub fn once(bytes: Bytes) -> Self {
        Self { inner: ResponseKind::Once(Some(bytes)) }
    }

    pub fn stream<B>(body: B) -> Self
    where
        B: HttpBody<Data = Bytes, Error = BoxError> + Send + 'static,
    {
        Self { inner: ResponseKind::Stream(UnsyncBoxBody::new(body)) }
    }
}

impl Default for ResponseBody {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<String> for ResponseBody {
    fn from(value: String) -> Self {
        if value.is_empty() { Self::empty() } else { Self::once(Bytes::from(value)) }
    }
}

impl From<&'static str> for ResponseBody {
    fn from(value: &'static str) -> Self {
        if value.is_empty() { Self::empty() } else { Self::once(Bytes::from_static(value.as_bytes())) }
    }
}

impl From<Bytes> for ResponseBody {
    fn from(bytes: Bytes) -> Self {
        Self::once(bytes)
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            ResponseKind::Once(bytes) => f.debug_tuple("ResponseBody::Once").field(bytes).finish(),
            ResponseKind::Stream(_) => f.write_str("ResponseBody::Stream"),
        }
    }
}

impl HttpBody for ResponseBody {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match &mut self.get_mut().inner {
            ResponseKind::Once(option_bytes) => Poll::Ready(option_bytes.take().map(|bytes| Ok(Frame::data(bytes)))),
            ResponseKind::Stream(box_body) => Pin::new(box_body).poll_frame(cx),
        }
    }

    fn is_end_stream(&self) -> bool {
        match &self.inner {
            ResponseKind::Once(option_bytes) => option_bytes.is_none(),
            ResponseKind::Stream(box_body) => box_body.is_end_stream(),
        }
    }

    fn size_hint(&self) -> SizeHint {
        match &self.inner {
            ResponseKind::Once(None) => SizeHint::with_exact(0),
            ResponseKind::Once(Some(bytes)) => SizeHint::with_exact(bytes.len() as u64),
            ResponseKind::Stream(box_body) => box_body.size_hint(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use http_body_util::{BodyExt, StreamBody};
    use micro_multipart::{ChunkBuf, ChunkEvent, MultipartConfig, chunk_channel};

    fn check_send<T: Send>() {}

    #[test]
    fn bodies_are_send() {
        check_send::<ResponseBody>();
        check_send::<RequestBody>();
    }

    #[tokio::test]
    async fn request_body_is_consumed_once() {
        let body = RequestBody::from(String::from("hello"));
        let shared = body.clone();

        assert!(body.can_consume().await);
        assert_eq!(shared.bytes().await.unwrap(), Bytes::from("hello"));
        assert!(!body.can_consume().await);
        assert!(matches!(body.bytes().await, Err(FilterError::BodyConsumed)));
    }

    #[tokio::test]
    async fn plain_body_is_not_multipart() {
        let body = RequestBody::empty();
        assert!(matches!(body.parts().await, Err(FilterError::Body(BodyError::Malformed { .. }))));
        // the failed attempt leaves the body in place
        assert_eq!(body.bytes().await.unwrap(), Bytes::new());
    }

    #[tokio::test]
    async fn multipart_body_yields_parts() {
        let (publisher, source) = chunk_channel(4);
        let events = futures::stream::iter(vec![
            Ok(ChunkEvent::attribute("a", ChunkBuf::new(&b"hello "[..]), false)),
            Ok(ChunkEvent::attribute("a", ChunkBuf::new(&b"world"[..]), true)),
        ]);
        let pump = tokio::spawn(publisher.pump(events));

        let source: Box<dyn ChunkSource> = Box::new(source);
        let body = RequestBody::multipart(StreamingBodyProcessor::new(source, MultipartConfig::default()));
        assert!(body.is_multipart().await);
        assert!(matches!(body.bytes().await, Err(FilterError::Body(_))));

        let parts = body.collect_parts().await.unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].bytes().as_ref(), b"hello world");
        assert_eq!(pump.await.unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn string_response_body() {
        let mut body = ResponseBody::from("Hello world".to_string());

        assert_eq!(body.size_hint().exact(), Some(11));
        assert!(!body.is_end_stream());

        let bytes = body.frame().await.unwrap().unwrap().into_data().unwrap();
        assert_eq!(bytes, Bytes::from("Hello world"));

        assert!(body.is_end_stream());
        assert!(body.frame().await.is_none());
    }

    #[tokio::test]
    async fn empty_response_body() {
        let mut body = ResponseBody::from("");

        assert!(body.is_end_stream());
        assert_eq!(body.size_hint().exact(), Some(0));
        assert!(body.frame().await.is_none());
    }

    #[tokio::test]
    async fn stream_response_body() {
        let frames = futures::stream::iter(vec![Bytes::from(vec![1]), Bytes::from(vec![2])])
            .map(|bytes| Ok::<_, BoxError>(Frame::data(bytes)));
        let body = ResponseBody::stream(StreamBody::new(frames));

        assert!(body.size_hint().exact().is_none());
        let collected = body.collect().await.unwrap().to_bytes();
        assert_eq!(collected.as_ref(), [1, 2]);
    }
}
