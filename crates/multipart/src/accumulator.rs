use crate::chunk::{ChunkBuf, PartHeader, PartKind};
use crate::error::BodyError;
use crate::part::{CompletedAttribute, CompletedFileUpload, CompletedPart};
use bytes::BytesMut;
use tracing::trace;

/// Accumulates the chunks of one in-flight multipart field until its final chunk arrives.
///
/// Each appended [`ChunkBuf`] is copied and released right away, so the accumulator never
/// holds a raw chunk buffer. The accumulated content is owned here until
/// [`complete`](Self::complete) hands it to the consumer, or the accumulator is dropped
/// because the request ended first.
#[derive(Debug)]
pub struct PartAccumulator {
    header: PartHeader,
    content: BytesMut,
    max_size: u64,
}

impl PartAccumulator {
    pub fn new(header: PartHeader, max_size: u64) -> Self {
        Self { header, content: BytesMut::new(), max_size }
    }

    pub fn header(&self) -> &PartHeader {
        &self.header
    }

    /// accumulated byte length
    #[inline]
    pub fn len(&self) -> u64 {
        self.content.len() as u64
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Appends a chunk, releasing its buffer whether or not the append succeeds.
    pub fn append(&mut self, chunk: ChunkBuf) -> Result<(), BodyError> {
        let current_size = self.len() + chunk.len() as u64;
        if current_size > self.max_size {
            chunk.release();
            return Err(BodyError::part_too_large(self.header.name(), current_size, self.max_size));
        }

        self.content.extend_from_slice(chunk.as_bytes());
        trace!(field = self.header.name(), size = current_size, "accumulated chunk");
        chunk.release();
        Ok(())
    }

    /// Freezes the accumulated content into an immutable part.
    pub fn complete(self) -> CompletedPart {
        let Self { header, content, .. } = self;
        let content = content.freeze();
        let name = header.name().to_owned();
        match header.kind() {
            PartKind::Attribute => CompletedPart::Attribute(CompletedAttribute::new(name, content)),
            PartKind::File { filename, content_type } => {
                CompletedPart::File(CompletedFileUpload::new(name, filename.clone(), content_type.clone(), content))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::CountingTracker;
    use bytes::Bytes;

    #[test]
    fn accumulates_until_complete() {
        let tracker = CountingTracker::new();
        let mut accumulator = PartAccumulator::new(PartHeader::attribute("a"), 16);

        accumulator.append(ChunkBuf::tracked(Bytes::from_static(b"abcd"), tracker.clone())).unwrap();
        accumulator.append(ChunkBuf::tracked(Bytes::from_static(b"efgh"), tracker.clone())).unwrap();
        assert_eq!(accumulator.len(), 8);
        // chunk buffers are released as soon as they are copied
        assert!(tracker.is_balanced());

        let part = accumulator.complete();
        assert_eq!(part.name(), "a");
        assert_eq!(part.bytes().as_ref(), b"abcdefgh");
    }

    #[test]
    fn oversized_chunk_is_released_and_rejected() {
        let tracker = CountingTracker::new();
        let mut accumulator = PartAccumulator::new(PartHeader::attribute("a"), 6);

        accumulator.append(ChunkBuf::tracked(Bytes::from_static(b"abcd"), tracker.clone())).unwrap();
        let error = accumulator.append(ChunkBuf::tracked(Bytes::from_static(b"efgh"), tracker.clone())).unwrap_err();

        assert_eq!(error, BodyError::part_too_large("a", 8, 6));
        assert_eq!(accumulator.len(), 4);
        assert_eq!(tracker.acquired_count(), 2);
        assert!(tracker.is_balanced());
    }

    #[test]
    fn file_part_keeps_metadata() {
        let mut accumulator = PartAccumulator::new(PartHeader::file("upload", "a.json", mime::APPLICATION_JSON), 64);
        accumulator.append(ChunkBuf::new(&b"{}"[..])).unwrap();

        let part = accumulator.complete();
        assert!(part.is_file());
        assert_eq!(part.filename(), Some("a.json"));
        assert_eq!(part.content_type(), Some(&mime::APPLICATION_JSON));
    }
}
