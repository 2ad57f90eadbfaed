use bytes::Bytes;
use micro_multipart::{ChunkBuf, ChunkEvent};

/// A synthetic multipart body: `parts` file fields of `part_size` bytes, each split into
/// chunks of at most `chunk_size` bytes.
#[derive(Debug, Copy, Clone)]
pub struct BodyCase {
    name: &'static str,
    group: BodyGroup,
    parts: usize,
    part_size: usize,
    chunk_size: usize,
}

impl BodyCase {
    pub const fn new(name: &'static str, group: BodyGroup, parts: usize, part_size: usize, chunk_size: usize) -> Self {
        Self { name, group, parts, part_size, chunk_size }
    }

    pub const fn small(name: &'static str, parts: usize, part_size: usize) -> Self {
        Self::new(name, BodyGroup::Small, parts, part_size, 1024)
    }

    pub const fn large(name: &'static str, parts: usize, part_size: usize) -> Self {
        Self::new(name, BodyGroup::Large, parts, part_size, 16 * 1024)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> BodyGroup {
        self.group
    }

    pub fn total_size(&self) -> u64 {
        (self.parts * self.part_size) as u64
    }

    /// The chunk events of this body, in arrival order.
    pub fn events(&self) -> Vec<ChunkEvent> {
        let payload = Bytes::from(vec![b'x'; self.part_size]);
        let chunk_size = self.chunk_size.max(1);

        let mut events = Vec::new();
        for index in 0..self.parts {
            let name = format!("file{index}");
            let mut offset = 0;
            loop {
                let end = (offset + chunk_size).min(self.part_size);
                let last = end == self.part_size;
                let chunk = ChunkBuf::new(payload.slice(offset..end));
                events.push(ChunkEvent::file(name.as_str(), "upload.bin", mime::APPLICATION_OCTET_STREAM, chunk, last));
                if last {
                    break;
                }
                offset = end;
            }
        }
        events
    }
}

#[derive(Clone, Copy, Debug)]
pub enum BodyGroup {
    Small,
    Large,
}
