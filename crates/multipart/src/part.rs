use bytes::Bytes;
use mime::Mime;
use std::str::Utf8Error;

/// A fully materialized multipart field handed to the part consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletedPart {
    Attribute(CompletedAttribute),
    File(CompletedFileUpload),
}

/// A completed simple form value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedAttribute {
    name: String,
    content: Bytes,
}

/// A completed file upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedFileUpload {
    name: String,
    filename: String,
    content_type: Mime,
    content: Bytes,
}

impl CompletedAttribute {
    pub(crate) fn new(name: String, content: Bytes) -> Self {
        Self { name, content }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &Bytes {
        &self.content
    }

    /// The value as utf-8 text.
    pub fn value(&self) -> Result<&str, Utf8Error> {
        std::str::from_utf8(&self.content)
    }
}

impl CompletedFileUpload {
    pub(crate) fn new(name: String, filename: String, content_type: Mime, content: Bytes) -> Self {
        Self { name, filename, content_type, content }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn content_type(&self) -> &Mime {
        &self.content_type
    }

    pub fn bytes(&self) -> &Bytes {
        &self.content
    }
}

impl CompletedPart {
    pub fn name(&self) -> &str {
        match self {
            CompletedPart::Attribute(attribute) => attribute.name(),
            CompletedPart::File(file) => file.name(),
        }
    }

    pub fn bytes(&self) -> &Bytes {
        match self {
            CompletedPart::Attribute(attribute) => attribute.bytes(),
            CompletedPart::File(file) => file.bytes(),
        }
    }

    pub fn into_bytes(self) -> Bytes {
        match self {
            CompletedPart::Attribute(attribute) => attribute.content,
            CompletedPart::File(file) => file.content,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes().is_empty()
    }

    #[inline]
    pub fn is_file(&self) -> bool {
        matches!(self, CompletedPart::File(_))
    }

    /// file name of an upload, `None` for attributes
    pub fn filename(&self) -> Option<&str> {
        match self {
            CompletedPart::Attribute(_) => None,
            CompletedPart::File(file) => Some(file.filename()),
        }
    }

    /// content type of an upload, `None` for attributes
    pub fn content_type(&self) -> Option<&Mime> {
        match self {
            CompletedPart::Attribute(_) => None,
            CompletedPart::File(file) => Some(file.content_type()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_accessors() {
        let part = CompletedPart::Attribute(CompletedAttribute::new("name".into(), Bytes::from_static(b"micro")));
        assert_eq!(part.name(), "name");
        assert!(!part.is_file());
        assert_eq!(part.filename(), None);
        assert_eq!(part.content_type(), None);
        match &part {
            CompletedPart::Attribute(attribute) => assert_eq!(attribute.value(), Ok("micro")),
            CompletedPart::File(_) => panic!("expected attribute"),
        }
        assert_eq!(part.into_bytes(), Bytes::from_static(b"micro"));
    }

    #[test]
    fn file_accessors() {
        let part = CompletedPart::File(CompletedFileUpload::new(
            "upload".into(),
            "a.txt".into(),
            mime::TEXT_PLAIN,
            Bytes::from_static(b"0123456789"),
        ));
        assert!(part.is_file());
        assert_eq!(part.filename(), Some("a.txt"));
        assert_eq!(part.content_type(), Some(&mime::TEXT_PLAIN));
        assert_eq!(part.len(), 10);
    }
}
