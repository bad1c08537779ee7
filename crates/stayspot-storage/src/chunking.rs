use bytes::{Bytes, BytesMut};

/// Re-slices arbitrary writes into fixed-size chunks.
#[derive(Debug)]
pub(crate) struct Chunker {
    chunk_size: usize,
    pending: BytesMut,
}

impl Chunker {
    pub(crate) fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            pending: BytesMut::with_capacity(chunk_size),
        }
    }

    pub(crate) fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Buffer `data` and return every chunk that is now full.
    pub(crate) fn push(&mut self, data: &[u8]) -> Vec<Bytes> {
        self.pending.extend_from_slice(data);
        let mut full = Vec::new();
        while self.pending.len() >= self.chunk_size {
            full.push(self.pending.split_to(self.chunk_size).freeze());
        }
        full
    }

    /// The trailing partial chunk, if any.
    pub(crate) fn finish(&mut self) -> Option<Bytes> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.pending.split().freeze())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_across_write_boundaries() {
        let mut chunker = Chunker::new(4);
        assert!(chunker.push(b"ab").is_empty());
        let full = chunker.push(b"cdefghij");
        assert_eq!(full, vec![Bytes::from_static(b"abcd"), Bytes::from_static(b"efgh")]);
        assert_eq!(chunker.finish(), Some(Bytes::from_static(b"ij")));
        assert_eq!(chunker.finish(), None);
    }

    #[test]
    fn exact_multiple_leaves_no_tail() {
        let mut chunker = Chunker::new(3);
        assert_eq!(chunker.push(b"abcdef").len(), 2);
        assert_eq!(chunker.finish(), None);
    }
}
