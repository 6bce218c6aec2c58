use std::io::{self, Read};

use crate::hasher::Hasher;

/// Tee reader that digests bytes as they pass through.
///
/// Wraps any `Read` source so the CPU touches each byte once for both
/// hashing and whatever the caller does with the data.
pub struct HashingReader<R> {
    inner: R,
    hasher: Box<dyn Hasher>,
    bytes_read: u64,
}

impl<R> HashingReader<R> {
    pub fn new(inner: R, hasher: Box<dyn Hasher>) -> Self {
        Self {
            inner,
            hasher,
            bytes_read: 0,
        }
    }

    /// Total bytes that have flowed through so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Consume the adapter and yield the lowercase hex digest of everything
    /// read. The stream must not be re-read afterwards; the adapter owns it.
    pub fn finalize_hex(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

impl<R: Read> Read for HashingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.hasher.update(&buf[..n]);
            self.bytes_read += n as u64;
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::hasher::HashAlgorithm;

    #[test]
    fn digest_matches_one_shot() {
        let data = b"test data for verification";
        let mut reader = HashingReader::new(Cursor::new(data), HashAlgorithm::Md5.hasher());

        let mut sink = Vec::new();
        io::copy(&mut reader, &mut sink).unwrap();

        assert_eq!(sink, data);
        assert_eq!(reader.bytes_read(), data.len() as u64);
        assert_eq!(reader.finalize_hex(), HashAlgorithm::Md5.hex_digest(data));
    }

    #[test]
    fn empty_stream_digest() {
        let mut reader = HashingReader::new(Cursor::new(&b""[..]), HashAlgorithm::Md5.hasher());
        let mut sink = Vec::new();
        io::copy(&mut reader, &mut sink).unwrap();

        // md5 of the empty string
        assert_eq!(reader.finalize_hex(), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn digest_independent_of_chunking() {
        let data = vec![0xabu8; 10_000];

        let mut small = HashingReader::new(&data[..], HashAlgorithm::Sha256.hasher());
        let mut buf = [0u8; 7];
        while small.read(&mut buf).unwrap() > 0 {}

        let mut large = HashingReader::new(&data[..], HashAlgorithm::Sha256.hasher());
        let mut sink = Vec::new();
        io::copy(&mut large, &mut sink).unwrap();

        assert_eq!(small.finalize_hex(), large.finalize_hex());
    }
}
