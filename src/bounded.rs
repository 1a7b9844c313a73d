// Fixed-capacity containers with checked construction.
// Nothing here ever truncates: writes past capacity fail and the caller
// turns that into the matching PotaError.

use std::fmt;
use std::io;

/// A non-empty string of at most `N` bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct BoundedStr<const N: usize>(heapless::String<N>);

impl<const N: usize> BoundedStr<N> {
    /// Returns `None` for empty input or input longer than `N` bytes.
    pub fn new(value: &str) -> Option<Self> {
        if value.is_empty() {
            return None;
        }
        heapless::String::try_from(value).ok().map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl<const N: usize> fmt::Debug for BoundedStr<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl<const N: usize> fmt::Display for BoundedStr<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<const N: usize> AsRef<str> for BoundedStr<N> {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// `io::Write` sink backed by a fixed-capacity byte vector.
///
/// Used as the target for `serde_json::to_writer` so an oversized document
/// surfaces as an error instead of growing the heap.
pub struct BoundedWriter<const N: usize> {
    buf: heapless::Vec<u8, N>,
}

impl<const N: usize> BoundedWriter<N> {
    pub fn new() -> Self {
        Self {
            buf: heapless::Vec::new(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> heapless::Vec<u8, N> {
        self.buf
    }
}

impl<const N: usize> Default for BoundedWriter<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> io::Write for BoundedWriter<N> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf
            .extend_from_slice(data)
            .map_err(|_| io::Error::new(io::ErrorKind::WriteZero, "bounded buffer full"))?;
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
