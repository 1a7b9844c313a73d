// Secure byte-stream transport used for the check-in exchange

use std::fmt::Debug;

/// Result of polling for response bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// At least one byte can be read without blocking.
    Ready,
    /// Nothing yet, the connection is still open.
    Pending,
    /// The peer closed the connection and nothing is buffered.
    Closed,
}

/// TLS client socket as seen by the update check.
///
/// Implementations own the TLS state; the session borrows the transport for
/// exactly one connect/send/receive round trip and always calls [`close`]
/// before returning.
///
/// [`close`]: SecureTransport::close
pub trait SecureTransport {
    type Error: Debug;

    /// Installs the PEM root certificate used to validate the server.
    fn set_trust_anchor(&mut self, pem: &str) -> Result<(), Self::Error>;

    fn connect(&mut self, host: &str, port: u16) -> Result<(), Self::Error>;

    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    fn poll_readable(&mut self) -> Result<Readiness, Self::Error>;

    /// Reads up to and including the next `\n`, storing at most `buf.len()`
    /// bytes. The newline itself is consumed but not stored. When the buffer
    /// fills before a newline arrives the rest of the line stays unread.
    ///
    /// Returns `None` once the stream is exhausted.
    fn read_line(&mut self, buf: &mut [u8]) -> Result<Option<usize>, Self::Error>;

    /// Reads raw bytes; `Ok(0)` means end of stream.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    fn close(&mut self);
}

/// Closes the borrowed transport when dropped, on every exit path.
pub struct ConnectionGuard<'a, T: SecureTransport> {
    transport: &'a mut T,
}

impl<'a, T: SecureTransport> ConnectionGuard<'a, T> {
    pub fn new(transport: &'a mut T) -> Self {
        Self { transport }
    }
}

impl<T: SecureTransport> std::ops::Deref for ConnectionGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.transport
    }
}

impl<T: SecureTransport> std::ops::DerefMut for ConnectionGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.transport
    }
}

impl<T: SecureTransport> Drop for ConnectionGuard<'_, T> {
    fn drop(&mut self) {
        self.transport.close();
        log::info!("Disconnected from server");
    }
}
