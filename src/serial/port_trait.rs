//! Trait abstraction for link I/O operations to enable testing

use async_trait::async_trait;
use std::io;
use tokio::io::AsyncRead;

use crate::error::Result;

/// Trait for reading from an open link
#[async_trait]
pub trait SerialPortIO: Send {
    /// Read available bytes into `buf`
    ///
    /// Returns `Ok(0)` when the link has been closed by the other side.
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Trait for opening a link endpoint
#[async_trait]
pub trait LinkOpener: Send + Sync {
    /// Open the endpoint; an empty endpoint asks the opener to pick one
    async fn open(&self, endpoint: &str) -> Result<Box<dyn SerialPortIO>>;
}

/// Wrapper around any async byte source that implements SerialPortIO
pub struct AsyncPort<T> {
    inner: T,
}

/// Real serial port link
pub type TokioSerialPort = AsyncPort<tokio_serial::SerialStream>;

impl<T> AsyncPort<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<T: AsyncRead + Unpin + Send> SerialPortIO for AsyncPort<T> {
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        use tokio::io::AsyncReadExt;
        self.inner.read(buf).await
    }
}
