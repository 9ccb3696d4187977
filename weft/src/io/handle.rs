use super::{Operation, Ticket, Transfer, offload, submit};
use crate::error::{Error, Result};
use crate::task::Task;

use std::fmt;
use std::io::{self, Read, Write};
use std::sync::Arc;

/// A blocking I/O object driven through completion signals.
///
/// Every operation runs on a helper thread; the calling task suspends on
/// its environment's signal until the operation reports. `S` is anything
/// that reads or writes through a shared reference, such as
/// [`File`](std::fs::File), [`TcpStream`](std::net::TcpStream) or the pipe
/// ends returned by [`pipe`](super::pipe).
///
/// Buffers are passed by value and handed back on completion.
///
/// # Examples
///
/// ```rust,ignore
/// let (reader, writer) = weft::io::pipe()?;
///
/// let task = Task::new(async move {
///     writer.write_async(b"ping".to_vec()).await?;
///     reader.read_exact_async(4).await
/// });
/// ```
pub struct AsyncHandle<S> {
    inner: Arc<S>,
}

impl<S> AsyncHandle<S>
where
    S: Send + Sync + 'static,
{
    /// Wraps an I/O object.
    pub fn new(inner: S) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Returns a reference to the wrapped object.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }
}

impl<S> AsyncHandle<S>
where
    S: Send + Sync + 'static,
    for<'a> &'a S: Read,
{
    /// Reads once into `buf`.
    ///
    /// The buffer comes back truncated to the bytes read; an empty buffer
    /// means end of stream (for a non-empty `buf`).
    pub fn read_async(&self, buf: Vec<u8>) -> Task<Vec<u8>> {
        submit(ReadOp {
            source: self.inner.clone(),
            buffer: Some(buf),
        })
    }

    /// Reads exactly `len` bytes, suspending as many times as needed.
    ///
    /// Fails with [`Error::UnexpectedEof`] if the stream ends first.
    pub fn read_exact_async(&self, len: usize) -> Task<Vec<u8>> {
        let handle = self.clone();

        Task::new(async move {
            let mut data = Vec::with_capacity(len);

            while data.len() < len {
                let chunk = handle.read_async(vec![0; len - data.len()]).await?;

                if chunk.is_empty() {
                    return Err(Error::UnexpectedEof {
                        expected: len,
                        received: data.len(),
                    });
                }

                data.extend_from_slice(&chunk);
            }

            Ok(data)
        })
    }
}

impl<S> AsyncHandle<S>
where
    S: Send + Sync + 'static,
    for<'a> &'a S: Write,
{
    /// Writes all of `data`, returning the number of bytes written.
    pub fn write_async(&self, data: Vec<u8>) -> Task<usize> {
        submit(WriteOp {
            sink: self.inner.clone(),
            data: Some(data),
        })
    }
}

impl<S> Clone for AsyncHandle<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for AsyncHandle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AsyncHandle").field(&self.inner).finish()
    }
}

struct ReadOp<S> {
    source: Arc<S>,
    buffer: Option<Vec<u8>>,
}

impl<S> Operation for ReadOp<S>
where
    S: Send + Sync + 'static,
    for<'a> &'a S: Read,
{
    type Output = Vec<u8>;

    fn name(&self) -> &'static str {
        "read"
    }

    fn initiate(&mut self, ticket: Ticket) -> io::Result<()> {
        let source = self.source.clone();
        let mut buffer = self.buffer.take().unwrap_or_default();

        offload(self.name(), ticket, move || {
            let bytes = loop {
                match (&*source).read(&mut buffer) {
                    Ok(bytes) => break bytes,
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                    Err(err) => return Err(err),
                }
            };

            Ok(Transfer {
                bytes,
                eof: bytes == 0 && !buffer.is_empty(),
                buffer,
            })
        })
    }

    fn finish(self, mut transfer: Transfer) -> Result<Self::Output> {
        transfer.buffer.truncate(transfer.bytes);
        Ok(transfer.buffer)
    }
}

struct WriteOp<S> {
    sink: Arc<S>,
    data: Option<Vec<u8>>,
}

impl<S> Operation for WriteOp<S>
where
    S: Send + Sync + 'static,
    for<'a> &'a S: Write,
{
    type Output = usize;

    fn name(&self) -> &'static str {
        "write"
    }

    fn initiate(&mut self, ticket: Ticket) -> io::Result<()> {
        let sink = self.sink.clone();
        let data = self.data.take().unwrap_or_default();

        offload(self.name(), ticket, move || {
            let mut writer = &*sink;
            writer.write_all(&data)?;
            writer.flush()?;

            Ok(Transfer {
                bytes: data.len(),
                eof: false,
                buffer: data,
            })
        })
    }

    fn finish(self, transfer: Transfer) -> Result<Self::Output> {
        Ok(transfer.bytes)
    }
}
