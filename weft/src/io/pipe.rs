use super::AsyncHandle;

use std::io::{self, PipeReader, PipeWriter};

/// Creates an anonymous pipe, both ends wrapped for use from tasks.
///
/// Reads on the reader end report end of stream once every clone of the
/// writer end has been dropped.
pub fn pipe() -> io::Result<(AsyncHandle<PipeReader>, AsyncHandle<PipeWriter>)> {
    let (reader, writer) = io::pipe()?;

    Ok((AsyncHandle::new(reader), AsyncHandle::new(writer)))
}
