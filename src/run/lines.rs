//! Byte-stream to line reassembly.

/// Reassembles an arbitrary byte stream into discrete lines.
///
/// Bytes arrive in whatever chunk sizes the pipe happens to produce, so a
/// line is only emitted once its `\n` terminator has been seen; a `\r`
/// directly before the terminator is stripped. Invalid UTF-8 decodes to
/// U+FFFD rather than failing, so this type has no error path.
///
/// One splitter is bound to one stream for its lifetime; it is not
/// restartable.
#[derive(Debug, Default)]
pub struct LineSplitter {
    buf: Vec<u8>,
}

impl LineSplitter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes, returning the lines it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Flush the trailing partial once the stream has closed.
    ///
    /// Returns `None` when the stream ended on a terminator, so an empty
    /// trailing buffer emits nothing extra.
    #[must_use]
    pub fn finish(self) -> Option<String> {
        if self.buf.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&self.buf).into_owned())
        }
    }
}
