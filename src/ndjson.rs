// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jason Ish

//! Incremental decoding of a byte stream carrying concatenated JSON objects.
//!
//! Objects are usually newline delimited, but nothing here depends on that:
//! an object split across chunks, or several objects in one chunk, decode
//! the same way.

use futures::Stream;
use futures::StreamExt;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

pub(crate) struct JsonObjectStream<S> {
    stream: S,
    buffer: Vec<u8>,
}

impl<S> JsonObjectStream<S> {
    pub(crate) fn new(stream: S) -> Self {
        Self {
            stream,
            buffer: Vec::new(),
        }
    }
}

impl<S, B, E> JsonObjectStream<S>
where
    S: Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    Error: From<E>,
{
    /// Returns the next decoded object, `None` at a clean end of stream.
    ///
    /// Malformed JSON, or a partial object left over when the stream ends,
    /// is a stream error.
    pub(crate) async fn next_object<T: DeserializeOwned>(&mut self) -> Option<Result<T>> {
        loop {
            match self.decode_buffered::<T>() {
                Ok(Some(value)) => return Some(Ok(value)),
                Ok(None) => {}
                Err(e) => return Some(Err(e)),
            }

            match self.stream.next().await {
                Some(Ok(chunk)) => self.buffer.extend_from_slice(chunk.as_ref()),
                Some(Err(e)) => return Some(Err(Error::from(e))),
                None => {
                    if self.buffer.iter().all(u8::is_ascii_whitespace) {
                        return None;
                    }
                    let rest = String::from_utf8_lossy(&self.buffer).into_owned();
                    self.buffer.clear();
                    return Some(Err(Error::Stream(format!(
                        "stream ended inside a JSON object: {rest}"
                    ))));
                }
            }
        }
    }

    /// Decode one object from the buffer. `Ok(None)` means more bytes are
    /// needed.
    fn decode_buffered<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
        if self.buffer.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        let mut iter = serde_json::Deserializer::from_slice(&self.buffer).into_iter::<T>();
        match iter.next() {
            Some(Ok(value)) => {
                let consumed = iter.byte_offset();
                self.buffer.drain(..consumed);
                Ok(Some(value))
            }
            Some(Err(e)) if e.is_eof() => Ok(None),
            Some(Err(e)) => {
                self.buffer.clear();
                Err(Error::Stream(e.to_string()))
            }
            None => Ok(None),
        }
    }
}
