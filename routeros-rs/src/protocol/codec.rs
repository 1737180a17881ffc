use std::sync::Arc;

use tokio::io::{self, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use super::{
    error::{FramingError, ReadError},
    length::{encode_length, read_length},
    sentence::Sentence,
};
use crate::trace::{Direction, Tracer};

/// Reads length-prefixed words and sentences from a byte stream.
#[derive(Debug)]
pub struct WordReader<R> {
    inner: BufReader<R>,
    tracer: Arc<Tracer>,
    max_word_len: u32,
}

impl<R: AsyncRead + Unpin> WordReader<R> {
    /// Wraps `inner`, rejecting words longer than `max_word_len` bytes.
    pub fn new(inner: R, tracer: Arc<Tracer>, max_word_len: u32) -> Self {
        Self {
            inner: BufReader::new(inner),
            tracer,
            max_word_len,
        }
    }

    /// Reads a single word. An empty word marks the end of a sentence.
    ///
    /// The bytes are copied verbatim and decoded as UTF-8; invalid sequences are
    /// replaced rather than rejected so that the stream stays in sync.
    pub async fn read_word(&mut self) -> Result<String, ReadError> {
        let len = read_length(&mut self.inner).await?;
        if len == 0 {
            return Ok(String::new());
        }
        if len > self.max_word_len {
            return Err(FramingError::WordTooLong {
                len,
                max: self.max_word_len,
            }
            .into());
        }

        let mut buf = vec![0_u8; len as usize];
        self.inner.read_exact(&mut buf).await?;
        let word = match String::from_utf8(buf) {
            Ok(word) => word,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        };
        self.tracer.record(Direction::Inbound, &word);
        Ok(word)
    }

    /// Reads words until the empty terminator and assembles them into a [`Sentence`].
    ///
    /// On error the partially read sentence is discarded.
    pub async fn read_sentence(&mut self) -> Result<Sentence, ReadError> {
        let mut sentence = Sentence::new();
        loop {
            let word = self.read_word().await?;
            if word.is_empty() {
                return Ok(sentence);
            }
            sentence.push_word(&word);
        }
    }
}

/// Writes length-prefixed words and sentences to a byte stream.
#[derive(Debug)]
pub struct WordWriter<W> {
    inner: W,
    tracer: Arc<Tracer>,
    buf: Vec<u8>,
}

impl<W: AsyncWrite + Unpin> WordWriter<W> {
    /// Wraps `inner`.
    pub fn new(inner: W, tracer: Arc<Tracer>) -> Self {
        Self {
            inner,
            tracer,
            buf: Vec::new(),
        }
    }

    /// Writes a single word with its length prefix.
    pub async fn write_word(&mut self, word: &str) -> io::Result<()> {
        self.buf.clear();
        self.encode_word(word)?;
        self.inner.write_all(&self.buf).await?;
        self.inner.flush().await
    }

    /// Writes every word followed by the empty terminator word.
    ///
    /// The sentence is encoded in full before any byte hits the stream.
    pub async fn write_sentence<I, S>(&mut self, words: I) -> io::Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.buf.clear();
        for word in words {
            self.encode_word(word.as_ref())?;
        }
        self.buf.push(0);
        self.inner.write_all(&self.buf).await?;
        self.inner.flush().await
    }

    /// Gives access to the underlying stream, bypassing the framing.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Shuts down the write side of the stream.
    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.inner.shutdown().await
    }

    fn encode_word(&mut self, word: &str) -> io::Result<()> {
        let len = u32::try_from(word.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "word too long"))?;
        self.tracer.record(Direction::Outbound, word);
        self.buf.extend_from_slice(&encode_length(len));
        self.buf.extend_from_slice(word.as_bytes());
        Ok(())
    }
}
