//! Format adapters: token sources and sinks.
//!
//! The codec never touches bytes itself. It pulls [`TokenGroup`]s from a
//! [`TokenSource`] and pushes them into a [`TokenSink`]; everything about a
//! concrete wire format lives behind those two traits. A token group is an
//! ordered mapping from field name to raw value, which is exactly what a
//! [`Record`] is, so the alias is literal.
//!
//! Built-in adapters:
//! - [`jsonl`] - newline-delimited JSON, always available. Also the storage
//!   format for sort spill segments.
//! - [`csv`] - delimited text with optional header row (feature `fmt-csv`).
//!
//! File-backed constructors decompress and compress transparently based on
//! the path (see [`compression`]).

use crate::record::Record;
use anyhow::Result;

pub mod compression;
pub mod jsonl;

#[cfg(feature = "fmt-csv")]
#[cfg_attr(docsrs, doc(cfg(feature = "fmt-csv")))]
pub mod csv;

/// One unit of adapter input or output: an ordered mapping from field name
/// to raw value.
pub type TokenGroup = Record;

/// Pull side of a format adapter.
pub trait TokenSource {
    /// Produces the next token group, or `None` at end of stream.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying bytes cannot be read or parsed.
    /// Errors are fatal to the stream; implementations are not required to
    /// recover after reporting one.
    fn next_token_group(&mut self) -> Result<Option<TokenGroup>>;
}

/// Push side of a format adapter.
pub trait TokenSink {
    /// Emits one token group to the underlying sink.
    ///
    /// # Errors
    ///
    /// Returns an error when the group cannot be rendered or written.
    fn emit_token_group(&mut self, group: &TokenGroup) -> Result<()>;

    /// Flushes buffered output down to the underlying sink.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying sink fails.
    fn flush(&mut self) -> Result<()>;

    /// Performance hint: when `true`, the sink may reuse one emitter buffer
    /// across groups. Emitted bytes must be identical either way.
    fn set_reuse_hint(&mut self, _reuse: bool) {}
}

impl<S: TokenSource + ?Sized> TokenSource for Box<S> {
    fn next_token_group(&mut self) -> Result<Option<TokenGroup>> {
        (**self).next_token_group()
    }
}

impl<K: TokenSink + ?Sized> TokenSink for Box<K> {
    fn emit_token_group(&mut self, group: &TokenGroup) -> Result<()> {
        (**self).emit_token_group(group)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn set_reuse_hint(&mut self, reuse: bool) {
        (**self).set_reuse_hint(reuse);
    }
}
