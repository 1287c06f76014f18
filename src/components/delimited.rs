//! Semicolon separated text files without headers or quoting.
//!
//! Names are cleaned of `;` at ingest, so no field ever needs quoting.

use crate::error::{AppResult, Error};
use csv::{QuoteStyle, Reader, ReaderBuilder, Terminator, Writer, WriterBuilder};

pub const DELIMITER: u8 = b';';

/// In-memory writer, one record per line
pub fn writer() -> Writer<Vec<u8>> {
    WriterBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(false)
        .flexible(true)
        .quote_style(QuoteStyle::Never)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new())
}

pub fn finish(writer: Writer<Vec<u8>>) -> AppResult<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| Error::Serialization(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| Error::Serialization(e.to_string()))
}

/// Reader over `content`; records may have any number of fields
pub fn reader(content: &str) -> Reader<&[u8]> {
    ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(content.as_bytes())
}
