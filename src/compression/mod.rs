// src/compression/mod.rs
//! Compression utilities
//!
//! The published metadata index is zstd-compressed (`metadata.xml.zst`) and
//! the Dell catalog is served gzip-compressed.

use std::io::{self, Read, Write};
use thiserror::Error;

/// zstd level used for the metadata index
pub const ZSTD_LEVEL: i32 = 19;

/// Compression-related errors
#[derive(Error, Debug)]
pub enum CompressionError {
    #[error("Failed to create {format} decoder: {source}")]
    DecoderCreation {
        format: &'static str,
        source: io::Error,
    },

    #[error("Failed to decompress {format} data: {source}")]
    Decompression {
        format: &'static str,
        source: io::Error,
    },

    #[error("Failed to compress {format} data: {source}")]
    Compression {
        format: &'static str,
        source: io::Error,
    },
}

/// Formats the mirror reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionFormat {
    /// Gzip (Dell catalog)
    Gzip,
    /// Zstandard (published metadata)
    Zstd,
}

impl CompressionFormat {
    /// Human-readable name for error messages
    pub fn name(&self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Zstd => "zstd",
        }
    }
}

/// Create a decompressing reader for the given format
pub fn create_decoder<'a, R: Read + 'a>(
    reader: R,
    format: CompressionFormat,
) -> Result<Box<dyn Read + 'a>, CompressionError> {
    match format {
        CompressionFormat::Gzip => Ok(Box::new(flate2::read::GzDecoder::new(reader))),
        CompressionFormat::Zstd => {
            let decoder = zstd::Decoder::new(reader).map_err(|e| CompressionError::DecoderCreation {
                format: "zstd",
                source: e,
            })?;
            Ok(Box::new(decoder))
        }
    }
}

/// Decompress a byte slice using the specified format
pub fn decompress(data: &[u8], format: CompressionFormat) -> Result<Vec<u8>, CompressionError> {
    let mut decoder = create_decoder(data, format)?;
    let mut output = Vec::new();
    decoder
        .read_to_end(&mut output)
        .map_err(|e| CompressionError::Decompression {
            format: format.name(),
            source: e,
        })?;
    Ok(output)
}

/// Stream `reader` into `writer` as a zstd frame
pub fn compress_zstd<R: Read, W: Write>(reader: &mut R, writer: W) -> Result<u64, CompressionError> {
    let to_err = |e: io::Error| CompressionError::Compression {
        format: "zstd",
        source: e,
    };

    let mut encoder = zstd::Encoder::new(writer, ZSTD_LEVEL).map_err(to_err)?;
    let written = io::copy(reader, &mut encoder).map_err(to_err)?;
    encoder.finish().map_err(to_err)?;
    Ok(written)
}
