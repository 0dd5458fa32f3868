//! Content-Encoding negotiation and response decompression.
//!
//! A request selects a [`Compression`] mode. On the way out the mode becomes an
//! `Accept-Encoding` header; on the way back [`verify_and_decompress`] checks the
//! server's `Content-Encoding` against it and decodes the body with the matching
//! [`Compressor`].
//!
//! | Mode                   | `Accept-Encoding`   | Response handling                      |
//! |------------------------|---------------------|----------------------------------------|
//! | [`Compression::None`]    | not sent            | body untouched                         |
//! | [`Compression::Gzip`]    | `gzip`              | must be `gzip` (or decoded by transport) |
//! | [`Compression::Brotli`]  | `br`                | must be `br`                           |
//! | [`Compression::Deflate`] | `deflate`           | must be `deflate`                      |
//! | [`Compression::All`]     | `gzip, deflate, br` | decoded per `Content-Encoding`         |

use crate::error::{DecompressionError, HttpError};
use bytes::Bytes;
use http::HeaderMap;
use std::io::{Read, Write};

/// `gzip` content-coding token
pub const GZIP: &str = "gzip";
/// `br` (Brotli) content-coding token
pub const BROTLI: &str = "br";
/// `deflate` (zlib) content-coding token
pub const DEFLATE: &str = "deflate";
/// `Accept-Encoding` value offering every supported algorithm
pub const ACCEPT_ALL: &str = "gzip, deflate, br";

const BROTLI_BUFFER_SIZE: usize = 4096;
const BROTLI_WINDOW: u32 = 22;

/// Compression level tier.
///
/// Each algorithm maps a tier to its own numeric scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompressionLevel {
    /// Lowest latency (gzip/deflate 1, brotli 0)
    Fastest,
    /// Library default (gzip/deflate 6, brotli 6)
    #[default]
    Default,
    /// Smallest output (gzip/deflate 9, brotli 11)
    Best,
}

/// A compression algorithm usable for HTTP content-coding.
pub trait Compressor: Send + Sync {
    /// Content-coding token (`gzip`, `br`, `deflate`)
    fn name(&self) -> &'static str;

    /// Current level tier
    fn level(&self) -> CompressionLevel;

    /// Change the level used by [`Compressor::compress`]
    fn set_level(&mut self, level: CompressionLevel);

    /// Encode `data` with this algorithm.
    ///
    /// # Errors
    /// Returns the encoder's I/O error.
    fn compress(&self, data: &[u8]) -> std::io::Result<Vec<u8>>;

    /// Decode `data` with this algorithm.
    ///
    /// # Errors
    /// Returns [`DecompressionError`] if `data` is not a valid stream.
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, DecompressionError>;
}

/// gzip (RFC 1952)
#[derive(Debug, Clone, Copy, Default)]
pub struct GzipCompressor {
    level: CompressionLevel,
}

/// deflate as used by HTTP: zlib-wrapped (RFC 1950)
#[derive(Debug, Clone, Copy, Default)]
pub struct DeflateCompressor {
    level: CompressionLevel,
}

/// Brotli (RFC 7932)
#[derive(Debug, Clone, Copy, Default)]
pub struct BrotliCompressor {
    level: CompressionLevel,
}

fn flate_level(level: CompressionLevel) -> flate2::Compression {
    match level {
        CompressionLevel::Fastest => flate2::Compression::fast(),
        CompressionLevel::Default => flate2::Compression::default(),
        CompressionLevel::Best => flate2::Compression::best(),
    }
}

fn brotli_quality(level: CompressionLevel) -> u32 {
    match level {
        CompressionLevel::Fastest => 0,
        CompressionLevel::Default => 6,
        CompressionLevel::Best => 11,
    }
}

fn read_all(algorithm: &'static str, mut reader: impl Read) -> Result<Vec<u8>, DecompressionError> {
    let mut out = Vec::new();
    reader
        .read_to_end(&mut out)
        .map_err(|source| DecompressionError { algorithm, source })?;
    Ok(out)
}

impl Compressor for GzipCompressor {
    fn name(&self) -> &'static str {
        GZIP
    }

    fn level(&self) -> CompressionLevel {
        self.level
    }

    fn set_level(&mut self, level: CompressionLevel) {
        self.level = level;
    }

    fn compress(&self, data: &[u8]) -> std::io::Result<Vec<u8>> {
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate_level(self.level));
        encoder.write_all(data)?;
        encoder.finish()
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, DecompressionError> {
        read_all(GZIP, flate2::read::MultiGzDecoder::new(data))
    }
}

impl Compressor for DeflateCompressor {
    fn name(&self) -> &'static str {
        DEFLATE
    }

    fn level(&self) -> CompressionLevel {
        self.level
    }

    fn set_level(&mut self, level: CompressionLevel) {
        self.level = level;
    }

    fn compress(&self, data: &[u8]) -> std::io::Result<Vec<u8>> {
        let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate_level(self.level));
        encoder.write_all(data)?;
        encoder.finish()
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, DecompressionError> {
        read_all(DEFLATE, flate2::read::ZlibDecoder::new(data))
    }
}

impl Compressor for BrotliCompressor {
    fn name(&self) -> &'static str {
        BROTLI
    }

    fn level(&self) -> CompressionLevel {
        self.level
    }

    fn set_level(&mut self, level: CompressionLevel) {
        self.level = level;
    }

    fn compress(&self, data: &[u8]) -> std::io::Result<Vec<u8>> {
        let mut writer = brotli::CompressorWriter::new(
            Vec::new(),
            BROTLI_BUFFER_SIZE,
            brotli_quality(self.level),
            BROTLI_WINDOW,
        );
        writer.write_all(data)?;
        writer.flush()?;
        Ok(writer.into_inner())
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, DecompressionError> {
        read_all(BROTLI, brotli::Decompressor::new(data, BROTLI_BUFFER_SIZE))
    }
}

/// Compression requested for a response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum Compression {
    /// No negotiation; the body is returned as received
    #[default]
    None,
    /// Ask for and require gzip
    Gzip,
    /// Ask for and require Brotli
    Brotli,
    /// Ask for and require deflate
    Deflate,
    /// Offer all three and decode whichever the server picked
    All,
}

impl Compression {
    /// `Accept-Encoding` value for this mode, `None` when nothing is negotiated
    #[must_use]
    pub fn accept_encoding(self) -> Option<&'static str> {
        match self {
            Compression::None => None,
            Compression::All => Some(ACCEPT_ALL),
            single => single.algorithm(),
        }
    }

    /// Content-coding token of a single-algorithm mode
    #[must_use]
    pub fn algorithm(self) -> Option<&'static str> {
        match self {
            Compression::Gzip => Some(GZIP),
            Compression::Brotli => Some(BROTLI),
            Compression::Deflate => Some(DEFLATE),
            Compression::None | Compression::All => None,
        }
    }

    /// Negotiated compressor for a single-algorithm mode, set to the fastest tier
    #[must_use]
    pub fn compressor(self) -> Option<Box<dyn Compressor>> {
        self.algorithm().and_then(compressor_for)
    }
}

/// Compressor for a content-coding token, configured at the fastest tier.
///
/// Returns `None` for tokens this crate cannot decode.
#[must_use]
pub fn compressor_for(token: &str) -> Option<Box<dyn Compressor>> {
    let mut compressor: Box<dyn Compressor> = if token.eq_ignore_ascii_case(GZIP) {
        Box::new(GzipCompressor::default())
    } else if token.eq_ignore_ascii_case(BROTLI) {
        Box::new(BrotliCompressor::default())
    } else if token.eq_ignore_ascii_case(DEFLATE) {
        Box::new(DeflateCompressor::default())
    } else {
        return None;
    };
    compressor.set_level(CompressionLevel::Fastest);
    Some(compressor)
}

/// Lower-cased content-coding tokens from every `Content-Encoding` header, in order
fn content_encodings(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(http::header::CONTENT_ENCODING)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|token| token.trim().to_ascii_lowercase())
        .filter(|token| !token.is_empty())
        .collect()
}

fn raw_content_encoding(headers: &HeaderMap) -> Option<String> {
    let values: Vec<&str> = headers
        .get_all(http::header::CONTENT_ENCODING)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values.join(", "))
    }
}

/// Check the response encoding against the requested mode and decode the body.
///
/// `transparent_gzip` tells that the transport already decoded gzip itself, in
/// which case a [`Compression::Gzip`] body is passed through unchanged.
///
/// # Errors
///
/// - [`HttpError::ContentEncodingMismatch`] if the server did not use the
///   negotiated encoding
/// - [`HttpError::Decompression`] if the body is not a valid stream
pub fn verify_and_decompress(
    headers: &HeaderMap,
    body: Bytes,
    compression: Compression,
    transparent_gzip: bool,
) -> Result<Bytes, HttpError> {
    let encodings = content_encodings(headers);

    match compression {
        Compression::None => Ok(body),
        Compression::Gzip if transparent_gzip => {
            tracing::trace!("gzip handled by transport, passing body through");
            Ok(body)
        }
        Compression::All => decode_any(headers, &encodings, body),
        single => {
            let Some(compressor) = single.compressor() else {
                return Ok(body);
            };
            if !encodings.iter().any(|token| token == compressor.name()) {
                return Err(HttpError::ContentEncodingMismatch {
                    expected: compressor.name().to_owned(),
                    actual: raw_content_encoding(headers),
                });
            }
            tracing::trace!(algorithm = compressor.name(), "decoding response body");
            Ok(Bytes::from(compressor.decompress(&body)?))
        }
    }
}

/// Decode with whatever the server applied; codings are undone last-applied first.
fn decode_any(headers: &HeaderMap, encodings: &[String], body: Bytes) -> Result<Bytes, HttpError> {
    let mut decoded = body;
    for token in encodings.iter().rev() {
        if token == "identity" {
            continue;
        }
        let Some(compressor) = compressor_for(token) else {
            return Err(HttpError::ContentEncodingMismatch {
                expected: ACCEPT_ALL.to_owned(),
                actual: raw_content_encoding(headers),
            });
        };
        tracing::trace!(algorithm = compressor.name(), "decoding response body");
        decoded = Bytes::from(compressor.decompress(&decoded)?);
    }
    Ok(decoded)
}
