//! Pluggable encode/decode pair bridging opaque `Img` values and the bytes
//! the disk tier persists. The cache itself is bytes-in/image-out and relies
//! entirely on an injected codec to cross that boundary.

/// Converts between an in-memory image value and its on-disk byte
/// representation. The core never interprets the bytes — decoding is purely
/// about whether the blob deserializes, not what it means.
pub trait ImageCodec<Img>: Send + Sync + 'static {
    /// Serialize an image to bytes for the disk tier.
    fn encode(&self, image: &Img) -> Vec<u8>;

    /// Deserialize bytes read from the disk tier. Returns `None` for a blob
    /// that fails to parse — the disk tier treats that as a miss and deletes
    /// the file rather than surfacing an error.
    fn decode(&self, bytes: &[u8]) -> Option<Img>;
}

/// Identity codec for image representations that are already raw bytes
/// (`Img = Vec<u8>`). Convenient for embedders whose `Provider::Image` is
/// already the encoded form (e.g. a JPEG/PNG byte buffer which some other
/// layer decodes outside the core).
#[derive(Clone, Copy, Debug, Default)]
pub struct RawBytesCodec;

impl ImageCodec<Vec<u8>> for RawBytesCodec {
    fn encode(&self, image: &Vec<u8>) -> Vec<u8> {
        image.clone()
    }

    fn decode(&self, bytes: &[u8]) -> Option<Vec<u8>> {
        Some(bytes.to_vec())
    }
}
