// Wed Jan 15 2026 - Alex

pub mod hash;

use std::io::Read;
use thiserror::Error;

pub use hash::xxh32;

pub const MAGIC: [u8; 4] = *b"RSB1";
pub const KEY_MULTIPLIER: usize = 41;
pub const HASH_SEED: u32 = 42;
pub const HEADER_LEN: usize = 8;
const COMPRESSION_LEVEL: i32 = 3;
// Upfront reservation cap; larger payloads grow while decompressing.
const MAX_PREALLOC: usize = 1 << 20;

#[derive(Error, Debug)]
pub enum BytecodeError {
    #[error("Container shorter than its {HEADER_LEN}-byte header")]
    Truncated,
    #[error("Integrity digest mismatch")]
    IntegrityMismatch,
    #[error("Decompressed size does not match the declared {declared} bytes")]
    LengthMismatch { declared: usize },
    #[error("Payload of {0} bytes does not fit the container")]
    TooLarge(usize),
    #[error("Compression error: {0}")]
    Compression(#[from] std::io::Error),
}

/// Envelope for script bytecode exchanged with the target:
/// `[obfuscated digest (4)][raw length LE (4)][zstd payload]`, with every
/// byte XOR-keyed by the xxHash32 digest of the plain buffer.
pub struct ScriptBytecode;

impl ScriptBytecode {
    pub fn encode(raw: &[u8]) -> Result<Vec<u8>, BytecodeError> {
        let declared = u32::try_from(raw.len()).map_err(|_| BytecodeError::TooLarge(raw.len()))?;
        let compressed = zstd::bulk::compress(raw, COMPRESSION_LEVEL)?;

        let mut buffer = Vec::with_capacity(HEADER_LEN + compressed.len());
        buffer.extend_from_slice(&MAGIC);
        buffer.extend_from_slice(&declared.to_le_bytes());
        buffer.extend_from_slice(&compressed);

        let digest = xxh32(&buffer, HASH_SEED).to_le_bytes();
        apply_key(&mut buffer, digest);
        // The keyed magic is the header: magic[i] ^ key(i).
        Ok(buffer)
    }

    pub fn decode(container: &[u8]) -> Result<Vec<u8>, BytecodeError> {
        if container.len() < HEADER_LEN {
            return Err(BytecodeError::Truncated);
        }

        let mut digest = [0u8; 4];
        for (i, byte) in digest.iter_mut().enumerate() {
            *byte = (container[i] ^ MAGIC[i]).wrapping_sub(key_offset(i));
        }

        let mut plain = container.to_vec();
        apply_key(&mut plain, digest);
        if xxh32(&plain, HASH_SEED) != u32::from_le_bytes(digest) {
            return Err(BytecodeError::IntegrityMismatch);
        }

        let declared = u32::from_le_bytes([plain[4], plain[5], plain[6], plain[7]]) as usize;
        let decoder = zstd::stream::read::Decoder::new(&plain[HEADER_LEN..])?;
        let mut output = Vec::with_capacity(declared.min(MAX_PREALLOC));
        // one byte of slack is enough to notice an oversized payload
        decoder.take(declared as u64 + 1).read_to_end(&mut output)?;
        if output.len() != declared {
            return Err(BytecodeError::LengthMismatch { declared });
        }
        Ok(output)
    }

    /// Empty output means the payload must not be trusted.
    pub fn decode_or_empty(container: &[u8]) -> Vec<u8> {
        Self::decode(container).unwrap_or_else(|e| {
            log::warn!("rejected bytecode container of {} bytes: {}", container.len(), e);
            Vec::new()
        })
    }
}

fn key_offset(i: usize) -> u8 {
    i.wrapping_mul(KEY_MULTIPLIER) as u8
}

fn apply_key(buffer: &mut [u8], digest: [u8; 4]) {
    for (i, byte) in buffer.iter_mut().enumerate() {
        *byte ^= digest[i % 4].wrapping_add(key_offset(i));
    }
}
