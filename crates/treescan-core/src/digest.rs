//! Streaming content digests.
//!
//! Every requested algorithm is fed from the same byte stream, so hashing a
//! file with several algorithms reads it once.

use std::io::Read;

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use strum::{Display, EnumIter, EnumString};

/// Default read size when streaming a file into digests (1 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Supported content digest algorithms.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Md5,
    #[strum(to_string = "sha1", serialize = "sha-1")]
    Sha1,
    #[strum(to_string = "sha256", serialize = "sha-256")]
    Sha256,
    Blake3,
}

/// Running state for one algorithm.
enum Accumulator {
    Md5(Md5),
    Sha1(Sha1),
    Sha256(Sha256),
    Blake3(Box<blake3::Hasher>),
}

impl Accumulator {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Md5 => Self::Md5(Md5::new()),
            HashAlgorithm::Sha1 => Self::Sha1(Sha1::new()),
            HashAlgorithm::Sha256 => Self::Sha256(Sha256::new()),
            HashAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Md5(h) => h.update(data),
            Self::Sha1(h) => h.update(data),
            Self::Sha256(h) => h.update(data),
            Self::Blake3(h) => {
                h.update(data);
            }
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            Self::Md5(h) => hex::encode(h.finalize()),
            Self::Sha1(h) => hex::encode(h.finalize()),
            Self::Sha256(h) => hex::encode(h.finalize()),
            Self::Blake3(h) => h.finalize().to_hex().to_string(),
        }
    }
}

/// Stream `reader` through every algorithm in a single pass.
///
/// Returns one lowercase hex digest per algorithm, in request order.
pub(crate) fn digest_reader<R: Read>(
    mut reader: R,
    algorithms: &[HashAlgorithm],
    chunk_size: usize,
) -> std::io::Result<Vec<String>> {
    let mut accumulators: Vec<Accumulator> =
        algorithms.iter().copied().map(Accumulator::new).collect();
    let mut buffer = vec![0u8; chunk_size];

    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        for acc in &mut accumulators {
            acc.update(&buffer[..n]);
        }
    }

    Ok(accumulators
        .into_iter()
        .map(Accumulator::finalize_hex)
        .collect())
}
