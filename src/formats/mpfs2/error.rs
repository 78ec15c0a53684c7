/// Errors raised while decoding the structure of an MPFS2 image.
///
/// Header and table level errors abort the whole decode. The per-record
/// variants are collected in [`DecodedImage::issues`](super::DecodedImage)
/// unless the decode runs with [`Strictness::FailFast`](super::Strictness).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    /// The image does not start with `MPFS`
    #[error("not an MPFS image: bad signature {found:02X?}")]
    BadSignature {
        /// Up to the first four bytes of the image
        found: Vec<u8>,
    },
    /// A read ran past the end of the image
    #[error("{region} truncated: need {required} bytes at offset {offset:#x}, image has {available}")]
    Truncated {
        /// Which part of the image was being read
        region: &'static str,
        /// Absolute offset the read started at
        offset: u64,
        /// Bytes the read needed
        required: u64,
        /// Total image length
        available: usize,
    },
    /// A has-index record is the last record of the table
    #[error("record {index} has an index but no record follows it")]
    DanglingIndex {
        /// Position of the has-index record
        index: usize,
    },
    /// The record after a has-index record has a name
    #[error("record {index} should be the index of record {owner} but has a name")]
    MalformedIndexCompanion {
        /// Position of the has-index record
        owner: usize,
        /// Position of the offending record
        index: usize,
    },
    /// A record outside an index pairing has an empty name
    #[error("record {index} should have a name")]
    UnnamedRecord {
        /// Position of the unnamed record
        index: usize,
    },
    /// A variable id resolved to two different names
    #[error("bad index variable {id}: resolved as both {first:?} and {second:?}")]
    InconsistentVariable {
        id: u32,
        first: String,
        second: String,
    },
}

impl FormatError {
    pub(crate) fn truncated(region: &'static str, offset: u64, required: u64, available: usize) -> Self {
        FormatError::Truncated { region, offset, required, available }
    }
}

/// Errors raised while extracting the payload of a single record.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error(transparent)]
    Format(#[from] FormatError),
    /// The record is flagged as gzip but does not decompress
    #[error("corrupt gzip payload at {data_ptr:#x}: {source}")]
    CorruptPayload {
        data_ptr: u32,
        #[source]
        source: std::io::Error,
    },
}
