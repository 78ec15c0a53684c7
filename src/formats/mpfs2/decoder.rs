use std::borrow::Cow;
use std::io::{self, Cursor};
use std::thread;

use binrw::BinReaderExt;
use indexmap::IndexMap;
use log::{debug, warn};

use super::error::{ExtractError, FormatError};
use super::include::*;
use super::variables;
use crate::utils::common;
use crate::utils::compression::{decompress_gzip, is_gzip};

/// What to do with per-record problems found while decoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strictness {
    /// The first per-record problem fails the decode.
    FailFast,
    /// Problems are collected in [`DecodedImage::issues`] and decoding carries on.
    #[default]
    Lenient,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeOptions {
    pub strictness: Strictness,
}

/// Role of a record in the table, fixed by its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// A regular named file
    File,
    /// The unnamed index companion of the record at `owner`
    Index { owner: usize },
    /// A record with an empty name outside an index pairing
    Unnamed,
}

/// How an empty name is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameStyle {
    /// `<no name>`
    Label,
    /// The string pointer as six hex digits
    HexOffset,
}

/// Payload of one record as produced by [`DecodedImage::extract_all`].
#[derive(Debug)]
pub struct Extracted<'a> {
    pub index: usize,
    pub result: Result<Cow<'a, [u8]>, ExtractError>,
}

/// Read-only view over a decoded MPFS2 image.
///
/// `records`, `name_hashes` and `kinds` are parallel arrays in on-disk order.
#[derive(Debug)]
pub struct DecodedImage<'a> {
    image: &'a [u8],
    pub header: Header,
    pub name_hashes: Vec<u16>,
    pub records: Vec<FileRecord>,
    pub kinds: Vec<RecordKind>,
    pub dynamic_variables: IndexMap<u32, String>,
    pub issues: Vec<FormatError>,
}

pub fn decode(image: &[u8]) -> Result<DecodedImage<'_>, FormatError> {
    decode_with(image, DecodeOptions::default())
}

pub fn decode_with(image: &[u8], options: DecodeOptions) -> Result<DecodedImage<'_>, FormatError> {
    let header = read_header(image)?;
    if !header.is_mpfs2() {
        warn!("Unexpected MPFS version {}, decoding as MPFS2", header.version());
    }

    let (name_hashes, records) = read_tables(image, &header)?;

    let mut issues = Vec::new();
    let kinds = link_records(image, &records, &mut issues)?;

    // linkage has to be complete before anything looks at the indexes
    let scan = variables::find_variables(image, &records, &kinds);
    issues.extend(scan.issues);

    if options.strictness == Strictness::FailFast {
        if let Some(issue) = issues
            .iter()
            .find(|issue| !matches!(issue, FormatError::InconsistentVariable { .. }))
        {
            return Err(issue.clone());
        }
    }

    Ok(DecodedImage {
        image,
        header,
        name_hashes,
        records,
        kinds,
        dynamic_variables: scan.variables,
        issues,
    })
}

fn read_header(image: &[u8]) -> Result<Header, FormatError> {
    if !image.starts_with(SIGNATURE) {
        return Err(FormatError::BadSignature {
            found: image[..image.len().min(SIGNATURE.len())].to_vec(),
        });
    }
    if image.len() < HEADER_SIZE {
        return Err(FormatError::truncated("header", 0, HEADER_SIZE as u64, image.len()));
    }

    let mut reader = Cursor::new(image);
    reader
        .read_le()
        .map_err(|_| FormatError::truncated("header", 0, HEADER_SIZE as u64, image.len()))
}

fn read_tables(image: &[u8], header: &Header) -> Result<(Vec<u16>, Vec<FileRecord>), FormatError> {
    let count = header.file_count as usize;
    let hashes_size = NAME_HASH_SIZE * count;
    let records_offset = HEADER_SIZE + hashes_size;

    // check whole regions up front, the count comes straight from the file
    if image.len() < records_offset {
        return Err(FormatError::truncated("name hash table", HEADER_SIZE as u64, hashes_size as u64, image.len()));
    }
    if image.len() < header.tables_size() {
        return Err(FormatError::truncated(
            "record table",
            records_offset as u64,
            (FILE_RECORD_SIZE * count) as u64,
            image.len(),
        ));
    }

    let mut reader = Cursor::new(image);
    reader.set_position(HEADER_SIZE as u64);

    let mut name_hashes = Vec::with_capacity(count);
    for _i in 0..count {
        let offset = reader.position();
        let hash: u16 = reader
            .read_le()
            .map_err(|_| FormatError::truncated("name hash table", offset, NAME_HASH_SIZE as u64, image.len()))?;
        name_hashes.push(hash);
    }

    let mut records = Vec::with_capacity(count);
    for i in 0..count {
        let offset = reader.position();
        let record: FileRecord = reader
            .read_le()
            .map_err(|_| FormatError::truncated("record table", offset, FILE_RECORD_SIZE as u64, image.len()))?;
        debug!(
            "Record {} - String: {:#x}, Data: {:#x}, Len: {}, Flags: {:#06x}",
            i, record.string_ptr, record.data_ptr, record.len, record.flags
        );
        records.push(record);
    }

    Ok((name_hashes, records))
}

fn first_name_byte(image: &[u8], record: &FileRecord) -> Option<u8> {
    image.get(record.string_ptr as usize).copied()
}

/// Assigns every record its [`RecordKind`]. A has-index record claims the
/// record right after it, which must be unnamed.
fn link_records(image: &[u8], records: &[FileRecord], issues: &mut Vec<FormatError>) -> Result<Vec<RecordKind>, FormatError> {
    let mut kinds = Vec::with_capacity(records.len());

    let mut i = 0;
    while i < records.len() {
        let record = &records[i];

        let kind = match first_name_byte(image, record) {
            Some(0) => {
                issues.push(FormatError::UnnamedRecord { index: i });
                RecordKind::Unnamed
            }
            Some(_) => RecordKind::File,
            None => {
                issues.push(FormatError::truncated("string", record.string_ptr as u64, 1, image.len()));
                RecordKind::File
            }
        };
        kinds.push(kind);

        if record.has_index() {
            let companion = records.get(i + 1).ok_or(FormatError::DanglingIndex { index: i })?;
            if first_name_byte(image, companion) == Some(0) {
                kinds.push(RecordKind::Index { owner: i });
                i += 2;
                continue;
            }
            // not consumed, it gets looked at as a regular record next
            issues.push(FormatError::MalformedIndexCompanion { owner: i, index: i + 1 });
        }

        i += 1;
    }

    Ok(kinds)
}

fn escape_name(bytes: &[u8]) -> String {
    let mut name = String::with_capacity(bytes.len());
    for &b in bytes {
        if b < 32 {
            name.push_str(&format!("<{}>", b));
        } else {
            name.push(b as char);
        }
    }
    name
}

impl<'a> DecodedImage<'a> {
    /// Raw name bytes of `record`, without the terminator.
    pub fn name_bytes(&self, record: &FileRecord) -> Result<&'a [u8], FormatError> {
        let ptr = record.string_ptr as u64;
        common::bytes_until(self.image, ptr, 0).ok_or_else(|| {
            let remaining = (self.image.len() as u64).saturating_sub(ptr);
            FormatError::truncated("string", ptr, remaining + 1, self.image.len())
        })
    }

    pub fn resolve_name(&self, record: &FileRecord) -> Result<String, FormatError> {
        self.resolve_name_as(record, NameStyle::Label)
    }

    pub fn resolve_name_as(&self, record: &FileRecord, style: NameStyle) -> Result<String, FormatError> {
        let bytes = self.name_bytes(record)?;
        if bytes.is_empty() {
            return Ok(match style {
                NameStyle::Label => NO_NAME.to_string(),
                NameStyle::HexOffset => format!("{:06X}", record.string_ptr),
            });
        }
        Ok(escape_name(bytes))
    }

    /// Name used for listing and extraction: companions are named after
    /// their owner, unnamed records after their string offset.
    pub fn entry_name(&self, index: usize) -> Result<String, FormatError> {
        let record = &self.records[index];
        match self.kinds[index] {
            RecordKind::File => self.resolve_name(record),
            RecordKind::Index { owner } => Ok(format!("{}-index", self.entry_name(owner)?)),
            RecordKind::Unnamed => self.resolve_name_as(record, NameStyle::HexOffset),
        }
    }

    pub fn find(&self, name: &str) -> Option<(usize, &FileRecord)> {
        self.files()
            .find(|&(_, record)| self.resolve_name(record).map(|n| n == name).unwrap_or(false))
    }

    /// Regular named files, the records a non-verbose listing shows.
    pub fn files(&self) -> impl Iterator<Item = (usize, &FileRecord)> + '_ {
        self.records
            .iter()
            .enumerate()
            .filter(move |&(i, _)| self.kinds[i] == RecordKind::File)
    }

    /// Everything except index companions.
    pub fn extractable(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.records.len()).filter(move |&i| !matches!(self.kinds[i], RecordKind::Index { .. }))
    }

    /// Records carrying the has-index flag.
    pub fn index_count(&self) -> usize {
        self.records.iter().filter(|r| r.has_index()).count()
    }

    /// `None` for unnamed records or unreadable names.
    pub fn hash_matches(&self, index: usize) -> Option<bool> {
        let bytes = self.name_bytes(&self.records[index]).ok()?;
        if bytes.is_empty() {
            return None;
        }
        Some(name_hash(bytes) == self.name_hashes[index])
    }

    /// Stored bytes of `record`, still compressed if it is zipped.
    pub fn payload(&self, record: &FileRecord) -> Result<&'a [u8], FormatError> {
        common::slice_at(self.image, record.data_ptr as u64, record.len as u64).ok_or_else(|| {
            FormatError::truncated("payload", record.data_ptr as u64, record.len as u64, self.image.len())
        })
    }

    pub fn extract(&self, record: &FileRecord) -> Result<Cow<'a, [u8]>, ExtractError> {
        let data = self.payload(record)?;
        if !record.is_zipped() {
            return Ok(Cow::Borrowed(data));
        }
        if !is_gzip(data) {
            return Err(ExtractError::CorruptPayload {
                data_ptr: record.data_ptr,
                source: io::Error::new(io::ErrorKind::InvalidData, "missing gzip header"),
            });
        }
        decompress_gzip(data)
            .map(Cow::Owned)
            .map_err(|source| ExtractError::CorruptPayload { data_ptr: record.data_ptr, source })
    }

    /// Extracts every non-companion record, spread over scoped worker threads.
    /// Results come back in record order; one bad record does not affect the others.
    pub fn extract_all(&self) -> Vec<Extracted<'a>> {
        let indices: Vec<usize> = self.extractable().collect();
        if indices.is_empty() {
            return Vec::new();
        }

        let workers = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(indices.len());
        let chunk_size = indices.len().div_ceil(workers);

        thread::scope(|scope| {
            let handles: Vec<_> = indices
                .chunks(chunk_size)
                .map(|chunk| {
                    scope.spawn(move || {
                        chunk
                            .iter()
                            .map(|&index| Extracted { index, result: self.extract(&self.records[index]) })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|handle| handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
                .collect()
        })
    }
}
