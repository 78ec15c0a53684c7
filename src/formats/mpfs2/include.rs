use binrw::BinRead;

pub const SIGNATURE: &[u8; 4] = b"MPFS";

pub const HEADER_SIZE: usize = 8;
pub const NAME_HASH_SIZE: usize = 2;
pub const FILE_RECORD_SIZE: usize = 22;
pub const INDEX_ENTRY_SIZE: usize = 8;

/// File is compressed with gzip.
pub const MPFS2_FLAG_ISZIPPED: u16 = 0x0001;
/// File is followed by an unnamed record holding its dynamic variable index.
pub const MPFS2_FLAG_HASINDEX: u16 = 0x0002;

/// Delimits a dynamic variable name inside file content, `~name~`.
pub const VAR_DELIMITER: u8 = b'~';

pub const NO_NAME: &str = "<no name>";
pub const NO_VAR: &str = "<no var>";

#[derive(Debug, Clone, PartialEq, Eq, BinRead)]
pub struct Header {
    _magic_bytes: [u8; 4], //MPFS
    pub version_major: u8,
    pub version_minor: u8,
    pub file_count: u16,
}
impl Header {
    pub fn version(&self) -> String {
        format!("{}.{}", self.version_major, self.version_minor)
    }

    pub fn is_mpfs2(&self) -> bool {
        self.version_major == 2
    }

    /// Size of header, hash table and record table together.
    pub fn tables_size(&self) -> usize {
        HEADER_SIZE + (NAME_HASH_SIZE + FILE_RECORD_SIZE) * self.file_count as usize
    }
}

/// One 22-byte entry of the record table. Pointers are absolute offsets into the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead)]
pub struct FileRecord {
    pub string_ptr: u32,
    pub data_ptr: u32,
    pub len: u32,
    pub timestamp: u32,
    pub microtime: u32, //always 0
    pub flags: u16,
}
impl FileRecord {
    pub fn is_zipped(&self) -> bool {
        self.flags & MPFS2_FLAG_ISZIPPED == MPFS2_FLAG_ISZIPPED
    }
    pub fn has_index(&self) -> bool {
        self.flags & MPFS2_FLAG_HASINDEX == MPFS2_FLAG_HASINDEX
    }

    /// Short two-character form used by the listing, e.g. `iz`, `-z`, `--`.
    pub fn flag_chars(&self) -> String {
        let mut s = String::with_capacity(2);
        s.push(if self.has_index() { 'i' } else { '-' });
        s.push(if self.is_zipped() { 'z' } else { '-' });
        s
    }

    pub fn flag_names(&self) -> String {
        let mut names = Vec::new();
        if self.has_index() {
            names.push("HASINDEX");
        }
        if self.is_zipped() {
            names.push("ISZIPPED");
        }
        names.join(",")
    }
}

/// One 8-byte entry of an index companion's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead)]
pub struct IndexEntry {
    /// Position of the `~name~` marker, relative to the owning file's data
    pub offset: u32,
    pub var_id: u32,
}

/// Name hash as computed by the image builder. Only the last 15 bytes of
/// a name end up influencing the result.
pub fn name_hash(name: &[u8]) -> u16 {
    name.iter()
        .fold(0u16, |hash, &b| hash.wrapping_add(b as u16) << 1)
}
