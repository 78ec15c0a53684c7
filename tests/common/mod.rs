#![allow(dead_code)]

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;
use mpfs2_extract::formats::mpfs2::{name_hash, FILE_RECORD_SIZE, HEADER_SIZE, NAME_HASH_SIZE};

pub const TIMESTAMP: u32 = 1406549066;

pub struct Entry {
    pub name: Vec<u8>,
    pub data: Vec<u8>,
    pub flags: u16,
}

impl Entry {
    pub fn file(name: &str, data: &[u8]) -> Self {
        Self { name: name.as_bytes().to_vec(), data: data.to_vec(), flags: 0 }
    }

    pub fn anonymous(data: &[u8]) -> Self {
        Self { name: Vec::new(), data: data.to_vec(), flags: 0 }
    }

    pub fn index(pairs: &[(u32, u32)]) -> Self {
        let mut data = Vec::new();
        for (offset, var_id) in pairs {
            data.extend_from_slice(&offset.to_le_bytes());
            data.extend_from_slice(&var_id.to_le_bytes());
        }
        Self::anonymous(&data)
    }

    pub fn flags(mut self, flags: u16) -> Self {
        self.flags = flags;
        self
    }
}

/// Lays out header, hashes, records, strings and payloads in that order.
pub fn build_image(entries: &[Entry]) -> Vec<u8> {
    let tables = HEADER_SIZE + (NAME_HASH_SIZE + FILE_RECORD_SIZE) * entries.len();

    let mut strings = Vec::new();
    let mut string_ptrs = Vec::new();
    for entry in entries {
        string_ptrs.push((tables + strings.len()) as u32);
        strings.extend_from_slice(&entry.name);
        strings.push(0);
    }

    let data_base = tables + strings.len();
    let mut payloads = Vec::new();
    let mut data_ptrs = Vec::new();
    for entry in entries {
        data_ptrs.push((data_base + payloads.len()) as u32);
        payloads.extend_from_slice(&entry.data);
    }

    let mut image = b"MPFS".to_vec();
    image.extend_from_slice(&[2, 1]);
    image.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for entry in entries {
        image.extend_from_slice(&name_hash(&entry.name).to_le_bytes());
    }
    for (i, entry) in entries.iter().enumerate() {
        image.extend_from_slice(&string_ptrs[i].to_le_bytes());
        image.extend_from_slice(&data_ptrs[i].to_le_bytes());
        image.extend_from_slice(&(entry.data.len() as u32).to_le_bytes());
        image.extend_from_slice(&TIMESTAMP.to_le_bytes());
        image.extend_from_slice(&0u32.to_le_bytes());
        image.extend_from_slice(&entry.flags.to_le_bytes());
    }
    assert_eq!(image.len(), tables);

    image.extend_from_slice(&strings);
    image.extend_from_slice(&payloads);
    image
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("write gzip");
    encoder.finish().expect("finish gzip")
}

/// Offsets of every occurrence of `needle` in `haystack`.
pub fn find_all(haystack: &[u8], needle: &[u8]) -> Vec<u32> {
    haystack
        .windows(needle.len())
        .enumerate()
        .filter(|(_, window)| *window == needle)
        .map(|(i, _)| i as u32)
        .collect()
}

pub fn index_html() -> Vec<u8> {
    let mut html = b"<html><body>Status: ~status~ Uptime: ~uptime~ Again: ~status~</body></html>\n".to_vec();
    html.resize(142, b' ');
    html
}

pub fn tree_txt() -> Vec<u8> {
    let mut text = Vec::new();
    while text.len() < 351 {
        text.extend_from_slice(b"protect/\n  tree.txt\n");
    }
    text.truncate(351);
    text
}

/// Eleven records: three regular files, the index of `index.html`, and
/// seven anonymous entries.
pub fn test_bin() -> Vec<u8> {
    use mpfs2_extract::formats::mpfs2::MPFS2_FLAG_HASINDEX;

    let html = index_html();
    let status = find_all(&html, b"~status~");
    let uptime = find_all(&html, b"~uptime~");

    let mut entries = vec![
        Entry::file("index.html", &html).flags(MPFS2_FLAG_HASINDEX),
        Entry::index(&[(status[0], 1), (uptime[0], 2), (status[1], 1)]),
        Entry::file("data", b"\x00\x01\x02\x03\x04\x05\x06\x07"),
        Entry::file("protect/tree.txt", &tree_txt()),
    ];
    for _ in 0..7 {
        entries.push(Entry::anonymous(b""));
    }
    build_image(&entries)
}
