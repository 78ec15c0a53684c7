use std::io::{self, Read};

use flate2::read::GzDecoder;

pub const GZIP_MAGIC: &[u8; 2] = b"\x1F\x8B";

pub fn is_gzip(data: &[u8]) -> bool {
    data.starts_with(GZIP_MAGIC)
}

pub fn decompress_gzip(compressed_data: &[u8]) -> io::Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(compressed_data);
    let mut decompressed = Vec::new();
    decoder.read_to_end(&mut decompressed)?;
    Ok(decompressed)
}
