use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};

/// Reads up to `size` bytes at `offset`; shorter files give a shorter buffer.
pub fn read_file(mut file: &File, offset: u64, size: usize) -> io::Result<Vec<u8>> {
    file.seek(SeekFrom::Start(offset))?;
    let mut buffer = Vec::with_capacity(size);
    file.take(size as u64).read_to_end(&mut buffer)?;

    // reset seek (!
    file.seek(SeekFrom::Start(offset))?;
    Ok(buffer)
}

/// `len` bytes starting at `offset`, or `None` if any of them lie past the end of `buf`.
pub fn slice_at(buf: &[u8], offset: u64, len: u64) -> Option<&[u8]> {
    let end = offset.checked_add(len)?;
    if end > buf.len() as u64 {
        return None;
    }
    Some(&buf[offset as usize..end as usize])
}

/// Bytes from `start` up to (not including) the first `delimiter`.
/// `None` when `start` is out of range or no delimiter follows it.
pub fn bytes_until(buf: &[u8], start: u64, delimiter: u8) -> Option<&[u8]> {
    if start >= buf.len() as u64 {
        return None;
    }
    let rest = &buf[start as usize..];
    let end = rest.iter().position(|&b| b == delimiter)?;
    Some(&rest[..end])
}

//one char per byte, same as the firmware tooling
pub fn latin1_string(buf: &[u8]) -> String {
    buf.iter().map(|&b| b as char).collect()
}
