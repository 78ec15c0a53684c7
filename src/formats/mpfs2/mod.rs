mod decoder;
mod error;
mod include;
mod variables;

use std::any::Any;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use chrono::DateTime;
use log::{info, warn};

use crate::utils::common;
use crate::utils::global::opt_dump;
use crate::AppContext;

pub use decoder::{decode, decode_with, DecodeOptions, DecodedImage, Extracted, NameStyle, RecordKind, Strictness};
pub use error::{ExtractError, FormatError};
pub use include::*;
pub use variables::{find_variables, resolve_var, VariableScan};

pub const VARIABLES_FILE_NAME: &str = "DYNAMIC_VARIABLES.idx";

pub fn is_mpfs2_file(app_ctx: &AppContext) -> Result<Option<Box<dyn Any>>, Box<dyn std::error::Error>> {
    let file = match app_ctx.file() {Some(f) => f, None => return Ok(None)};

    let header = common::read_file(&file, 0, SIGNATURE.len())?;
    if header == SIGNATURE {
        Ok(Some(Box::new(())))
    } else {
        Ok(None)
    }
}

pub fn extract_mpfs2(app_ctx: &AppContext, _ctx: Box<dyn Any>) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(&app_ctx.input_path)?;
    let image = decode_with(&data, DecodeOptions { strictness: app_ctx.strictness })?;

    opt_dump(app_ctx, "dump_tables", &data[..image.header.tables_size()], "tables")?;

    for issue in &image.issues {
        warn!("{}", issue);
    }

    for line in summary_lines(&image) {
        println!("{}", line);
    }

    if app_ctx.list {
        for line in listing_lines(&image, app_ctx.verbose) {
            println!("{}", line);
        }
    }

    if app_ctx.variables && !image.dynamic_variables.is_empty() {
        println!("Dynamic variables:");
        for line in variable_lines(&image) {
            println!("{}", line);
        }
    }

    if app_ctx.extract {
        extract_files(app_ctx, &image)?;
    }

    Ok(())
}

pub fn summary_lines(image: &DecodedImage) -> Vec<String> {
    let count = image.records.len();
    let index_count = image.index_count();
    vec![
        format!("Version: {}", image.header.version()),
        format!("Number of files: {} ({} regular, {} index)", count, count - index_count, index_count),
        format!("Number of dynamic variables: {}", image.dynamic_variables.len()),
    ]
}

/// Plain listing shows regular files only, the verbose one every record.
pub fn listing_lines(image: &DecodedImage, verbose: bool) -> Vec<String> {
    let mut lines = Vec::new();

    for (i, record) in image.records.iter().enumerate() {
        let timestamp = format_timestamp(record.timestamp);

        if verbose {
            let hash = image.name_hashes[i];
            let hash_note = if image.hash_matches(i) == Some(false) { " (mismatch)" } else { "" };

            lines.push(String::new());
            lines.push(format!("FileRecord {}:", i));
            lines.push(format!("    .StringPtr = {} {}", record.string_ptr, display_name(image, i)));
            lines.push(format!("    .DataPtr   = {}", record.data_ptr));
            lines.push(format!("    .Len       = {}", record.len));
            lines.push(format!("    .Timestamp = {}", timestamp));
            lines.push(format!("    .Flags     = {} {}", record.flags, record.flag_names()));
            lines.push(format!("    .NameHash  = {:#06x}{}", hash, hash_note));
        } else if image.kinds[i] == RecordKind::File {
            lines.push(format!("{:4}  {}  {:8}  {}  {}", i, record.flag_chars(), record.len, timestamp, display_name(image, i)));
        }
    }

    lines
}

pub fn variable_lines(image: &DecodedImage) -> Vec<String> {
    image
        .dynamic_variables
        .iter()
        .map(|(id, name)| format!("{} {}", id, name))
        .collect()
}

fn format_timestamp(timestamp: u32) -> String {
    DateTime::from_timestamp(timestamp as i64, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

// an unreadable name still gets listed, by its offset
fn display_name(image: &DecodedImage, index: usize) -> String {
    image
        .entry_name(index)
        .unwrap_or_else(|_| format!("{:06X}", image.records[index].string_ptr))
}

/// Relative path for an entry name. `.`, `..` and root components are
/// dropped so nothing lands outside the output directory.
pub fn sanitize_entry_path(name: &str) -> Option<PathBuf> {
    let mut path = PathBuf::new();
    for component in Path::new(&name.replace('\\', "/")).components() {
        if let Component::Normal(part) = component {
            path.push(part);
        }
    }
    if path.as_os_str().is_empty() { None } else { Some(path) }
}

fn write_output(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut out_file = OpenOptions::new().write(true).create(true).truncate(true).open(path)?;
    out_file.write_all(data)
}

/// Writes every non-index record below the output directory, plus the
/// variable table when there is one. Returns how many records failed.
pub fn extract_files(app_ctx: &AppContext, image: &DecodedImage) -> Result<usize, Box<dyn std::error::Error>> {
    let export = Path::new(&app_ctx.output_dir);
    fs::create_dir_all(export)?;

    let mut failed = 0;
    for Extracted { index, result } in image.extract_all() {
        let record = &image.records[index];
        let data = match result {
            Ok(data) => data,
            Err(e) if app_ctx.strictness == Strictness::Lenient => {
                warn!("Record {} ({}): {}, skipping", index, display_name(image, index), e);
                failed += 1;
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let name = display_name(image, index);
        let relative = sanitize_entry_path(&name)
            .unwrap_or_else(|| PathBuf::from(format!("{:06X}", record.string_ptr)));
        let path = export.join(relative);
        write_output(&path, &data)?;

        if app_ctx.verbose {
            println!("extracted: {} {} bytes", path.display(), record.len);
        }
        info!("Saved {} ({} bytes)", path.display(), data.len());
    }

    for (index, kind) in image.kinds.iter().enumerate() {
        if let RecordKind::Index { .. } = kind {
            if let Ok(data) = image.payload(&image.records[index]) {
                opt_dump(app_ctx, "dump_index", data, &display_name(image, index))?;
            }
        }
    }

    if !image.dynamic_variables.is_empty() {
        let path = export.join(VARIABLES_FILE_NAME);
        fs::write(&path, variable_lines(image).join("\n"))?;
        if app_ctx.verbose {
            println!("created: {} {} variables", path.display(), image.dynamic_variables.len());
        }
    }

    if failed > 0 {
        println!("{} record(s) could not be extracted", failed);
    }

    Ok(failed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_paths_stay_inside_output() {
        assert_eq!(sanitize_entry_path("protect/tree.txt"), Some(PathBuf::from("protect/tree.txt")));
        assert_eq!(sanitize_entry_path("../../etc/passwd"), Some(PathBuf::from("etc/passwd")));
        assert_eq!(sanitize_entry_path("/abs/./name"), Some(PathBuf::from("abs/name")));
        assert_eq!(sanitize_entry_path("dir\\file.htm"), Some(PathBuf::from("dir/file.htm")));
        assert_eq!(sanitize_entry_path(".."), None);
        assert_eq!(sanitize_entry_path(""), None);
    }

    #[test]
    fn timestamps_render_as_utc() {
        assert_eq!(format_timestamp(0), "1970-01-01T00:00:00Z");
        assert_eq!(format_timestamp(1406549066), "2014-07-28T12:04:26Z");
    }
}
