//! Lister and extractor for Microchip MPFS2 images.
//!
//! The decoder lives in [`formats::mpfs2`]; it works on a borrowed byte
//! slice and never writes anything. Reporting and writing files are done
//! by the extractor registered in [`formats::get_registry`].

pub mod formats;
pub mod utils;

use std::fs::File;
use std::path::PathBuf;

pub use formats::mpfs2::{decode, decode_with, DecodeOptions, DecodedImage, ExtractError, FormatError, Strictness};

/// Everything the command line asked for.
#[derive(Debug, Clone, Default)]
pub struct AppContext {
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    pub options: Vec<String>,
    pub strictness: Strictness,
    pub list: bool,
    pub verbose: bool,
    pub extract: bool,
    pub variables: bool,
}

impl AppContext {
    /// The input opened as a file, `None` for directories or unreadable paths.
    pub fn file(&self) -> Option<File> {
        if self.input_path.is_dir() {
            return None;
        }
        File::open(&self.input_path).ok()
    }

    pub fn has_option(&self, name: &str) -> bool {
        self.options.iter().any(|e| e == name)
    }
}
