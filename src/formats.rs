use std::any::Any;
use crate::AppContext;

pub struct Format {
    pub name: &'static str,
    pub detector_func: fn(&AppContext) -> Result<Option<Box<dyn Any>>, Box<dyn std::error::Error>>,
    pub extractor_func: fn(&AppContext, Box<dyn Any>) -> Result<(), Box<dyn std::error::Error>>,
}

pub mod mpfs2;

pub fn get_registry() -> Vec<Format> {
    vec![
        Format { name: "MPFS2", detector_func: mpfs2::is_mpfs2_file, extractor_func: mpfs2::extract_mpfs2 },
    ]
}
