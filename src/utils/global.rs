use std::{fs::{self, OpenOptions}, io::Write, path::Path};

use crate::AppContext;

/// Saves `data` as `_<name>.bin` in the output folder when `option` was passed with `-o`.
pub fn opt_dump(app_ctx: &AppContext, option: &str, data: &[u8], name: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !app_ctx.has_option(option) {
        return Ok(())
    }

    let filename = format!("_{}.bin", name.replace(['/', '\\'], "_"));
    let output_path = Path::new(&app_ctx.output_dir).join(&filename);
    fs::create_dir_all(&app_ctx.output_dir)?;

    let mut out_file = OpenOptions::new().write(true).create(true).truncate(true).open(output_path)?;
    out_file.write_all(data)?;

    println!("[i] Saved {} to {}", name, filename);

    Ok(())
}
