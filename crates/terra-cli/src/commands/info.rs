//! `terra info` — report an image's shape and pixel semantics (like `iinfo`).

use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use terra_io::io::read_image;
use terra_view::View;

use super::{default_driver_manager, format_size};

#[derive(Args)]
pub struct InfoArgs {
    /// Input image(s).
    #[arg(required = true)]
    pub input: Vec<PathBuf>,

    /// Emit one JSON object per file instead of plain text.
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: InfoArgs, verbose: u8) -> Result<()> {
    let drivers = default_driver_manager();
    for path in &args.input {
        let file_size = fs::metadata(path)?.len();
        let view = read_image(path, &drivers)?;
        let fmt = view.format();

        if args.json {
            println!(
                "{}",
                serde_json::json!({
                    "file": path.display().to_string(),
                    "cols": fmt.cols,
                    "rows": fmt.rows,
                    "planes": fmt.planes,
                    "pixel_format": format!("{:?}", fmt.pixel_format),
                    "channel_kind": format!("{:?}", fmt.channel_kind),
                    "premultiply": fmt.premultiply,
                    "size_bytes": file_size,
                })
            );
        } else {
            println!("{}", path.display());
            println!("  resolution:    {}x{}", fmt.cols, fmt.rows);
            println!("  planes:        {}", fmt.planes);
            println!("  pixel format:  {:?}", fmt.pixel_format);
            println!("  channel kind:  {:?}", fmt.channel_kind);
            println!("  premultiplied: {}", fmt.premultiply);
            println!("  file size:     {}", format_size(file_size));
            if verbose > 0 {
                println!("  raster bytes:  {}", fmt.raster_bytes()?);
            }
        }
    }
    Ok(())
}
