//! Subcommand implementations. Each module exposes a `run(args, verbose)`
//! function dispatched from `main`, mirroring the one-module-per-subcommand
//! layout of the workspace's original CLI.

pub mod convert;
pub mod detect;
pub mod info;

use std::sync::Arc;

use anyhow::{bail, Result};
use terra_core::channel::ChannelKind;
use terra_core::pixel_format::PixelFormat;
use terra_io::driver::DriverManager;

use crate::raw_driver::RawDriverFactory;

/// The driver set every command resolves `read_image`/`write_image` paths
/// against. Just the `.traw` reference driver today — a real build would
/// register one factory per supported codec here.
pub fn default_driver_manager() -> DriverManager {
    let mut mgr = DriverManager::new();
    mgr.register(Arc::new(RawDriverFactory));
    mgr
}

/// Parses a `--pixel-format` value (case-insensitive). `genericN` (e.g.
/// `generic5`) selects `PixelFormat::GenericN(5)`.
pub fn parse_pixel_format(s: &str) -> Result<PixelFormat> {
    let lower = s.to_lowercase();
    Ok(match lower.as_str() {
        "scalar" => PixelFormat::Scalar,
        "gray" => PixelFormat::Gray,
        "graya" => PixelFormat::GrayA,
        "rgb" => PixelFormat::Rgb,
        "rgba" => PixelFormat::Rgba,
        "hsv" => PixelFormat::Hsv,
        "xyz" => PixelFormat::Xyz,
        "luv" => PixelFormat::Luv,
        "lab" => PixelFormat::Lab,
        other if other.starts_with("generic") => {
            let n: u8 = other[7..].parse().map_err(|_| anyhow::anyhow!("invalid generic channel count in '{s}'"))?;
            PixelFormat::GenericN(n)
        }
        _ => bail!("unrecognized pixel format '{s}'"),
    })
}

/// Parses a `--channel-kind` value (case-insensitive).
pub fn parse_channel_kind(s: &str) -> Result<ChannelKind> {
    let lower = s.to_lowercase();
    Ok(match lower.as_str() {
        "u8" => ChannelKind::U8,
        "u12" => ChannelKind::U12,
        "u14" => ChannelKind::U14,
        "u16" => ChannelKind::U16,
        "u32" => ChannelKind::U32,
        "u64" => ChannelKind::U64,
        "i8" => ChannelKind::I8,
        "i16" => ChannelKind::I16,
        "i32" => ChannelKind::I32,
        "i64" => ChannelKind::I64,
        "f32" => ChannelKind::F32,
        "f64" => ChannelKind::F64,
        "f32free" => ChannelKind::F32Free,
        "f64free" => ChannelKind::F64Free,
        _ => bail!("unrecognized channel kind '{s}'"),
    })
}

/// Human-readable `NNN B` / `NNN KiB` / ... size, for `info`'s plain-text
/// output.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} {}", UNITS[0])
    } else {
        format!("{size:.2} {}", UNITS[unit])
    }
}
