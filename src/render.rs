//! Export rendering: burns the markers into the photo at native resolution using tiny-skia,
//! then encodes and writes the PNG.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use image::{ImageFormat, Rgba, RgbaImage};
use tiny_skia::{Color, ColorU8, FillRule, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::error::ImpactError;
use crate::session::Marker;

pub const MIN_RADIUS: f32 = 12.0;
pub const RADIUS_PER_WIDTH: f32 = 0.008;
pub const OUTLINE_WIDTH: f32 = 3.0;

const FILE_PREFIX: &str = "impact-vehicule-";

/// Circle radius in export pixels for an image `native_width` pixels wide.
pub fn marker_radius(native_width: u32) -> f32 {
    (native_width as f32 * RADIUS_PER_WIDTH).max(MIN_RADIUS)
}

/// One filled, white-outlined circle in native image pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Circle {
    pub cx: f32,
    pub cy: f32,
    pub radius: f32,
    pub fill: [u8; 4],
}

/// Circles to draw for `markers`, in drawing order.
pub fn export_circles(markers: &[Marker], width: u32, height: u32) -> Vec<Circle> {
    let radius = marker_radius(width);
    markers
        .iter()
        .map(|m| Circle {
            cx: m.x / 100.0 * width as f32,
            cy: m.y / 100.0 * height as f32,
            radius,
            fill: m.color.to_rgba_u8(),
        })
        .collect()
}

/// Copy `img` into a premultiplied pixmap, run `f`, and copy the result back out.
fn with_pixmap(
    img: &RgbaImage,
    f: impl FnOnce(&mut Pixmap),
) -> Result<RgbaImage, ImpactError> {
    let (width, height) = img.dimensions();
    let mut pixmap = Pixmap::new(width, height).ok_or(ImpactError::Canvas { width, height })?;

    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(img.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }

    f(&mut pixmap);

    let mut out = RgbaImage::new(width, height);
    for (dst, src) in out.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    Ok(out)
}

/// Draw one circle per marker onto a copy of `img`, earlier markers underneath.
pub fn composite(img: &RgbaImage, markers: &[Marker]) -> Result<RgbaImage, ImpactError> {
    let circles = export_circles(markers, img.width(), img.height());

    with_pixmap(img, |pixmap| {
        let mut outline = Paint::default();
        outline.set_color(Color::WHITE);
        outline.anti_alias = true;
        let stroke = Stroke {
            width: OUTLINE_WIDTH,
            ..Default::default()
        };

        for circle in &circles {
            let Some(path) = PathBuilder::from_circle(circle.cx, circle.cy, circle.radius) else {
                continue;
            };
            let [r, g, b, a] = circle.fill;
            let mut fill = Paint::default();
            fill.set_color_rgba8(r, g, b, a);
            fill.anti_alias = true;

            pixmap.fill_path(&path, &fill, FillRule::Winding, Transform::identity(), None);
            pixmap.stroke_path(&path, &outline, &stroke, Transform::identity(), None);
        }
    })
}

pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, ImpactError> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)
        .map_err(ImpactError::Encode)?;
    Ok(out.into_inner())
}

/// Everything an export needs, detached from the live session.
#[derive(Clone, Debug)]
pub struct ExportSnapshot {
    pub image: Arc<RgbaImage>,
    pub markers: Vec<Marker>,
}

impl ExportSnapshot {
    pub fn render_png(&self) -> Result<Vec<u8>, ImpactError> {
        let annotated = composite(&self.image, &self.markers)?;
        encode_png(&annotated)
    }
}

/// `impact-vehicule-YYYY-MM-DD.png`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("{FILE_PREFIX}{}.png", date.format("%Y-%m-%d"))
}

/// `file_name`, then `name (1).ext`, `name (2).ext`, ...
fn export_candidates(file_name: &str) -> impl Iterator<Item = String> + '_ {
    let name = Path::new(file_name);
    let stem = name
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    let ext = name.extension().and_then(|s| s.to_str());

    std::iter::once(file_name.to_string()).chain((1u32..).map(move |n| match ext {
        Some(ext) => format!("{stem} ({n}).{ext}"),
        None => format!("{stem} ({n})"),
    }))
}

/// Create the first candidate name in `dir` that does not exist yet.
///
/// Creation is exclusive, so concurrent exports never end up sharing a file.
pub fn create_export_file(dir: &Path, file_name: &str) -> Result<(PathBuf, File), ImpactError> {
    for candidate in export_candidates(file_name) {
        let path = dir.join(candidate);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(source) => return Err(ImpactError::Io { path, source }),
        }
    }
    Err(ImpactError::Io {
        path: dir.join(file_name),
        source: io::Error::new(io::ErrorKind::AlreadyExists, "no free export name"),
    })
}

/// Render `snapshot` and write it into `dir` under the dated export name.
pub fn write_export(
    snapshot: &ExportSnapshot,
    dir: &Path,
    date: NaiveDate,
) -> Result<PathBuf, ImpactError> {
    let png = snapshot.render_png()?;

    fs::create_dir_all(dir).map_err(|source| ImpactError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let (path, mut file) = create_export_file(dir, &export_file_name(date))?;
    file.write_all(&png)
        .and_then(|()| file.flush())
        .map_err(|source| ImpactError::Io {
            path: path.clone(),
            source,
        })?;

    log::info!("exported {} markers to {}", snapshot.markers.len(), path.display());
    Ok(path)
}
