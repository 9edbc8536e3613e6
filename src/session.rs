//! Annotation model: the loaded photo, the active marker color and the ordered markers.
//!
//! Markers store their position as a percentage (0..=100) of the displayed image's width and
//! height, so they stay attached to the same spot of the photo whatever size it is drawn at.

use std::fmt;
use std::io::Cursor;
use std::sync::Arc;

use image::{DynamicImage, ImageDecoder, ImageReader, RgbaImage};

use crate::error::ImpactError;
use crate::render::ExportSnapshot;

// ── Markers ─────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MarkerColor {
    #[default]
    Red,
    Green,
}

impl MarkerColor {
    pub const ALL: [MarkerColor; 2] = [MarkerColor::Red, MarkerColor::Green];

    /// Fill color as RGBA: `#ef4444` for red, `#22c55e` for green.
    pub fn to_rgba_u8(self) -> [u8; 4] {
        match self {
            MarkerColor::Red => [0xef, 0x44, 0x44, 0xff],
            MarkerColor::Green => [0x22, 0xc5, 0x5e, 0xff],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MarkerColor::Red => "Gommette Rouge",
            MarkerColor::Green => "Gommette Verte",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(u64);

/// A single impact. Never moved after creation, only removed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Marker {
    pub id: MarkerId,
    /// Percent of the image width, 0..=100
    pub x: f32,
    /// Percent of the image height, 0..=100
    pub y: f32,
    pub color: MarkerColor,
}

// ── Geometry ────────────────────────────────────────────────────────────────

/// Pointer position in the same pixel space as [`BoundingBox`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelPoint {
    pub x: f32,
    pub y: f32,
}

/// Rectangle the image currently occupies on screen.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    /// Percent coordinates of `point` inside this box. No clamping is applied.
    pub fn normalize(&self, point: PixelPoint) -> Option<(f32, f32)> {
        let usable = |v: f32| v.is_finite() && v > 0.0;
        if !usable(self.width) || !usable(self.height) {
            return None;
        }
        Some((
            (point.x - self.left) / self.width * 100.0,
            (point.y - self.top) / self.height * 100.0,
        ))
    }
}

// ── Image ───────────────────────────────────────────────────────────────────

/// Decoded photo at native resolution. Cheap to clone.
#[derive(Clone)]
pub struct LoadedImage {
    pixels: Arc<RgbaImage>,
}

impl LoadedImage {
    /// Decode any raster format the `image` crate recognizes, turned upright according to
    /// its EXIF orientation the way camera photos are meant to be viewed.
    pub fn decode(bytes: &[u8]) -> Result<Self, ImpactError> {
        let mut decoder = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| ImpactError::Decode(image::ImageError::IoError(e)))?
            .into_decoder()
            .map_err(ImpactError::Decode)?;
        let orientation = decoder.orientation().map_err(ImpactError::Decode)?;

        let mut decoded = DynamicImage::from_decoder(decoder).map_err(ImpactError::Decode)?;
        decoded.apply_orientation(orientation);
        Ok(Self::from_rgba(decoded.to_rgba8()))
    }

    pub fn from_rgba(pixels: RgbaImage) -> Self {
        Self {
            pixels: Arc::new(pixels),
        }
    }

    pub fn pixels(&self) -> &Arc<RgbaImage> {
        &self.pixels
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }
}

impl fmt::Debug for LoadedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (w, h) = self.dimensions();
        f.debug_struct("LoadedImage")
            .field("width", &w)
            .field("height", &h)
            .finish()
    }
}

// ── Session ─────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default)]
pub enum SessionState {
    #[default]
    NoImage,
    ImageLoaded {
        image: LoadedImage,
        markers: Vec<Marker>,
    },
}

#[derive(Debug, Default)]
pub struct Session {
    state: SessionState,
    selected_color: MarkerColor,
    // never rewound, ids stay unique across reloads and resets
    next_id: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn image(&self) -> Option<&LoadedImage> {
        match &self.state {
            SessionState::NoImage => None,
            SessionState::ImageLoaded { image, .. } => Some(image),
        }
    }

    /// Markers in insertion order, which is also drawing order.
    pub fn markers(&self) -> &[Marker] {
        match &self.state {
            SessionState::NoImage => &[],
            SessionState::ImageLoaded { markers, .. } => markers,
        }
    }

    pub fn count(&self, color: MarkerColor) -> usize {
        self.markers().iter().filter(|m| m.color == color).count()
    }

    pub fn selected_color(&self) -> MarkerColor {
        self.selected_color
    }

    pub fn set_selected_color(&mut self, color: MarkerColor) {
        self.selected_color = color;
    }

    /// Decode `bytes` and make it the current image. On failure nothing changes.
    pub fn load_image(&mut self, bytes: &[u8]) -> Result<&LoadedImage, ImpactError> {
        let image = LoadedImage::decode(bytes)?;
        self.replace_image(image);
        self.image().ok_or(ImpactError::NoImage)
    }

    /// Swap in an already decoded image, dropping every marker.
    pub fn replace_image(&mut self, image: LoadedImage) {
        let (w, h) = image.dimensions();
        log::info!("image loaded ({w}x{h}), markers cleared");
        self.state = SessionState::ImageLoaded {
            image,
            markers: Vec::new(),
        };
    }

    /// Append a marker at `pointer`, measured against where the image is displayed.
    ///
    /// Returns `None` without touching state when no image is loaded or the box is empty.
    pub fn add_marker_at(&mut self, pointer: PixelPoint, displayed: BoundingBox) -> Option<Marker> {
        let SessionState::ImageLoaded { markers, .. } = &mut self.state else {
            return None;
        };
        let (x, y) = displayed.normalize(pointer)?;

        let marker = Marker {
            id: MarkerId(self.next_id),
            x,
            y,
            color: self.selected_color,
        };
        self.next_id += 1;
        markers.push(marker);
        log::debug!("added {:?} marker {:?} at ({x:.2}%, {y:.2}%)", marker.color, marker.id);
        Some(marker)
    }

    pub fn remove_marker(&mut self, id: MarkerId) -> Option<Marker> {
        let SessionState::ImageLoaded { markers, .. } = &mut self.state else {
            return None;
        };
        let index = markers.iter().position(|m| m.id == id)?;
        log::debug!("removed marker {id:?}");
        Some(markers.remove(index))
    }

    pub fn clear_markers(&mut self) {
        if let SessionState::ImageLoaded { markers, .. } = &mut self.state {
            markers.clear();
        }
    }

    pub fn reset_session(&mut self) {
        log::info!("session reset");
        self.state = SessionState::NoImage;
    }

    /// Immutable copy of what an export needs, so it can be rendered off the UI thread.
    ///
    /// `Ok(None)` when there is nothing to draw.
    pub fn export_snapshot(&self) -> Result<Option<ExportSnapshot>, ImpactError> {
        match &self.state {
            SessionState::NoImage => Err(ImpactError::NoImage),
            SessionState::ImageLoaded { markers, .. } if markers.is_empty() => Ok(None),
            SessionState::ImageLoaded { image, markers } => Ok(Some(ExportSnapshot {
                image: Arc::clone(image.pixels()),
                markers: markers.clone(),
            })),
        }
    }

    /// Composite every marker onto the native image and encode it as PNG.
    pub fn export_annotated_image(&self) -> Result<Option<Vec<u8>>, ImpactError> {
        match self.export_snapshot()? {
            Some(snapshot) => snapshot.render_png().map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage, Rgba};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([90, 90, 90, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    /// JPEG whose EXIF block carries `orientation`: left half red, right half blue.
    fn jpeg_with_orientation(width: u32, height: u32, orientation: u16) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, _| {
            if x < width / 2 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 255])
            }
        });
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Jpeg).unwrap();
        let jpeg = out.into_inner();

        // little-endian TIFF with a single IFD entry: Orientation (0x0112), SHORT, count 1
        let mut exif = b"Exif\0\0II\x2a\0\x08\0\0\0\x01\0\x12\x01\x03\0\x01\0\0\0".to_vec();
        exif.extend_from_slice(&orientation.to_le_bytes());
        exif.extend_from_slice(&[0, 0, 0, 0, 0, 0]);

        let mut bytes = jpeg[..2].to_vec();
        bytes.extend_from_slice(&[0xff, 0xe1]);
        bytes.extend_from_slice(&((exif.len() + 2) as u16).to_be_bytes());
        bytes.extend_from_slice(&exif);
        bytes.extend_from_slice(&jpeg[2..]);
        bytes
    }

    fn loaded_session() -> Session {
        let mut session = Session::new();
        session.replace_image(LoadedImage::from_rgba(RgbaImage::new(1000, 800)));
        session
    }

    const BOX: BoundingBox = BoundingBox {
        left: 40.0,
        top: 120.0,
        width: 500.0,
        height: 400.0,
    };

    fn at(x: f32, y: f32) -> PixelPoint {
        PixelPoint { x, y }
    }

    #[test]
    fn test_initial_state() {
        let session = Session::new();
        assert!(matches!(session.state(), SessionState::NoImage));
        assert!(session.markers().is_empty());
        assert_eq!(session.selected_color(), MarkerColor::Red);
    }

    #[test]
    fn test_add_marker_without_image_is_noop() {
        let mut session = Session::new();
        assert!(session.add_marker_at(at(100.0, 200.0), BOX).is_none());
        assert!(session.markers().is_empty());
    }

    #[test]
    fn test_marker_count_matches_loaded_calls() {
        let mut session = Session::new();
        session.add_marker_at(at(50.0, 130.0), BOX);
        session.add_marker_at(at(60.0, 130.0), BOX);
        session.replace_image(LoadedImage::from_rgba(RgbaImage::new(4, 4)));
        for i in 0..5 {
            session.add_marker_at(at(50.0 + i as f32, 130.0), BOX);
        }
        assert_eq!(session.markers().len(), 5);
    }

    #[test]
    fn test_normalized_round_trip() {
        let mut session = loaded_session();
        let pointer = at(BOX.left + BOX.width * 0.25, BOX.top + BOX.height * 0.5);
        let marker = session.add_marker_at(pointer, BOX).unwrap();
        assert!((marker.x - 25.0).abs() < 1e-4);
        assert!((marker.y - 50.0).abs() < 1e-4);
    }

    #[test]
    fn test_box_corners_stay_in_range() {
        let mut session = loaded_session();
        let tl = session.add_marker_at(at(BOX.left, BOX.top), BOX).unwrap();
        let br = session
            .add_marker_at(at(BOX.left + BOX.width, BOX.top + BOX.height), BOX)
            .unwrap();
        assert_eq!((tl.x, tl.y), (0.0, 0.0));
        assert!((br.x - 100.0).abs() < 1e-4);
        assert!((br.y - 100.0).abs() < 1e-4);
    }

    #[test]
    fn test_degenerate_box_is_rejected() {
        let mut session = loaded_session();
        let flat = BoundingBox {
            height: 0.0,
            ..BOX
        };
        assert!(session.add_marker_at(at(50.0, 120.0), flat).is_none());
        assert!(session.markers().is_empty());
    }

    #[test]
    fn test_selected_color_applies_to_new_markers_only() {
        let mut session = loaded_session();
        session.add_marker_at(at(100.0, 200.0), BOX);
        session.set_selected_color(MarkerColor::Green);
        session.add_marker_at(at(110.0, 200.0), BOX);

        let colors: Vec<_> = session.markers().iter().map(|m| m.color).collect();
        assert_eq!(colors, vec![MarkerColor::Red, MarkerColor::Green]);
        assert_eq!(session.count(MarkerColor::Red), 1);
        assert_eq!(session.count(MarkerColor::Green), 1);
    }

    #[test]
    fn test_scenario_two_colors() {
        let mut session = loaded_session();
        let shown = BoundingBox {
            left: 0.0,
            top: 0.0,
            width: 1000.0,
            height: 800.0,
        };
        session.add_marker_at(at(100.0, 80.0), shown);
        session.set_selected_color(MarkerColor::Green);
        session.add_marker_at(at(900.0, 720.0), shown);

        let markers = session.markers();
        assert_eq!(markers.len(), 2);
        let close = |a: f32, b: f32| (a - b).abs() < 1e-4;
        assert!(close(markers[0].x, 10.0) && close(markers[0].y, 10.0));
        assert!(close(markers[1].x, 90.0) && close(markers[1].y, 90.0));
        assert_eq!(markers[0].color, MarkerColor::Red);
        assert_eq!(markers[1].color, MarkerColor::Green);
    }

    #[test]
    fn test_remove_marker_is_idempotent() {
        let mut session = loaded_session();
        let first = session.add_marker_at(at(100.0, 200.0), BOX).unwrap();
        session.add_marker_at(at(200.0, 200.0), BOX);

        assert_eq!(session.remove_marker(first.id), Some(first));
        assert_eq!(session.markers().len(), 1);
        assert_eq!(session.remove_marker(first.id), None);
        assert_eq!(session.markers().len(), 1);
    }

    #[test]
    fn test_remove_keeps_insertion_order() {
        let mut session = loaded_session();
        let ids: Vec<_> = (0..4)
            .filter_map(|i| session.add_marker_at(at(100.0 + i as f32 * 10.0, 200.0), BOX))
            .map(|m| m.id)
            .collect();
        session.remove_marker(ids[1]);
        let left: Vec<_> = session.markers().iter().map(|m| m.id).collect();
        assert_eq!(left, vec![ids[0], ids[2], ids[3]]);
    }

    #[test]
    fn test_load_image_clears_markers() {
        let mut session = loaded_session();
        for i in 0..3 {
            session.add_marker_at(at(100.0 + i as f32, 200.0), BOX);
        }
        let image = session.load_image(&png_bytes(8, 6)).unwrap();
        assert_eq!(image.dimensions(), (8, 6));
        assert!(session.markers().is_empty());
    }

    #[test]
    fn test_decode_applies_exif_orientation() {
        // 6 = rotate 90 degrees clockwise to display
        let image = LoadedImage::decode(&jpeg_with_orientation(40, 20, 6)).unwrap();
        assert_eq!(image.dimensions(), (20, 40));

        // the left (red) half of the stored pixels ends up on top
        let top = image.pixels().get_pixel(10, 5).0;
        let bottom = image.pixels().get_pixel(10, 35).0;
        assert!(top[0] > 180 && top[2] < 90, "top is {top:?}");
        assert!(bottom[2] > 180 && bottom[0] < 90, "bottom is {bottom:?}");
    }

    #[test]
    fn test_decode_without_exif_keeps_layout() {
        let image = LoadedImage::decode(&jpeg_with_orientation(40, 20, 1)).unwrap();
        assert_eq!(image.dimensions(), (40, 20));
    }

    #[test]
    fn test_decode_failure_leaves_state_unchanged() {
        let mut session = loaded_session();
        session.add_marker_at(at(100.0, 200.0), BOX);

        let err = session.load_image(b"definitely not an image").unwrap_err();
        assert!(matches!(err, ImpactError::Decode(_)));
        assert_eq!(session.image().unwrap().dimensions(), (1000, 800));
        assert_eq!(session.markers().len(), 1);
    }

    #[test]
    fn test_ids_unique_across_reset_and_reload() {
        let mut session = loaded_session();
        let a = session.add_marker_at(at(100.0, 200.0), BOX).unwrap();
        session.reset_session();
        session.replace_image(LoadedImage::from_rgba(RgbaImage::new(2, 2)));
        let b = session.add_marker_at(at(100.0, 200.0), BOX).unwrap();
        session.replace_image(LoadedImage::from_rgba(RgbaImage::new(2, 2)));
        let c = session.add_marker_at(at(100.0, 200.0), BOX).unwrap();
        assert!(a.id != b.id && b.id != c.id && a.id != c.id);
    }

    #[test]
    fn test_clear_markers_keeps_image() {
        let mut session = loaded_session();
        session.add_marker_at(at(100.0, 200.0), BOX);
        session.clear_markers();
        assert!(session.markers().is_empty());
        assert!(session.image().is_some());
    }

    #[test]
    fn test_reset_session() {
        let mut session = loaded_session();
        session.add_marker_at(at(100.0, 200.0), BOX);
        session.reset_session();
        assert!(session.image().is_none());
        assert!(session.markers().is_empty());

        // no-ops while empty
        session.clear_markers();
        assert!(session.remove_marker(MarkerId(0)).is_none());
        session.reset_session();
        assert!(matches!(session.state(), SessionState::NoImage));
    }

    #[test]
    fn test_export_preconditions() {
        let session = Session::new();
        assert!(matches!(
            session.export_annotated_image(),
            Err(ImpactError::NoImage)
        ));

        let session = loaded_session();
        assert!(session.export_annotated_image().unwrap().is_none());
    }

    #[test]
    fn test_export_produces_png() {
        let mut session = Session::new();
        session.load_image(&png_bytes(64, 48)).unwrap();
        let shown = BoundingBox {
            left: 0.0,
            top: 0.0,
            width: 64.0,
            height: 48.0,
        };
        session.add_marker_at(at(32.0, 24.0), shown);

        let png = session.export_annotated_image().unwrap().unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (64, 48));
        assert_eq!(decoded.get_pixel(32, 24).0, MarkerColor::Red.to_rgba_u8());
    }
}
