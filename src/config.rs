//! Startup settings. Nothing here is persisted between runs.

use std::path::PathBuf;

use anyhow::bail;

pub const APP_TITLE: &str = "Relevé d'Impacts Carrosserie";
pub const WINDOW_SIZE: [f32; 2] = [900.0, 900.0];

/// Extensions offered by the photo picker; decoding itself accepts anything `image` reads.
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "webp", "gif", "bmp", "tif", "tiff", "tga", "ico", "pnm", "qoi",
];

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Photo to open at startup
    pub initial_image: Option<PathBuf>,
    /// Where exported PNGs are written
    pub export_dir: PathBuf,
    pub window_size: [f32; 2],
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            initial_image: None,
            export_dir: default_export_dir(),
            window_size: WINDOW_SIZE,
        }
    }
}

/// The user's download folder, falling back to home, then the working directory.
pub fn default_export_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

impl AppConfig {
    /// Build from the command line arguments following the program name.
    ///
    /// Usage: `impact-marker [photo]`
    pub fn from_args<I>(args: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let initial_image = args.next().map(PathBuf::from);
        if let Some(extra) = args.next() {
            bail!("unexpected argument: {extra}\nusage: impact-marker [photo]");
        }
        if let Some(path) = &initial_image {
            if !path.exists() {
                bail!("file not found: {}", path.display());
            }
        }

        Ok(Self {
            initial_image,
            ..Self::default()
        })
    }

    pub fn title(&self) -> String {
        match self.initial_image.as_ref().and_then(|p| p.file_name()) {
            Some(name) => format!("{APP_TITLE} — {}", name.to_string_lossy()),
            None => APP_TITLE.to_string(),
        }
    }
}
