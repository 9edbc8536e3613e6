//! Decoding and exporting run on worker threads so the window stays responsive.
//!
//! Jobs are never cancelled or serialized: whichever finishes last is what the user sees.

use std::path::{Path, PathBuf};
use std::thread;

use chrono::NaiveDate;
use crossbeam_channel::{Receiver, Sender};

use crate::error::ImpactError;
use crate::render::{self, ExportSnapshot};
use crate::session::LoadedImage;

#[derive(Debug)]
pub enum JobOutcome {
    Decoded { source: PathBuf, image: LoadedImage },
    DecodeFailed { source: PathBuf, error: ImpactError },
    Exported { path: PathBuf },
    ExportFailed { error: ImpactError },
}

pub struct Jobs {
    tx: Sender<JobOutcome>,
    rx: Receiver<JobOutcome>,
}

impl Default for Jobs {
    fn default() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }
}

fn decode_file(path: &Path) -> Result<LoadedImage, ImpactError> {
    let bytes = std::fs::read(path).map_err(|source| ImpactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    LoadedImage::decode(&bytes)
}

impl Jobs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and decode `path`; `notify` runs once the outcome is queued.
    pub fn spawn_decode<F>(&self, path: PathBuf, notify: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let tx = self.tx.clone();
        thread::spawn(move || {
            let outcome = match decode_file(&path) {
                Ok(image) => JobOutcome::Decoded {
                    source: path,
                    image,
                },
                Err(error) => JobOutcome::DecodeFailed {
                    source: path,
                    error,
                },
            };
            // receiver only goes away with the app
            let _ = tx.send(outcome);
            notify();
        });
    }

    /// Composite, encode and write `snapshot` into `dir`.
    pub fn spawn_export<F>(&self, snapshot: ExportSnapshot, dir: PathBuf, date: NaiveDate, notify: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let tx = self.tx.clone();
        thread::spawn(move || {
            let outcome = match render::write_export(&snapshot, &dir, date) {
                Ok(path) => JobOutcome::Exported { path },
                Err(error) => JobOutcome::ExportFailed { error },
            };
            let _ = tx.send(outcome);
            notify();
        });
    }

    /// Finished jobs, in completion order.
    pub fn drain(&self) -> Vec<JobOutcome> {
        self.rx.try_iter().collect()
    }
}
