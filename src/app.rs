use eframe::egui;

use crate::config::{AppConfig, APP_TITLE, IMAGE_EXTENSIONS};
use crate::input::PressFilter;
use crate::jobs::{JobOutcome, Jobs};
use crate::overlay;
use crate::session::{MarkerColor, Session};

const BUTTON_HEIGHT: f32 = 44.0;

#[derive(Clone, Debug, PartialEq)]
enum Status {
    Info(String),
    Error(String),
}

pub struct ImpactApp {
    config: AppConfig,
    session: Session,
    // rebuilt whenever the session image changes
    texture: Option<egui::TextureHandle>,
    jobs: Jobs,
    presses: PressFilter,
    status: Option<Status>,
}

impl ImpactApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: AppConfig) -> Self {
        let mut style = (*cc.egui_ctx.style()).clone();
        style.spacing.item_spacing = egui::vec2(12.0, 12.0);
        style.spacing.button_padding = egui::vec2(16.0, 10.0);
        cc.egui_ctx.set_style(style);

        let app = Self {
            config,
            session: Session::new(),
            texture: None,
            jobs: Jobs::new(),
            presses: PressFilter::default(),
            status: None,
        };
        if let Some(path) = app.config.initial_image.clone() {
            app.load_from(&cc.egui_ctx, path);
        }
        app
    }

    fn load_from(&self, ctx: &egui::Context, path: std::path::PathBuf) {
        log::info!("decoding {}", path.display());
        let ctx = ctx.clone();
        self.jobs.spawn_decode(path, move || ctx.request_repaint());
    }

    fn pick_photo(&mut self, ctx: &egui::Context) {
        let picked = rfd::FileDialog::new()
            .set_title("Prendre une photo")
            .add_filter("Images", IMAGE_EXTENSIONS)
            .pick_file();
        if let Some(path) = picked {
            self.load_from(ctx, path);
        }
    }

    fn start_export(&mut self, ctx: &egui::Context) {
        let snapshot = match self.session.export_snapshot() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return,
            Err(e) => {
                log::error!("export requested in an invalid state: {e}");
                return;
            }
        };
        let date = chrono::Utc::now().date_naive();
        let ctx = ctx.clone();
        self.jobs.spawn_export(
            snapshot,
            self.config.export_dir.clone(),
            date,
            move || ctx.request_repaint(),
        );
    }

    fn reset(&mut self) {
        self.session.reset_session();
        self.texture = None;
        self.status = None;
    }

    fn apply_outcomes(&mut self) {
        for outcome in self.jobs.drain() {
            match outcome {
                JobOutcome::Decoded { source, image } => {
                    self.session.replace_image(image);
                    self.texture = None;
                    self.status = Some(Status::Info(format!(
                        "Photo chargée : {}",
                        source.display()
                    )));
                }
                JobOutcome::DecodeFailed { source, error } => {
                    log::warn!("could not load {}: {error}", source.display());
                    self.status = Some(Status::Error(format!(
                        "Impossible d'ouvrir {} : {error}",
                        source.display()
                    )));
                }
                JobOutcome::Exported { path } => {
                    self.status = Some(Status::Info(format!(
                        "Image enregistrée : {}",
                        path.display()
                    )));
                }
                JobOutcome::ExportFailed { error } => {
                    log::warn!("export failed: {error}");
                    self.status = Some(Status::Error(format!("Échec de l'export : {error}")));
                }
            }
        }
    }

    fn ensure_texture(&mut self, ctx: &egui::Context) {
        if self.texture.is_some() {
            return;
        }
        if let Some(image) = self.session.image() {
            let pixels = image.pixels();
            let size = [pixels.width() as usize, pixels.height() as usize];
            let color_image =
                egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_flat_samples().as_slice());
            self.texture = Some(ctx.load_texture("photo", color_image, egui::TextureOptions::LINEAR));
        }
    }

    // ── Views ───────────────────────────────────────────────────────────────

    fn empty_view(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui.vertical_centered(|ui| {
            ui.add_space(48.0);
            let button = egui::Button::new(egui::RichText::new("📷 Prendre une photo").size(22.0).strong())
                .fill(egui::Color32::from_rgb(0x3b, 0x82, 0xf6))
                .min_size(egui::vec2(0.0, 64.0));
            if ui.add(button).clicked() {
                self.pick_photo(ctx);
            }
            ui.add_space(12.0);
            ui.label(
                egui::RichText::new("Prenez une photo du véhicule pour commencer")
                    .size(17.0)
                    .weak(),
            );
        });
    }

    fn color_picker(&mut self, ui: &mut egui::Ui) {
        ui.horizontal_wrapped(|ui| {
            for color in MarkerColor::ALL {
                let selected = self.session.selected_color() == color;
                let swatch = overlay::to_color32(color);
                let text = egui::RichText::new(format!("⏺ {}", color.label())).size(17.0).strong();
                let button = if selected {
                    egui::Button::new(text.color(egui::Color32::WHITE)).fill(swatch)
                } else {
                    egui::Button::new(text.color(swatch))
                };
                let button = button
                    .selected(selected)
                    .min_size(egui::vec2(0.0, BUTTON_HEIGHT));
                if ui.add(button).clicked() {
                    self.session.set_selected_color(color);
                }
            }
        });
    }

    fn photo_view(&mut self, ui: &mut egui::Ui) {
        let (Some(texture), Some(image)) = (self.texture.as_ref(), self.session.image()) else {
            return;
        };

        let size = overlay::displayed_size(image.dimensions(), ui.available_width());
        let (rect, image_response) = ui.allocate_exact_size(size, egui::Sense::click());
        ui.painter().image(
            texture.id(),
            rect,
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            egui::Color32::WHITE,
        );
        let image_response = image_response.on_hover_cursor(egui::CursorIcon::Crosshair);

        overlay::marker_layer(ui, rect, &image_response, &mut self.session, &self.presses);
    }

    fn tally(&self, ui: &mut egui::Ui) {
        egui::Frame::group(ui.style()).show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.vertical_centered(|ui| {
                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new("Total :").size(19.0).strong());
                    ui.label(
                        egui::RichText::new(format!("{} rouge(s)", self.session.count(MarkerColor::Red)))
                            .size(19.0)
                            .strong()
                            .color(overlay::to_color32(MarkerColor::Red)),
                    );
                    ui.label(egui::RichText::new("·").size(19.0));
                    ui.label(
                        egui::RichText::new(format!("{} verte(s)", self.session.count(MarkerColor::Green)))
                            .size(19.0)
                            .strong()
                            .color(overlay::to_color32(MarkerColor::Green)),
                    );
                });
                ui.label(
                    egui::RichText::new(
                        "Touchez la photo pour ajouter · Touchez une gommette pour la retirer",
                    )
                    .small()
                    .weak(),
                );
            });
        });
    }

    fn actions(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let has_markers = !self.session.markers().is_empty();
        let action = |label: &str, fill: egui::Color32| {
            egui::Button::new(egui::RichText::new(label).color(egui::Color32::WHITE).strong())
                .fill(fill)
                .min_size(egui::vec2(0.0, BUTTON_HEIGHT))
        };

        ui.horizontal_wrapped(|ui| {
            let clear = action("🗑 Effacer gommettes", egui::Color32::from_rgb(0xf9, 0x73, 0x16));
            if ui.add_enabled(has_markers, clear).clicked() {
                self.session.clear_markers();
            }
            let download = action("⬇ Télécharger", egui::Color32::from_rgb(0x16, 0xa3, 0x4a));
            if ui.add_enabled(has_markers, download).clicked() {
                self.start_export(ctx);
            }
            let reset = action("⟲ Nouvelle photo", egui::Color32::from_rgb(0x6b, 0x72, 0x80));
            if ui.add(reset).clicked() {
                self.reset();
            }
        });
    }
}

// ── eframe App impl ────────────────────────────────────────────────────────

impl eframe::App for ImpactApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.presses.begin_frame(ctx);
        self.apply_outcomes();
        self.ensure_texture(ctx);

        if let Some(status) = &self.status {
            egui::TopBottomPanel::bottom("status").show(ctx, |ui| match status {
                Status::Info(text) => {
                    ui.label(text);
                }
                Status::Error(text) => {
                    ui.colored_label(ui.visuals().error_fg_color, text);
                }
            });
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false; 2])
                .show(ui, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.heading(egui::RichText::new(format!("📋 {APP_TITLE}")).size(26.0).strong());
                    });
                    ui.add_space(8.0);

                    if self.session.image().is_none() {
                        self.empty_view(ui, ctx);
                        return;
                    }
                    self.color_picker(ui);
                    self.photo_view(ui);
                    self.tally(ui);
                    self.actions(ui, ctx);
                });
        });
    }
}
