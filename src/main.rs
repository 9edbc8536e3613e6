use eframe::egui;
use impact_marker::app::ImpactApp;
use impact_marker::config::AppConfig;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = AppConfig::from_args(std::env::args().skip(1))?;
    let title = config.title();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(config.window_size)
            .with_title(&title),
        ..Default::default()
    };

    eframe::run_native(
        &title,
        options,
        Box::new(move |cc| Ok(Box::new(ImpactApp::new(cc, config)))),
    )
    .map_err(|e| anyhow::anyhow!("failed to run eframe: {e}"))
}
