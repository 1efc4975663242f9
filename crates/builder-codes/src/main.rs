//! Builder Codes: wallet connection, EIP-5792 call batches and ERC-8021
//! attribution in a native egui shell.

use eframe::egui;
use eyre::WrapErr;

use builder_codes_adapters::AppConfig;

mod app;
mod bridge;
mod state;
mod ui;

fn main() -> eyre::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = AppConfig::from_env();
    tracing::info!(
        profile = ?config.runtime_profile,
        proxy = config.wallet_proxy_url.is_some(),
        default_chain = %config.default_chain,
        "Starting Builder Codes"
    );

    let bridge = bridge::WalletBridge::from_config(&config)
        .wrap_err("failed to initialize wallet session")?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .wrap_err("failed to start tokio runtime")?;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Builder Codes")
            .with_inner_size([900.0, 760.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Builder Codes",
        native_options,
        Box::new(move |cc| Ok(Box::new(app::App::new(cc, &config, bridge, runtime)))),
    )
    .map_err(|e| eyre::eyre!("eframe exited with error: {e}"))
}
