// src/main.rs

//! Demo: opens one window and logs every event until it is closed.

use anyhow::Context;
use log::{error, info};
use std::ops::ControlFlow;

use swim::config::CONFIG;
use swim::{Event, Platform};

fn main() -> anyhow::Result<()> {
    // Default filter is "info" if RUST_LOG is not set.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    info!("Starting swim...");
    let config = &*CONFIG;
    info!("Configuration: {:?}", config);

    let mut platform = swim::connect().context("Failed to connect to the window system")?;
    info!("Connected to the native window system.");

    let size = config.window.size();
    let title = config.window.title.as_str();

    #[cfg(not(target_os = "macos"))]
    if config.gl.enabled {
        let window = platform
            .create_gl_window(size, title, &config.gl)
            .context("Failed to create GL window")?;
        info!("GL window {} created ({})", window.window().id(), window.gl_version());
        window.draw();
        return event_loop(&mut platform, || window.draw());
    }

    let window = platform
        .create_window(size, title)
        .context("Failed to create window")?;
    info!("Window {} created: {:?}, '{}'", window.id(), window.size()?, window.title());

    event_loop(&mut platform, || {})
}

fn event_loop<P: Platform>(platform: &mut P, mut redraw: impl FnMut()) -> anyhow::Result<()> {
    let result = swim::run(platform, CONFIG.event_loop.poll_interval(), |event| {
        info!("Event: {:?}", event);
        match event {
            Event::Quit | Event::WindowClosed(_) => ControlFlow::Break(()),
            _ => {
                redraw();
                ControlFlow::Continue(())
            }
        }
    });

    if let Err(e) = &result {
        error!("Event loop failed: {}", e);
    }
    result.context("Event loop terminated with an error")?;
    info!("swim exited successfully.");
    Ok(())
}
