use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use isomap::render::write_png_snapshot;
use isomap::{MapHandle, MapListener, MapRenderer, MapUpdater};
use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use super::bootstrap::{AppWiring, BootstrapError};
use super::demo_feed::DemoFeed;
use super::presenter::Presenter;

#[derive(Debug, Error)]
pub(crate) enum ViewerError {
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create viewer window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize presenter: {0}")]
    CreatePresenter(#[source] PixelsError),
    #[error("failed to start map feed: {0}")]
    StartFeed(#[source] io::Error),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

pub(crate) fn run_viewer(app: AppWiring) -> Result<(), ViewerError> {
    let AppWiring {
        config,
        faces,
        manifest,
    } = app;

    let event_loop = EventLoop::new().map_err(ViewerError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(ViewerError::CreateWindow)?,
    );
    let mut presenter =
        Presenter::new(Arc::clone(&window)).map_err(ViewerError::CreatePresenter)?;

    let (width, height) = presenter.size();
    let map = MapHandle::default();
    let renderer = Arc::new(MapRenderer::new(
        map.clone(),
        config.render.clone(),
        faces,
        width,
        height,
    ));
    let mut updater = MapUpdater::new(map);
    updater.add_listener(renderer.clone());
    let feed = DemoFeed::new(
        updater,
        manifest,
        config.map_width,
        config.map_height,
        config.scroll_every_ticks,
    );
    let mut feed = Some(feed.spawn(config.feed_tick()).map_err(ViewerError::StartFeed)?);
    info!(
        width,
        height,
        map_width = config.map_width,
        map_height = config.map_height,
        coverage_mode = ?config.render.coverage_mode,
        "viewer_started"
    );

    event_loop.set_control_flow(ControlFlow::Poll);
    let mut snapshots_taken = 0_u32;

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(size) => {
                    if let Err(error) = resize(&mut presenter, &renderer, size.width, size.height) {
                        warn!(error = %error, "presenter_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::ScaleFactorChanged { .. } => {
                    let size = window.inner_size();
                    if let Err(error) = resize(&mut presenter, &renderer, size.width, size.height) {
                        warn!(error = %error, "presenter_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::KeyboardInput { event, .. }
                    if event.state == ElementState::Pressed && !event.repeat =>
                {
                    match event.physical_key {
                        PhysicalKey::Code(KeyCode::Escape) => {
                            info!(reason = "escape_key", "shutdown_requested");
                            window_target.exit();
                        }
                        PhysicalKey::Code(KeyCode::F5) => {
                            renderer.redraw_all();
                            info!("full_redraw_requested");
                        }
                        PhysicalKey::Code(KeyCode::F12) => {
                            snapshots_taken += 1;
                            let path = snapshot_path(&config.snapshot_dir, snapshots_taken);
                            let frame = renderer.render_frame();
                            match write_png_snapshot(&path, &frame) {
                                Ok(()) => info!(
                                    path = %path.display(),
                                    generation = frame.generation(),
                                    "snapshot_saved"
                                ),
                                Err(error) => warn!(error = %error, "snapshot_failed"),
                            }
                        }
                        _ => {}
                    }
                }
                WindowEvent::RedrawRequested => {
                    {
                        let frame = renderer.render_frame();
                        presenter.upload(&frame, frame.generation());
                    }
                    if let Err(error) = presenter.render() {
                        warn!(error = %error, "presenter_draw_failed");
                        window_target.exit();
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
            }
            Event::LoopExiting => {
                if let Some(mut feed) = feed.take() {
                    feed.stop();
                }
                let metrics = renderer.metrics().snapshot();
                info!(
                    full_redraws = metrics.full_redraws,
                    incremental_redraws = metrics.incremental_redraws,
                    over_budget_passes = metrics.over_budget_passes,
                    "shutdown"
                );
            }
            _ => {}
        })
        .map_err(ViewerError::EventLoopRun)
}

fn resize(
    presenter: &mut Presenter,
    renderer: &MapRenderer,
    width: u32,
    height: u32,
) -> Result<(), PixelsError> {
    // Minimised windows report 0x0; keep the last layout.
    if width == 0 || height == 0 {
        return Ok(());
    }
    presenter.resize(width, height)?;
    renderer.on_viewport_resized(width, height);
    Ok(())
}

fn snapshot_path(dir: &Path, index: u32) -> PathBuf {
    dir.join(format!("frame-{index:04}.png"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshots_are_numbered_in_the_snapshot_dir() {
        assert_eq!(
            snapshot_path(Path::new("shots"), 7),
            Path::new("shots").join("frame-0007.png")
        );
    }
}
