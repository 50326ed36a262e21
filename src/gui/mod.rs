pub mod app;
pub mod menu;
pub mod pipeline;

use egui_wgpu::wgpu;
use egui_winit::winit;
use thiserror::Error;

/// Failures while bringing up the window and graphics device.
#[derive(Debug, Error)]
pub enum GuiError {
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("could not create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("could not create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable graphics adapter found")]
    NoAdapter,

    #[error("could not open graphics device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
}
