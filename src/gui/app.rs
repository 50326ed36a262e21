use egui_wgpu::wgpu;
use egui_winit::winit::{self, event::{Event, WindowEvent}, event_loop::EventLoop, window::Window};
use std::sync::Arc;
use egui_wgpu::Renderer as EguiRenderer;
use egui_winit::State as EguiState;

use grid_creator::config::AppConfig;
use grid_creator::form::FormState;

use crate::gui::GuiError;
use crate::gui::menu::populate_form_menu;

const BACKGROUND: wgpu::Color = wgpu::Color { r: 0.1, g: 0.1, b: 0.12, a: 1.0 };

// This struct manages all the wgpu-related state.
struct RenderState<'a> {
    _window: Arc<Window>, // Store the Arc to keep the window alive
    surface: wgpu::Surface<'a>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
}

impl<'a> RenderState<'a> {
    async fn new(window: Arc<Window>) -> Result<Self, GuiError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let surface = instance.create_surface(window.clone())?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GuiError::NoAdapter)?;
        log::debug!("Using graphics adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps.formats.iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or(GuiError::NoAdapter)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        Ok(Self {
            _window: window,
            surface,
            device,
            queue,
            config,
        })
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }
}

/// Preview of the last raster written, with its one-line summary.
pub struct Preview {
    pub texture: egui::TextureHandle,
    pub summary: String,
}

/// Everything the window shows between frames.
pub struct AppState {
    pub config: AppConfig,
    pub form: FormState,
    /// Informational line under the buttons, e.g. after a cancelled save.
    pub status: Option<String>,
    pub preview: Option<Preview>,
    pub should_close: bool,
}

impl AppState {
    fn new(config: AppConfig) -> Self {
        Self {
            form: FormState::new(&config),
            config,
            status: None,
            preview: None,
            should_close: false,
        }
    }
}

fn show_preview(app_state: &AppState, ui: &mut egui::Ui) {
    match &app_state.preview {
        Some(preview) => {
            ui.vertical_centered(|ui| {
                ui.label(preview.summary.as_str());
                ui.add(
                    egui::Image::new(egui::load::SizedTexture::from_handle(&preview.texture))
                        .max_size(ui.available_size())
                        .maintain_aspect_ratio(true),
                );
            });
        }
        None => {
            ui.centered_and_justified(|ui| {
                ui.label("The generated grid is previewed here.");
            });
        }
    }
}

pub async fn run_app(config: AppConfig) -> Result<(), GuiError> {
    // --- Basic Setup ---
    let event_loop = EventLoop::new()?;
    let window = Arc::new(winit::window::WindowBuilder::new()
        .with_title("Grid Creator")
        .with_inner_size(winit::dpi::LogicalSize::new(1024, 720))
        .build(&event_loop)?);

    // --- State Initialization ---
    let mut render_state = RenderState::new(Arc::clone(&window)).await?;
    let mut app_state = AppState::new(config);

    // --- Egui Setup ---
    let egui_ctx = egui::Context::default();
    let mut egui_state = EguiState::new(
        egui_ctx.clone(),
        egui::ViewportId::ROOT,
        &window,
        None,
        None,
    );
    let mut egui_renderer = EguiRenderer::new(
        &render_state.device,
        render_state.config.format,
        None, // No depth buffer
        1,    // msaa_samples
    );

    // --- Event Loop ---
    event_loop.run(move |event, elwt| {
        match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => {
                let response = egui_state.on_window_event(&window, &event);
                if response.consumed {
                    return;
                }

                match event {
                    WindowEvent::CloseRequested => elwt.exit(),
                    WindowEvent::Resized(physical_size) => {
                        render_state.resize(physical_size);
                    }
                    WindowEvent::RedrawRequested => {
                        // --- Egui Frame ---
                        let raw_input = egui_state.take_egui_input(&window);
                        egui_ctx.begin_frame(raw_input);

                        egui::SidePanel::left("form_panel")
                            .resizable(false)
                            .min_width(300.0)
                            .show(&egui_ctx, |ui| {
                                populate_form_menu(&mut app_state, ui);
                            });

                        egui::CentralPanel::default()
                            .frame(egui::Frame::none().inner_margin(8.0))
                            .show(&egui_ctx, |ui| {
                                show_preview(&app_state, ui);
                            });

                        let egui_output = egui_ctx.end_frame();
                        egui_state.handle_platform_output(
                            &window,
                            egui_output.platform_output
                        );

                        // Texture updates must happen before tessellating.
                        for (id, image_delta) in &egui_output.textures_delta.set {
                            egui_renderer.update_texture(
                                &render_state.device,
                                &render_state.queue,
                                *id,
                                image_delta
                            );
                        }

                        let paint_jobs = egui_ctx.tessellate(
                            egui_output.shapes,
                            window.scale_factor() as f32
                        );

                        for id in &egui_output.textures_delta.free {
                            egui_renderer.free_texture(id);
                        }

                        // --- Get Surface Texture for Drawing ---
                        let output_frame = match render_state.surface.get_current_texture() {
                            Ok(frame) => frame,
                            Err(e) => { log::warn!("Dropped frame: {:?}", e); return; }
                        };
                        let output_view = output_frame.texture.create_view(
                            &wgpu::TextureViewDescriptor::default()
                        );

                        let mut encoder = render_state.device.create_command_encoder(
                            &wgpu::CommandEncoderDescriptor::default()
                        );
                        let screen_descriptor = egui_wgpu::ScreenDescriptor {
                            size_in_pixels: [render_state.config.width, render_state.config.height],
                            pixels_per_point: window.scale_factor() as f32,
                        };

                        egui_renderer.update_buffers(
                            &render_state.device,
                            &render_state.queue,
                            &mut encoder,
                            &paint_jobs,
                            &screen_descriptor
                        );
                        {
                            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                                label: Some("Form Pass"),
                                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                                    view: &output_view,
                                    resolve_target: None,
                                    ops: wgpu::Operations {
                                        load: wgpu::LoadOp::Clear(BACKGROUND),
                                        store: wgpu::StoreOp::Store,
                                    },
                                })],
                                depth_stencil_attachment: None,
                                timestamp_writes: None,
                                occlusion_query_set: None,
                            });
                            egui_renderer.render(
                                &mut render_pass,
                                &paint_jobs,
                                &screen_descriptor
                            );
                        }

                        // --- Submit and Present ---
                        render_state.queue.submit(std::iter::once(encoder.finish()));
                        output_frame.present();

                        if app_state.should_close {
                            log::info!("Closing");
                            elwt.exit();
                        }
                    }
                    _ => {}
                }
            }
            Event::AboutToWait => {
                window.request_redraw();
            }
            _ => (),
        }
    })?;
    Ok(())
}
