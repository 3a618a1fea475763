//! Immediate-mode 2D renderer on wgpu
//!
//! Every draw call becomes a textured quad. Solid shapes sample a 1x1 white
//! texture so a single pipeline covers sprites, lines, rectangles and points.
//! Quads are batched per texture and submitted in one render pass on present.

use std::convert::Infallible;
use std::sync::Arc;

use tracing::{info, warn};
use wgpu::util::DeviceExt;
use winit::window::Window;

use super::{Color, FRect, RenderBackend, RenderError, Surface};
use crate::handle::{Handle, Resource};

/// WGSL shader for textured, tinted quads
const SPRITE_SHADER: &str = r#"
struct VertexInput {
    @location(0) position: vec2<f32>,
    @location(1) uv: vec2<f32>,
    @location(2) color: vec4<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) color: vec4<f32>,
}

struct Uniforms {
    screen_size: vec2<f32>,
    _padding: vec2<f32>,
}

@group(0) @binding(0)
var<uniform> uniforms: Uniforms;

@group(1) @binding(0)
var sprite_texture: texture_2d<f32>;

@group(1) @binding(1)
var sprite_sampler: sampler;

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;

    // Screen coordinates: (0, 0) at top-left, (width, height) at bottom-right
    let clip_x = (in.position.x / uniforms.screen_size.x) * 2.0 - 1.0;
    let clip_y = 1.0 - (in.position.y / uniforms.screen_size.y) * 2.0;

    out.clip_position = vec4<f32>(clip_x, clip_y, 0.0, 1.0);
    out.uv = in.uv;
    out.color = in.color;

    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(sprite_texture, sprite_sampler, in.uv) * in.color;
}
"#;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 2],
    uv: [f32; 2],
    color: [f32; 4],
}

impl Vertex {
    const ATTRIBS: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2, 2 => Float32x4];

    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Uniforms {
    screen_size: [f32; 2],
    _padding: [f32; 2],
}

/// A texture uploaded to the GPU together with its bind group
pub struct GpuTexture {
    id: u64,
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
}

impl GpuTexture {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

impl Resource for GpuTexture {
    const KIND: &'static str = "texture";
    type Error = Infallible;

    fn release(self) -> Result<(), Self::Error> {
        self.texture.destroy();
        Ok(())
    }
}

/// Consecutive vertices sharing one texture
struct Batch {
    texture_id: u64,
    bind_group: wgpu::BindGroup,
    vertices: std::ops::Range<u32>,
}

/// wgpu implementation of [`RenderBackend`]
pub struct WgpuRenderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    pipeline: wgpu::RenderPipeline,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    /// 1x1 white texture sampled by solid shapes
    white: Handle<GpuTexture>,
    next_texture_id: u64,
    draw_color: Color,
    clear_color: Color,
    vertices: Vec<Vertex>,
    batches: Vec<Batch>,
}

impl WgpuRenderer {
    /// Creates a renderer drawing into `window`
    pub async fn new(window: Arc<Window>, vsync: bool) -> anyhow::Result<Self> {
        info!("Initializing wgpu renderer");

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;

        info!(
            adapter.name = adapter.get_info().name,
            adapter.backend = ?adapter.get_info().backend,
            "Found GPU adapter"
        );

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Main Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
                experimental_features: Default::default(),
            })
            .await?;

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| anyhow::anyhow!("surface reports no supported formats"))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: if vsync {
                wgpu::PresentMode::AutoVsync
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &config);

        info!(
            surface.width = config.width,
            surface.height = config.height,
            surface.format = ?config.format,
            "Surface configured"
        );

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sprite Uniform Buffer"),
            contents: bytemuck::cast_slice(&[Uniforms {
                screen_size: [config.width as f32, config.height as f32],
                _padding: [0.0; 2],
            }]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Sprite Uniform Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Sprite Uniform Bind Group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Sprite Texture Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Sprite Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Sprite Shader"),
            source: wgpu::ShaderSource::Wgsl(SPRITE_SHADER.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Sprite Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Sprite Render Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::desc()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        });

        let mut renderer = Self {
            surface,
            device,
            queue,
            config,
            pipeline,
            texture_layout,
            sampler,
            uniform_buffer,
            uniform_bind_group,
            white: Handle::empty(),
            next_texture_id: 0,
            draw_color: Color::WHITE,
            clear_color: Color::rgb(0, 0, 0),
            vertices: Vec::new(),
            batches: Vec::new(),
        };

        let white_pixel = [255u8; 4];
        let white = renderer.create_texture(&Surface::from_pixels(1, 1, 4, &white_pixel)?)?;
        renderer.white = Handle::new(white);

        info!("Renderer initialized");
        Ok(renderer)
    }

    fn push_quad(
        &mut self,
        texture_id: u64,
        bind_group: &wgpu::BindGroup,
        corners: [[f32; 2]; 4],
        uv: FRect,
        color: [f32; 4],
    ) {
        let uvs = [
            [uv.x, uv.y],
            [uv.x, uv.y + uv.h],
            [uv.x + uv.w, uv.y + uv.h],
            [uv.x + uv.w, uv.y],
        ];
        let v = |i: usize| Vertex {
            position: corners[i],
            uv: uvs[i],
            color,
        };

        let start = self.vertices.len() as u32;
        // Two triangles: (0, 1, 2) and (0, 2, 3)
        self.vertices.extend([v(0), v(1), v(2), v(0), v(2), v(3)]);
        let end = self.vertices.len() as u32;

        match self.batches.last_mut() {
            Some(batch) if batch.texture_id == texture_id => batch.vertices.end = end,
            _ => self.batches.push(Batch {
                texture_id,
                bind_group: bind_group.clone(),
                vertices: start..end,
            }),
        }
    }

    fn push_solid(&mut self, corners: [[f32; 2]; 4]) -> Result<(), RenderError> {
        let (id, bind_group) = match self.white.get() {
            Some(white) => (white.id, white.bind_group.clone()),
            None => return Err(RenderError::Draw("solid texture missing".to_string())),
        };
        let color = linear_color(self.draw_color);
        self.push_quad(id, &bind_group, corners, FRect::new(0.0, 0.0, 1.0, 1.0), color);
        Ok(())
    }

    fn reset_frame(&mut self) {
        self.vertices.clear();
        self.batches.clear();
    }
}

impl RenderBackend for WgpuRenderer {
    type Texture = GpuTexture;

    fn create_texture(&mut self, surface: &Surface<'_>) -> Result<GpuTexture, RenderError> {
        let max = self.device.limits().max_texture_dimension_2d;
        if surface.width() > max || surface.height() > max {
            return Err(RenderError::TextureCreation(format!(
                "{}x{} exceeds the device limit of {max}",
                surface.width(),
                surface.height()
            )));
        }

        let size = wgpu::Extent3d {
            width: surface.width(),
            height: surface.height(),
            depth_or_array_layers: 1,
        };

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Sprite Texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let byte_len = (surface.pitch() * surface.height()) as usize;
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &surface.pixels()[..byte_len],
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(surface.pitch()),
                rows_per_image: Some(surface.height()),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Sprite Texture Bind Group"),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        let id = self.next_texture_id;
        self.next_texture_id += 1;

        Ok(GpuTexture {
            id,
            texture,
            bind_group,
            width: surface.width(),
            height: surface.height(),
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);

            info!(width, height, "Surface resized");
        }
    }

    fn set_draw_color(&mut self, color: Color) {
        self.draw_color = color;
    }

    fn clear(&mut self) -> Result<(), RenderError> {
        // Anything drawn before a clear would be overwritten
        self.reset_frame();
        self.clear_color = self.draw_color;
        Ok(())
    }

    fn draw_texture(
        &mut self,
        texture: &GpuTexture,
        src: Option<FRect>,
        dst: FRect,
    ) -> Result<(), RenderError> {
        let (tw, th) = (texture.width as f32, texture.height as f32);
        let uv = match src {
            Some(src) => FRect::new(src.x / tw, src.y / th, src.w / tw, src.h / th),
            None => FRect::new(0.0, 0.0, 1.0, 1.0),
        };

        let corners = [
            [dst.x, dst.y],
            [dst.x, dst.y + dst.h],
            [dst.x + dst.w, dst.y + dst.h],
            [dst.x + dst.w, dst.y],
        ];
        self.push_quad(
            texture.id,
            &texture.bind_group,
            corners,
            uv,
            [1.0, 1.0, 1.0, 1.0],
        );
        Ok(())
    }

    fn draw_rect(&mut self, rect: FRect) -> Result<(), RenderError> {
        let (l, t) = (rect.x, rect.y);
        let (r, b) = (rect.x + rect.w, rect.y + rect.h);
        self.draw_line([l, t], [r, t])?;
        self.draw_line([r, t], [r, b])?;
        self.draw_line([r, b], [l, b])?;
        self.draw_line([l, b], [l, t])
    }

    fn draw_line(&mut self, from: [f32; 2], to: [f32; 2]) -> Result<(), RenderError> {
        let dx = to[0] - from[0];
        let dy = to[1] - from[1];
        let len = (dx * dx + dy * dy).sqrt();

        if len == 0.0 {
            return self.draw_point(from);
        }

        // Perpendicular offset for a one pixel wide quad
        let px = -dy / len * 0.5;
        let py = dx / len * 0.5;

        self.push_solid([
            [from[0] + px, from[1] + py],
            [from[0] - px, from[1] - py],
            [to[0] - px, to[1] - py],
            [to[0] + px, to[1] + py],
        ])
    }

    fn draw_point(&mut self, at: [f32; 2]) -> Result<(), RenderError> {
        let [x, y] = at;
        self.push_solid([[x, y], [x, y + 1.0], [x + 1.0, y + 1.0], [x + 1.0, y]])
    }

    fn present(&mut self) -> Result<(), RenderError> {
        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                warn!("Surface lost, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                self.reset_frame();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("Timed out acquiring surface texture, skipping frame");
                self.reset_frame();
                return Ok(());
            }
            Err(e) => return Err(RenderError::Present(e.to_string())),
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::cast_slice(&[Uniforms {
                screen_size: [self.config.width as f32, self.config.height as f32],
                _padding: [0.0; 2],
            }]),
        );

        let vertex_buffer = (!self.vertices.is_empty()).then(|| {
            self.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Sprite Vertex Buffer"),
                    contents: bytemuck::cast_slice(&self.vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                })
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let [r, g, b, a] = linear_color(self.clear_color);
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Sprite Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: a as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let Some(vertex_buffer) = &vertex_buffer {
                rpass.set_pipeline(&self.pipeline);
                rpass.set_bind_group(0, &self.uniform_bind_group, &[]);
                rpass.set_vertex_buffer(0, vertex_buffer.slice(..));

                for batch in &self.batches {
                    rpass.set_bind_group(1, &batch.bind_group, &[]);
                    rpass.draw(batch.vertices.clone(), 0..1);
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        self.reset_frame();
        Ok(())
    }
}

/// Converts an sRGB color to the linear values an sRGB target expects
fn linear_color(color: Color) -> [f32; 4] {
    let [r, g, b, a] = color.to_f32();
    [srgb_to_linear(r), srgb_to_linear(g), srgb_to_linear(b), a]
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}
