use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;
use wgpu::*;

use crate::config::DemoConfig;
use crate::controller::{FrameLoopContext, FrameRenderer, LoadTicket};
use crate::model::{Camera, Scene};
use crate::ui;
use crate::utils::{create_sphere_mesh, rgb_from_hex, Mesh, MeshBuffer, Vertex};
use crate::view::GpuContext;

pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

const VERTEX_ATTRIBUTES: [VertexAttribute; 3] = wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x4];
const INSTANCE_ATTRIBUTES: [VertexAttribute; 5] =
    wgpu::vertex_attr_array![3 => Float32x4, 4 => Float32x4, 5 => Float32x4, 6 => Float32x4, 7 => Float32x4];

#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub eye: [f32; 4],
    pub fog: [f32; 4],
}

impl CameraUniform {
    pub fn new(camera: &Camera, fog_near: f32, fog_far: f32) -> Self {
        Self {
            view_proj: camera.view_proj().to_cols_array_2d(),
            eye: camera.eye.extend(1.0).to_array(),
            fog: [fog_near, fog_far, 0.0, 0.0],
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightingUniform {
    pub sky: [f32; 4],
    pub ground: [f32; 4],
    pub sun_dir: [f32; 4],
    pub sun_color: [f32; 4],
}

impl Default for LightingUniform {
    /// Hemisphere light plus a directional light from (0, 200, 100)
    fn default() -> Self {
        let [sr, sg, sb] = rgb_from_hex(0x68ffff);
        let [gr, gg, gb] = rgb_from_hex(0xfffac5);
        let sun = Vec3::new(0.0, 200.0, 100.0).normalize();
        Self {
            sky: [sr, sg, sb, 0.6],
            ground: [gr, gg, gb, 0.0],
            sun_dir: sun.extend(0.0).to_array(),
            sun_color: [1.0, 1.0, 1.0, 0.8],
        }
    }
}

/// Per-instance model matrix and color tint
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    pub model: [[f32; 4]; 4],
    pub tint: [f32; 4],
}

impl InstanceRaw {
    pub const IDENTITY: InstanceRaw = InstanceRaw {
        model: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
        tint: [1.0; 4],
    };

    pub fn new(model: Mat4, tint: [f32; 4]) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            tint,
        }
    }
}

fn vertex_layouts() -> [VertexBufferLayout<'static>; 2] {
    [
        VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as BufferAddress,
            step_mode: VertexStepMode::Vertex,
            attributes: &VERTEX_ATTRIBUTES,
        },
        VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceRaw>() as BufferAddress,
            step_mode: VertexStepMode::Instance,
            attributes: &INSTANCE_ATTRIBUTES,
        },
    ]
}

// Shared graphics setup used by native and web
pub struct CameraResources {
    pub camera_buffer: Buffer,
    pub lighting_buffer: Buffer,
    pub bind_group_layout: BindGroupLayout,
    pub camera_bind_group: BindGroup,
}

pub struct ScenePipelines {
    pub lit: RenderPipeline,
    pub lines: RenderPipeline,
    pub points: RenderPipeline,
}

pub fn create_depth_texture(device: &Device, width: u32, height: u32) -> (Texture, TextureView) {
    let depth_texture = device.create_texture(&TextureDescriptor {
        label: Some("depth_texture"),
        size: Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let depth_view = depth_texture.create_view(&TextureViewDescriptor::default());
    (depth_texture, depth_view)
}

pub fn create_camera_resources(device: &Device) -> CameraResources {
    let camera_buffer = device.create_buffer_init(&util::BufferInitDescriptor {
        label: Some("camera_buffer"),
        contents: bytemuck::bytes_of(&CameraUniform::new(&Camera::new(1, 1), 0.0, 1.0)),
        usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
    });
    let lighting_buffer = device.create_buffer_init(&util::BufferInitDescriptor {
        label: Some("lighting_buffer"),
        contents: bytemuck::bytes_of(&LightingUniform::default()),
        usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
    });

    let uniform_entry = |binding| BindGroupLayoutEntry {
        binding,
        visibility: ShaderStages::VERTEX_FRAGMENT,
        ty: BindingType::Buffer {
            ty: BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    };
    let bind_group_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("camera_bind_group_layout"),
        entries: &[uniform_entry(0), uniform_entry(1)],
    });

    let camera_bind_group = device.create_bind_group(&BindGroupDescriptor {
        label: Some("camera_bind_group"),
        layout: &bind_group_layout,
        entries: &[
            BindGroupEntry { binding: 0, resource: camera_buffer.as_entire_binding() },
            BindGroupEntry { binding: 1, resource: lighting_buffer.as_entire_binding() },
        ],
    });

    CameraResources { camera_buffer, lighting_buffer, bind_group_layout, camera_bind_group }
}

struct PipelineDesc {
    label: &'static str,
    topology: PrimitiveTopology,
    fragment_entry: &'static str,
    blend: BlendState,
    depth_write: bool,
}

fn create_pipeline(
    device: &Device,
    layout: &PipelineLayout,
    shader: &ShaderModule,
    format: TextureFormat,
    desc: PipelineDesc,
) -> RenderPipeline {
    let buffers = vertex_layouts();
    device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some(desc.label),
        layout: Some(layout),
        vertex: VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &buffers,
            compilation_options: Default::default(),
        },
        fragment: Some(FragmentState {
            module: shader,
            entry_point: Some(desc.fragment_entry),
            targets: &[Some(ColorTargetState { format, blend: Some(desc.blend), write_mask: ColorWrites::ALL })],
            compilation_options: Default::default(),
        }),
        primitive: PrimitiveState {
            topology: desc.topology,
            strip_index_format: None,
            front_face: FrontFace::Ccw,
            // Floor is double sided
            cull_mode: None,
            polygon_mode: PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: desc.depth_write,
            depth_compare: CompareFunction::Less,
            stencil: StencilState::default(),
            bias: DepthBiasState::default(),
        }),
        multisample: MultisampleState { count: 1, mask: !0, alpha_to_coverage_enabled: false },
        multiview: None,
        cache: None,
    })
}

pub fn create_scene_pipelines(device: &Device, format: TextureFormat, bind_group_layout: &BindGroupLayout) -> ScenePipelines {
    let shader = device.create_shader_module(ShaderModuleDescriptor {
        label: Some("scene_shader"),
        source: ShaderSource::Wgsl(include_str!("../shaders/scene.wgsl").into()),
    });
    let layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
        label: Some("scene_pipeline_layout"),
        bind_group_layouts: &[bind_group_layout],
        push_constant_ranges: &[],
    });

    let additive = BlendState {
        color: BlendComponent {
            src_factor: BlendFactor::SrcAlpha,
            dst_factor: BlendFactor::One,
            operation: BlendOperation::Add,
        },
        alpha: BlendComponent::OVER,
    };

    ScenePipelines {
        lit: create_pipeline(device, &layout, &shader, format, PipelineDesc {
            label: "lit_pipeline",
            topology: PrimitiveTopology::TriangleList,
            fragment_entry: "fs_lit",
            blend: BlendState::ALPHA_BLENDING,
            depth_write: true,
        }),
        lines: create_pipeline(device, &layout, &shader, format, PipelineDesc {
            label: "line_pipeline",
            topology: PrimitiveTopology::LineList,
            fragment_entry: "fs_unlit",
            blend: BlendState::ALPHA_BLENDING,
            depth_write: false,
        }),
        points: create_pipeline(device, &layout, &shader, format, PipelineDesc {
            label: "point_pipeline",
            topology: PrimitiveTopology::PointList,
            fragment_entry: "fs_unlit",
            blend: additive,
            depth_write: false,
        }),
    }
}

/// Upload a mesh unless it is empty (zero-sized slices are invalid)
fn upload_nonempty(mesh: &Mesh, device: &Device) -> Option<MeshBuffer> {
    (!mesh.vertices.is_empty() && !mesh.indices.is_empty()).then(|| mesh.upload(device))
}

/// Instance buffer that grows to fit
struct InstanceBuffer {
    buffer: Buffer,
    capacity: usize,
    count: u32,
}

impl InstanceBuffer {
    fn new(device: &Device, label: &'static str, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let buffer = device.create_buffer(&BufferDescriptor {
            label: Some(label),
            size: (capacity * std::mem::size_of::<InstanceRaw>()) as BufferAddress,
            usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self { buffer, capacity, count: 0 }
    }

    fn write(&mut self, device: &Device, queue: &Queue, instances: &[InstanceRaw]) {
        if instances.len() > self.capacity {
            self.buffer.destroy();
            *self = Self::new(device, "instance_buffer", instances.len().next_power_of_two());
        }
        if !instances.is_empty() {
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(instances));
        }
        self.count = instances.len() as u32;
    }
}

/// GPU copy of the active character, tagged with the load it came from
struct CharacterGpu {
    ticket: LoadTicket,
    mesh: MeshBuffer,
}

fn draw_mesh(rp: &mut RenderPass<'_>, mesh: &MeshBuffer, instances: &Buffer, count: u32) {
    if mesh.index_count == 0 || count == 0 {
        return;
    }
    rp.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
    rp.set_vertex_buffer(1, instances.slice(..));
    rp.set_index_buffer(mesh.index_buffer.slice(..), IndexFormat::Uint32);
    rp.draw_indexed(0..mesh.index_count, 0, 0..count);
}

///////////////////////////////////////////////////////////////////////////////

/// Everything needed to draw a frame
pub struct RenderState {
    pub gpu: GpuContext,
    depth_view: TextureView,

    // Uniforms
    camera_buffer: Buffer,
    camera_bind_group: BindGroup,
    fog: (f32, f32),

    pipelines: ScenePipelines,

    // Static meshes
    floor: Option<MeshBuffer>,
    grid: Option<MeshBuffer>,
    particles: Option<MeshBuffer>,
    star: MeshBuffer,

    // Instances
    identity_instance: Buffer,
    star_instances: InstanceBuffer,
    character_instance: InstanceBuffer,
    character: Option<CharacterGpu>,
    skinned: Vec<Vertex>,
    star_scratch: Vec<InstanceRaw>,

    // UI
    pub egui_ctx: egui::Context,
    egui_renderer: egui_wgpu::Renderer,
    pending_input: Option<egui::RawInput>,
    pub platform_output: Option<egui::PlatformOutput>,
}

impl RenderState {
    pub fn new(gpu: GpuContext, scene: &Scene, config: &DemoConfig) -> Self {
        let device = gpu.device.clone();
        let (_, depth_view) = create_depth_texture(&device, gpu.config.width, gpu.config.height);
        let camera_resources = create_camera_resources(&device);
        let pipelines = create_scene_pipelines(&device, gpu.format, &camera_resources.bind_group_layout);

        let identity_instance = device.create_buffer_init(&util::BufferInitDescriptor {
            label: Some("identity_instance"),
            contents: bytemuck::bytes_of(&InstanceRaw::IDENTITY),
            usage: BufferUsages::VERTEX,
        });

        let egui_ctx = egui::Context::default();
        let egui_renderer = egui_wgpu::Renderer::new(&device, gpu.format, egui_wgpu::RendererOptions::default());

        tracing::info!(
            width = gpu.config.width,
            height = gpu.config.height,
            format = ?gpu.format,
            "renderer ready"
        );

        Self {
            depth_view,
            camera_buffer: camera_resources.camera_buffer,
            camera_bind_group: camera_resources.camera_bind_group,
            fog: (config.scene.fog_near, config.scene.fog_far),
            pipelines,
            floor: upload_nonempty(&scene.floor, &device),
            grid: upload_nonempty(&scene.grid, &device),
            particles: upload_nonempty(&scene.particles, &device),
            star: create_sphere_mesh(32, 16, [1.0; 4]).upload(&device),
            identity_instance,
            star_instances: InstanceBuffer::new(&device, "star_instances", scene.proxies.len()),
            character_instance: InstanceBuffer::new(&device, "character_instance", 1),
            character: None,
            skinned: Vec::new(),
            star_scratch: Vec::with_capacity(scene.proxies.len()),
            egui_ctx,
            egui_renderer,
            pending_input: None,
            platform_output: None,
            gpu,
        }
    }

    pub fn width(&self) -> u32 {
        self.gpu.config.width
    }

    pub fn height(&self) -> u32 {
        self.gpu.config.height
    }

    /// Input for the next UI pass; collected by the platform glue
    pub fn set_egui_input(&mut self, input: egui::RawInput) {
        self.pending_input = Some(input);
    }

    fn take_egui_input(&mut self) -> egui::RawInput {
        let mut input = self.pending_input.take().unwrap_or_default();
        if input.screen_rect.is_none() {
            let ppp = self.egui_ctx.pixels_per_point();
            input.screen_rect = Some(egui::Rect::from_min_size(
                egui::Pos2::ZERO,
                egui::vec2(self.width() as f32 / ppp, self.height() as f32 / ppp),
            ));
        }
        input
    }

    /// Upload the active character when it changed, releasing the old buffers
    fn sync_character(&mut self, ctx: &FrameLoopContext) {
        let active = ctx.character.active_ticket();
        if self.character.as_ref().map(|c| c.ticket) != active {
            if let Some(old) = self.character.take() {
                old.mesh.destroy();
                tracing::debug!(ticket = old.ticket.0, "character buffers released");
            }
            if let (Some(ticket), Some(character)) = (active, ctx.character.active()) {
                let template = character.model.mesh_template();
                if !template.vertices.is_empty() && !template.indices.is_empty() {
                    self.character = Some(CharacterGpu {
                        ticket,
                        mesh: template.upload_dynamic(&self.gpu.device),
                    });
                }
            }
        }

        let (Some(gpu_character), Some(character)) = (&self.character, ctx.character.active()) else {
            return;
        };
        character.skin_into(&mut self.skinned);
        self.gpu
            .queue
            .write_buffer(&gpu_character.mesh.vertex_buffer, 0, bytemuck::cast_slice(&self.skinned));
        let instance = [InstanceRaw::new(character.model_matrix(), [1.0; 4])];
        self.character_instance.write(&self.gpu.device, &self.gpu.queue, &instance);
    }

    fn write_frame_data(&mut self, ctx: &FrameLoopContext) {
        let camera = CameraUniform::new(&ctx.camera, self.fog.0, self.fog.1);
        self.gpu.queue.write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&camera));

        self.star_scratch.clear();
        self.star_scratch
            .extend(ctx.scene.proxies.iter().map(|p| InstanceRaw::new(p.model_matrix(), p.color)));
        self.star_instances.write(&self.gpu.device, &self.gpu.queue, &self.star_scratch);
    }

    fn draw(&mut self, full_output: egui::FullOutput) -> Result<(), SurfaceError> {
        let device = self.gpu.device.clone();
        let queue = self.gpu.queue.clone();

        // Textures first so a skipped frame does not lose font uploads
        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer.update_texture(&device, &queue, *id, image_delta);
        }
        let free_textures = |renderer: &mut egui_wgpu::Renderer| {
            for id in &full_output.textures_delta.free {
                renderer.free_texture(id);
            }
        };

        let frame = match self.gpu.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(SurfaceError::Lost | SurfaceError::Outdated) => {
                self.gpu.surface.configure(&device, &self.gpu.config);
                free_textures(&mut self.egui_renderer);
                return Ok(());
            }
            Err(e) => {
                free_textures(&mut self.egui_renderer);
                return Err(e);
            }
        };

        let primitives = self.egui_ctx.tessellate(full_output.shapes, full_output.pixels_per_point);
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.width(), self.height()],
            pixels_per_point: full_output.pixels_per_point,
        };

        let view = frame.texture.create_view(&TextureViewDescriptor::default());
        let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor { label: Some("encoder") });

        {
            let mut rp = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(Color::BLACK),
                        store: StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rp.set_bind_group(0, &self.camera_bind_group, &[]);

            rp.set_pipeline(&self.pipelines.lit);
            if let Some(floor) = &self.floor {
                draw_mesh(&mut rp, floor, &self.identity_instance, 1);
            }
            draw_mesh(&mut rp, &self.star, &self.star_instances.buffer, self.star_instances.count);
            if let Some(character) = &self.character {
                draw_mesh(&mut rp, &character.mesh, &self.character_instance.buffer, self.character_instance.count);
            }

            if let Some(grid) = &self.grid {
                rp.set_pipeline(&self.pipelines.lines);
                draw_mesh(&mut rp, grid, &self.identity_instance, 1);
            }
            if let Some(particles) = &self.particles {
                rp.set_pipeline(&self.pipelines.points);
                draw_mesh(&mut rp, particles, &self.identity_instance, 1);
            }
        }

        let egui_commands =
            self.egui_renderer
                .update_buffers(&device, &queue, &mut encoder, &primitives, &screen_descriptor);

        // Render egui overlay
        {
            let egui_pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("egui_render_pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Load,
                        store: StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.egui_renderer
                .render(&mut egui_pass.forget_lifetime(), &primitives, &screen_descriptor);
        }

        free_textures(&mut self.egui_renderer);

        queue.submit(egui_commands.into_iter().chain(std::iter::once(encoder.finish())));
        frame.present();
        Ok(())
    }
}

impl FrameRenderer for RenderState {
    fn resize(&mut self, width: u32, height: u32) {
        self.gpu.resize(width, height);
        let (_, depth_view) = create_depth_texture(&self.gpu.device, width, height);
        self.depth_view = depth_view;
    }

    fn render(&mut self, ctx: &mut FrameLoopContext) {
        self.sync_character(ctx);
        self.write_frame_data(ctx);

        let raw_input = self.take_egui_input();
        let mut full_output = ui::build_ui(&self.egui_ctx, raw_input, ctx);
        self.platform_output = Some(std::mem::take(&mut full_output.platform_output));

        if let Err(e) = self.draw(full_output) {
            tracing::error!(error = ?e, "failed to draw frame");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_layouts_match_shader() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 96);
        assert_eq!(std::mem::size_of::<LightingUniform>(), 64);
        assert_eq!(std::mem::size_of::<InstanceRaw>(), 80);
        assert_eq!(std::mem::size_of::<Vertex>(), 40);
    }

    #[test]
    fn test_instance_carries_proxy_transform() {
        let model = Mat4::from_scale_rotation_translation(Vec3::splat(25.0), glam::Quat::IDENTITY, Vec3::new(1.0, 2.0, 3.0));
        let raw = InstanceRaw::new(model, [0.5; 4]);
        assert_eq!(raw.model[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(raw.model[0][0], 25.0);
    }

    #[test]
    fn test_sun_points_up_and_back() {
        let lighting = LightingUniform::default();
        assert!(lighting.sun_dir[1] > 0.0 && lighting.sun_dir[2] > 0.0);
        assert_eq!(lighting.sun_dir[0], 0.0);
    }
}
