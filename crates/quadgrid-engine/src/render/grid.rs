use anyhow::Result;
use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

use crate::camera::{model_matrix, CameraUniform};
use crate::device::DEPTH_FORMAT;
use crate::geometry::{GridGeometry, MeshUpload, Vertex};
use crate::render::{RenderCtx, RenderTarget};
use crate::shader::layout::{CAMERA_SLOT, MODEL_SLOT};
use crate::shader::ShaderProgram;

/// Size of one model matrix in the per-draw uniform buffer.
const MODEL_SIZE: u64 = MODEL_SLOT.size as u64;

const _: () = assert!(std::mem::size_of::<Mat4>() as u64 == MODEL_SIZE);
const _: () = assert!(std::mem::size_of::<CameraUniform>() == CAMERA_SLOT.size as usize);

/// Inputs for one grid frame.
pub struct GridFrame<'a> {
    /// Projection matrix; the scene computes it once.
    pub projection: Mat4,
    pub view: Mat4,
    pub geometry: &'a GridGeometry,
    /// Uniform scale applied to the quad before translation.
    pub instance_scale: f32,
}

/// Draws one quad per grid position.
///
/// The quad mesh is uploaded once (or replicated, see [`MeshUpload`]); each
/// position gets its own model matrix slot in a dynamic-offset uniform buffer
/// and its own draw call.
pub struct GridRenderer {
    program: ShaderProgram,
    upload: MeshUpload,

    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,

    camera_bgl: Option<wgpu::BindGroupLayout>,
    model_bgl: Option<wgpu::BindGroupLayout>,

    camera_ubo: Option<wgpu::Buffer>,
    camera_bind_group: Option<wgpu::BindGroup>,

    model_ubo: Option<wgpu::Buffer>,
    model_bind_group: Option<wgpu::BindGroup>,
    model_capacity: usize,
    model_stride: u64,
    model_bytes: Vec<u8>,

    mesh_vbo: Option<wgpu::Buffer>,
    mesh_len: usize,
}

impl GridRenderer {
    pub fn new(program: ShaderProgram, upload: MeshUpload) -> Self {
        Self {
            program,
            upload,
            pipeline_format: None,
            pipeline: None,
            camera_bgl: None,
            model_bgl: None,
            camera_ubo: None,
            camera_bind_group: None,
            model_ubo: None,
            model_bind_group: None,
            model_capacity: 0,
            model_stride: MODEL_SIZE,
            model_bytes: Vec::new(),
            mesh_vbo: None,
            mesh_len: 0,
        }
    }

    /// Creates every GPU resource `geometry` needs.
    ///
    /// Fails when the device cannot hold one model slot per grid position.
    /// Called implicitly by [`render`](Self::render); calling it ahead of the
    /// first frame moves pipeline creation out of the loop.
    pub fn prepare(&mut self, ctx: &RenderCtx<'_>, geometry: &GridGeometry) -> Result<()> {
        self.ensure_pipeline(ctx);
        self.ensure_camera_binding(ctx);
        self.ensure_mesh(ctx, geometry);
        self.ensure_model_capacity(ctx, geometry.positions().len())
    }

    /// Records the grid into `target`: one draw per position, in position order.
    ///
    /// Returns the number of draws recorded.
    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        frame: &GridFrame<'_>,
    ) -> usize {
        let positions = frame.geometry.positions();
        if positions.is_empty() {
            return 0;
        }

        // Mutating methods must happen before borrowing pipeline/buffers immutably.
        if let Err(err) = self.prepare(ctx, frame.geometry) {
            log::error!("grid not drawn: {err:#}");
            return 0;
        }
        self.write_camera_uniform(ctx, frame.projection, frame.view);
        self.write_model_uniforms(ctx, positions, frame.instance_scale);

        let Some(pipeline) = self.pipeline.as_ref() else { return 0 };
        let Some(camera_bind_group) = self.camera_bind_group.as_ref() else { return 0 };
        let Some(model_bind_group) = self.model_bind_group.as_ref() else { return 0 };
        let Some(mesh_vbo) = self.mesh_vbo.as_ref() else { return 0 };

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("quadgrid grid pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: target.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(CAMERA_SLOT.group, camera_bind_group, &[]);
        rpass.set_vertex_buffer(0, mesh_vbo.slice(..));

        let quad_len = frame.geometry.base().len() as u32;
        let mut draws = 0;
        for index in 0..positions.len() {
            // In range: capacity was checked against u32 offsets in prepare().
            let offset = (index as u64 * self.model_stride) as u32;
            let first = frame.geometry.first_vertex(self.upload, index);
            rpass.set_bind_group(MODEL_SLOT.group, model_bind_group, &[offset]);
            rpass.draw(first..first + quad_len, 0..1);
            draws += 1;
        }
        draws
    }

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>) {
        if self.pipeline_format == Some(ctx.surface_format) && self.pipeline.is_some() {
            return;
        }

        let (vs, fs) = self.program.create_modules(ctx.device);

        let camera_bgl = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("quadgrid camera bgl"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: CAMERA_SLOT.binding,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: Some(uniform_size(CAMERA_SLOT.size as u64)),
                    },
                    count: None,
                }],
            });

        let model_bgl = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("quadgrid model bgl"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: MODEL_SLOT.binding,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: Some(uniform_size(MODEL_SIZE)),
                    },
                    count: None,
                }],
            });

        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("quadgrid pipeline layout"),
                bind_group_layouts: &[&camera_bgl, &model_bgl],
                immediate_size: 0,
            });

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("quadgrid pipeline"),
            layout: Some(&pipeline_layout),

            vertex: wgpu::VertexState {
                module: &vs,
                entry_point: Some(self.program.vertex_entry()),
                compilation_options: Default::default(),
                buffers: &[Vertex::layout()],
            },

            fragment: Some(wgpu::FragmentState {
                module: &fs,
                entry_point: Some(self.program.fragment_entry()),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),

            multiview_mask: None,
            cache: None,
        });

        log::debug!("grid pipeline created for {:?}", ctx.surface_format);

        self.pipeline_format = Some(ctx.surface_format);
        self.pipeline = Some(pipeline);
        self.camera_bgl = Some(camera_bgl);
        self.model_bgl = Some(model_bgl);

        // Bind groups reference the old layouts.
        self.camera_bind_group = None;
        self.camera_ubo = None;
        self.model_bind_group = None;
        self.model_ubo = None;
        self.model_capacity = 0;
    }

    fn ensure_camera_binding(&mut self, ctx: &RenderCtx<'_>) {
        if self.camera_bind_group.is_some() && self.camera_ubo.is_some() {
            return;
        }
        let Some(bgl) = self.camera_bgl.as_ref() else { return };

        let camera_ubo = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("quadgrid camera ubo"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("quadgrid camera bind group"),
            layout: bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: CAMERA_SLOT.binding,
                resource: camera_ubo.as_entire_binding(),
            }],
        });

        self.camera_ubo = Some(camera_ubo);
        self.camera_bind_group = Some(bind_group);
    }

    fn ensure_mesh(&mut self, ctx: &RenderCtx<'_>, geometry: &GridGeometry) {
        let vertices = match self.upload {
            MeshUpload::Shared => geometry.base().len(),
            MeshUpload::Replicated => geometry.base().len() * geometry.positions().len(),
        };
        if self.mesh_vbo.is_some() && self.mesh_len == vertices {
            return;
        }

        let data = geometry.vertices(self.upload);
        self.mesh_vbo = Some(ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quadgrid mesh vbo"),
            contents: bytemuck::cast_slice(&data),
            usage: wgpu::BufferUsages::VERTEX,
        }));
        self.mesh_len = data.len();

        log::debug!("uploaded {} mesh vertices ({:?})", data.len(), self.upload);
    }

    fn ensure_model_capacity(&mut self, ctx: &RenderCtx<'_>, required: usize) -> Result<()> {
        if required <= self.model_capacity && self.model_bind_group.is_some() {
            return Ok(());
        }
        let Some(bgl) = self.model_bgl.as_ref() else { return Ok(()) };

        let limits = ctx.device.limits();
        let stride = model_stride(limits.min_uniform_buffer_offset_alignment as u64);
        check_model_capacity(required, stride, limits.max_buffer_size)?;
        let capacity = required.max(1);

        let model_ubo = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("quadgrid model ubo"),
            size: capacity as u64 * stride,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("quadgrid model bind group"),
            layout: bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: MODEL_SLOT.binding,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &model_ubo,
                    offset: 0,
                    size: Some(uniform_size(MODEL_SIZE)),
                }),
            }],
        });

        self.model_ubo = Some(model_ubo);
        self.model_bind_group = Some(bind_group);
        self.model_capacity = capacity;
        self.model_stride = stride;
        Ok(())
    }

    fn write_camera_uniform(&mut self, ctx: &RenderCtx<'_>, projection: Mat4, view: Mat4) {
        let Some(ubo) = self.camera_ubo.as_ref() else { return };
        let u = CameraUniform::new(projection, view);
        ctx.queue.write_buffer(ubo, 0, bytemuck::bytes_of(&u));
    }

    fn write_model_uniforms(&mut self, ctx: &RenderCtx<'_>, positions: &[Vec3], scale: f32) {
        let Some(ubo) = self.model_ubo.as_ref() else { return };
        pack_models(positions, scale, self.model_stride, &mut self.model_bytes);
        ctx.queue.write_buffer(ubo, 0, &self.model_bytes);
    }
}

/// Distance between model slots: one matrix rounded up to the device's
/// dynamic-offset alignment.
fn model_stride(alignment: u64) -> u64 {
    MODEL_SIZE.div_ceil(alignment.max(1)) * alignment.max(1)
}

/// Model slots one buffer can hold: bounded by the device's buffer size and by
/// dynamic offsets being `u32`.
fn max_model_slots(stride: u64, max_buffer_size: u64) -> usize {
    let by_size = max_buffer_size / stride;
    let by_offset = u32::MAX as u64 / stride + 1;
    by_size.min(by_offset).try_into().unwrap_or(usize::MAX)
}

fn check_model_capacity(required: usize, stride: u64, max_buffer_size: u64) -> Result<()> {
    let limit = max_model_slots(stride, max_buffer_size);
    anyhow::ensure!(
        required <= limit,
        "{required} grid positions need {} bytes of model uniforms; \
         this device fits at most {limit} positions",
        required as u64 * stride,
    );
    Ok(())
}

/// Writes `model_matrix(p, scale)` for every position into `out`, slot `i`
/// starting at byte `i * stride`.
fn pack_models(positions: &[Vec3], scale: f32, stride: u64, out: &mut Vec<u8>) {
    let stride = stride as usize;
    out.clear();
    out.resize(positions.len() * stride, 0);
    for (slot, &p) in out.chunks_exact_mut(stride).zip(positions) {
        let m = model_matrix(p, scale).to_cols_array();
        slot[..MODEL_SIZE as usize].copy_from_slice(bytemuck::cast_slice(&m));
    }
}

fn uniform_size(size: u64) -> wgpu::BufferSize {
    wgpu::BufferSize::new(size).expect("uniform blocks have non-zero size")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_respects_alignment() {
        assert_eq!(model_stride(256), 256);
        assert_eq!(model_stride(64), 64);
        assert_eq!(model_stride(16), 64);
        assert_eq!(model_stride(0), 64);
    }

    #[test]
    fn packed_slots_hold_model_matrices() {
        let positions = [Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), Vec3::new(0.0, 2.0, 0.0)];
        let mut bytes = Vec::new();
        pack_models(&positions, 0.2, 256, &mut bytes);

        assert_eq!(bytes.len(), 3 * 256);
        for (i, &p) in positions.iter().enumerate() {
            let start = i * 256;
            let cols: [f32; 16] = bytemuck::pod_read_unaligned(&bytes[start..start + 64]);
            let m = Mat4::from_cols_array(&cols);
            assert_eq!(m, model_matrix(p, 0.2));
        }
    }

    #[test]
    fn packing_reuses_the_buffer() {
        let mut bytes = Vec::new();
        pack_models(&[Vec3::ONE; 4], 1.0, 64, &mut bytes);
        pack_models(&[Vec3::ONE; 2], 1.0, 64, &mut bytes);
        assert_eq!(bytes.len(), 128);
    }
    #[test]
    fn slots_bounded_by_buffer_size() {
        assert_eq!(max_model_slots(256, 256 << 20), 1 << 20);
        assert_eq!(max_model_slots(64, 1000), 15);
    }

    #[test]
    fn slots_bounded_by_u32_offsets() {
        assert_eq!(max_model_slots(256, u64::MAX), (u32::MAX as usize) / 256 + 1);
    }

    #[test]
    fn oversized_grid_is_rejected() {
        let max = 256 << 20;
        assert!(check_model_capacity(1024 * 1024, 256, max).is_ok());

        let err = check_model_capacity(1100 * 1100, 256, max).unwrap_err();
        assert!(err.to_string().contains("1210000 grid positions"), "{err}");
    }

    mod offscreen {
        use super::*;
        use crate::camera::{Projection, View};
        use crate::geometry::QUAD_VERTICES;
        use crate::shader::ShaderSources;

        const SIZE: u32 = 64;
        const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

        fn device() -> Option<(wgpu::Device, wgpu::Queue)> {
            let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
            let adapter =
                pollster::block_on(instance.request_adapter(&Default::default())).ok()?;
            let desc = wgpu::DeviceDescriptor {
                required_limits: adapter.limits(),
                ..Default::default()
            };
            pollster::block_on(adapter.request_device(&desc)).ok()
        }

        fn texture(device: &wgpu::Device, format: wgpu::TextureFormat) -> wgpu::Texture {
            device.create_texture(&wgpu::TextureDescriptor {
                label: None,
                size: wgpu::Extent3d {
                    width: SIZE,
                    height: SIZE,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            })
        }

        /// Clears, draws the grid once and reads the colour target back as RGBA8.
        fn draw(
            device: &wgpu::Device,
            queue: &wgpu::Queue,
            upload: MeshUpload,
            frame: &GridFrame<'_>,
        ) -> (usize, Vec<u8>) {
            let program = ShaderProgram::build(&ShaderSources::default()).unwrap();
            let mut renderer = GridRenderer::new(program, upload);
            let ctx = RenderCtx {
                device,
                queue,
                surface_format: FORMAT,
            };
            renderer.prepare(&ctx, frame.geometry).unwrap();

            let color = texture(device, FORMAT);
            let depth = texture(device, DEPTH_FORMAT);
            let color_view = color.create_view(&Default::default());
            let depth_view = depth.create_view(&Default::default());
            let mut encoder = device.create_command_encoder(&Default::default());

            encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: None,
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            let draws = {
                let mut target = RenderTarget {
                    encoder: &mut encoder,
                    color_view: &color_view,
                    depth_view: &depth_view,
                };
                renderer.render(&ctx, &mut target, frame)
            };

            let readback = device.create_buffer(&wgpu::BufferDescriptor {
                label: None,
                size: (SIZE * SIZE * 4) as u64,
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                mapped_at_creation: false,
            });
            encoder.copy_texture_to_buffer(
                color.as_image_copy(),
                wgpu::TexelCopyBufferInfo {
                    buffer: &readback,
                    layout: wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(SIZE * 4),
                        rows_per_image: Some(SIZE),
                    },
                },
                wgpu::Extent3d {
                    width: SIZE,
                    height: SIZE,
                    depth_or_array_layers: 1,
                },
            );
            queue.submit(std::iter::once(encoder.finish()));

            let slice = readback.slice(..);
            slice.map_async(wgpu::MapMode::Read, |r| r.unwrap());
            device.poll(wgpu::PollType::wait_indefinitely()).unwrap();
            let pixels = slice.get_mapped_range().to_vec();
            (draws, pixels)
        }

        fn is_orange(pixels: &[u8], x: u32, y: u32) -> bool {
            let i = ((y * SIZE + x) * 4) as usize;
            let [r, g, b, _] = [pixels[i], pixels[i + 1], pixels[i + 2], pixels[i + 3]];
            r > 200 && (100..160).contains(&g) && b < 90
        }

        /// Pixel under world point `p`.
        fn pixel_of(clip: Mat4, p: Vec3) -> (u32, u32) {
            let ndc = clip.project_point3(p);
            let to_px = |v: f32| ((v * 0.5 + 0.5) * SIZE as f32).clamp(0.0, SIZE as f32 - 1.0);
            (to_px(ndc.x) as u32, to_px(-ndc.y) as u32)
        }

        #[test]
        fn single_quad_covers_a_quarter_of_the_target() {
            let Some((device, queue)) = device() else {
                eprintln!("no GPU adapter; skipped");
                return;
            };
            let geometry = GridGeometry::generate(1, &QUAD_VERTICES);
            let frame = GridFrame {
                projection: Mat4::IDENTITY,
                view: Mat4::IDENTITY,
                geometry: &geometry,
                instance_scale: 1.0,
            };

            let (draws, pixels) = draw(&device, &queue, MeshUpload::Shared, &frame);

            assert_eq!(draws, 1);
            let covered = (0..SIZE)
                .flat_map(|y| (0..SIZE).map(move |x| (x, y)))
                .filter(|&(x, y)| is_orange(&pixels, x, y))
                .count();
            assert_eq!(covered, (SIZE * SIZE / 4) as usize);
        }

        #[test]
        fn one_quad_drawn_at_every_grid_position() {
            let Some((device, queue)) = device() else {
                eprintln!("no GPU adapter; skipped");
                return;
            };
            let geometry = GridGeometry::generate(3, &QUAD_VERTICES);
            let projection = Projection::perspective(45.0, SIZE as f32, SIZE as f32).matrix();
            let view = View::look_at(Vec3::new(2.0, 2.0, 8.0), Vec3::new(2.0, 2.0, 0.0)).matrix();
            let clip = projection * view;

            for upload in [MeshUpload::Shared, MeshUpload::Replicated] {
                let frame = GridFrame {
                    projection,
                    view,
                    geometry: &geometry,
                    instance_scale: 1.0,
                };
                let (draws, pixels) = draw(&device, &queue, upload, &frame);

                assert_eq!(draws, geometry.positions().len(), "{upload:?}");
                for &p in geometry.positions() {
                    let (x, y) = pixel_of(clip, p);
                    assert!(is_orange(&pixels, x, y), "{upload:?}: no quad at {p}");
                }
                // Gap between the first two cells stays background.
                let (x, y) = pixel_of(clip, Vec3::new(1.0, 0.0, 0.0));
                assert!(!is_orange(&pixels, x, y), "{upload:?}: gap filled");
            }
        }
    }
}
