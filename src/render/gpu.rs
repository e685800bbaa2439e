use vello::wgpu;

use crate::foundation::core::{Affine, GeoExtent};
use crate::foundation::error::{TilefieldError, TilefieldResult, soft_assert};
use crate::foundation::math::align_to;
use crate::render::backend::TileDevice;
use crate::scene::model::{FeatureSet, Geometry};

const COUNT_WGSL: &str = r#"
@group(0) @binding(0) var tile: texture_2d<f32>;

@vertex
fn vs(@builtin(vertex_index) vi: u32) -> @builtin(position) vec4<f32> {
  var p = array<vec2<f32>, 3>(
    vec2<f32>(-1.0, -1.0),
    vec2<f32>( 3.0, -1.0),
    vec2<f32>(-1.0,  3.0),
  );
  return vec4<f32>(p[vi], 0.0, 1.0);
}

@fragment
fn fs(@builtin(position) pos: vec4<f32>) -> @location(0) vec4<f32> {
  let a = textureLoad(tile, vec2<i32>(pos.xy), 0).a;
  if (a <= 0.0) {
    discard;
  }
  return vec4<f32>(0.0);
}
"#;

/// Fullscreen pass whose surviving fragments are the tile's non-transparent pixels.
struct CountPass {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    sink_view: wgpu::TextureView,
}

/// Tile device drawing with `vello` into an offscreen texture.
///
/// Touched pixels are counted with an occlusion query over a pass that discards fully
/// transparent texels; readback copies the texture into a mapped buffer with padded rows.
pub struct GpuTileDevice {
    width: u32,
    height: u32,
    bytes_per_row: u32,
    device: wgpu::Device,
    queue: wgpu::Queue,
    renderer: vello::Renderer,
    scene: vello::Scene,
    target: wgpu::Texture,
    target_view: wgpu::TextureView,
    count: CountPass,
}

/// Persistent host-visible staging buffer.
pub struct GpuTransferBuffer {
    buffer: wgpu::Buffer,
}

/// Occlusion query plus its resolve and readback buffers.
pub struct GpuSampleQuery {
    set: wgpu::QuerySet,
    resolve: wgpu::Buffer,
    readback: wgpu::Buffer,
    active: bool,
}

impl GpuTileDevice {
    pub fn new(width: u32, height: u32) -> TilefieldResult<Self> {
        soft_assert(
            width > 0 && height > 0,
            "GpuTileDevice::new",
            "dimensions must be > 0",
        )?;

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| match e {
            wgpu::RequestAdapterError::NotFound { .. } => {
                TilefieldError::gpu("no gpu adapter available")
            }
            other => TilefieldError::gpu(format!("wgpu request_adapter failed: {other:?}")),
        })?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("tilefield_tile_device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| TilefieldError::gpu(format!("wgpu request_device failed: {e:?}")))?;

        let renderer = vello::Renderer::new(&device, vello::RendererOptions::default())
            .map_err(|e| TilefieldError::gpu(format!("vello renderer init failed: {e:?}")))?;

        let bytes_per_row_unpadded = width
            .checked_mul(4)
            .ok_or_else(|| TilefieldError::invalid_argument("render target width overflow"))?;
        let bytes_per_row = align_to(bytes_per_row_unpadded, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let target = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("tilefield_tile_target"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let target_view = target.create_view(&wgpu::TextureViewDescriptor::default());
        let count = build_count_pass(&device, &target_view, size);

        tracing::debug!(width, height, adapter = ?adapter.get_info().name, "gpu tile device ready");
        Ok(Self {
            width,
            height,
            bytes_per_row,
            device,
            queue,
            renderer,
            scene: vello::Scene::new(),
            target,
            target_view,
            count,
        })
    }

    fn staging_buffer(&self, label: &'static str) -> wgpu::Buffer {
        self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: u64::from(self.bytes_per_row) * u64::from(self.height),
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Copy the target into `staging`, map it and strip the row padding into `out`.
    fn read_through(&self, staging: &wgpu::Buffer, out: &mut [u8]) -> TilefieldResult<()> {
        let row_bytes = (self.width as usize) * 4;
        if out.len() != row_bytes * self.height as usize {
            return Err(TilefieldError::render(format!(
                "readback expects {} bytes, got {}",
                row_bytes * self.height as usize,
                out.len()
            )));
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("tilefield_readback_encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.target,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(self.bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(Some(encoder.finish()));

        map_blocking(&self.device, staging)?;
        let mapped = staging.slice(..).get_mapped_range();
        let padded = self.bytes_per_row as usize;
        for (row, dst) in out.chunks_exact_mut(row_bytes).enumerate() {
            let start = row * padded;
            dst.copy_from_slice(&mapped[start..start + row_bytes]);
        }
        drop(mapped);
        staging.unmap();
        Ok(())
    }

    fn encode_scene(&mut self, content: &FeatureSet, to_pixel: Affine) {
        use vello::peniko::{Color, Fill};

        self.scene.reset();
        for feature in content {
            let [r, g, b, a] = feature.style.color.to_straight_rgba();
            let color = Color::from_rgba8(r, g, b, a);
            let mut path = feature.geometry.path().clone();
            path.apply_affine(to_pixel);
            match &feature.geometry {
                Geometry::Polygon(_) => {
                    self.scene
                        .fill(Fill::NonZero, Affine::IDENTITY, color, None, &path);
                }
                Geometry::LineString(_) => {
                    let stroke = kurbo::Stroke::new(feature.style.stroke_width_px);
                    self.scene
                        .stroke(&stroke, Affine::IDENTITY, color, None, &path);
                }
            }
        }
    }
}

impl std::fmt::Debug for GpuTileDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuTileDevice")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl TileDevice for GpuTileDevice {
    type Content = FeatureSet;
    type TransferBuffer = GpuTransferBuffer;
    type SampleQuery = GpuSampleQuery;

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn supports_transfer_buffer(&self) -> bool {
        true
    }

    fn create_transfer_buffer(&mut self, size_bytes: u64) -> TilefieldResult<GpuTransferBuffer> {
        let buffer = self.staging_buffer("tilefield_transfer");
        if buffer.size() < size_bytes {
            return Err(TilefieldError::gpu(format!(
                "transfer buffer of {} bytes cannot hold {size_bytes}",
                buffer.size()
            )));
        }
        Ok(GpuTransferBuffer { buffer })
    }

    fn create_sample_query(&mut self) -> TilefieldResult<GpuSampleQuery> {
        let set = self.device.create_query_set(&wgpu::QuerySetDescriptor {
            label: Some("tilefield_samples"),
            ty: wgpu::QueryType::Occlusion,
            count: 1,
        });
        let resolve = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tilefield_samples_resolve"),
            size: wgpu::QUERY_SIZE as u64,
            usage: wgpu::BufferUsages::QUERY_RESOLVE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let readback = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tilefield_samples_readback"),
            size: wgpu::QUERY_SIZE as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Ok(GpuSampleQuery {
            set,
            resolve,
            readback,
            active: false,
        })
    }

    fn begin_samples(&mut self, query: &mut GpuSampleQuery) -> TilefieldResult<()> {
        query.active = true;
        Ok(())
    }

    fn draw(&mut self, content: &FeatureSet, extent: &GeoExtent) -> TilefieldResult<()> {
        let to_pixel = extent.to_pixel_transform(self.width, self.height);
        self.encode_scene(content, to_pixel);
        self.renderer
            .render_to_texture(
                &self.device,
                &self.queue,
                &self.scene,
                &self.target_view,
                &vello::RenderParams {
                    base_color: vello::peniko::Color::from_rgba8(0, 0, 0, 0),
                    width: self.width,
                    height: self.height,
                    antialiasing_method: vello::AaConfig::Area,
                },
            )
            .map_err(|e| TilefieldError::render(format!("vello render failed: {e:?}")))
    }

    fn end_samples(&mut self, query: &mut GpuSampleQuery) -> TilefieldResult<u64> {
        if !std::mem::take(&mut query.active) {
            return Err(TilefieldError::render(
                "end_samples called without begin_samples",
            ));
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("tilefield_count_encoder"),
            });
        {
            let mut rp = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("tilefield_count_rp"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.count.sink_view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Discard,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: Some(&query.set),
            });
            rp.set_pipeline(&self.count.pipeline);
            rp.set_bind_group(0, &self.count.bind_group, &[]);
            rp.begin_occlusion_query(0);
            rp.draw(0..3, 0..1);
            rp.end_occlusion_query();
        }
        encoder.resolve_query_set(&query.set, 0..1, &query.resolve, 0);
        encoder.copy_buffer_to_buffer(
            &query.resolve,
            0,
            &query.readback,
            0,
            wgpu::QUERY_SIZE as u64,
        );
        self.queue.submit(Some(encoder.finish()));

        map_blocking(&self.device, &query.readback)?;
        let mapped = query.readback.slice(..).get_mapped_range();
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&mapped[..8]);
        drop(mapped);
        query.readback.unmap();
        Ok(u64::from_le_bytes(raw))
    }

    fn read_via_transfer(
        &mut self,
        buffer: &mut GpuTransferBuffer,
        out: &mut [u8],
    ) -> TilefieldResult<()> {
        self.read_through(&buffer.buffer, out)
    }

    fn read_direct(&mut self, out: &mut [u8]) -> TilefieldResult<()> {
        let staging = self.staging_buffer("tilefield_direct_readback");
        self.read_through(&staging, out)
    }
}

fn build_count_pass(
    device: &wgpu::Device,
    target_view: &wgpu::TextureView,
    size: wgpu::Extent3d,
) -> CountPass {
    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("tilefield_count_bgl"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                multisampled: false,
                view_dimension: wgpu::TextureViewDimension::D2,
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
            },
            count: None,
        }],
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("tilefield_count_bg"),
        layout: &bind_group_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::TextureView(target_view),
        }],
    });

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("tilefield_count_shader"),
        source: wgpu::ShaderSource::Wgsl(COUNT_WGSL.into()),
    });
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("tilefield_count_pl"),
        bind_group_layouts: &[&bind_group_layout],
        push_constant_ranges: &[],
    });
    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("tilefield_count_pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            buffers: &[],
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: wgpu::TextureFormat::R8Unorm,
                blend: None,
                write_mask: wgpu::ColorWrites::empty(),
            })],
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    });

    let sink = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("tilefield_count_sink"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::R8Unorm,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let sink_view = sink.create_view(&wgpu::TextureViewDescriptor::default());

    CountPass {
        pipeline,
        bind_group,
        sink_view,
    }
}

fn map_blocking(device: &wgpu::Device, buffer: &wgpu::Buffer) -> TilefieldResult<()> {
    let (tx, rx) = std::sync::mpsc::channel();
    buffer.slice(..).map_async(wgpu::MapMode::Read, move |res| {
        let _ = tx.send(res);
    });
    device
        .poll(wgpu::PollType::wait_indefinitely())
        .map_err(|e| TilefieldError::gpu(format!("wgpu poll failed: {e:?}")))?;
    rx.recv()
        .map_err(|_| TilefieldError::gpu("readback channel closed"))?
        .map_err(|e| TilefieldError::gpu(format!("readback map failed: {e:?}")))
}
