use std::num::NonZeroU64;

use crate::field::jfa::{flood_extent, flood_rounds};
use crate::field::nnf::NearestNeighborField;
use crate::foundation::error::{TilefieldError, TilefieldResult};

const WORKGROUP_SIZE: u32 = 8;
/// Per-round uniform slot; matches the default `min_uniform_buffer_offset_alignment`.
const PARAMS_STRIDE: u64 = 256;
const PARAMS_SIZE: u64 = 16;

const JFA_WGSL: &str = r#"
struct Params {
  width: u32,
  height: u32,
  step: u32,
  _pad: u32,
};

const NODATA: f32 = 32767.0;

@group(0) @binding(0) var<storage, read> src: array<vec2<f32>>;
@group(0) @binding(1) var<storage, read_write> dst: array<vec2<f32>>;
@group(0) @binding(2) var<uniform> params: Params;

fn dist2(q: vec2<f32>, p: vec2<f32>) -> f32 {
  let d = p - q;
  return d.x * d.x + d.y * d.y;
}

@compute @workgroup_size(8, 8, 1)
fn jfa(@builtin(global_invocation_id) gid: vec3<u32>) {
  if (gid.x >= params.width || gid.y >= params.height) {
    return;
  }
  let w = i32(params.width);
  let h = i32(params.height);
  let l = i32(params.step);
  let s = i32(gid.x);
  let t = i32(gid.y);
  let q = vec2<f32>(f32(s), f32(t));

  var best = src[gid.y * params.width + gid.x];
  for (var i = -1; i <= 1; i = i + 1) {
    let rs = s + i * l;
    if (rs < 0 || rs >= w) {
      continue;
    }
    for (var j = -1; j <= 1; j = j + 1) {
      let rt = t + j * l;
      if (rt < 0 || rt >= h || (i == 0 && j == 0)) {
        continue;
      }
      let c = src[u32(rt) * params.width + u32(rs)];
      if (c.x == NODATA) {
        continue;
      }
      if (best.x == NODATA || dist2(q, c) < dist2(q, best)) {
        best = c;
      }
    }
  }
  dst[gid.y * params.width + gid.x] = best;
}
"#;

/// Jump flood on a wgpu compute device.
///
/// Each round is one dispatch over the whole field, reading the previous round's buffer and
/// writing the other one; the step size arrives through a dynamic uniform offset. Separate compute
/// passes order the rounds, so no invocation ever sees a partially written round.
pub struct GpuJumpFlood {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl GpuJumpFlood {
    /// Acquire an adapter and compile the kernel.
    pub fn new() -> TilefieldResult<Self> {
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
            label: Some("tilefield_jfa_device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| TilefieldError::gpu(format!("wgpu request_device failed: {e:?}")))?;

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tilefield_jfa_bgl"),
            entries: &[
                storage_entry(0, true),
                storage_entry(1, false),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: NonZeroU64::new(PARAMS_SIZE),
                    },
                    count: None,
                },
            ],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("tilefield_jfa_shader"),
            source: wgpu::ShaderSource::Wgsl(JFA_WGSL.into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("tilefield_jfa_pl"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("tilefield_jfa_pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("jfa"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        });

        tracing::debug!(adapter = ?adapter.get_info().name, "gpu jump flood ready");
        Ok(Self {
            device,
            queue,
            pipeline,
            bind_group_layout,
        })
    }

    /// Flood `nnf` in place. On any GPU failure `nnf` is left unchanged.
    pub fn flood(&self, nnf: &mut NearestNeighborField) -> TilefieldResult<()> {
        let n = flood_extent(nnf, "GpuJumpFlood::flood")?;
        let steps: Vec<u32> = flood_rounds(n).collect();
        if steps.is_empty() {
            return Ok(());
        }

        let (w, h) = (nnf.width(), nnf.height());
        let cells = nnf.encode_rg32f();
        let field_bytes = (cells.len() as u64) * 4;
        let max_binding = u64::from(self.device.limits().max_storage_buffer_binding_size);
        if field_bytes > max_binding {
            return Err(TilefieldError::gpu(format!(
                "field of {field_bytes} bytes exceeds the storage binding limit ({max_binding})"
            )));
        }

        let ping = self.storage_buffer("tilefield_jfa_ping", field_bytes);
        let pong = self.storage_buffer("tilefield_jfa_pong", field_bytes);
        self.queue.write_buffer(&ping, 0, &f32s_to_bytes(&cells));

        let params = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tilefield_jfa_params"),
            size: PARAMS_STRIDE * steps.len() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mut param_bytes = vec![0u8; (PARAMS_STRIDE as usize) * steps.len()];
        for (round, &step) in steps.iter().enumerate() {
            let at = round * PARAMS_STRIDE as usize;
            param_bytes[at..at + 4].copy_from_slice(&w.to_le_bytes());
            param_bytes[at + 4..at + 8].copy_from_slice(&h.to_le_bytes());
            param_bytes[at + 8..at + 12].copy_from_slice(&step.to_le_bytes());
        }
        self.queue.write_buffer(&params, 0, &param_bytes);

        let forward = self.bind_group(&ping, &pong, &params);
        let backward = self.bind_group(&pong, &ping, &params);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("tilefield_jfa_encoder"),
            });
        for (round, &step) in steps.iter().enumerate() {
            let bind_group = if round % 2 == 0 { &forward } else { &backward };
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("tilefield_jfa_round"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, bind_group, &[(round as u64 * PARAMS_STRIDE) as u32]);
            pass.dispatch_workgroups(w.div_ceil(WORKGROUP_SIZE), h.div_ceil(WORKGROUP_SIZE), 1);
            tracing::trace!(step, "jump flood round (gpu)");
        }

        let result = if steps.len() % 2 == 0 { &ping } else { &pong };
        let readback = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tilefield_jfa_readback"),
            size: field_bytes,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        encoder.copy_buffer_to_buffer(result, 0, &readback, 0, field_bytes);
        self.queue.submit(Some(encoder.finish()));

        let floats = map_read(&self.device, &readback)?;
        nnf.decode_rg32f(&floats)
    }

    fn storage_buffer(&self, label: &'static str, size: u64) -> wgpu::Buffer {
        self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        })
    }

    fn bind_group(
        &self,
        src: &wgpu::Buffer,
        dst: &wgpu::Buffer,
        params: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tilefield_jfa_bg"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: src.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: dst.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: params,
                        offset: 0,
                        size: NonZeroU64::new(PARAMS_SIZE),
                    }),
                },
            ],
        })
    }
}

impl std::fmt::Debug for GpuJumpFlood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuJumpFlood").finish_non_exhaustive()
    }
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn f32s_to_bytes(values: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * 4);
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

fn map_read(device: &wgpu::Device, buffer: &wgpu::Buffer) -> TilefieldResult<Vec<f32>> {
    let slice = buffer.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |res| {
        let _ = tx.send(res);
    });
    device
        .poll(wgpu::PollType::wait_indefinitely())
        .map_err(|e| TilefieldError::gpu(format!("wgpu poll failed: {e:?}")))?;
    rx.recv()
        .map_err(|_| TilefieldError::gpu("readback channel closed"))?
        .map_err(|e| TilefieldError::gpu(format!("readback map failed: {e:?}")))?;

    let mapped = slice.get_mapped_range();
    let floats = mapped
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    drop(mapped);
    buffer.unmap();
    Ok(floats)
}
