use cubeclear_common::{CubeFace, DriverError, DriverStatus, FACE_COUNT, Rgba8};
use cubeclear_probe::ClearDevice;

const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Row pitch of a face readback, padded to the copy alignment.
pub fn padded_bytes_per_row(face_size: u32) -> u32 {
    let unpadded = face_size * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

fn driver_error(err: &wgpu::Error) -> DriverError {
    match err {
        wgpu::Error::OutOfMemory { .. } => DriverError::OutOfMemory,
        wgpu::Error::Validation { .. } => DriverError::InvalidOperation,
        _ => DriverError::Internal,
    }
}

fn face_extent(face_size: u32, layers: u32) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: face_size,
        height: face_size,
        depth_or_array_layers: layers,
    }
}

/// The framebuffer of one variant: color attachment 0 and whether it is bound.
#[derive(Default)]
struct Framebuffer {
    color0: Option<wgpu::TextureView>,
    bound: bool,
}

/// GPU objects of one variant.
pub struct WgpuHandles {
    face_size: u32,
    sampler: Option<wgpu::Sampler>,
    texture: Option<wgpu::Texture>,
    immutable: bool,
    framebuffer: Option<Framebuffer>,
}

impl WgpuHandles {
    fn face_bytes(&self) -> usize {
        (self.face_size as usize) * (self.face_size as usize) * 4
    }
}

/// Host-visible buffer a face is copied into before landing in the scratch
/// buffer. Reused across faces and variants of the same size.
struct Staging {
    buffer: wgpu::Buffer,
    face_size: u32,
    padded_bytes_per_row: u32,
}

/// [`ClearDevice`] over a wgpu device and queue.
pub struct WgpuClearDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    staging: Option<Staging>,
    pending: DriverStatus,
    scopes_open: bool,
}

impl WgpuClearDevice {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            staging: None,
            pending: DriverStatus::OK,
            scopes_open: false,
        }
    }

    fn create_texture(&self, face_size: u32, levels: u32) -> wgpu::Texture {
        self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("cubeclear.cube"),
            size: face_extent(face_size, FACE_COUNT as u32),
            mip_level_count: levels,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        })
    }

    /// Upload `data` to `layers` layers of mip 0 starting at `first_layer`.
    fn write_layers(
        &self,
        texture: &wgpu::Texture,
        face_size: u32,
        first_layer: u32,
        layers: u32,
        data: &[u8],
    ) {
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: 0,
                    y: 0,
                    z: first_layer,
                },
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(face_size * 4),
                rows_per_image: Some(face_size),
            },
            face_extent(face_size, layers),
        );
    }

    fn ensure_staging(&mut self, face_size: u32) {
        if self
            .staging
            .as_ref()
            .is_some_and(|s| s.face_size == face_size)
        {
            return;
        }
        let padded_bytes_per_row = padded_bytes_per_row(face_size);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("cubeclear.readback"),
            size: u64::from(padded_bytes_per_row) * u64::from(face_size),
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        if let Some(old) = self.staging.replace(Staging {
            buffer,
            face_size,
            padded_bytes_per_row,
        }) {
            old.buffer.destroy();
        }
    }

    /// Copy one layer into the staging buffer, wait for it, and unpad the
    /// rows into `dst`. `dst` is only written when the copy and the map
    /// both complete without a validation error.
    fn read_layer(
        &self,
        texture: &wgpu::Texture,
        face: CubeFace,
        dst: &mut [u8],
    ) -> Result<(), DriverError> {
        let staging = self.staging.as_ref().ok_or(DriverError::Internal)?;

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let mapped = self.map_layer(staging, texture, face);
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            tracing::warn!(face = face.label(), "readback copy failed: {err}");
            if mapped.is_ok() {
                staging.buffer.unmap();
            }
            return Err(driver_error(&err));
        }
        mapped?;

        let row = (staging.face_size * 4) as usize;
        let pitch = staging.padded_bytes_per_row as usize;
        {
            let view = staging.buffer.slice(..).get_mapped_range();
            for (y, out) in dst.chunks_exact_mut(row).enumerate() {
                out.copy_from_slice(&view[y * pitch..y * pitch + row]);
            }
        }
        staging.buffer.unmap();
        Ok(())
    }

    /// Record and submit the layer copy, then block until the staging
    /// buffer is mapped for reading.
    fn map_layer(
        &self,
        staging: &Staging,
        texture: &wgpu::Texture,
        face: CubeFace,
    ) -> Result<(), DriverError> {
        let face_size = staging.face_size;
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("cubeclear.readback_encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: 0,
                    y: 0,
                    z: face.index() as u32,
                },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging.buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(staging.padded_bytes_per_row),
                    rows_per_image: Some(face_size),
                },
            },
            face_extent(face_size, 1),
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let (sender, receiver) = std::sync::mpsc::channel();
        staging
            .buffer
            .slice(..)
            .map_async(wgpu::MapMode::Read, move |res| {
                sender.send(res).ok();
            });
        // Readback is the one synchronization point of a variant.
        let _ = self.device.poll(wgpu::Maintain::Wait);
        match receiver.recv() {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => {
                tracing::warn!(face = face.label(), "readback map failed: {err}");
                Err(DriverError::Internal)
            }
            Err(_) => Err(DriverError::Internal),
        }
    }

    fn pop_scopes(&mut self) -> Option<DriverError> {
        if !self.scopes_open {
            return None;
        }
        self.scopes_open = false;
        let validation = pollster::block_on(self.device.pop_error_scope());
        let oom = pollster::block_on(self.device.pop_error_scope());
        for err in validation.iter().chain(oom.iter()) {
            tracing::debug!("captured wgpu error: {err}");
        }
        oom.or(validation).map(|err| driver_error(&err))
    }
}

impl ClearDevice for WgpuClearDevice {
    type Handles = WgpuHandles;

    fn create_cube(&mut self, face_size: u32) -> WgpuHandles {
        if !self.scopes_open {
            self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
            self.device.push_error_scope(wgpu::ErrorFilter::Validation);
            self.scopes_open = true;
        }
        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("cubeclear.cube_sampler"),
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        WgpuHandles {
            face_size,
            sampler: Some(sampler),
            texture: None,
            immutable: false,
            framebuffer: Some(Framebuffer::default()),
        }
    }

    fn specify_face(&mut self, handles: &mut WgpuHandles, face: CubeFace, data: Option<&[u8]>) {
        if handles.immutable {
            self.pending.record(DriverError::InvalidOperation);
            return;
        }
        if data.is_some_and(|d| d.len() != handles.face_bytes()) {
            self.pending.record(DriverError::InvalidValue);
            return;
        }
        // wgpu has no per-face image calls; the first one realizes the texture.
        let texture = match handles.texture.take() {
            Some(texture) => texture,
            None => self.create_texture(handles.face_size, 1),
        };
        if let Some(bytes) = data {
            self.write_layers(&texture, handles.face_size, face.index() as u32, 1, bytes);
        }
        handles.texture = Some(texture);
    }

    fn allocate_storage(&mut self, handles: &mut WgpuHandles, levels: u32) {
        if handles.texture.is_some() {
            self.pending.record(DriverError::InvalidOperation);
            return;
        }
        if levels == 0 {
            self.pending.record(DriverError::InvalidValue);
            return;
        }
        handles.texture = Some(self.create_texture(handles.face_size, levels));
        handles.immutable = true;
    }

    fn clear_texture(&mut self, handles: &mut WgpuHandles, color: Rgba8) {
        let Some(texture) = handles.texture.as_ref() else {
            self.pending.record(DriverError::InvalidOperation);
            return;
        };
        let texels = (handles.face_size as usize).pow(2) * FACE_COUNT;
        let fill = vec![color; texels];
        self.write_layers(
            texture,
            handles.face_size,
            0,
            FACE_COUNT as u32,
            bytemuck::cast_slice(&fill),
        );
    }

    fn attach_layered(&mut self, handles: &mut WgpuHandles) {
        let (Some(texture), Some(framebuffer)) =
            (handles.texture.as_ref(), handles.framebuffer.as_mut())
        else {
            self.pending.record(DriverError::InvalidOperation);
            return;
        };
        framebuffer.bound = true;
        framebuffer.color0 = Some(texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("cubeclear.layered_attachment"),
            format: Some(FORMAT),
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            base_mip_level: 0,
            mip_level_count: Some(1),
            base_array_layer: 0,
            array_layer_count: Some(FACE_COUNT as u32),
            ..Default::default()
        }));
    }

    fn clear_attachment(&mut self, handles: &mut WgpuHandles, color: Rgba8) {
        let Some(view) = handles
            .framebuffer
            .as_ref()
            .filter(|fb| fb.bound)
            .and_then(|fb| fb.color0.as_ref())
        else {
            self.pending.record(DriverError::InvalidOperation);
            return;
        };
        let [r, g, b, a] = color.to_unit();
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("cubeclear.clear_encoder"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("cubeclear.layered_clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                ..Default::default()
            });
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn detach(&mut self, handles: &mut WgpuHandles) {
        if let Some(framebuffer) = handles.framebuffer.as_mut() {
            framebuffer.bound = false;
        }
    }

    fn read_face(&mut self, handles: &WgpuHandles, face: CubeFace, dst: &mut [u8]) {
        let Some(texture) = handles.texture.as_ref() else {
            self.pending.record(DriverError::InvalidOperation);
            return;
        };
        if handles.face_size == 0 || dst.len() != handles.face_bytes() {
            self.pending.record(DriverError::InvalidValue);
            return;
        }
        self.ensure_staging(handles.face_size);
        if let Err(err) = self.read_layer(texture, face, dst) {
            self.pending.record(err);
        }
    }

    fn take_error(&mut self) -> DriverStatus {
        let mut status = std::mem::take(&mut self.pending);
        if let Some(err) = self.pop_scopes() {
            status.record(err);
        }
        status
    }

    fn destroy(&mut self, handles: &mut WgpuHandles) {
        handles.framebuffer = None;
        if let Some(texture) = handles.texture.take() {
            texture.destroy();
        }
        handles.sampler = None;
    }
}
