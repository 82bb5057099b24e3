//! Software driver implementing [`ClearDevice`].
//!
//! Used for offline runs and for tests. A [`Quirk`] reproduces the layered
//! clear bugs seen on real drivers; fault injection reproduces driver errors.

use crate::device::ClearDevice;
use crate::matrix::StorageKind;
use cubeclear_common::{CubeFace, DriverError, DriverStatus, FACE_COUNT, Rgba8};
use std::collections::BTreeMap;

/// Byte pattern left in texels that were never written.
pub const GARBAGE: u8 = 0xCD;

/// How the simulated layered clear misbehaves.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Quirk {
    #[default]
    Compliant,
    /// The layered clear leaves `faces` untouched on textures with `storage`.
    SkipFaces {
        storage: StorageKind,
        faces: Vec<CubeFace>,
    },
}

impl Quirk {
    pub fn skips_first_layer(storage: StorageKind) -> Self {
        Quirk::SkipFaces {
            storage,
            faces: vec![CubeFace::PositiveX],
        }
    }

    pub fn clears_first_layer_only(storage: StorageKind) -> Self {
        Quirk::SkipFaces {
            storage,
            faces: CubeFace::ALL[1..].to_vec(),
        }
    }

    fn skips(&self, storage: StorageKind, face: CubeFace) -> bool {
        match self {
            Quirk::Compliant => false,
            Quirk::SkipFaces {
                storage: kind,
                faces,
            } => *kind == storage && faces.contains(&face),
        }
    }
}

/// Driver entry points, for fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    CreateCube,
    SpecifyFace,
    AllocateStorage,
    ClearTexture,
    AttachLayered,
    ClearAttachment,
    Detach,
    ReadFace,
    Destroy,
}

/// One issued driver call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateCube { face_size: u32 },
    SpecifyFace { face: CubeFace, seeded: bool },
    AllocateStorage { levels: u32 },
    ClearTexture { color: Rgba8 },
    AttachLayered,
    ClearAttachment { color: Rgba8 },
    Detach,
    ReadFace { face: CubeFace },
    Destroy,
}

impl Call {
    pub fn kind(&self) -> CallKind {
        match self {
            Call::CreateCube { .. } => CallKind::CreateCube,
            Call::SpecifyFace { .. } => CallKind::SpecifyFace,
            Call::AllocateStorage { .. } => CallKind::AllocateStorage,
            Call::ClearTexture { .. } => CallKind::ClearTexture,
            Call::AttachLayered => CallKind::AttachLayered,
            Call::ClearAttachment { .. } => CallKind::ClearAttachment,
            Call::Detach => CallKind::Detach,
            Call::ReadFace { .. } => CallKind::ReadFace,
            Call::Destroy => CallKind::Destroy,
        }
    }
}

/// Texture and framebuffer names of one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimHandles {
    pub texture: u32,
    pub framebuffer: u32,
}

#[derive(Debug)]
struct SimTexture {
    face_size: u32,
    storage: Option<StorageKind>,
    faces: [Option<Vec<u8>>; FACE_COUNT],
}

impl SimTexture {
    fn face_bytes(&self) -> usize {
        (self.face_size as usize) * (self.face_size as usize) * 4
    }

    fn is_complete(&self) -> bool {
        self.faces.iter().all(Option::is_some)
    }

    fn fill(&mut self, face: CubeFace, color: Rgba8) {
        let texels = self.face_bytes() / 4;
        self.faces[face.index()] =
            Some(bytemuck::cast_slice::<Rgba8, u8>(&vec![color; texels]).to_vec());
    }
}

/// In-memory driver. Texture contents live on the host.
#[derive(Debug, Default)]
pub struct SimulatedDevice {
    quirk: Quirk,
    textures: BTreeMap<u32, SimTexture>,
    /// Framebuffer name to attached texture name.
    framebuffers: BTreeMap<u32, Option<u32>>,
    bound_framebuffer: Option<u32>,
    next_name: u32,
    pending: DriverStatus,
    faults: Vec<(CallKind, DriverError)>,
    calls: Vec<Call>,
    peak_live_textures: usize,
}

impl SimulatedDevice {
    pub fn new(quirk: Quirk) -> Self {
        Self {
            quirk,
            next_name: 1,
            ..Default::default()
        }
    }

    pub fn compliant() -> Self {
        Self::new(Quirk::Compliant)
    }

    /// Make the next call of `kind` fail with `err` and have no effect.
    ///
    /// `CreateCube` still hands out names; `Destroy` never fails.
    pub fn fail_on(&mut self, kind: CallKind, err: DriverError) {
        self.faults.push((kind, err));
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_framebuffers(&self) -> usize {
        self.framebuffers.len()
    }

    pub fn bound_framebuffer(&self) -> Option<u32> {
        self.bound_framebuffer
    }

    /// Highest number of texture objects alive at once.
    pub fn peak_live_textures(&self) -> usize {
        self.peak_live_textures
    }

    fn issue(&mut self, call: Call) -> bool {
        let kind = call.kind();
        self.calls.push(call);
        match self.faults.iter().position(|(k, _)| *k == kind) {
            Some(pos) => {
                let (_, err) = self.faults.remove(pos);
                tracing::debug!(?kind, %err, "injected driver fault");
                self.pending.record(err);
                false
            }
            None => true,
        }
    }

    fn fail(&mut self, err: DriverError) {
        self.pending.record(err);
    }

    fn texture_mut(&mut self, name: u32) -> Option<&mut SimTexture> {
        self.textures.get_mut(&name)
    }
}

impl ClearDevice for SimulatedDevice {
    type Handles = SimHandles;

    fn create_cube(&mut self, face_size: u32) -> SimHandles {
        self.issue(Call::CreateCube { face_size });
        let handles = SimHandles {
            texture: self.next_name,
            framebuffer: self.next_name + 1,
        };
        self.next_name += 2;
        self.textures.insert(
            handles.texture,
            SimTexture {
                face_size,
                storage: None,
                faces: Default::default(),
            },
        );
        self.framebuffers.insert(handles.framebuffer, None);
        self.peak_live_textures = self.peak_live_textures.max(self.textures.len());
        handles
    }

    fn specify_face(&mut self, handles: &mut SimHandles, face: CubeFace, data: Option<&[u8]>) {
        if !self.issue(Call::SpecifyFace {
            face,
            seeded: data.is_some(),
        }) {
            return;
        }
        let result = match self.texture_mut(handles.texture) {
            None => Err(DriverError::InvalidOperation),
            Some(tex) if tex.storage == Some(StorageKind::Immutable) => {
                Err(DriverError::InvalidOperation)
            }
            Some(tex) => match data {
                Some(bytes) if bytes.len() != tex.face_bytes() => Err(DriverError::InvalidValue),
                Some(bytes) => {
                    tex.storage = Some(StorageKind::Mutable);
                    tex.faces[face.index()] = Some(bytes.to_vec());
                    Ok(())
                }
                None => {
                    tex.storage = Some(StorageKind::Mutable);
                    tex.faces[face.index()] = Some(vec![GARBAGE; tex.face_bytes()]);
                    Ok(())
                }
            },
        };
        if let Err(err) = result {
            self.fail(err);
        }
    }

    fn allocate_storage(&mut self, handles: &mut SimHandles, levels: u32) {
        if !self.issue(Call::AllocateStorage { levels }) {
            return;
        }
        let result = match self.texture_mut(handles.texture) {
            None => Err(DriverError::InvalidOperation),
            Some(_) if levels == 0 => Err(DriverError::InvalidValue),
            Some(tex) if tex.storage == Some(StorageKind::Immutable) => {
                Err(DriverError::InvalidOperation)
            }
            Some(tex) => {
                tex.storage = Some(StorageKind::Immutable);
                let bytes = tex.face_bytes();
                for face in tex.faces.iter_mut() {
                    *face = Some(vec![GARBAGE; bytes]);
                }
                Ok(())
            }
        };
        if let Err(err) = result {
            self.fail(err);
        }
    }

    fn clear_texture(&mut self, handles: &mut SimHandles, color: Rgba8) {
        if !self.issue(Call::ClearTexture { color }) {
            return;
        }
        let result = match self.texture_mut(handles.texture) {
            Some(tex) if tex.is_complete() => {
                for face in CubeFace::ALL {
                    tex.fill(face, color);
                }
                Ok(())
            }
            _ => Err(DriverError::InvalidOperation),
        };
        if let Err(err) = result {
            self.fail(err);
        }
    }

    fn attach_layered(&mut self, handles: &mut SimHandles) {
        if !self.issue(Call::AttachLayered) {
            return;
        }
        self.bound_framebuffer = Some(handles.framebuffer);
        let complete = self
            .textures
            .get(&handles.texture)
            .is_some_and(SimTexture::is_complete);
        if complete {
            self.framebuffers
                .insert(handles.framebuffer, Some(handles.texture));
        } else {
            self.fail(DriverError::InvalidOperation);
        }
    }

    fn clear_attachment(&mut self, _handles: &mut SimHandles, color: Rgba8) {
        if !self.issue(Call::ClearAttachment { color }) {
            return;
        }
        let attached = self
            .bound_framebuffer
            .and_then(|fb| self.framebuffers.get(&fb).copied().flatten());
        let Some(name) = attached else {
            self.fail(DriverError::InvalidOperation);
            return;
        };
        let quirk = self.quirk.clone();
        if let Some(tex) = self.texture_mut(name) {
            let storage = tex.storage.unwrap_or(StorageKind::Mutable);
            for face in CubeFace::ALL {
                if quirk.skips(storage, face) {
                    continue;
                }
                tex.fill(face, color);
            }
        }
    }

    fn detach(&mut self, _handles: &mut SimHandles) {
        if self.issue(Call::Detach) {
            self.bound_framebuffer = None;
        }
    }

    fn read_face(&mut self, handles: &SimHandles, face: CubeFace, dst: &mut [u8]) {
        if !self.issue(Call::ReadFace { face }) {
            return;
        }
        let result = match self.textures.get(&handles.texture) {
            Some(tex) => match &tex.faces[face.index()] {
                Some(texels) if texels.len() == dst.len() => {
                    dst.copy_from_slice(texels);
                    Ok(())
                }
                Some(_) => Err(DriverError::InvalidValue),
                None => Err(DriverError::InvalidOperation),
            },
            None => Err(DriverError::InvalidOperation),
        };
        if let Err(err) = result {
            self.fail(err);
        }
    }

    fn take_error(&mut self) -> DriverStatus {
        std::mem::take(&mut self.pending)
    }

    fn destroy(&mut self, handles: &mut SimHandles) {
        let texture = self.textures.remove(&handles.texture);
        let framebuffer = self.framebuffers.remove(&handles.framebuffer);
        if texture.is_none() && framebuffer.is_none() {
            return;
        }
        self.calls.push(Call::Destroy);
        if self.bound_framebuffer == Some(handles.framebuffer) {
            self.bound_framebuffer = None;
        }
    }
}
