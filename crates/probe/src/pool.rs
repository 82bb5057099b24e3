use cubeclear_common::Rgba8;

/// Host-side pixel buffers shared by every variant of a run.
///
/// The seed buffer holds one face of the seed color; the scratch buffer
/// receives each face readback and is only meaningful right after one.
/// Both are released when the pool is dropped.
#[derive(Debug)]
pub struct PixelPool {
    face_size: u32,
    seed: Vec<u8>,
    scratch: Vec<u8>,
}

impl PixelPool {
    pub fn new(face_size: u32, seed_color: Rgba8) -> Self {
        let texels = (face_size as usize) * (face_size as usize);
        let seed = bytemuck::cast_slice::<Rgba8, u8>(&vec![seed_color; texels]).to_vec();
        Self {
            face_size,
            seed,
            scratch: vec![0; texels * 4],
        }
    }

    pub fn face_size(&self) -> u32 {
        self.face_size
    }

    /// Size in bytes of one face.
    pub fn face_bytes(&self) -> usize {
        self.seed.len()
    }

    pub fn seed(&self) -> &[u8] {
        &self.seed
    }

    pub fn scratch_mut(&mut self) -> &mut [u8] {
        &mut self.scratch
    }

    /// Fill the scratch buffer with transparent black, which never verifies,
    /// so a readback that writes nothing cannot inherit an earlier face.
    pub fn reset_scratch(&mut self) {
        self.scratch.fill(0);
    }

    /// Texel at the center of the last readback.
    pub fn center_texel(&self) -> Rgba8 {
        let half = (self.face_size / 2) as usize;
        let idx = half * self.face_size as usize + half;
        let texels: &[Rgba8] = bytemuck::cast_slice(&self.scratch);
        texels.get(idx).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffers_are_face_sized() {
        let pool = PixelPool::new(256, Rgba8::WHITE);
        assert_eq!(pool.face_bytes(), 256 * 256 * 4);
        assert!(pool.seed().iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn center_texel_reads_middle_of_scratch() {
        let mut pool = PixelPool::new(4, Rgba8::WHITE);
        let scratch = pool.scratch_mut();
        // texel (2, 2) of a 4x4 face
        let idx = (2 * 4 + 2) * 4;
        scratch[idx..idx + 4].copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(pool.center_texel(), Rgba8([1, 2, 3, 4]));
    }

    #[test]
    fn reset_scratch_clears_previous_readback() {
        let mut pool = PixelPool::new(4, Rgba8::WHITE);
        pool.scratch_mut().fill(0xFF);
        assert_eq!(pool.center_texel(), Rgba8::WHITE);
        pool.reset_scratch();
        assert_eq!(pool.center_texel(), Rgba8::default());
        assert!(!crate::verify_clear(pool.center_texel()));
    }

    #[test]
    fn empty_pool_center_is_zero() {
        let pool = PixelPool::new(0, Rgba8::WHITE);
        assert_eq!(pool.center_texel(), Rgba8::default());
    }
}
