use cubeclear_common::{CubeFace, DriverStatus, Rgba8};

/// Driver interface the lifecycle manager runs a variant against.
///
/// One method per lifecycle step. Implementations record driver failures
/// internally and hand them back through [`ClearDevice::take_error`]; none of
/// these calls abort the run.
pub trait ClearDevice {
    /// A texture + framebuffer pair owned by one variant.
    type Handles;

    /// Create a cube-map texture name and a framebuffer name, with nearest
    /// filtering on the texture.
    fn create_cube(&mut self, face_size: u32) -> Self::Handles;

    /// Mutable image specification for one face. `None` leaves contents
    /// undefined.
    fn specify_face(&mut self, handles: &mut Self::Handles, face: CubeFace, data: Option<&[u8]>);

    /// Immutable storage for all six faces at once.
    fn allocate_storage(&mut self, handles: &mut Self::Handles, levels: u32);

    /// Clear every texel of every face to `color`, bypassing the framebuffer.
    fn clear_texture(&mut self, handles: &mut Self::Handles, color: Rgba8);

    /// Bind the framebuffer and attach the whole cube as one layered color
    /// attachment.
    fn attach_layered(&mut self, handles: &mut Self::Handles);

    /// Clear the bound framebuffer's color buffer to `color`.
    fn clear_attachment(&mut self, handles: &mut Self::Handles, color: Rgba8);

    /// Bind the default framebuffer.
    fn detach(&mut self, handles: &mut Self::Handles);

    /// Read one full face, mip 0, into `dst`. Blocks until prior commands
    /// affecting the face have completed.
    fn read_face(&mut self, handles: &Self::Handles, face: CubeFace, dst: &mut [u8]);

    /// Return and reset the pending driver status.
    fn take_error(&mut self) -> DriverStatus;

    /// Delete the texture and framebuffer. Calling it twice is a no-op.
    fn destroy(&mut self, handles: &mut Self::Handles);
}
