use crate::shared::image::ColorImage;

/// Display surface the pipeline hands each annotated frame to.
///
/// Called from the tick worker, so implementations must not block and must
/// marshal onto their own UI context if they need one.
pub trait RenderSink: Send + Sync {
    /// Shows `image` and updates the visible face counter.
    fn present(&self, image: ColorImage, face_count: usize);

    /// What the surface currently shows, as a still image. Never re-grabs;
    /// before the first `present` this is a blank image of the surface size.
    fn capture_current_view(&self) -> ColorImage;

    /// Current surface size; a zero dimension means it is not laid out yet.
    fn surface_size(&self) -> (u32, u32);

    /// Blanks the surface and resets the counter to zero.
    fn clear(&self) {}

    /// Grabs have failed for several ticks in a row.
    fn signal_lost(&self) {}

    /// A frame was emitted again after `signal_lost`.
    fn signal_restored(&self) {}
}
