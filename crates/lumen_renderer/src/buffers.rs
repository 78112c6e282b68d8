//! Accumulation and display buffers.
//!
//! Buffers are only ever reallocated, never resized in place: a resolution
//! change produces fresh buffers and discards prior accumulation.

use half::f16;
use lumen_math::Vec4;

use crate::error::{RenderError, RenderResult};

/// Pixel dimensions of the traced image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> RenderResult<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidResolution { width, height });
        }
        Ok(Self { width, height })
    }

    /// Buffer size for a host viewport of `width` x `height` pixels,
    /// scaled by `scale` and rounded up.
    pub fn from_viewport(width: u32, height: u32, scale: f32) -> RenderResult<Self> {
        Self::new(
            (width as f32 * scale).ceil() as u32,
            (height as f32 * scale).ceil() as u32,
        )
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Allocate a buffer, surfacing allocation failure instead of aborting.
fn try_alloc<T: Clone>(what: &'static str, len: usize, value: T) -> RenderResult<Vec<T>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|source| RenderError::Allocation {
            what,
            pixels: len,
            source,
        })?;
    buffer.resize(len, value);
    Ok(buffer)
}

/// Double-buffered running radiance sums.
///
/// Each pixel is a `Vec4` of (r, g, b) radiance summed over all samples so
/// far, with the sample count in `w`. A batch reads `input` and writes
/// `input + batch` to `output`; the next batch swaps the two.
#[derive(Debug)]
pub struct AccumulationBuffers {
    resolution: Resolution,
    input: Vec<Vec4>,
    output: Vec<Vec4>,
    ray_counts: Vec<u32>,
}

impl AccumulationBuffers {
    pub fn allocate(resolution: Resolution) -> RenderResult<Self> {
        let len = resolution.pixel_count();
        Ok(Self {
            resolution,
            input: try_alloc("accumulation input", len, Vec4::ZERO)?,
            output: try_alloc("accumulation output", len, Vec4::ZERO)?,
            ray_counts: try_alloc("ray counters", len, 0)?,
        })
    }

    /// Hard reset: replace the input with a freshly zeroed buffer.
    pub fn reset(&mut self) -> RenderResult<()> {
        self.input = try_alloc("accumulation input", self.resolution.pixel_count(), Vec4::ZERO)?;
        Ok(())
    }

    /// Carry the last batch's result over as the next batch's running sum.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.input, &mut self.output);
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn input(&self) -> &[Vec4] {
        &self.input
    }

    /// Running sums after the most recent batch.
    pub fn output(&self) -> &[Vec4] {
        &self.output
    }

    pub fn ray_counts(&self) -> &[u32] {
        &self.ray_counts
    }

    pub fn total_rays(&self) -> u64 {
        self.ray_counts.iter().map(|&n| n as u64).sum()
    }

    /// Split borrows for a batch: read input, write output and ray counts.
    pub(crate) fn batch_views(&mut self) -> (&[Vec4], &mut [Vec4], &mut [u32]) {
        (&self.input, &mut self.output, &mut self.ray_counts)
    }
}

/// One display pixel: tone-mapped RGBA in half precision.
pub type Rgba16 = [f16; 4];

/// Display-ready image produced by the combine pass.
#[derive(Debug, Clone)]
pub struct FrontBuffer {
    resolution: Resolution,
    pixels: Vec<Rgba16>,
}

impl FrontBuffer {
    /// Transparent black image.
    pub fn allocate(resolution: Resolution) -> RenderResult<Self> {
        Ok(Self {
            resolution,
            pixels: try_alloc("front buffer", resolution.pixel_count(), [f16::ZERO; 4])?,
        })
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Pixels in row-major order, top row first.
    pub fn pixels(&self) -> &[Rgba16] {
        &self.pixels
    }

    pub(crate) fn pixels_mut(&mut self) -> &mut [Rgba16] {
        &mut self.pixels
    }

    /// Raw RGBA16F bytes for texture upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Pixel (x, y) widened to f32.
    pub fn get(&self, x: u32, y: u32) -> [f32; 4] {
        let px = self.pixels[(y * self.resolution.width + x) as usize];
        px.map(f16::to_f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_from_viewport_rounds_up() {
        let res = Resolution::from_viewport(1001, 501, 0.5).unwrap();
        assert_eq!(res, Resolution { width: 501, height: 251 });
        assert_eq!(res.pixel_count(), 501 * 251);
    }

    #[test]
    fn test_zero_resolution_is_rejected() {
        assert!(matches!(
            Resolution::new(0, 10),
            Err(RenderError::InvalidResolution { width: 0, height: 10 })
        ));
        assert!(Resolution::from_viewport(100, 100, 0.0).is_err());
    }

    #[test]
    fn test_buffers_share_pixel_count() {
        let buffers = AccumulationBuffers::allocate(Resolution::new(7, 3).unwrap()).unwrap();
        assert_eq!(buffers.input().len(), 21);
        assert_eq!(buffers.output().len(), 21);
        assert_eq!(buffers.ray_counts().len(), 21);
    }

    #[test]
    fn test_swap_exchanges_input_and_output() {
        let mut buffers = AccumulationBuffers::allocate(Resolution::new(2, 1).unwrap()).unwrap();
        {
            let (_, output, _) = buffers.batch_views();
            output[0] = Vec4::new(1.0, 2.0, 3.0, 1.0);
        }
        buffers.swap();

        assert_eq!(buffers.input()[0], Vec4::new(1.0, 2.0, 3.0, 1.0));
        assert_eq!(buffers.output()[0], Vec4::ZERO);
    }

    #[test]
    fn test_reset_zeroes_input() {
        let mut buffers = AccumulationBuffers::allocate(Resolution::new(4, 4).unwrap()).unwrap();
        {
            let (_, output, _) = buffers.batch_views();
            output.fill(Vec4::splat(9.0));
        }
        buffers.swap();
        assert!(buffers.input().iter().all(|p| *p == Vec4::splat(9.0)));

        buffers.reset().unwrap();
        assert!(buffers.input().iter().all(|p| *p == Vec4::ZERO));
        assert_eq!(buffers.input().len(), 16);
    }

    #[test]
    fn test_front_buffer_bytes() {
        let front = FrontBuffer::allocate(Resolution::new(3, 2).unwrap()).unwrap();
        // 4 channels * 2 bytes
        assert_eq!(front.as_bytes().len(), 3 * 2 * 8);
        assert_eq!(front.get(2, 1), [0.0; 4]);
    }
}
