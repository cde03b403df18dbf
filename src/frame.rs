// Owned YUV 4:2:0 pixel planes, sized to the macroblock-aligned buffers a
// VP8 decode needs (full mb_width*16 x mb_height*16 luma, half-resolution
// chroma, cropped only at emit time).

use crate::error::DecodeError;

pub struct Plane {
    pub width: usize,
    pub height: usize,
    pub stride: usize,
    pub data: Box<[u8]>,
}

impl Plane {
    pub fn new(width: usize, height: usize) -> Result<Self, DecodeError> {
        let len = width * height;
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| DecodeError::OutOfMemory("plane buffer"))?;
        data.resize(len, 0u8);
        Ok(Self {
            width,
            height,
            stride: width,
            data: data.into_boxed_slice(),
        })
    }

    #[inline]
    pub fn row(&self, y: usize) -> &[u8] {
        let start = y * self.stride;
        &self.data[start..start + self.width]
    }

    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
        let start = y * self.stride;
        &mut self.data[start..start + self.width]
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.stride + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: u8) {
        self.data[y * self.stride + x] = v;
    }
}

/// A macroblock-aligned reconstruction target: full luma plane plus the two
/// half-resolution chroma planes, sized to whole macroblocks (`mb_width *
/// 16` etc.) so the row pipeline never special-cases a partial last
/// macroblock mid-row; only the final emitted rows are cropped.
pub struct Frame {
    planes: [Plane; 3],
}

impl Frame {
    pub fn new(mb_width: usize, mb_height: usize) -> Result<Self, DecodeError> {
        let y_w = mb_width * 16;
        let y_h = mb_height * 16;
        let uv_w = mb_width * 8;
        let uv_h = mb_height * 8;

        Ok(Self {
            planes: [
                Plane::new(y_w, y_h)?,
                Plane::new(uv_w, uv_h)?,
                Plane::new(uv_w, uv_h)?,
            ],
        })
    }

    pub fn plane(&self, idx: usize) -> &Plane {
        &self.planes[idx]
    }

    pub fn plane_mut(&mut self, idx: usize) -> &mut Plane {
        &mut self.planes[idx]
    }

    pub fn y(&self) -> &Plane {
        &self.planes[0]
    }
    pub fn y_mut(&mut self) -> &mut Plane {
        &mut self.planes[0]
    }
    pub fn u(&self) -> &Plane {
        &self.planes[1]
    }
    pub fn u_mut(&mut self) -> &mut Plane {
        &mut self.planes[1]
    }
    pub fn v(&self) -> &Plane {
        &self.planes[2]
    }
    pub fn v_mut(&mut self) -> &mut Plane {
        &mut self.planes[2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_planes_are_mb_aligned() {
        let f = Frame::new(2, 3).unwrap();
        assert_eq!((f.y().width, f.y().height), (32, 48));
        assert_eq!((f.u().width, f.u().height), (16, 24));
        assert_eq!((f.v().width, f.v().height), (16, 24));
    }
}
