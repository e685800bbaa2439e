use crate::foundation::core::GeoExtent;
use crate::foundation::error::{TilefieldError, TilefieldResult, soft_assert};

/// A pixel center in both integer and normalized coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelCenter {
    /// Column.
    pub s: u32,
    /// Row (row 0 is the southern edge).
    pub t: u32,
    /// Normalized column center, `(s + 0.5) / width`.
    pub u: f64,
    /// Normalized row center, `(t + 0.5) / height`.
    pub v: f64,
}

/// Row-major 2D buffer of `T` covering a [`GeoExtent`].
///
/// Row `t = 0` is the southern edge (`y_min`), column `s = 0` the western edge (`x_min`).
#[derive(Clone, Debug, PartialEq)]
pub struct Raster<T> {
    width: u32,
    height: u32,
    extent: GeoExtent,
    data: Vec<T>,
}

fn checked_len(op: &str, width: u32, height: u32, extent: &GeoExtent) -> TilefieldResult<usize> {
    soft_assert(width > 0 && height > 0, op, "raster dimensions must be > 0")?;
    soft_assert(extent.is_valid(), op, "raster extent must be valid")?;
    (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| TilefieldError::invalid_argument(format!("{op}: raster size overflow")))
}

impl<T: Clone> Raster<T> {
    /// Allocate a `width x height` raster with every pixel set to `fill`.
    pub fn new(width: u32, height: u32, extent: GeoExtent, fill: T) -> TilefieldResult<Self> {
        let len = checked_len("Raster::new", width, height, &extent)?;
        Ok(Self {
            width,
            height,
            extent,
            data: vec![fill; len],
        })
    }

    /// Fill every pixel with `value`.
    pub fn assign(&mut self, value: T) {
        self.data.fill(value);
    }
}

impl<T> Raster<T> {
    /// Wrap existing row-major pixel data.
    pub fn from_vec(
        width: u32,
        height: u32,
        extent: GeoExtent,
        data: Vec<T>,
    ) -> TilefieldResult<Self> {
        let len = checked_len("Raster::from_vec", width, height, &extent)?;
        if data.len() != len {
            return Err(TilefieldError::invalid_argument(format!(
                "Raster::from_vec expects {len} pixels, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            extent,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn extent(&self) -> &GeoExtent {
        &self.extent
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub(crate) fn index(&self, s: u32, t: u32) -> usize {
        (t as usize) * (self.width as usize) + (s as usize)
    }

    pub fn get(&self, s: u32, t: u32) -> Option<&T> {
        if s >= self.width || t >= self.height {
            return None;
        }
        self.data.get(self.index(s, t))
    }

    pub fn get_mut(&mut self, s: u32, t: u32) -> Option<&mut T> {
        if s >= self.width || t >= self.height {
            return None;
        }
        let i = self.index(s, t);
        self.data.get_mut(i)
    }

    /// Write one pixel. Returns `false` (and writes nothing) when `(s, t)` is out of range.
    pub fn set(&mut self, s: u32, t: u32, value: T) -> bool {
        match self.get_mut(s, t) {
            Some(px) => {
                *px = value;
                true
            }
            None => false,
        }
    }

    /// Iterate `(s, t, &pixel)` row by row, starting at the southern row.
    pub fn pixels(&self) -> impl Iterator<Item = (u32, u32, &T)> + '_ {
        let w = self.width as usize;
        self.data
            .iter()
            .enumerate()
            .map(move |(i, px)| ((i % w) as u32, (i / w) as u32, px))
    }

    /// Iterate pixel centers with their normalized coordinates.
    pub fn centers(&self) -> impl Iterator<Item = PixelCenter> + use<T> {
        let (w, h) = (self.width, self.height);
        (0..h).flat_map(move |t| {
            (0..w).map(move |s| PixelCenter {
                s,
                t,
                u: (f64::from(s) + 0.5) / f64::from(w),
                v: (f64::from(t) + 0.5) / f64::from(h),
            })
        })
    }

    /// Pixel containing normalized position `(u, v)`, clamped into the raster.
    pub fn nearest_pixel(&self, u: f64, v: f64) -> (u32, u32) {
        fn axis(x: f64, n: u32) -> u32 {
            let i = (x * f64::from(n)).floor();
            if i.is_nan() || i < 0.0 {
                0
            } else {
                (i as u32).min(n - 1)
            }
        }
        (axis(u, self.width), axis(v, self.height))
    }

    /// Read the pixel at normalized `(u, v)` without interpolation.
    pub fn sample_nearest(&self, u: f64, v: f64) -> &T {
        let (s, t) = self.nearest_pixel(u, v);
        &self.data[self.index(s, t)]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/raster/buffer.rs"]
mod tests;
