use ndarray::{s, Array2, Array4, ArrayView2};

/// Circularly roll a 2D image by `(dy, dx)` pixels.
///
/// Follows the roll convention `out[y, x] = in[y - dy, x - dx]` with
/// toroidal wraparound, so a positive `dx` moves content to the right.
pub fn roll2d(image: ArrayView2<f32>, dy: i32, dx: i32) -> Array2<f32> {
    let (h, w) = image.dim();
    Array2::from_shape_fn((h, w), |(y, x)| {
        let sy = (y as i64 - dy as i64).rem_euclid(h as i64) as usize;
        let sx = (x as i64 - dx as i64).rem_euclid(w as i64) as usize;
        image[[sy, sx]]
    })
}

/// The 4D intensity stack handed over by the data-loading collaborator,
/// indexed `[channel, projection, y, x]`, plus per-projection metadata.
///
/// All channels share identical `(projections, height, width)` extents, and
/// `angles`/`filenames` stay 1:1 with the projection axis.
#[derive(Debug, Clone)]
pub struct ProjectionVolume {
    data: Array4<f32>,
    angles: Vec<f64>,
    filenames: Vec<String>,
}

impl ProjectionVolume {
    pub fn new(data: Array4<f32>, angles: Vec<f64>, filenames: Vec<String>) -> crate::Result<Self> {
        let projections = data.shape()[1];
        if angles.len() != projections {
            anyhow::bail!(
                "angle count {} does not match projection count {}",
                angles.len(),
                projections
            );
        }
        if filenames.len() != projections {
            anyhow::bail!(
                "filename count {} does not match projection count {}",
                filenames.len(),
                projections
            );
        }
        Ok(Self {
            data,
            angles,
            filenames,
        })
    }

    pub fn channels(&self) -> usize {
        self.data.shape()[0]
    }

    pub fn projections(&self) -> usize {
        self.data.shape()[1]
    }

    pub fn height(&self) -> usize {
        self.data.shape()[2]
    }

    pub fn width(&self) -> usize {
        self.data.shape()[3]
    }

    pub fn data(&self) -> &Array4<f32> {
        &self.data
    }

    pub fn angles(&self) -> &[f64] {
        &self.angles
    }

    pub fn filenames(&self) -> &[String] {
        &self.filenames
    }

    /// View of one projection image in one channel.
    pub fn projection(&self, channel: usize, index: usize) -> ArrayView2<'_, f32> {
        self.data.slice(s![channel, index, .., ..])
    }

    /// Roll one projection by `(dy, dx)` across **all** channels, keeping
    /// multi-element data locked together.
    pub fn roll_projection(&mut self, index: usize, dy: i32, dx: i32) {
        if dy == 0 && dx == 0 {
            return;
        }
        for c in 0..self.channels() {
            let rolled = roll2d(self.data.slice(s![c, index, .., ..]), dy, dx);
            self.data.slice_mut(s![c, index, .., ..]).assign(&rolled);
        }
    }

    /// Apply one `(dy, dx)` correction per projection, staged into a fresh
    /// array and swapped in as a unit so a mid-pass panic cannot leave the
    /// stack half-shifted.
    pub fn apply_deltas(&mut self, deltas: &[(i32, i32)]) -> crate::Result<()> {
        if deltas.len() != self.projections() {
            anyhow::bail!(
                "delta count {} does not match projection count {}",
                deltas.len(),
                self.projections()
            );
        }
        let mut staged = self.data.clone();
        for (p, &(dy, dx)) in deltas.iter().enumerate() {
            if dy == 0 && dx == 0 {
                continue;
            }
            for c in 0..self.channels() {
                let rolled = roll2d(self.data.slice(s![c, p, .., ..]), dy, dx);
                staged.slice_mut(s![c, p, .., ..]).assign(&rolled);
            }
        }
        self.data = staged;
        Ok(())
    }

    /// Replace the backing arrays wholesale. Used by the projection editor
    /// to commit a transactional edit; validates the metadata lengths.
    pub(crate) fn replace(
        &mut self,
        data: Array4<f32>,
        angles: Vec<f64>,
        filenames: Vec<String>,
    ) -> crate::Result<()> {
        let replacement = Self::new(data, angles, filenames)?;
        *self = replacement;
        Ok(())
    }
}
