use serde::{Deserialize, Serialize};

/// Maximum number of independent hotspot landmark groups a user can mark.
pub const MAX_HOTSPOT_GROUPS: usize = 5;

/// Parameters of the rotation-center sinusoid
/// `f(theta) = amplitude * sin(2*pi/360 * (theta - phase)) + offset`,
/// with `theta` and `phase` in degrees. `offset` is the rotation-center
/// x-estimate handed to the reconstruction collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SineParams {
    pub amplitude: f64,
    pub phase: f64,
    pub offset: f64,
}

impl SineParams {
    pub fn eval(&self, angle_deg: f64) -> f64 {
        let arg = std::f64::consts::TAU / 360.0 * (angle_deg - self.phase);
        self.amplitude * arg.sin() + self.offset
    }
}

/// Per-projection integer shift accumulators plus the last fitted
/// rotation-center sinusoid.
///
/// Shifts are cumulative: every alignment pass adds its delta on top of
/// whatever was applied before, never resetting implicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftState {
    pub dx: Vec<i32>,
    pub dy: Vec<i32>,
    pub center: SineParams,
}

impl ShiftState {
    pub fn new(projections: usize) -> Self {
        Self {
            dx: vec![0; projections],
            dy: vec![0; projections],
            center: SineParams::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.dx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dx.is_empty()
    }

    /// Accumulate one `(dy, dx)` delta per projection.
    pub fn apply_deltas(&mut self, deltas: &[(i32, i32)]) -> crate::Result<()> {
        if deltas.len() != self.len() {
            anyhow::bail!(
                "delta count {} does not match shift count {}",
                deltas.len(),
                self.len()
            );
        }
        for (i, &(dy, dx)) in deltas.iter().enumerate() {
            self.dy[i] += dy;
            self.dx[i] += dx;
        }
        Ok(())
    }

    pub(crate) fn remove(&mut self, index: usize) {
        self.dx.remove(index);
        self.dy.remove(index);
    }

    pub(crate) fn insert(&mut self, index: usize) {
        self.dx.insert(index, 0);
        self.dy.insert(index, 0);
    }
}

/// User-marked landmark pixel positions, `[group][projection] -> (x, y)`.
///
/// `(0, 0)` means "unmarked": that projection is skipped for the group and
/// excluded from any regression sample set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotspotPositions {
    groups: Vec<Vec<(f64, f64)>>,
}

impl HotspotPositions {
    pub fn new(projections: usize) -> Self {
        Self {
            groups: vec![vec![(0.0, 0.0); projections]; MAX_HOTSPOT_GROUPS],
        }
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn projections(&self) -> usize {
        self.groups[0].len()
    }

    pub fn mark(&mut self, group: usize, projection: usize, x: f64, y: f64) -> crate::Result<()> {
        if group >= self.group_count() {
            anyhow::bail!("hotspot group {} out of range", group);
        }
        if projection >= self.projections() {
            anyhow::bail!("projection index {} out of range", projection);
        }
        self.groups[group][projection] = (x, y);
        Ok(())
    }

    pub fn clear(&mut self, group: usize, projection: usize) {
        self.groups[group][projection] = (0.0, 0.0);
    }

    /// Marked position, or `None` for the unmarked sentinel.
    pub fn get(&self, group: usize, projection: usize) -> Option<(f64, f64)> {
        let pos = self.groups[group][projection];
        if pos == (0.0, 0.0) {
            None
        } else {
            Some(pos)
        }
    }

    /// Index of the first marked projection in a group, the alignment
    /// reference point for the hotspot policies.
    pub fn first_marked(&self, group: usize) -> Option<usize> {
        (0..self.projections()).find(|&p| self.get(group, p).is_some())
    }

    pub(crate) fn remove_projection(&mut self, index: usize) {
        for group in &mut self.groups {
            group.remove(index);
        }
    }

    pub(crate) fn insert_projection(&mut self, index: usize) {
        for group in &mut self.groups {
            group.insert(index, (0.0, 0.0));
        }
    }
}
