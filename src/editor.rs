//! Transactional projection removal and insertion.
//!
//! The volume, angles, filenames, shift vectors, and hotspot matrix are
//! parallel along the projection axis; an edit that changes the projection
//! count must update all of them together or not at all. Every edit here
//! builds the fully updated arrays first and only then commits, so a
//! failure partway through cannot leave the lengths inconsistent.

use ndarray::{concatenate, Array3, Axis};
use tracing::info;

use crate::state::{HotspotPositions, ShiftState};
use crate::volume::ProjectionVolume;

pub struct ProjectionEditor;

impl ProjectionEditor {
    /// Remove projection `index` from every parallel array.
    ///
    /// Returns the post-removal active index: `index - 1` when `index > 0`,
    /// otherwise 0.
    pub fn remove(
        volume: &mut ProjectionVolume,
        state: &mut ShiftState,
        hotspots: &mut HotspotPositions,
        index: usize,
    ) -> crate::Result<usize> {
        let projections = volume.projections();
        if index >= projections {
            anyhow::bail!(
                "projection index {} out of range ({} projections)",
                index,
                projections
            );
        }
        if projections == 1 {
            anyhow::bail!("cannot remove the last remaining projection");
        }

        let keep: Vec<usize> = (0..projections).filter(|&p| p != index).collect();
        let data = volume.data().select(Axis(1), &keep);
        let angles: Vec<f64> = keep.iter().map(|&p| volume.angles()[p]).collect();
        let filenames: Vec<String> = keep
            .iter()
            .map(|&p| volume.filenames()[p].clone())
            .collect();

        // All staged; commit as a unit.
        volume.replace(data, angles, filenames)?;
        state.remove(index);
        hotspots.remove_projection(index);

        info!(index, remaining = projections - 1, "projection removed");
        Ok(index.saturating_sub(1))
    }

    /// Insert a projection frame `[channel, y, x]` at `index`, with zeroed
    /// shifts and unmarked hotspot positions.
    pub fn insert(
        volume: &mut ProjectionVolume,
        state: &mut ShiftState,
        hotspots: &mut HotspotPositions,
        index: usize,
        frame: Array3<f32>,
        angle: f64,
        filename: String,
    ) -> crate::Result<()> {
        let projections = volume.projections();
        if index > projections {
            anyhow::bail!(
                "insert index {} out of range ({} projections)",
                index,
                projections
            );
        }
        let expected = (volume.channels(), volume.height(), volume.width());
        if frame.dim() != expected {
            anyhow::bail!(
                "frame shape {:?} does not match volume {:?}",
                frame.dim(),
                expected
            );
        }

        let frame = frame.insert_axis(Axis(1));
        let data = concatenate(
            Axis(1),
            &[
                volume.data().slice_axis(Axis(1), (0..index).into()),
                frame.view(),
                volume.data().slice_axis(Axis(1), (index..projections).into()),
            ],
        )?;
        let mut angles = volume.angles().to_vec();
        angles.insert(index, angle);
        let mut filenames = volume.filenames().to_vec();
        filenames.insert(index, filename);

        volume.replace(data, angles, filenames)?;
        state.insert(index);
        hotspots.insert_projection(index);

        info!(index, total = projections + 1, "projection inserted");
        Ok(())
    }
}
