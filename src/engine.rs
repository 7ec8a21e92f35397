//! The alignment engine: owns the shared volume + shift state and executes
//! alignment commands against them.
//!
//! Every pass follows the same shape: an algorithm reads the volume and
//! prior state and produces per-projection deltas; the engine then commits
//! the rolled volume and the updated shift accumulators together, so the
//! length invariant between volume, angles, filenames, and shifts holds at
//! every observable point.

use instant::Instant;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::algorithms::center_of_mass::{self, CenterOfMassMode};
use crate::algorithms::hotspot::{self, HotspotPolicy, HotspotRequest};
use crate::algorithms::{cross_correlation, phase_correlation};
use crate::config::Config;
use crate::editor::ProjectionEditor;
use crate::record::AlignmentRecord;
use crate::state::{HotspotPositions, ShiftState};
use crate::volume::ProjectionVolume;

/// One operation against the engine, decoupled from whatever input device
/// or UI produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AlignmentCommand {
    /// Nudge the active projection one pixel up (decreasing y).
    ShiftUp,
    ShiftDown,
    ShiftLeft,
    ShiftRight,
    SelectProjection(usize),
    /// Remove the active projection from every parallel array.
    ExcludeProjection,
    RunCrossCorrelation,
    RunPhaseCorrelation,
    RunCenterOfMass(CenterOfMassMode),
    RunHotspot {
        group: usize,
        policy: HotspotPolicy,
    },
    SaveRecord(PathBuf),
    LoadRecord(PathBuf),
}

/// What a pass did, for the UI/reconstruction collaborator and for logs.
#[derive(Debug, Clone, Serialize)]
pub struct AlignmentPassReport {
    pub algorithm: String,
    /// `(dy, dx)` delta committed per projection this pass.
    pub applied: Vec<(i32, i32)>,
    /// Projections left untouched (unmarked or numerically degenerate).
    pub skipped: Vec<usize>,
    pub elapsed_ms: f64,
}

impl AlignmentPassReport {
    fn new(algorithm: &str) -> Self {
        Self {
            algorithm: algorithm.to_string(),
            applied: Vec::new(),
            skipped: Vec::new(),
            elapsed_ms: 0.0,
        }
    }
}

pub struct AlignmentEngine {
    volume: ProjectionVolume,
    state: ShiftState,
    hotspots: HotspotPositions,
    active: usize,
    channel: usize,
    config: Config,
}

impl AlignmentEngine {
    pub fn new(volume: ProjectionVolume, config: Config) -> Self {
        let projections = volume.projections();
        Self {
            volume,
            state: ShiftState::new(projections),
            hotspots: HotspotPositions::new(projections),
            active: 0,
            channel: 0,
            config,
        }
    }

    pub fn volume(&self) -> &ProjectionVolume {
        &self.volume
    }

    pub fn state(&self) -> &ShiftState {
        &self.state
    }

    pub fn hotspots(&self) -> &HotspotPositions {
        &self.hotspots
    }

    pub fn hotspots_mut(&mut self) -> &mut HotspotPositions {
        &mut self.hotspots
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn channel(&self) -> usize {
        self.channel
    }

    /// Select which element's images drive the algorithms.
    pub fn set_channel(&mut self, channel: usize) -> crate::Result<()> {
        if channel >= self.volume.channels() {
            anyhow::bail!(
                "channel {} out of range ({} channels)",
                channel,
                self.volume.channels()
            );
        }
        self.channel = channel;
        Ok(())
    }

    pub fn execute(&mut self, command: AlignmentCommand) -> crate::Result<AlignmentPassReport> {
        let start = Instant::now();
        let mut report = match command {
            AlignmentCommand::ShiftUp => self.nudge(-1, 0)?,
            AlignmentCommand::ShiftDown => self.nudge(1, 0)?,
            AlignmentCommand::ShiftLeft => self.nudge(0, -1)?,
            AlignmentCommand::ShiftRight => self.nudge(0, 1)?,
            AlignmentCommand::SelectProjection(index) => {
                if index >= self.volume.projections() {
                    anyhow::bail!(
                        "projection index {} out of range ({} projections)",
                        index,
                        self.volume.projections()
                    );
                }
                self.active = index;
                AlignmentPassReport::new("select")
            }
            AlignmentCommand::ExcludeProjection => {
                self.active = ProjectionEditor::remove(
                    &mut self.volume,
                    &mut self.state,
                    &mut self.hotspots,
                    self.active,
                )?;
                AlignmentPassReport::new("exclude")
            }
            AlignmentCommand::RunCrossCorrelation => {
                let deltas = cross_correlation::align_stack(&self.volume, self.channel)?;
                self.commit(&deltas)?;
                let mut report = AlignmentPassReport::new("cross_correlation");
                report.applied = deltas;
                report
            }
            AlignmentCommand::RunPhaseCorrelation => {
                let deltas = phase_correlation::align_stack(
                    &self.volume,
                    self.channel,
                    self.config.correlation.epsilon,
                )?;
                self.commit(&deltas)?;
                let mut report = AlignmentPassReport::new("phase_correlation");
                report.applied = deltas;
                report
            }
            AlignmentCommand::RunCenterOfMass(mode) => {
                let result = center_of_mass::align(
                    &self.volume,
                    self.channel,
                    mode,
                    self.state.center.offset,
                    &self.config.fit,
                )?;
                let deltas: Vec<(i32, i32)> = result.dx.iter().map(|&dx| (0, dx)).collect();
                self.commit(&deltas)?;
                self.state.center = result.params;
                let mut report = AlignmentPassReport::new(match mode {
                    CenterOfMassMode::Line => "center_of_mass_line",
                    CenterOfMassMode::Sine => "center_of_mass_sine",
                });
                report.applied = deltas;
                report.skipped = result.skipped;
                report
            }
            AlignmentCommand::RunHotspot { group, policy } => {
                let request = HotspotRequest {
                    volume: &self.volume,
                    positions: &self.hotspots,
                    channel: self.channel,
                    group,
                    box_size: self.config.hotspot.box_size,
                };
                let result = hotspot::align(&request, policy, &self.config.fit)?;
                self.commit(&result.deltas)?;
                if let Some(params) = result.params {
                    self.state.center = params;
                }
                let mut report = AlignmentPassReport::new(match policy {
                    HotspotPolicy::Line => "hotspot_line",
                    HotspotPolicy::Sine => "hotspot_sine",
                    HotspotPolicy::YOnly => "hotspot_y_only",
                });
                report.applied = result.deltas;
                report.skipped = result.skipped;
                report
            }
            AlignmentCommand::SaveRecord(path) => {
                self.save_record(&path)?;
                AlignmentPassReport::new("save_record")
            }
            AlignmentCommand::LoadRecord(path) => {
                let applied = self.load_record(&path)?;
                let mut report = AlignmentPassReport::new("load_record");
                report.applied = applied;
                report
            }
        };
        report.elapsed_ms = start.elapsed().as_secs_f64() * 1e3;
        info!(
            algorithm = %report.algorithm,
            skipped = report.skipped.len(),
            elapsed_ms = report.elapsed_ms,
            "command executed"
        );
        Ok(report)
    }

    /// Roll the volume and accumulate the shift state as one unit.
    fn commit(&mut self, deltas: &[(i32, i32)]) -> crate::Result<()> {
        if deltas.len() != self.state.len() {
            anyhow::bail!(
                "delta count {} does not match projection count {}",
                deltas.len(),
                self.state.len()
            );
        }
        self.volume.apply_deltas(deltas)?;
        self.state.apply_deltas(deltas)?;
        Ok(())
    }

    fn nudge(&mut self, dy: i32, dx: i32) -> crate::Result<AlignmentPassReport> {
        let mut deltas = vec![(0, 0); self.volume.projections()];
        deltas[self.active] = (dy, dx);
        self.commit(&deltas)?;
        let mut report = AlignmentPassReport::new("nudge");
        report.applied = deltas;
        Ok(report)
    }

    /// Write the current shifts and rotation center as a text record.
    pub fn save_record<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        AlignmentRecord::new(
            self.state.center.offset,
            self.volume.filenames(),
            &self.state.dx,
            &self.state.dy,
        )
        .save(path)
    }

    /// Restore shifts from a record, rolling the volume by the difference
    /// between recorded and current shifts. A parse failure leaves the
    /// in-memory state untouched.
    pub fn load_record<P: AsRef<Path>>(&mut self, path: P) -> crate::Result<Vec<(i32, i32)>> {
        let record = AlignmentRecord::load(path)?;
        let (dx, dy) = record.shifts_for(self.volume.filenames());
        let deltas: Vec<(i32, i32)> = dy
            .iter()
            .zip(&dx)
            .enumerate()
            .map(|(i, (&dy, &dx))| (dy - self.state.dy[i], dx - self.state.dx[i]))
            .collect();
        self.commit(&deltas)?;
        self.state.center.offset = record.center_x;
        Ok(deltas)
    }
}
