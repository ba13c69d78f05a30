//! Sub-step stage ordering.
//!
//! Each stage declares which buffers it needs valid on entry, which it
//! produces and which it leaves stale. [`Schedule::validate`] walks a stage
//! list and rejects any order where a stage would read something that has not
//! been produced since it was last invalidated.

use thiserror::Error;

/// Buffers passed between stages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Resource {
    /// Particle positions, velocities and affine matrices; carried across sub-steps
    Particles,
    /// Length of the active particle prefix; carried across sub-steps
    ActiveCount,
    /// Grid accumulators zeroed for this sub-step
    ClearedGrid,
    /// Mass field from P2G pass 1
    GridMass,
    /// APIC momentum field from P2G pass 1
    GridMomentum,
    /// Stress contribution added to the momentum field
    GridStress,
    /// Per-particle density
    Density,
    /// Resolved grid velocity
    GridVelocity,
    /// Renderer output records
    Output,
}

use Resource::*;

/// One kernel of the sub-step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    Clear,
    Spawn,
    P2gMassMomentum,
    P2gStress,
    UpdateGrid,
    G2p,
    CopyOutput,
}

impl Stage {
    pub fn reads(self) -> &'static [Resource] {
        match self {
            Stage::Clear => &[],
            Stage::Spawn => &[ActiveCount],
            Stage::P2gMassMomentum => &[Particles, ActiveCount, ClearedGrid],
            Stage::P2gStress => &[Particles, ActiveCount, GridMass, GridMomentum],
            Stage::UpdateGrid => &[GridMass, GridMomentum, GridStress],
            Stage::G2p => &[Particles, ActiveCount, GridVelocity],
            Stage::CopyOutput => &[Particles, ActiveCount, Density],
        }
    }

    pub fn writes(self) -> &'static [Resource] {
        match self {
            Stage::Clear => &[ClearedGrid],
            Stage::Spawn => &[Particles, ActiveCount],
            Stage::P2gMassMomentum => &[GridMass, GridMomentum],
            Stage::P2gStress => &[Density, GridStress],
            Stage::UpdateGrid => &[GridVelocity],
            Stage::G2p => &[Particles],
            Stage::CopyOutput => &[Output],
        }
    }

    /// Resources no longer valid once this stage has run.
    pub fn invalidates(self) -> &'static [Resource] {
        match self {
            Stage::Clear => &[GridMass, GridMomentum, GridStress, GridVelocity],
            // New particles are missing from anything already scattered
            Stage::Spawn => &[GridMass, GridMomentum, GridStress, Density, GridVelocity],
            Stage::P2gMassMomentum => &[ClearedGrid],
            Stage::P2gStress => &[],
            Stage::UpdateGrid => &[],
            Stage::G2p => &[],
            Stage::CopyOutput => &[],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::Clear => "clear",
            Stage::Spawn => "spawn",
            Stage::P2gMassMomentum => "p2g_mass_momentum",
            Stage::P2gStress => "p2g_stress",
            Stage::UpdateGrid => "update_grid",
            Stage::G2p => "g2p",
            Stage::CopyOutput => "copy_output",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("stage {stage:?} reads {resource:?} before any earlier stage produced it")]
    MissingInput { stage: Stage, resource: Resource },

    #[error("stage {0:?} appears more than once")]
    DuplicateStage(Stage),
}

/// Ordered stage list for one sub-step.
#[derive(Clone, Copy, Debug)]
pub struct Schedule {
    stages: &'static [Stage],
}

/// The sub-step the simulator runs.
pub const SUBSTEP: Schedule = Schedule {
    stages: &[
        Stage::Clear,
        Stage::Spawn,
        Stage::P2gMassMomentum,
        Stage::P2gStress,
        Stage::UpdateGrid,
        Stage::G2p,
        Stage::CopyOutput,
    ],
};

impl Schedule {
    pub const fn new(stages: &'static [Stage]) -> Self {
        Self { stages }
    }

    pub fn stages(&self) -> &'static [Stage] {
        self.stages
    }

    /// Check that every stage's inputs are valid when it runs.
    ///
    /// Particle state and the active count carry over from the previous
    /// sub-step and are valid on entry.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        let mut valid = vec![Particles, ActiveCount];
        let mut seen: Vec<Stage> = Vec::with_capacity(self.stages.len());

        for &stage in self.stages {
            if seen.contains(&stage) {
                return Err(ScheduleError::DuplicateStage(stage));
            }
            seen.push(stage);

            if let Some(&resource) = stage.reads().iter().find(|r| !valid.contains(*r)) {
                return Err(ScheduleError::MissingInput { stage, resource });
            }
            valid.retain(|r| !stage.invalidates().contains(r));
            for &r in stage.writes() {
                if !valid.contains(&r) {
                    valid.push(r);
                }
            }
        }
        Ok(())
    }
}
