//! Fixed pipeline stage catalog.
//!
//! The backend executes a known, ordered list of pipeline stages with
//! numeric-prefixed ids. Stages with no events yet still produce pending
//! placeholder groups so the dashboard can show anticipated work. Two
//! reserved pseudo-stage ids carry the run-level bookend events; they are
//! rendered as banners, never as ordinary stage cards.

use serde::{Deserialize, Serialize};

use crate::constants::{PSEUDO_STAGE_RUN_END, PSEUDO_STAGE_RUN_START};

/// One entry in the fixed stage catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDescriptor {
    pub id: String,
    pub name: String,
}

/// Ordered catalog of pipeline stages known in advance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCatalog {
    stages: Vec<StageDescriptor>,
}

impl StageCatalog {
    pub fn new(stages: Vec<StageDescriptor>) -> Self {
        Self { stages }
    }

    /// The standard five-stage research pipeline.
    pub fn standard() -> Self {
        let stages = [
            ("1_baseline", "Baseline Implementation"),
            ("2_tuning", "Hyperparameter Tuning"),
            ("3_creative", "Creative Research"),
            ("4_ablation", "Ablation Studies"),
            ("5_paper", "Paper Generation"),
        ]
        .into_iter()
        .map(|(id, name)| StageDescriptor {
            id: id.to_string(),
            name: name.to_string(),
        })
        .collect();
        Self { stages }
    }

    pub fn stages(&self) -> &[StageDescriptor] {
        &self.stages
    }

    pub fn contains(&self, stage_id: &str) -> bool {
        self.stages.iter().any(|s| s.id == stage_id)
    }

    /// Display name for a stage id, falling back to the id itself for
    /// stages the catalog does not know about.
    pub fn display_name(&self, stage_id: &str) -> String {
        match stage_id {
            PSEUDO_STAGE_RUN_START => "Run Started".to_string(),
            PSEUDO_STAGE_RUN_END => "Run Finished".to_string(),
            _ => self
                .stages
                .iter()
                .find(|s| s.id == stage_id)
                .map(|s| s.name.clone())
                .unwrap_or_else(|| stage_id.to_string()),
        }
    }
}

impl Default for StageCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

/// Whether a stage id is one of the two reserved run-level bookends.
pub fn is_pseudo_stage(stage_id: &str) -> bool {
    stage_id == PSEUDO_STAGE_RUN_START || stage_id == PSEUDO_STAGE_RUN_END
}

/// Parse the numeric sequence prefix of a stage id ("3_creative" -> 3).
///
/// Pseudo-stages have no sequence; the run-start bookend sorts before
/// every pipeline stage and the run-end bookend after, which callers
/// handle explicitly rather than through this function.
pub fn stage_sequence(stage_id: &str) -> Option<u32> {
    let prefix = stage_id.split('_').next()?;
    prefix.parse().ok()
}
