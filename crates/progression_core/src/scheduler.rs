//! crates/progression_core/src/scheduler.rs
//!
//! Weighted Leitner sampling: picks a bounded set of questions across the
//! five boxes, favouring the weakest boxes and backfilling in ascending box
//! order when some boxes are too sparse to meet their share.

use rand::seq::SliceRandom;
use rand::Rng;
use uuid::Uuid;

use crate::domain::{BoxLevel, Inventory};

pub const DEFAULT_BOX_WEIGHTS: [f64; BoxLevel::COUNT] = [0.50, 0.25, 0.15, 0.07, 0.03];
pub const DEFAULT_QUESTION_COUNTS: [u32; 4] = [5, 10, 15, 20];

/// Selection weights and the accepted session sizes.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// Nominal share of a session drawn from each box, indexed by `BoxLevel::index`.
    pub weights: [f64; BoxLevel::COUNT],
    /// Session sizes a client may request. Checked at the boundary, not in `select`.
    pub valid_counts: Vec<u32>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            weights: DEFAULT_BOX_WEIGHTS,
            valid_counts: DEFAULT_QUESTION_COUNTS.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("the inventory holds no questions")]
    NoQuestionsAvailable,
}

/// One drawn question and the box it was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Draw {
    pub question_id: Uuid,
    pub level: BoxLevel,
}

#[derive(Debug, Clone, Default)]
pub struct BoxScheduler {
    config: SchedulerConfig,
}

impl BoxScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn is_valid_count(&self, count: u32) -> bool {
        self.config.valid_counts.contains(&count)
    }

    /// How many questions to draw from each box.
    ///
    /// Each box first gets `floor(requested * weight)`, capped at what it
    /// holds and at what is left of the request, box 1 first. Any shortfall
    /// is then filled from box 1 upwards until either the request or the
    /// inventory runs out. The targets never sum past `requested`.
    pub fn targets(&self, inventory: &Inventory, requested: usize) -> [usize; BoxLevel::COUNT] {
        let available = available_per_box(inventory);
        let mut targets = [0usize; BoxLevel::COUNT];
        let mut remaining = requested;

        for level in BoxLevel::all() {
            let i = level.index();
            let share = (requested as f64 * self.config.weights[i]).floor() as usize;
            targets[i] = share.min(available[i]).min(remaining);
            remaining -= targets[i];
        }

        for i in 0..BoxLevel::COUNT {
            if remaining == 0 {
                break;
            }
            let extra = remaining.min(available[i] - targets[i]);
            targets[i] += extra;
            remaining -= extra;
        }

        targets
    }

    /// Draws a session from `inventory`.
    ///
    /// Returns fewer than `requested` questions when the whole inventory is
    /// smaller than the request; deciding whether a short session is
    /// acceptable is the caller's job. The result order carries no box
    /// information.
    pub fn select<R: Rng + ?Sized>(
        &self,
        inventory: &Inventory,
        requested: usize,
        rng: &mut R,
    ) -> Result<Vec<Draw>, ScheduleError> {
        if inventory.values().all(Vec::is_empty) {
            return Err(ScheduleError::NoQuestionsAvailable);
        }

        let targets = self.targets(inventory, requested);
        let mut selection = Vec::with_capacity(targets.iter().sum());

        for (level, questions) in inventory {
            let target = targets[level.index()];
            selection.extend(
                questions
                    .choose_multiple(rng, target)
                    .map(|&question_id| Draw { question_id, level: *level }),
            );
        }

        selection.shuffle(rng);
        Ok(selection)
    }
}

fn available_per_box(inventory: &Inventory) -> [usize; BoxLevel::COUNT] {
    let mut available = [0usize; BoxLevel::COUNT];
    for (level, questions) in inventory {
        available[level.index()] = questions.len();
    }
    available
}

/// Count of drawn questions per box.
pub fn distribution(draws: &[Draw]) -> [u32; BoxLevel::COUNT] {
    let mut counts = [0u32; BoxLevel::COUNT];
    for draw in draws {
        counts[draw.level.index()] += 1;
    }
    counts
}
