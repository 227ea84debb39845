// ============================================================
// Layer 5 - Training Policies
// ============================================================
// Independent rules the controller consults after every epoch.
// Each one watches a single validation metric and answers with
// a PolicySignal:
//
//   EarlyStopping      val_accuracy, patience 3
//                        → Checkpoint on a new best
//                        → Stop{restore_best: true} after
//                          `patience` epochs without one
//
//   ReduceLrOnPlateau  val_loss, patience 2
//                        → ScaleLearningRate(0.5) after
//                          `patience` epochs without improvement
//
//   TargetAccuracy     val_accuracy ≥ target
//                        → Stop{restore_best: false}
//
// Policies know nothing about models or each other; the
// controller applies the signals (snapshot, LR change, stop).

use crate::domain::metadata::StopReason;
use crate::ml::controller::EpochRecord;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PolicySignal {
    Continue,
    /// This epoch is the best seen so far; keep a copy of the weights
    Checkpoint,
    /// Multiply the learning rate by the factor
    ScaleLearningRate(f64),
    Stop { reason: StopReason, restore_best: bool },
}

pub trait TrainingPolicy {
    fn name(&self) -> &'static str;

    fn observe(&mut self, record: &EpochRecord) -> PolicySignal;
}

// ─── EarlyStopping ────────────────────────────────────────────────────────────
/// Stops when validation accuracy has not improved for `patience` epochs.
/// Strictly greater counts as an improvement, so ties keep the earliest epoch.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience:  usize,
    min_delta: f64,
    best:      f64,
    best_epoch: Option<usize>,
    wait:      usize,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> Self {
        Self {
            patience,
            min_delta:  0.0,
            best:       f64::NEG_INFINITY,
            best_epoch: None,
            wait:       0,
        }
    }

    pub fn best_epoch(&self) -> Option<usize> {
        self.best_epoch
    }
}

impl TrainingPolicy for EarlyStopping {
    fn name(&self) -> &'static str {
        "early_stopping"
    }

    fn observe(&mut self, record: &EpochRecord) -> PolicySignal {
        let current = record.val.accuracy;

        if current - self.min_delta > self.best {
            self.best       = current;
            self.best_epoch = Some(record.epoch);
            self.wait       = 0;
            return PolicySignal::Checkpoint;
        }

        self.wait += 1;
        if self.wait >= self.patience {
            PolicySignal::Stop { reason: StopReason::EarlyStopped, restore_best: true }
        } else {
            PolicySignal::Continue
        }
    }
}

// ─── ReduceLrOnPlateau ────────────────────────────────────────────────────────
/// Halves (by default) the learning rate when validation loss stalls.
/// Repeated triggers compound; there is no lower bound.
#[derive(Debug, Clone)]
pub struct ReduceLrOnPlateau {
    patience:  usize,
    factor:    f64,
    /// Loss must drop by more than this to count as an improvement
    min_delta: f64,
    best:      f64,
    wait:      usize,
}

impl ReduceLrOnPlateau {
    pub fn new(patience: usize, factor: f64) -> Self {
        Self {
            patience,
            factor,
            min_delta: 1e-4,
            best:      f64::INFINITY,
            wait:      0,
        }
    }
}

impl TrainingPolicy for ReduceLrOnPlateau {
    fn name(&self) -> &'static str {
        "reduce_lr_on_plateau"
    }

    fn observe(&mut self, record: &EpochRecord) -> PolicySignal {
        let current = record.val.loss;

        if current < self.best - self.min_delta {
            self.best = current;
            self.wait = 0;
            return PolicySignal::Continue;
        }

        self.wait += 1;
        if self.wait >= self.patience {
            self.wait = 0;
            PolicySignal::ScaleLearningRate(self.factor)
        } else {
            PolicySignal::Continue
        }
    }
}

// ─── TargetAccuracy ───────────────────────────────────────────────────────────
/// "Good enough": stops as soon as validation accuracy reaches the target.
#[derive(Debug, Clone)]
pub struct TargetAccuracy {
    target: f64,
}

impl TargetAccuracy {
    pub fn new(target: f64) -> Self {
        Self { target }
    }
}

impl TrainingPolicy for TargetAccuracy {
    fn name(&self) -> &'static str {
        "target_accuracy"
    }

    fn observe(&mut self, record: &EpochRecord) -> PolicySignal {
        if record.val.accuracy >= self.target {
            PolicySignal::Stop { reason: StopReason::TargetReached, restore_best: false }
        } else {
            PolicySignal::Continue
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::traits::EpochScore;

    fn rec(epoch: usize, val_loss: f64, val_acc: f64) -> EpochRecord {
        EpochRecord {
            epoch,
            train: EpochScore { loss: 1.0, accuracy: 0.5 },
            val:   EpochScore { loss: val_loss, accuracy: val_acc },
            learning_rate: 1e-3,
        }
    }

    #[test]
    fn test_early_stopping_waits_patience_epochs() {
        let mut es = EarlyStopping::new(3);
        assert_eq!(es.observe(&rec(1, 1.0, 0.50)), PolicySignal::Checkpoint);
        assert_eq!(es.observe(&rec(2, 1.0, 0.50)), PolicySignal::Continue); // tie
        assert_eq!(es.observe(&rec(3, 1.0, 0.40)), PolicySignal::Continue);
        assert!(matches!(
            es.observe(&rec(4, 1.0, 0.45)),
            PolicySignal::Stop { reason: StopReason::EarlyStopped, restore_best: true }
        ));
        assert_eq!(es.best_epoch(), Some(1));
    }

    #[test]
    fn test_early_stopping_resets_on_improvement() {
        let mut es = EarlyStopping::new(2);
        es.observe(&rec(1, 1.0, 0.5));
        es.observe(&rec(2, 1.0, 0.4));
        assert_eq!(es.observe(&rec(3, 1.0, 0.6)), PolicySignal::Checkpoint);
        assert_eq!(es.observe(&rec(4, 1.0, 0.6)), PolicySignal::Continue);
        assert_eq!(es.best_epoch(), Some(3));
    }

    #[test]
    fn test_lr_plateau_halves_and_compounds() {
        let mut lr = ReduceLrOnPlateau::new(2, 0.5);
        assert_eq!(lr.observe(&rec(1, 1.0, 0.0)), PolicySignal::Continue);
        assert_eq!(lr.observe(&rec(2, 1.0, 0.0)), PolicySignal::Continue);
        assert_eq!(lr.observe(&rec(3, 1.0, 0.0)), PolicySignal::ScaleLearningRate(0.5));
        // counter restarts after a reduction
        assert_eq!(lr.observe(&rec(4, 1.0, 0.0)), PolicySignal::Continue);
        assert_eq!(lr.observe(&rec(5, 1.0, 0.0)), PolicySignal::ScaleLearningRate(0.5));
        // a real improvement clears the wait
        assert_eq!(lr.observe(&rec(6, 0.5, 0.0)), PolicySignal::Continue);
        assert_eq!(lr.observe(&rec(7, 0.5, 0.0)), PolicySignal::Continue);
    }

    #[test]
    fn test_target_accuracy_is_inclusive() {
        let mut t = TargetAccuracy::new(0.9);
        assert_eq!(t.observe(&rec(1, 1.0, 0.89)), PolicySignal::Continue);
        assert!(matches!(
            t.observe(&rec(2, 1.0, 0.90)),
            PolicySignal::Stop { reason: StopReason::TargetReached, restore_best: false }
        ));
    }
}
