// ============================================================
// Layer 5 - Training Controller (epoch loop)
// ============================================================
// Drives any TrainableClassifier through the epoch loop and
// applies the training policies after each epoch:
//
//   for epoch in 1..=epochs
//       train one pass at the current learning rate
//       validate
//       non-finite loss/accuracy → NumericalTrainingFailure
//       print + report the EpochRecord
//       ask each policy, in order:
//           early stopping → reduce LR → target accuracy
//       Checkpoint            → snapshot the weights
//       ScaleLearningRate(f)  → lr *= f
//       Stop                  → first one wins; leave the loop
//
//   early stop → restore the best snapshot
//   target     → keep the weights as they are
//
// The loop knows nothing about burn. The burn-backed
// implementation lives in trainer.rs; the tests below drive it
// with a scripted fake.

use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::metadata::StopReason;
use crate::domain::traits::{EpochScore, TrainableClassifier};
use crate::ml::policies::{
    EarlyStopping, PolicySignal, ReduceLrOnPlateau, TargetAccuracy, TrainingPolicy,
};

/// Knobs for the epoch loop and its policies
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerSettings {
    pub epochs:              usize,
    pub learning_rate:       f64,
    pub early_stop_patience: usize,
    pub lr_patience:         usize,
    pub lr_factor:           f64,
    pub target_accuracy:     f64,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            epochs:              10,
            learning_rate:       1e-3,
            early_stop_patience: 3,
            lr_patience:         2,
            lr_factor:           0.5,
            target_accuracy:     0.90,
        }
    }
}

/// Everything measured in one epoch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochRecord {
    /// 1-based
    pub epoch:         usize,
    pub train:         EpochScore,
    pub val:           EpochScore,
    /// Rate the training pass ran with
    pub learning_rate: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingOutcome {
    pub stop_reason:         StopReason,
    pub epochs_run:          usize,
    pub best_epoch:          Option<usize>,
    pub best_val_accuracy:   Option<f64>,
    /// Validation accuracy of the weights that will be saved
    pub final_val_accuracy:  Option<f64>,
    pub final_learning_rate: f64,
    pub history:             Vec<EpochRecord>,
}

pub struct TrainingController {
    settings: ControllerSettings,
}

impl TrainingController {
    pub fn new(settings: ControllerSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// Fresh policies for one run, in evaluation order.
    fn policies(&self) -> Vec<Box<dyn TrainingPolicy>> {
        let s = &self.settings;
        vec![
            Box::new(EarlyStopping::new(s.early_stop_patience)),
            Box::new(ReduceLrOnPlateau::new(s.lr_patience, s.lr_factor)),
            Box::new(TargetAccuracy::new(s.target_accuracy)),
        ]
    }

    /// Run the epoch loop. `on_epoch` sees every completed epoch before the
    /// policies do; an error from it aborts the run.
    pub fn run<T, F>(&self, model: &mut T, mut on_epoch: F) -> PipelineResult<TrainingOutcome>
    where
        T: TrainableClassifier,
        F: FnMut(&EpochRecord) -> PipelineResult<()>,
    {
        let epochs       = self.settings.epochs;
        let mut policies = self.policies();
        let mut lr       = self.settings.learning_rate;
        let mut history  = Vec::with_capacity(epochs);

        // (epoch, val_accuracy, weights) of the best epoch so far
        let mut best: Option<(usize, f64, T::Snapshot)> = None;
        let mut stop: Option<(StopReason, bool)>        = None;

        for epoch in 1..=epochs {
            let train = model.train_epoch(lr)?;
            ensure_finite(epoch, "train_loss", train.loss)?;
            ensure_finite(epoch, "train_accuracy", train.accuracy)?;

            let val = model.validate()?;
            ensure_finite(epoch, "val_loss", val.loss)?;
            ensure_finite(epoch, "val_accuracy", val.accuracy)?;

            let record = EpochRecord { epoch, train, val, learning_rate: lr };

            println!(
                "Epoch {:>3}/{} | train_loss={:.4} | train_acc={:.1}% | val_loss={:.4} | val_acc={:.1}% | lr={:.2e}",
                epoch, epochs, train.loss, train.accuracy * 100.0,
                val.loss, val.accuracy * 100.0, lr,
            );
            on_epoch(&record)?;

            for policy in policies.iter_mut() {
                match policy.observe(&record) {
                    PolicySignal::Continue => {}
                    PolicySignal::Checkpoint => {
                        best = Some((epoch, val.accuracy, model.snapshot()));
                        tracing::debug!("New best val_acc={:.4} at epoch {}", val.accuracy, epoch);
                    }
                    PolicySignal::ScaleLearningRate(factor) => {
                        let old = lr;
                        lr *= factor;
                        tracing::info!("{}: learning rate {:.2e} → {:.2e}", policy.name(), old, lr);
                    }
                    PolicySignal::Stop { reason, restore_best } => {
                        if stop.is_none() {
                            tracing::info!("{}: stopping after epoch {} ({})", policy.name(), epoch, reason);
                            stop = Some((reason, restore_best));
                        }
                    }
                }
            }

            history.push(record);
            if stop.is_some() {
                break;
            }
        }

        let (stop_reason, restore_best) = stop.unwrap_or((StopReason::EpochsExhausted, false));
        let best_epoch        = best.as_ref().map(|(e, _, _)| *e);
        let best_val_accuracy = best.as_ref().map(|(_, acc, _)| *acc);

        let final_val_accuracy = match best {
            Some((epoch, acc, snapshot)) if restore_best => {
                model.restore(snapshot);
                tracing::info!("Restored weights from epoch {} (val_acc={:.4})", epoch, acc);
                Some(acc)
            }
            _ => history.last().map(|r: &EpochRecord| r.val.accuracy),
        };

        Ok(TrainingOutcome {
            stop_reason,
            epochs_run: history.len(),
            best_epoch,
            best_val_accuracy,
            final_val_accuracy,
            final_learning_rate: lr,
            history,
        })
    }
}

fn ensure_finite(epoch: usize, metric: &'static str, value: f64) -> PipelineResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(PipelineError::NumericalTrainingFailure { epoch, metric, value })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    /// Replays a fixed list of (val_loss, val_acc) pairs. Its "weights" are
    /// just the number of the last epoch trained, so restores are visible.
    struct ScriptedModel {
        script:   Vec<(f64, f64)>,
        trained:  usize,
        weights:  usize,
        lrs_seen: Vec<f64>,
    }

    impl ScriptedModel {
        fn new(script: Vec<(f64, f64)>) -> Self {
            Self { script, trained: 0, weights: 0, lrs_seen: Vec::new() }
        }
    }

    impl TrainableClassifier for ScriptedModel {
        type Snapshot = usize;

        fn train_epoch(&mut self, learning_rate: f64) -> PipelineResult<EpochScore> {
            self.trained += 1;
            self.weights = self.trained;
            self.lrs_seen.push(learning_rate);
            Ok(EpochScore { loss: 1.0, accuracy: 0.5 })
        }

        fn validate(&self) -> PipelineResult<EpochScore> {
            let (loss, accuracy) = self.script[self.trained - 1];
            Ok(EpochScore { loss, accuracy })
        }

        fn snapshot(&self) -> usize {
            self.weights
        }

        fn restore(&mut self, snapshot: usize) {
            self.weights = snapshot;
        }
    }

    fn settings(epochs: usize) -> ControllerSettings {
        ControllerSettings { epochs, learning_rate: 1.0, ..ControllerSettings::default() }
    }

    #[test]
    fn test_target_reached_stops_at_first_epoch() {
        let mut model = ScriptedModel::new(vec![(0.3, 0.92), (0.2, 0.95)]);
        let ctl       = TrainingController::new(settings(10));
        let outcome   = ctl.run(&mut model, |_| Ok(())).unwrap();

        assert_eq!(outcome.stop_reason, StopReason::TargetReached);
        assert_eq!(outcome.epochs_run, 1);
        assert_eq!(model.trained, 1);
    }

    #[test]
    fn test_target_stop_keeps_current_weights() {
        let mut model = ScriptedModel::new(vec![(1.0, 0.5), (1.0, 0.4), (1.0, 0.95)]);
        let outcome   = TrainingController::new(settings(10)).run(&mut model, |_| Ok(())).unwrap();

        assert_eq!(outcome.stop_reason, StopReason::TargetReached);
        assert_eq!(model.weights, 3);
        assert_eq!(outcome.final_val_accuracy, Some(0.95));
    }

    #[test]
    fn test_early_stop_restores_best_epoch() {
        // best is epoch 2; epoch 3 only ties it, so epoch 2 stays the best
        let script    = vec![(1.0, 0.5), (1.0, 0.7), (1.0, 0.7), (1.0, 0.6), (1.0, 0.65), (1.0, 0.8)];
        let mut model = ScriptedModel::new(script);
        let outcome   = TrainingController::new(settings(10)).run(&mut model, |_| Ok(())).unwrap();

        assert_eq!(outcome.stop_reason, StopReason::EarlyStopped);
        assert_eq!(outcome.epochs_run, 5);
        assert_eq!(outcome.best_epoch, Some(2));
        assert_eq!(model.weights, 2);
        assert_eq!(outcome.final_val_accuracy, Some(0.7));
    }

    #[test]
    fn test_lr_reduction_compounds() {
        // accuracy keeps improving, loss stays flat
        let script    = vec![(1.0, 0.1), (1.0, 0.2), (1.0, 0.3), (1.0, 0.4), (1.0, 0.5)];
        let mut model = ScriptedModel::new(script);
        let outcome   = TrainingController::new(settings(5)).run(&mut model, |_| Ok(())).unwrap();

        assert_eq!(outcome.stop_reason, StopReason::EpochsExhausted);
        assert_eq!(model.lrs_seen, vec![1.0, 1.0, 1.0, 0.5, 0.5]);
        assert_eq!(outcome.final_learning_rate, 0.25);
        assert_eq!(outcome.history[3].learning_rate, 0.5);
    }

    #[test]
    fn test_non_finite_metric_aborts() {
        let mut model = ScriptedModel::new(vec![(1.0, 0.5), (f64::NAN, 0.6)]);
        let mut seen  = Vec::new();
        let err = TrainingController::new(settings(5))
            .run(&mut model, |r| {
                seen.push(r.epoch);
                Ok(())
            })
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::NumericalTrainingFailure { epoch: 2, metric: "val_loss", .. }
        ));
        assert_eq!(seen, vec![1]);
    }

    #[test]
    fn test_callback_error_aborts_run() {
        let mut model = ScriptedModel::new(vec![(1.0, 0.1), (1.0, 0.2)]);
        let result = TrainingController::new(settings(2))
            .run(&mut model, |_| Err(PipelineError::Model("disk full".into())));
        assert!(result.is_err());
        assert_eq!(model.trained, 1);
    }
}
