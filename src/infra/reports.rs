// ============================================================
// Layer 6 - Evaluation Reports
// ============================================================
// Turns (true class, predicted class) pairs from `evaluate`
// into two files under the reports directory:
//
//   classification_report_<version>.txt
//                 precision    recall  f1-score   support
//
//         lung_n     0.9910    0.9820    0.9865       500
//       lung_aca     ...
//
//       accuracy                         0.9800      1500
//      macro avg     ...
//
//   confusion_matrix_<version>.json
//     {"labels": [...], "matrix": [[...], ...]}
//     rows = true class, columns = predicted class
//
// A score whose denominator is zero is reported as 0.0.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::domain::error::PipelineResult;
use crate::domain::labels::LabelSet;
use crate::infra::artifact_store::write_atomic;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    pub labels: Vec<String>,
    pub matrix: Vec<Vec<usize>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassScore {
    pub name:      String,
    pub precision: f64,
    pub recall:    f64,
    pub f1:        f64,
    pub support:   usize,
}

impl ConfusionMatrix {
    pub fn new(labels: &LabelSet) -> Self {
        let n = labels.len();
        Self { labels: labels.as_slice().to_vec(), matrix: vec![vec![0; n]; n] }
    }

    /// Count one sample. Out-of-range class ids are ignored.
    pub fn record(&mut self, truth: usize, predicted: usize) {
        if let Some(cell) = self.matrix.get_mut(truth).and_then(|row| row.get_mut(predicted)) {
            *cell += 1;
        }
    }

    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    pub fn correct(&self) -> usize {
        (0..self.matrix.len()).map(|i| self.matrix[i][i]).sum()
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.correct(), self.total())
    }

    /// Per-class precision / recall / F1, in label order
    pub fn class_scores(&self) -> Vec<ClassScore> {
        let n = self.matrix.len();
        (0..n)
            .map(|c| {
                let tp        = self.matrix[c][c];
                let support   = self.matrix[c].iter().sum::<usize>();
                let predicted = (0..n).map(|r| self.matrix[r][c]).sum::<usize>();

                let precision = ratio(tp, predicted);
                let recall    = ratio(tp, support);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };

                ClassScore { name: self.labels[c].clone(), precision, recall, f1, support }
            })
            .collect()
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// Plain-text table in the familiar precision/recall/f1/support layout.
pub fn classification_report(cm: &ConfusionMatrix) -> String {
    let scores = cm.class_scores();
    let width  = scores.iter().map(|s| s.name.len()).chain(["weighted avg".len()]).max().unwrap_or(9);
    let mut out = String::new();

    out.push_str(&format!(
        "{:>width$} {:>10} {:>10} {:>10} {:>10}\n\n",
        "", "precision", "recall", "f1-score", "support"
    ));
    for s in &scores {
        out.push_str(&format!(
            "{:>width$} {:>10.4} {:>10.4} {:>10.4} {:>10}\n",
            s.name, s.precision, s.recall, s.f1, s.support
        ));
    }

    let n     = scores.len().max(1) as f64;
    let total = cm.total();
    let mean  = |f: fn(&ClassScore) -> f64| scores.iter().map(f).sum::<f64>() / n;
    let weighted = |f: fn(&ClassScore) -> f64| {
        let sum = scores.iter().map(|s| f(s) * s.support as f64).sum::<f64>();
        if total == 0 { 0.0 } else { sum / total as f64 }
    };

    out.push('\n');
    out.push_str(&format!(
        "{:>width$} {:>10} {:>10} {:>10.4} {:>10}\n",
        "accuracy", "", "", cm.accuracy(), total
    ));
    out.push_str(&format!(
        "{:>width$} {:>10.4} {:>10.4} {:>10.4} {:>10}\n",
        "macro avg",
        mean(|s| s.precision),
        mean(|s| s.recall),
        mean(|s| s.f1),
        total
    ));
    out.push_str(&format!(
        "{:>width$} {:>10.4} {:>10.4} {:>10.4} {:>10}\n",
        "weighted avg",
        weighted(|s| s.precision),
        weighted(|s| s.recall),
        weighted(|s| s.f1),
        total
    ));
    out
}

/// Write the text report and the JSON matrix; returns (report, matrix) paths.
pub fn write_reports(
    dir:           &Path,
    model_version: &str,
    cm:            &ConfusionMatrix,
) -> PipelineResult<(PathBuf, PathBuf)> {
    let report_path = dir.join(format!("classification_report_{model_version}.txt"));
    let matrix_path = dir.join(format!("confusion_matrix_{model_version}.json"));

    write_atomic(&report_path, classification_report(cm).as_bytes())?;
    write_atomic(&matrix_path, &serde_json::to_vec_pretty(cm)?)?;

    tracing::info!(
        "Saved '{}' and '{}'",
        report_path.display(),
        matrix_path.display()
    );
    Ok((report_path, matrix_path))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn matrix() -> ConfusionMatrix {
        let mut cm = ConfusionMatrix::new(&LabelSet::default());
        // lung_n: 3 right, 1 called lung_aca
        for _ in 0..3 { cm.record(0, 0); }
        cm.record(0, 1);
        // lung_aca: 2 right
        cm.record(1, 1);
        cm.record(1, 1);
        // lung_scc: never predicted
        cm.record(2, 0);
        cm
    }

    #[test]
    fn test_counts_and_accuracy() {
        let cm = matrix();
        assert_eq!(cm.total(), 7);
        assert_eq!(cm.correct(), 5);
        assert!((cm.accuracy() - 5.0 / 7.0).abs() < 1e-12);
        assert_eq!(cm.matrix[0], vec![3, 1, 0]);
    }

    #[test]
    fn test_class_scores() {
        let scores = matrix().class_scores();

        // lung_n: tp 3, predicted 4, support 4
        assert!((scores[0].precision - 0.75).abs() < 1e-12);
        assert!((scores[0].recall - 0.75).abs() < 1e-12);
        // lung_aca: tp 2, predicted 3, support 2
        assert!((scores[1].precision - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(scores[1].recall, 1.0);
        // lung_scc: nothing predicted, zero scores instead of NaN
        assert_eq!(scores[2].precision, 0.0);
        assert_eq!(scores[2].f1, 0.0);
        assert_eq!(scores[2].support, 1);
    }

    #[test]
    fn test_out_of_range_ids_are_ignored() {
        let mut cm = ConfusionMatrix::new(&LabelSet::default());
        cm.record(5, 0);
        cm.record(0, 9);
        assert_eq!(cm.total(), 0);
    }

    #[test]
    fn test_reports_written() {
        let dir = tempfile::tempdir().unwrap();
        let (report, json) = write_reports(dir.path(), "v1", &matrix()).unwrap();

        let text = std::fs::read_to_string(report).unwrap();
        assert!(text.contains("lung_aca"));
        assert!(text.contains("macro avg"));

        let value: serde_json::Value = serde_json::from_slice(&std::fs::read(json).unwrap()).unwrap();
        assert_eq!(value["matrix"][0], serde_json::json!([3, 1, 0]));
        assert_eq!(value["labels"][2], "lung_scc");
    }

    #[test]
    fn test_weighted_avg_uses_support() {
        let text = classification_report(&matrix());
        let row: Vec<f64> = text
            .lines()
            .find(|l| l.trim_start().starts_with("weighted avg"))
            .unwrap()
            .split_whitespace()
            .skip(2)
            .map(|v| v.parse().unwrap())
            .collect();

        // supports 4, 2, 1 out of 7
        let precision = (0.75 * 4.0 + (2.0 / 3.0) * 2.0) / 7.0;
        let recall    = (0.75 * 4.0 + 1.0 * 2.0) / 7.0;
        let f1        = (0.75 * 4.0 + 0.8 * 2.0) / 7.0;
        assert!((row[0] - precision).abs() < 1e-4);
        assert!((row[1] - recall).abs() < 1e-4);
        assert!((row[2] - f1).abs() < 1e-4);
        assert_eq!(row[3], 7.0);
    }
}
