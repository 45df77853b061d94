use serde::{Deserialize, Serialize};

use super::detection::GroundTruth;
use super::matching::{greedy_match, Match, MatchParams, ScoreSorted};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PrecisionRecallF1 {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Punto de la curva PR. Se serializa como `[recall, precision]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct PrPoint {
    pub recall: f64,
    pub precision: f64,
}

impl From<(f64, f64)> for PrPoint {
    fn from((recall, precision): (f64, f64)) -> Self {
        Self { recall, precision }
    }
}

impl From<PrPoint> for (f64, f64) {
    fn from(p: PrPoint) -> Self {
        (p.recall, p.precision)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApEstimate {
    pub ap: f64,
    /// Curva ya interpolada (envolvente), ordenada por recall ascendente.
    pub curve: Vec<PrPoint>,
}

// Denominador cero => 0.0, nunca NaN.
fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

pub fn precision_recall_f1(tp: usize, fp: usize, fn_: usize) -> PrecisionRecallF1 {
    let precision = ratio(tp as f64, (tp + fp) as f64);
    let recall = ratio(tp as f64, (tp + fn_) as f64);
    let f1 = ratio(2.0 * precision * recall, precision + recall);
    PrecisionRecallF1 { precision, recall, f1 }
}

pub fn mean_iou(matches: &[Match]) -> f64 {
    let total: f64 = matches.iter().map(|m| m.iou).sum();
    ratio(total, matches.len() as f64)
}

/// AP a un umbral de IoU fijo.
///
/// Cada score distinto es un punto de operación: se empareja el prefijo con
/// `score >= t` y se anota `(recall, precision)`. Después se construye la
/// envolvente monótona y se integra por escalones.
pub fn average_precision(
    predictions: &ScoreSorted,
    ground_truths: &[GroundTruth],
    params: &MatchParams,
) -> ApEstimate {
    if predictions.is_empty() {
        return ApEstimate::default();
    }

    let mut samples: Vec<PrPoint> = predictions
        .distinct_scores()
        .into_iter()
        .map(|t| {
            let outcome = greedy_match(predictions.at_or_above(t), ground_truths, params);
            let prf = precision_recall_f1(outcome.tp(), outcome.fp(), outcome.fn_());
            PrPoint { recall: prf.recall, precision: prf.precision }
        })
        .collect();

    samples.sort_by(|a, b| {
        a.recall
            .total_cmp(&b.recall)
            .then(a.precision.total_cmp(&b.precision))
    });
    precision_envelope(&mut samples);

    ApEstimate {
        ap: integrate_envelope(&samples),
        curve: samples,
    }
}

/// Precisión monótona no creciente respecto al recall (interpolación estilo VOC).
/// Recorre desde el recall más alto hacia abajo: `p[i] = max(p[i], p[i + 1])`.
pub fn precision_envelope(samples: &mut [PrPoint]) {
    for i in (0..samples.len().saturating_sub(1)).rev() {
        samples[i].precision = samples[i].precision.max(samples[i + 1].precision);
    }
}

/// `Σ p[i] · max(0, r[i] − r[i−1])` para `i` en `1..n`. El primer punto no aporta área.
pub fn integrate_envelope(samples: &[PrPoint]) -> f64 {
    samples
        .windows(2)
        .map(|w| w[1].precision * (w[1].recall - w[0].recall).max(0.0))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::detection::Detection;
    use crate::domain::geometry::BBox;

    fn pts(raw: &[(f64, f64)]) -> Vec<PrPoint> {
        raw.iter().copied().map(PrPoint::from).collect()
    }

    #[test]
    fn zero_denominators_yield_zero() {
        assert_eq!(precision_recall_f1(0, 0, 0), PrecisionRecallF1::default());
        let only_fn = precision_recall_f1(0, 0, 3);
        assert_eq!((only_fn.precision, only_fn.recall, only_fn.f1), (0.0, 0.0, 0.0));
        assert_eq!(mean_iou(&[]), 0.0);
    }

    #[test]
    fn prf_from_counts() {
        let prf = precision_recall_f1(3, 1, 2);
        assert_eq!(prf.precision, 0.75);
        assert_eq!(prf.recall, 0.6);
        assert!((prf.f1 - 2.0 * 0.75 * 0.6 / 1.35).abs() < 1e-12);
    }

    #[test]
    fn mean_iou_averages_matches() {
        let m = [
            Match { prediction: 0, ground_truth: 0, iou: 1.0 },
            Match { prediction: 1, ground_truth: 1, iou: 0.5 },
        ];
        assert_eq!(mean_iou(&m), 0.75);
    }

    #[test]
    fn envelope_is_non_increasing_as_recall_grows() {
        let mut s = pts(&[(0.2, 0.5), (0.4, 0.8), (0.6, 0.6)]);
        precision_envelope(&mut s);
        let p: Vec<f64> = s.iter().map(|x| x.precision).collect();
        assert_eq!(p, vec![0.8, 0.8, 0.6]);
    }

    #[test]
    fn envelope_handles_short_inputs() {
        let mut empty: Vec<PrPoint> = vec![];
        precision_envelope(&mut empty);
        let mut one = pts(&[(0.5, 0.3)]);
        precision_envelope(&mut one);
        assert_eq!(one[0].precision, 0.3);
    }

    #[test]
    fn integration_skips_first_sample() {
        let s = pts(&[(0.2, 0.8), (0.4, 0.8), (0.6, 0.6)]);
        let ap = integrate_envelope(&s);
        assert!((ap - (0.8 * 0.2 + 0.6 * 0.2)).abs() < 1e-12);
        assert_eq!(integrate_envelope(&pts(&[(1.0, 1.0)])), 0.0);
        assert_eq!(integrate_envelope(&[]), 0.0);
    }

    #[test]
    fn ap_without_predictions_is_zero() {
        let gts = [GroundTruth::new(BBox::new(0.0, 0.0, 1.0, 1.0), "Text")];
        let est = average_precision(&ScoreSorted::new(&[]), &gts, &MatchParams::default());
        assert_eq!(est.ap, 0.0);
        assert!(est.curve.is_empty());
    }

    #[test]
    fn single_distinct_score_gives_zero_ap() {
        let b = BBox::new(0.0, 0.0, 10.0, 10.0);
        let preds = [Detection::new(b, "Text", 0.9), Detection::new(b, "Text", 0.9)];
        let gts = [GroundTruth::new(b, "Text"), GroundTruth::new(b, "Text")];
        let est = average_precision(&ScoreSorted::new(&preds), &gts, &MatchParams::default());
        assert_eq!(est.curve.len(), 1);
        assert_eq!(est.curve[0], PrPoint { recall: 1.0, precision: 1.0 });
        assert_eq!(est.ap, 0.0);
    }

    #[test]
    fn ap_over_three_operating_points() {
        // Scores 0.9 (TP), 0.8 (FP), 0.7 (TP) contra dos ground truths.
        let g0 = BBox::new(0.0, 0.0, 10.0, 10.0);
        let g1 = BBox::new(20.0, 0.0, 30.0, 10.0);
        let miss = BBox::new(50.0, 50.0, 60.0, 60.0);
        let preds = [
            Detection::new(g1, "Text", 0.7),
            Detection::new(g0, "Text", 0.9),
            Detection::new(miss, "Text", 0.8),
        ];
        let gts = [GroundTruth::new(g0, "Text"), GroundTruth::new(g1, "Text")];
        let est = average_precision(&ScoreSorted::new(&preds), &gts, &MatchParams::default());

        // Puntos crudos: (0.5, 1.0), (0.5, 0.5), (1.0, 2/3)
        let recalls: Vec<f64> = est.curve.iter().map(|p| p.recall).collect();
        assert_eq!(recalls, vec![0.5, 0.5, 1.0]);
        assert_eq!(est.curve[0].precision, 1.0);
        assert_eq!(est.curve[1].precision, 1.0);
        assert!((est.curve[2].precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((est.ap - 0.5 * 2.0 / 3.0).abs() < 1e-12);
    }
}
