use serde::{Deserialize, Serialize};

use super::detection::{Detection, GroundTruth};
use super::matching::{greedy_match, Match, MatchParams, ScoreSorted};
use super::metrics::{average_precision, mean_iou, precision_recall_f1, PrPoint};

/// Métricas de una llamada a [`evaluate`].
///
/// Los índices de predicción (`matches`, `unmatched_predictions`) se refieren
/// al orden en que el llamador entregó las predicciones, no al orden por score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub tp: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub mean_iou: f64,
    /// AP al `iou_threshold` de la llamada; el nombre sigue la convención de 0.5.
    pub ap50: f64,
    pub pr_curve: Vec<PrPoint>,
    pub matches: Vec<Match>,
    pub unmatched_predictions: Vec<usize>,
    pub unmatched_ground_truth: Vec<usize>,
}

/// Punto de entrada del motor de evaluación. Función pura: sin estado, sin I/O.
///
/// Las predicciones se ordenan por score descendente antes de emparejar, tanto
/// para P/R/F1 como para el barrido de AP.
pub fn evaluate(
    predictions: &[Detection],
    ground_truths: &[GroundTruth],
    params: &MatchParams,
) -> EvaluationResult {
    let sorted = ScoreSorted::new(predictions);
    let outcome = greedy_match(sorted.as_slice(), ground_truths, params);

    let prf = precision_recall_f1(outcome.tp(), outcome.fp(), outcome.fn_());
    let mean_iou = mean_iou(&outcome.matches);
    let ap = average_precision(&sorted, ground_truths, params);

    let matches: Vec<Match> = outcome
        .matches
        .iter()
        .map(|m| Match {
            prediction: sorted.original_index(m.prediction),
            ..*m
        })
        .collect();
    let mut unmatched_predictions: Vec<usize> = outcome
        .unmatched_predictions
        .iter()
        .map(|&i| sorted.original_index(i))
        .collect();
    unmatched_predictions.sort_unstable();

    EvaluationResult {
        tp: outcome.tp(),
        fp: outcome.fp(),
        fn_: outcome.fn_(),
        precision: prf.precision,
        recall: prf.recall,
        f1: prf.f1,
        mean_iou,
        ap50: ap.ap,
        pr_curve: ap.curve,
        matches,
        unmatched_predictions,
        unmatched_ground_truth: outcome.unmatched_ground_truth,
    }
}
