//! Emparejamiento voraz predicción -> ground truth.
//!
//! El algoritmo es de una sola pasada y depende del orden de las predicciones:
//! cada predicción toma la mejor ground truth libre y no se reconsidera después.
//! No es una asignación óptima (Hungarian) y no debe "arreglarse" en esa dirección.
//! Para emparejar por prioridad de score hay que pasar por [`ScoreSorted`].

use serde::{Deserialize, Serialize};

use super::detection::{Detection, GroundTruth};
use super::geometry::iou;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchParams {
    pub iou_threshold: f64,
    pub require_label_match: bool,
}

impl Default for MatchParams {
    fn default() -> Self {
        Self {
            iou_threshold: 0.5,
            require_label_match: true,
        }
    }
}

/// Par uno a uno. Se serializa como `[pred_idx, gt_idx, iou]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(usize, usize, f64)", into = "(usize, usize, f64)")]
pub struct Match {
    pub prediction: usize,
    pub ground_truth: usize,
    pub iou: f64,
}

impl From<(usize, usize, f64)> for Match {
    fn from((prediction, ground_truth, iou): (usize, usize, f64)) -> Self {
        Self { prediction, ground_truth, iou }
    }
}

impl From<Match> for (usize, usize, f64) {
    fn from(m: Match) -> Self {
        (m.prediction, m.ground_truth, m.iou)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchOutcome {
    pub matches: Vec<Match>,
    pub unmatched_predictions: Vec<usize>,
    pub unmatched_ground_truth: Vec<usize>,
}

impl MatchOutcome {
    pub fn tp(&self) -> usize {
        self.matches.len()
    }

    pub fn fp(&self) -> usize {
        self.unmatched_predictions.len()
    }

    pub fn fn_(&self) -> usize {
        self.unmatched_ground_truth.len()
    }
}

/// Predicciones ordenadas por score descendente (orden estable: los empates
/// conservan el orden relativo original). Recuerda el índice original de cada una.
#[derive(Debug, Clone)]
pub struct ScoreSorted {
    detections: Vec<Detection>,
    origin: Vec<usize>,
}

impl ScoreSorted {
    pub fn new(predictions: &[Detection]) -> Self {
        let mut order: Vec<usize> = (0..predictions.len()).collect();
        order.sort_by(|&a, &b| predictions[b].score.total_cmp(&predictions[a].score));
        Self {
            detections: order.iter().map(|&i| predictions[i].clone()).collect(),
            origin: order,
        }
    }

    pub fn as_slice(&self) -> &[Detection] {
        &self.detections
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    /// Prefijo con `score >= threshold`. Sigue ordenado.
    pub fn at_or_above(&self, threshold: f64) -> &[Detection] {
        let n = self.detections.partition_point(|d| d.score >= threshold);
        &self.detections[..n]
    }

    /// Scores distintos, de mayor a menor.
    pub fn distinct_scores(&self) -> Vec<f64> {
        let mut scores: Vec<f64> = self.detections.iter().map(|d| d.score).collect();
        scores.dedup();
        scores
    }

    /// Índice en la secuencia que entregó el llamador.
    pub fn original_index(&self, sorted_idx: usize) -> usize {
        self.origin[sorted_idx]
    }
}

/// Una pasada voraz en el orden recibido.
///
/// Para cada predicción se recorren las ground truths libres en orden de índice
/// y se queda con la de mayor IoU que cumpla `iou >= iou_threshold`. La mejor
/// sólo se reemplaza con un IoU estrictamente mayor, así que en un empate gana
/// el índice más bajo; y como el mejor arranca en 0.0, un IoU nulo nunca empareja.
pub fn greedy_match(
    predictions: &[Detection],
    ground_truths: &[GroundTruth],
    params: &MatchParams,
) -> MatchOutcome {
    let mut used = vec![false; ground_truths.len()];
    let mut matched_pred = vec![false; predictions.len()];
    let mut matches = Vec::new();

    for (p_idx, pred) in predictions.iter().enumerate() {
        let mut best_iou = 0.0;
        let mut best_gt: Option<usize> = None;

        for (g_idx, gt) in ground_truths.iter().enumerate() {
            if used[g_idx] {
                continue;
            }
            if params.require_label_match && pred.label != gt.label {
                continue;
            }
            let v = iou(&pred.bbox, &gt.bbox);
            if v >= params.iou_threshold && v > best_iou {
                best_iou = v;
                best_gt = Some(g_idx);
            }
        }

        if let Some(g_idx) = best_gt {
            used[g_idx] = true;
            matched_pred[p_idx] = true;
            matches.push(Match {
                prediction: p_idx,
                ground_truth: g_idx,
                iou: best_iou,
            });
        }
    }

    MatchOutcome {
        matches,
        unmatched_predictions: unset_indices(&matched_pred),
        unmatched_ground_truth: unset_indices(&used),
    }
}

fn unset_indices(flags: &[bool]) -> Vec<usize> {
    flags
        .iter()
        .enumerate()
        .filter(|&(_, &set)| !set)
        .map(|(i, _)| i)
        .collect()
}
