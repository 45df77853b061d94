use anyhow::{anyhow, Result};
use image::{imageops::FilterType, RgbImage};
use ndarray::{Array4, ArrayViewD, Axis, IxDyn};
use ort::session::Session;
use ort::value::TensorRef;
use std::fs;

use crate::domain::detection::{suppress_overlaps, Detection};
use crate::domain::geometry::BBox;
use crate::domain::model::DetectorParams;

/// Sesión ONNX de un modelo de layout con salida `[1, 4 + clases, N]`
/// (cx, cy, w, h en píxeles de entrada, seguido de un score por clase).
pub struct OnnxLayoutEngine {
    session: Session,
}

impl OnnxLayoutEngine {
    pub fn load(path: &str) -> Result<Self> {
        // Con `ort` leemos el modelo a memoria y usamos commit_from_memory.
        let model_bytes = fs::read(path)?;
        let session = Session::builder()?
            .with_intra_threads(4)?
            .commit_from_memory(&model_bytes)?;

        Ok(Self { session })
    }

    pub fn infer(&mut self, rgb: &RgbImage, params: &DetectorParams) -> Result<Vec<Detection>> {
        let input = preprocess(rgb, params.input_size);
        let input_tensor = TensorRef::from_array_view(input.view())?;

        let outputs = self.session.run(ort::inputs![input_tensor])?;
        let (shape_out, data_out) = outputs[0].try_extract_tensor::<f32>()?;

        let dims: Vec<usize> = shape_out.iter().map(|&x| x as usize).collect();
        if dims.len() != 3 || dims[1] <= 4 {
            return Err(anyhow!("Salida del modelo inesperada: {:?}", dims));
        }
        let array_view = ArrayViewD::from_shape(IxDyn(&dims), data_out)?;
        let view = array_view.index_axis(Axis(0), 0);

        let sx = rgb.width() as f32 / params.input_size as f32;
        let sy = rgb.height() as f32 / params.input_size as f32;
        Ok(decode(view, sx, sy, params))
    }
}

/// Redimensiona a `size x size` y normaliza a [0, 1] en formato CHW.
fn preprocess(rgb: &RgbImage, size: u32) -> Array4<f32> {
    let imgsz = size as usize;
    let resized = image::imageops::resize(rgb, size, size, FilterType::Triangle);

    let mut input = Array4::<f32>::zeros((1, 3, imgsz, imgsz));
    for (x, y, pixel) in resized.enumerate_pixels() {
        input[[0, 0, y as usize, x as usize]] = pixel[0] as f32 / 255.0;
        input[[0, 1, y as usize, x as usize]] = pixel[1] as f32 / 255.0;
        input[[0, 2, y as usize, x as usize]] = pixel[2] as f32 / 255.0;
    }
    input
}

/// `view` es `[4 + clases, N]`. Filtra por score, aplica NMS por etiqueta,
/// ordena por score y recorta a `max_detections`.
fn decode(view: ArrayViewD<'_, f32>, sx: f32, sy: f32, params: &DetectorParams) -> Vec<Detection> {
    let num_features = view.shape()[0];
    let num_candidates = view.shape()[1];

    let mut detections = Vec::new();
    for i in 0..num_candidates {
        let mut class_id = 0;
        let mut max_score = f32::MIN;
        for c in 4..num_features {
            let s = view[[c, i]];
            if s > max_score {
                max_score = s;
                class_id = c - 4;
            }
        }

        if max_score > params.score_threshold {
            let cx = view[[0, i]];
            let cy = view[[1, i]];
            let w = view[[2, i]];
            let h = view[[3, i]];

            detections.push(Detection {
                bbox: BBox::new(
                    ((cx - w / 2.0) * sx) as f64,
                    ((cy - h / 2.0) * sy) as f64,
                    ((cx + w / 2.0) * sx) as f64,
                    ((cy + h / 2.0) * sy) as f64,
                ),
                label: params.label_for(class_id),
                score: max_score as f64,
            });
        }
    }

    let mut kept = suppress_overlaps(detections, params.nms_iou_threshold as f64);
    kept.truncate(params.max_detections);
    kept
}
