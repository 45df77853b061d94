//! Lectura de ground truth desde JSON.
//!
//! Dos formas aceptadas:
//! - tipo COCO: `images`, `annotations` (bbox `[x, y, w, h]`) y `categories`;
//! - simple: `annotations` con `{bbox: [x1, y1, x2, y2], label}`.

use serde_json::{Map, Value};
use std::collections::HashMap;

use super::detection::GroundTruth;
use super::errors::{DomainError, DomainResult};
use super::geometry::BBox;

const UNKNOWN_LABEL: &str = "unknown";

/// Convierte un payload de anotaciones en ground truths en formato esquinas.
///
/// `image_filename` selecciona la imagen en payloads COCO con varias imágenes.
/// Si no coincide con ninguna y hay más de una, se usan todas las anotaciones.
pub fn parse_annotations(bytes: &[u8], image_filename: Option<&str>) -> DomainResult<Vec<GroundTruth>> {
    let data: Value = serde_json::from_slice(bytes)
        .map_err(|e| DomainError::InvalidAnnotations(format!("JSON inválido: {e}")))?;
    let Value::Object(data) = data else {
        return Err(DomainError::InvalidAnnotations(
            "se esperaba un objeto JSON en el nivel superior".into(),
        ));
    };

    let anns = match data.get("annotations") {
        Some(Value::Array(anns)) if !anns.is_empty() => anns,
        // ausente, vacío o no es lista
        _ => return Ok(Vec::new()),
    };

    if is_simple_schema(&data, anns) {
        Ok(parse_simple(anns))
    } else {
        Ok(parse_coco(&data, anns, image_filename))
    }
}

// Sin `images` ni `categories`, ningún `category_id` y al menos un `label`.
fn is_simple_schema(data: &Map<String, Value>, anns: &[Value]) -> bool {
    if data.contains_key("images") || data.contains_key("categories") {
        return false;
    }
    let objects = || anns.iter().filter_map(Value::as_object);
    !objects().any(|a| a.contains_key("category_id")) && objects().any(|a| a.contains_key("label"))
}

fn parse_simple(anns: &[Value]) -> Vec<GroundTruth> {
    anns.iter()
        .filter_map(Value::as_object)
        .filter_map(|ann| {
            let bbox = ann.get("bbox").and_then(bbox4)?;
            let label = ann.get("label").map(label_string).unwrap_or_else(|| UNKNOWN_LABEL.into());
            Some(GroundTruth::new(BBox::from(bbox), label))
        })
        .collect()
}

fn parse_coco(data: &Map<String, Value>, anns: &[Value], image_filename: Option<&str>) -> Vec<GroundTruth> {
    let categories = category_map(data.get("categories"));
    let image_filter = select_image(data.get("images"), image_filename);

    let mut gts = Vec::new();
    for ann in anns.iter().filter_map(Value::as_object) {
        if let Some(image_id) = image_filter {
            if ann.get("image_id").and_then(as_id).unwrap_or(-1) != image_id {
                continue;
            }
        }
        let Some(bbox) = ann.get("bbox").and_then(bbox4) else {
            continue;
        };
        let label = match ann.get("category_id").filter(|v| !v.is_null()) {
            Some(cat_id) => as_id(cat_id)
                .and_then(|id| categories.get(&id).cloned())
                .unwrap_or_else(|| label_string(cat_id)),
            None => ann
                .get("category")
                .map(label_string)
                .unwrap_or_else(|| UNKNOWN_LABEL.into()),
        };
        gts.push(GroundTruth::new(BBox::from_xywh(bbox), label));
    }
    gts
}

fn category_map(categories: Option<&Value>) -> HashMap<i64, String> {
    let Some(Value::Array(cats)) = categories else {
        return HashMap::new();
    };
    cats.iter()
        .filter_map(Value::as_object)
        .filter_map(|c| {
            let raw_id = c.get("id")?;
            let id = as_id(raw_id)?;
            let name = c.get("name").map(label_string).unwrap_or_else(|| label_string(raw_id));
            Some((id, name))
        })
        .collect()
}

/// Primero por `file_name`; si no, la única imagen; si no, ningún filtro.
fn select_image(images: Option<&Value>, image_filename: Option<&str>) -> Option<i64> {
    let Some(Value::Array(images)) = images else {
        return None;
    };
    if images.is_empty() {
        return None;
    }

    if let Some(name) = image_filename {
        let found = images
            .iter()
            .filter_map(Value::as_object)
            .find(|img| img.get("file_name").map(label_string).as_deref() == Some(name));
        if let Some(img) = found {
            if let Some(id) = img.get("id").and_then(as_id) {
                return Some(id);
            }
        }
    }

    if images.len() == 1 {
        return images[0].get("id").and_then(as_id);
    }
    None
}

// Exactamente 4 componentes numéricos.
fn bbox4(v: &Value) -> Option<[f64; 4]> {
    let arr = v.as_array()?;
    if arr.len() != 4 {
        return None;
    }
    let mut out = [0.0; 4];
    for (slot, item) in out.iter_mut().zip(arr) {
        *slot = item.as_f64()?;
    }
    Some(out)
}

// Ids enteros o cadenas numéricas ("3").
fn as_id(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn label_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str, name: Option<&str>) -> Vec<GroundTruth> {
        parse_annotations(json.as_bytes(), name).unwrap()
    }

    #[test]
    fn coco_single_image() {
        let json = r#"{
            "images": [{"id": 1, "file_name": "page.png"}],
            "categories": [{"id": 1, "name": "Table"}],
            "annotations": [{"image_id": 1, "bbox": [5, 5, 20, 10], "category_id": 1}]
        }"#;
        let gts = parse(json, None);
        assert_eq!(gts, vec![GroundTruth::new(BBox::new(5.0, 5.0, 25.0, 15.0), "Table")]);
    }

    #[test]
    fn single_image_is_used_even_if_filename_differs() {
        let json = r#"{
            "images": [{"id": 7, "file_name": "a.png"}],
            "categories": [{"id": 1, "name": "Text"}],
            "annotations": [
                {"image_id": 7, "bbox": [0, 0, 1, 1], "category_id": 1},
                {"image_id": 8, "bbox": [0, 0, 2, 2], "category_id": 1}
            ]
        }"#;
        let gts = parse(json, Some("other.png"));
        assert_eq!(gts.len(), 1);
        assert_eq!(gts[0].bbox, BBox::new(0.0, 0.0, 1.0, 1.0));
    }

    const MULTI: &str = r#"{
        "images": [{"id": 1, "file_name": "p1.png"}, {"id": 2, "file_name": "p2.png"}],
        "categories": [{"id": 1, "name": "Text"}, {"id": 2, "name": "Figure"}],
        "annotations": [
            {"image_id": 1, "bbox": [0, 0, 10, 10], "category_id": 1},
            {"image_id": 2, "bbox": [5, 5, 10, 10], "category_id": 2},
            {"image_id": 2, "bbox": [1, 1, 1, 1], "category_id": 1}
        ]
    }"#;

    #[test]
    fn multi_image_filters_by_filename() {
        let gts = parse(MULTI, Some("p2.png"));
        assert_eq!(gts.len(), 2);
        assert_eq!(gts[0].label, "Figure");
        assert_eq!(gts[0].bbox, BBox::new(5.0, 5.0, 15.0, 15.0));
    }

    #[test]
    fn multi_image_without_resolvable_filename_uses_everything() {
        assert_eq!(parse(MULTI, Some("missing.png")).len(), 3);
        assert_eq!(parse(MULTI, None).len(), 3);
    }

    #[test]
    fn category_fallbacks() {
        let json = r#"{
            "categories": [{"id": 1, "name": "Title"}, {"id": 4}],
            "annotations": [
                {"bbox": [0, 0, 1, 1], "category_id": 1},
                {"bbox": [0, 0, 1, 1], "category_id": 9},
                {"bbox": [0, 0, 1, 1], "category_id": 4},
                {"bbox": [0, 0, 1, 1], "category": "List"},
                {"bbox": [0, 0, 1, 1]},
                {"bbox": [0, 0, 1, 1], "category_id": "1"}
            ]
        }"#;
        let labels: Vec<String> = parse(json, None).into_iter().map(|g| g.label).collect();
        assert_eq!(labels, vec!["Title", "9", "4", "List", "unknown", "Title"]);
    }

    #[test]
    fn malformed_bboxes_are_skipped() {
        let json = r#"{
            "categories": [{"id": 1, "name": "Text"}],
            "annotations": [
                {"bbox": [0, 0, 1], "category_id": 1},
                {"bbox": [0, 0, 1, 1, 1], "category_id": 1},
                {"bbox": [0, "a", 1, 1], "category_id": 1},
                {"category_id": 1},
                "not an object",
                {"bbox": [0, 0, 3, 3], "category_id": 1}
            ]
        }"#;
        let gts = parse(json, None);
        assert_eq!(gts, vec![GroundTruth::new(BBox::new(0.0, 0.0, 3.0, 3.0), "Text")]);
    }

    #[test]
    fn simple_schema_keeps_corner_boxes() {
        let json = r#"{"annotations": [
            {"bbox": [1, 2, 30, 40], "label": "Text"},
            {"bbox": [5, 5, 6, 6]},
            {"bbox": [1, 2], "label": "Title"}
        ]}"#;
        let gts = parse(json, None);
        assert_eq!(
            gts,
            vec![
                GroundTruth::new(BBox::new(1.0, 2.0, 30.0, 40.0), "Text"),
                GroundTruth::new(BBox::new(5.0, 5.0, 6.0, 6.0), "unknown"),
            ]
        );
    }

    #[test]
    fn missing_or_empty_annotations_yield_nothing() {
        assert!(parse("{}", None).is_empty());
        assert!(parse(r#"{"annotations": []}"#, None).is_empty());
        assert!(parse(r#"{"annotations": {"bbox": [0, 0, 1, 1]}}"#, None).is_empty());
    }

    #[test]
    fn invalid_payloads_are_rejected() {
        for bad in ["not json", "[1, 2, 3]", "\"text\"", ""] {
            let err = parse_annotations(bad.as_bytes(), None).unwrap_err();
            assert!(matches!(err, DomainError::InvalidAnnotations(_)), "{bad}");
        }
    }
}
