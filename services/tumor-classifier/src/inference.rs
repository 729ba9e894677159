//! Reduces the model's class scores to a single labelled prediction.

use serde::Serialize;

use crate::error::ModelError;
use crate::labels::TumorClass;
use crate::preprocess::InputTensor;

/// Anything that can score a preprocessed (1, 299, 299, 3) batch.
///
/// Implementations must be safe to call from many request tasks at once;
/// the service never mutates a backend after it is loaded.
pub trait InferenceBackend: Send + Sync + 'static {
    /// Raw output vector, one score per class in label-table order.
    fn run(&self, input: &InputTensor) -> anyhow::Result<Vec<f32>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    #[serde(rename = "tumor_type")]
    pub label: TumorClass,
    pub confidence: f64,
}

/// Index of the largest finite score; ties go to the lowest index.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &s) in scores.iter().enumerate() {
        if !s.is_finite() {
            continue;
        }
        match best {
            Some((_, b)) if s <= b => {}
            _ => best = Some((i, s)),
        }
    }
    best.map(|(i, _)| i)
}

pub fn classify(scores: &[f32]) -> Result<Prediction, ModelError> {
    if scores.len() != TumorClass::COUNT {
        return Err(ModelError::Inference(format!(
            "expected {} class scores, model produced {}",
            TumorClass::COUNT,
            scores.len()
        )));
    }
    let index = argmax(scores).ok_or_else(|| ModelError::Inference("model produced no finite class score".into()))?;
    let label = TumorClass::from_index(index)
        .ok_or_else(|| ModelError::Inference(format!("class index {index} outside label table")))?;
    Ok(Prediction { label, confidence: f64::from(scores[index]) })
}

pub fn predict(backend: &dyn InferenceBackend, input: &InputTensor) -> Result<Prediction, ModelError> {
    let scores = backend.run(input).map_err(|e| ModelError::Inference(format!("{e:#}")))?;
    classify(&scores)
}


#[cfg(test)]
mod tests {
    use super::fakes::{Failing, FixedScores};
    use super::*;
    use crate::preprocess::warmup_tensor;

    #[test]
    fn unique_maximum_selects_its_label() {
        let cases: [([f32; 4], TumorClass); 4] = [
            ([0.7, 0.1, 0.1, 0.1], TumorClass::Glioma),
            ([0.05, 0.8, 0.1, 0.05], TumorClass::Meningioma),
            ([0.0, 0.0, 1.0, 0.0], TumorClass::NoTumor),
            ([0.2, 0.2, 0.2, 0.4], TumorClass::Pituitary),
        ];
        for (scores, expected) in cases {
            let p = classify(&scores).unwrap();
            assert_eq!(p.label, expected);
            assert_eq!(p.confidence, f64::from(scores[TumorClass::ALL.iter().position(|c| *c == expected).unwrap()]));
        }
    }

    #[test]
    fn ties_go_to_lowest_index() {
        assert_eq!(argmax(&[0.4, 0.4, 0.1, 0.1]), Some(0));
        assert_eq!(argmax(&[0.1, 0.3, 0.3, 0.3]), Some(1));
        assert_eq!(classify(&[0.25, 0.25, 0.25, 0.25]).unwrap().label, TumorClass::Glioma);
    }

    #[test]
    fn non_finite_scores_are_skipped() {
        assert_eq!(argmax(&[f32::NAN, 0.2, 0.5, 0.3]), Some(2));
        assert_eq!(argmax(&[f32::NAN; 4]), None);
        assert!(matches!(classify(&[f32::NAN; 4]), Err(ModelError::Inference(_))));
    }

    #[test]
    fn wrong_output_length_is_an_inference_failure() {
        let err = classify(&[0.5, 0.5]).unwrap_err();
        assert_eq!(err, ModelError::Inference("expected 4 class scores, model produced 2".into()));
        assert!(classify(&[]).is_err());
    }

    #[test]
    fn warmup_tensor_is_accepted_by_the_adapter() {
        let backend = FixedScores(vec![0.1, 0.2, 0.6, 0.1]);
        let p = predict(&backend, &warmup_tensor()).unwrap();
        assert_eq!(p.label, TumorClass::NoTumor);
        assert!((p.confidence - 0.6).abs() < 1e-6);
    }

    #[test]
    fn backend_errors_surface_as_inference_failures() {
        let err = predict(&Failing, &warmup_tensor()).unwrap_err();
        assert_eq!(err, ModelError::Inference("shape mismatch in node conv2d_1".into()));
    }

    #[test]
    fn prediction_serializes_with_wire_field_names() {
        let p = Prediction { label: TumorClass::Meningioma, confidence: 0.5 };
        assert_eq!(serde_json::to_value(p).unwrap(), serde_json::json!({"tumor_type": "meningioma", "confidence": 0.5}));
    }
}
