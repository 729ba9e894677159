//! Prediction metrics, exposed through the default Prometheus registry.

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter_vec, register_int_gauge, Histogram, IntCounterVec, IntGauge,
};

use crate::error::ApiError;
use crate::inference::Prediction;

pub static PREDICTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!("neuroscan_predictions_total", "Prediction requests by outcome", &["outcome"])
        .expect("register neuroscan_predictions_total")
});

pub static PREDICTIONS_BY_LABEL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!("neuroscan_predictions_by_label_total", "Successful predictions by label", &["label"])
        .expect("register neuroscan_predictions_by_label_total")
});

pub static INFERENCE_LATENCY_MS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "neuroscan_inference_latency_ms",
        "Decode + preprocess + inference latency (ms)",
        vec![5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0]
    )
    .expect("register neuroscan_inference_latency_ms")
});

pub static MODEL_READY: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("neuroscan_model_ready", "1 once the model is loaded and warmed up")
        .expect("register neuroscan_model_ready")
});

/// Force registration so every series shows up on `/metrics` before the first request.
pub fn register() {
    Lazy::force(&PREDICTIONS);
    Lazy::force(&PREDICTIONS_BY_LABEL);
    Lazy::force(&INFERENCE_LATENCY_MS);
    Lazy::force(&MODEL_READY);
}

pub fn record_outcome(outcome: &Result<Prediction, ApiError>) {
    match outcome {
        Ok(p) => {
            PREDICTIONS.with_label_values(&["ok"]).inc();
            PREDICTIONS_BY_LABEL.with_label_values(&[p.label.as_str()]).inc();
        }
        Err(e) => PREDICTIONS.with_label_values(&[e.outcome()]).inc(),
    }
}
