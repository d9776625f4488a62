//! Prometheus registry behind `/metrics`.
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    diagnoses: IntCounterVec,
    consultations: IntCounterVec,
    diagnosis_seconds: HistogramVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let diagnoses = IntCounterVec::new(
            Opts::new("triage_diagnoses_total", "Diagnoses served, by provider and outcome"),
            &["provider", "outcome"],
        )?;
        let consultations = IntCounterVec::new(
            Opts::new("triage_consultations_total", "Persistence gate decisions"),
            &["result"],
        )?;
        let diagnosis_seconds = HistogramVec::new(
            HistogramOpts::new("triage_diagnosis_seconds", "End to end diagnosis latency"),
            &["provider"],
        )?;

        registry.register(Box::new(diagnoses.clone()))?;
        registry.register(Box::new(consultations.clone()))?;
        registry.register(Box::new(diagnosis_seconds.clone()))?;

        Ok(Self {
            registry,
            diagnoses,
            consultations,
            diagnosis_seconds,
        })
    }

    pub fn record_diagnosis(&self, provider: &str, is_fallback: bool, seconds: f64) {
        let outcome = if is_fallback { "fallback" } else { "model" };
        self.diagnoses.with_label_values(&[provider, outcome]).inc();
        self.diagnosis_seconds
            .with_label_values(&[provider])
            .observe(seconds);
    }

    pub fn record_consultation(&self, result: &str) {
        self.consultations.with_label_values(&[result]).inc();
    }

    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_after_record() {
        let metrics = Metrics::new().unwrap();
        metrics.record_diagnosis("groq", true, 0.25);
        metrics.record_consultation("skipped");

        let text = metrics.encode().unwrap();
        assert!(text.contains("triage_diagnoses_total{"));
        assert!(text.contains(r#"outcome="fallback""#));
        assert!(text.contains(r#"triage_consultations_total{result="skipped"} 1"#));
    }
}
