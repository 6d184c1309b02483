use prometheus::{Encoder, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub login_attempts_total: IntCounterVec,
    pub packages_created_total: IntCounter,
    pub deliveries_total: IntCounterVec,
    pub delivery_confirmation_seconds: HistogramVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let login_attempts_total = IntCounterVec::new(
            Opts::new("login_attempts_total", "Token requests by outcome"),
            &["outcome"],
        )
        .expect("valid login_attempts_total metric");

        let packages_created_total =
            IntCounter::new("packages_created_total", "Packages assigned to an agent")
                .expect("valid packages_created_total metric");

        let deliveries_total = IntCounterVec::new(
            Opts::new("deliveries_total", "Delivery confirmations by outcome"),
            &["outcome"],
        )
        .expect("valid deliveries_total metric");

        let delivery_confirmation_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "delivery_confirmation_seconds",
                "Latency of delivery confirmation in seconds",
            ),
            &["outcome"],
        )
        .expect("valid delivery_confirmation_seconds metric");

        registry
            .register(Box::new(login_attempts_total.clone()))
            .expect("register login_attempts_total");
        registry
            .register(Box::new(packages_created_total.clone()))
            .expect("register packages_created_total");
        registry
            .register(Box::new(deliveries_total.clone()))
            .expect("register deliveries_total");
        registry
            .register(Box::new(delivery_confirmation_seconds.clone()))
            .expect("register delivery_confirmation_seconds");

        Self {
            registry,
            login_attempts_total,
            packages_created_total,
            deliveries_total,
            delivery_confirmation_seconds,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
