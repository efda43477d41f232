use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use thiserror::Error;

use super::labels::label_key;

// ─── Metric kinds ────────────────────────────────────────────────

/// What a metric name is permanently bound to on first use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Only ever moves upward via addition.
    Counter,
    /// Last write wins.
    Gauge,
}

impl MetricKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
        }
    }
}

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("metric '{name}' is registered as a {registered}, requested as a {requested}")]
    KindMismatch {
        name: String,
        registered: &'static str,
        requested: &'static str,
    },
}

// ─── MetricFamily ────────────────────────────────────────────────

/// One named metric: a fixed kind plus the current value of every
/// label series, guarded by the family's own lock. The registry lock
/// is never held while a family mutates its values, so writers to
/// unrelated metrics never contend with each other.
pub struct MetricFamily {
    kind: MetricKind,
    values: Mutex<HashMap<String, f64>>,
}

impl MetricFamily {
    fn new(kind: MetricKind) -> Self {
        Self {
            kind,
            values: Mutex::new(HashMap::new()),
        }
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    /// Add `delta` to the series, initializing it at `delta` if absent.
    pub fn increment_by(&self, label_key: &str, delta: f64) {
        let mut values = self.values.lock();
        *values.entry(label_key.to_owned()).or_insert(0.0) += delta;
    }

    /// Overwrite (or create) the series unconditionally.
    pub fn set(&self, label_key: &str, value: f64) {
        let mut values = self.values.lock();
        values.insert(label_key.to_owned(), value);
    }

    /// Copy of the full series map at the instant of the call. The
    /// family lock is held only for the copy, never while the caller
    /// iterates or renders.
    pub fn snapshot(&self) -> HashMap<String, f64> {
        self.values.lock().clone()
    }
}

// ─── Typed handles ───────────────────────────────────────────────

/// Pre-resolved counter. Long-lived collaborators (the gateways) look
/// their families up once at construction so a kind conflict surfaces
/// there instead of silently on the hot path.
#[derive(Clone)]
pub struct CounterHandle {
    family: Arc<MetricFamily>,
}

impl CounterHandle {
    pub fn increment(&self, labels: &[(&str, &str)]) {
        self.family.increment_by(&label_key(labels), 1.0);
    }

    pub fn increment_by(&self, labels: &[(&str, &str)], delta: f64) {
        self.family.increment_by(&label_key(labels), delta);
    }
}

/// Pre-resolved gauge.
#[derive(Clone)]
pub struct GaugeHandle {
    family: Arc<MetricFamily>,
}

impl GaugeHandle {
    pub fn set(&self, value: f64, labels: &[(&str, &str)]) {
        self.family.set(&label_key(labels), value);
    }
}

// ─── Registry ────────────────────────────────────────────────────

/// Single entry point for locating metric families by name and for
/// full-state text exposition.
///
/// Constructed once at startup and passed (behind `Arc`) to every
/// collaborator that emits metrics — there is no hidden global, so
/// each test can build its own isolated registry.
pub struct Registry {
    families: RwLock<HashMap<String, Arc<MetricFamily>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            families: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve the family for `name`, creating it with `kind` on first
    /// use. Exactly one family is ever constructed per name: the fast
    /// path is a read lock, and creators re-check under the write lock
    /// before inserting, so racing first-time callers all end up with
    /// the same instance.
    ///
    /// A name is permanently bound to its first kind; asking for it
    /// under another kind is a caller bug and fails here.
    pub fn get_or_create(
        &self,
        name: &str,
        kind: MetricKind,
    ) -> Result<Arc<MetricFamily>, MetricsError> {
        if let Some(family) = self.families.read().get(name) {
            return Self::check_kind(name, family, kind);
        }

        let mut families = self.families.write();
        if let Some(family) = families.get(name) {
            // Lost the race to another creator.
            return Self::check_kind(name, family, kind);
        }

        let family = Arc::new(MetricFamily::new(kind));
        families.insert(name.to_owned(), family.clone());
        Ok(family)
    }

    fn check_kind(
        name: &str,
        family: &Arc<MetricFamily>,
        requested: MetricKind,
    ) -> Result<Arc<MetricFamily>, MetricsError> {
        if family.kind() != requested {
            return Err(MetricsError::KindMismatch {
                name: name.to_owned(),
                registered: family.kind().as_str(),
                requested: requested.as_str(),
            });
        }
        Ok(family.clone())
    }

    /// Typed counter lookup for collaborators that resolve once and
    /// increment many times.
    pub fn counter(&self, name: &str) -> Result<CounterHandle, MetricsError> {
        let family = self.get_or_create(name, MetricKind::Counter)?;
        Ok(CounterHandle { family })
    }

    /// Typed gauge lookup.
    pub fn gauge(&self, name: &str) -> Result<GaugeHandle, MetricsError> {
        let family = self.get_or_create(name, MetricKind::Gauge)?;
        Ok(GaugeHandle { family })
    }

    /// Add 1 to the counter series identified by `name` + `labels`.
    ///
    /// Never fails from the caller's point of view: a kind conflict is
    /// logged and the observation dropped rather than reinterpreting
    /// values recorded under the original kind.
    pub fn increment_counter(&self, name: &str, labels: &[(&str, &str)]) {
        match self.get_or_create(name, MetricKind::Counter) {
            Ok(family) => family.increment_by(&label_key(labels), 1.0),
            Err(err) => tracing::error!(metric = name, %err, "dropping counter increment"),
        }
    }

    /// Overwrite the gauge series identified by `name` + `labels`.
    pub fn set_gauge(&self, name: &str, value: f64, labels: &[(&str, &str)]) {
        match self.get_or_create(name, MetricKind::Gauge) {
            Ok(family) => family.set(&label_key(labels), value),
            Err(err) => tracing::error!(metric = name, %err, "dropping gauge write"),
        }
    }

    /// Render every series as `<name><label_block> <value>\n` with six
    /// fractional digits, e.g.
    ///
    /// ```text
    /// api_requests_total{endpoint="/api/user",method="POST",status="200"} 42.000000
    /// app_uptime_seconds 37.250000
    /// ```
    ///
    /// Names and label keys are sorted so successive scrapes of an
    /// unchanged registry are byte-identical. Each family is
    /// snapshotted independently: a scrape concurrent with writers is
    /// not one atomic view of the whole registry, but every individual
    /// series value is internally consistent.
    pub fn export(&self) -> String {
        // Grab the family handles under the registry lock, render
        // after releasing it.
        let mut families: Vec<(String, Arc<MetricFamily>)> = self
            .families
            .read()
            .iter()
            .map(|(name, family)| (name.clone(), family.clone()))
            .collect();
        families.sort_by(|a, b| a.0.cmp(&b.0));

        let mut out = String::new();
        for (name, family) in families {
            let mut series: Vec<(String, f64)> =
                family.snapshot().into_iter().collect();
            series.sort_by(|a, b| a.0.cmp(&b.0));

            for (key, value) in series {
                let _ = writeln!(out, "{name}{key} {value:.6}");
            }
        }
        out
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn counter_accumulates_per_call() {
        let reg = Registry::new();
        for _ in 0..5 {
            reg.increment_counter("requests_total", &[("status", "200")]);
        }
        let family = reg
            .get_or_create("requests_total", MetricKind::Counter)
            .unwrap();
        let snap = family.snapshot();
        assert_eq!(snap[r#"{status="200"}"#], 5.0);
    }

    #[test]
    fn gauge_last_write_wins() {
        let reg = Registry::new();
        reg.set_gauge("temperature", 1.5, &[]);
        reg.set_gauge("temperature", 3.5, &[]);
        let family = reg
            .get_or_create("temperature", MetricKind::Gauge)
            .unwrap();
        assert_eq!(family.snapshot()[""], 3.5);
    }

    #[test]
    fn series_are_isolated_by_label_key() {
        let reg = Registry::new();
        reg.increment_counter("hits_total", &[("path", "/a")]);
        reg.increment_counter("hits_total", &[("path", "/a")]);
        reg.increment_counter("hits_total", &[("path", "/b")]);

        let snap = reg
            .get_or_create("hits_total", MetricKind::Counter)
            .unwrap()
            .snapshot();
        assert_eq!(snap[r#"{path="/a"}"#], 2.0);
        assert_eq!(snap[r#"{path="/b"}"#], 1.0);
    }

    #[test]
    fn label_order_converges_to_one_series() {
        let reg = Registry::new();
        reg.increment_counter("ops_total", &[("a", "1"), ("b", "2")]);
        reg.increment_counter("ops_total", &[("b", "2"), ("a", "1")]);

        let snap = reg
            .get_or_create("ops_total", MetricKind::Counter)
            .unwrap()
            .snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[r#"{a="1",b="2"}"#], 2.0);
    }

    #[test]
    fn kind_is_bound_on_first_use() {
        let reg = Registry::new();
        reg.increment_counter("mixed", &[]);

        assert!(matches!(
            reg.get_or_create("mixed", MetricKind::Gauge),
            Err(MetricsError::KindMismatch { .. })
        ));
        assert!(reg.gauge("mixed").is_err());

        // The dynamic path drops the conflicting write instead of
        // coercing the stored series.
        reg.set_gauge("mixed", 99.0, &[]);
        let snap = reg
            .get_or_create("mixed", MetricKind::Counter)
            .unwrap()
            .snapshot();
        assert_eq!(snap[""], 1.0);
    }

    #[test]
    fn handles_and_dynamic_path_share_one_family() {
        let reg = Registry::new();
        let handle = reg.counter("shared_total").unwrap();
        handle.increment(&[("via", "handle")]);
        reg.increment_counter("shared_total", &[("via", "handle")]);

        let snap = reg
            .get_or_create("shared_total", MetricKind::Counter)
            .unwrap()
            .snapshot();
        assert_eq!(snap[r#"{via="handle"}"#], 2.0);
    }

    #[test]
    fn racing_creators_observe_one_family_and_lose_no_updates() {
        const THREADS: usize = 16;
        const INCREMENTS: usize = 1000;

        let reg = Arc::new(Registry::new());
        let mut handles = Vec::with_capacity(THREADS);

        for _ in 0..THREADS {
            let reg = reg.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..INCREMENTS {
                    reg.increment_counter("raced_total", &[("t", "x")]);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        let snap = reg
            .get_or_create("raced_total", MetricKind::Counter)
            .unwrap()
            .snapshot();
        assert_eq!(snap[r#"{t="x"}"#], (THREADS * INCREMENTS) as f64);
    }

    #[test]
    fn export_renders_all_series_with_six_decimals() {
        let reg = Registry::new();
        reg.increment_counter("a_total", &[("x", "1")]);
        reg.increment_counter("a_total", &[("x", "1")]);
        reg.set_gauge("b", 3.5, &[]);

        let text = reg.export();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines.contains(&r#"a_total{x="1"} 2.000000"#));
        assert!(lines.contains(&"b 3.500000"));
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn empty_label_set_renders_without_braces() {
        let reg = Registry::new();
        reg.increment_counter("app_restarts_total", &[]);
        for _ in 0..6 {
            reg.increment_counter("app_restarts_total", &[]);
        }
        assert_eq!(reg.export(), "app_restarts_total 7.000000\n");
    }

    #[test]
    fn export_is_empty_for_fresh_registry() {
        assert_eq!(Registry::new().export(), "");
    }

    #[test]
    fn export_under_concurrent_writers_never_tears() {
        let reg = Arc::new(Registry::new());
        let writer = {
            let reg = reg.clone();
            thread::spawn(move || {
                for i in 0..5000u32 {
                    reg.set_gauge("busy", f64::from(i), &[]);
                    reg.increment_counter("busy_total", &[]);
                }
            })
        };

        for _ in 0..50 {
            // Every line must parse as name [+labels] + value; a torn
            // write would break the fixed-precision render.
            for line in reg.export().lines() {
                let (_, value) = line.rsplit_once(' ').unwrap();
                value.parse::<f64>().unwrap();
            }
        }
        writer.join().unwrap();
    }
}
