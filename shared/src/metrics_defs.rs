//! Metric definitions shared by the workspace crates.
//!
//! Each crate declares its metrics as `MetricDef` constants in its own
//! `metrics_defs` module and lists them in an `ALL_METRICS` table, which the
//! binary hands to [`describe_metrics`] once the recorder is installed.

use metrics::Unit;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Gauge,
    Histogram,
}

#[derive(Debug, Clone, Copy)]
pub struct MetricDef {
    pub name: &'static str,
    pub metric_type: MetricType,
    pub unit: Option<Unit>,
    pub description: &'static str,
}

impl MetricDef {
    pub fn describe(&self) {
        match (self.metric_type, self.unit) {
            (MetricType::Counter, None) => metrics::describe_counter!(self.name, self.description),
            (MetricType::Counter, Some(unit)) => {
                metrics::describe_counter!(self.name, unit, self.description)
            }
            (MetricType::Gauge, None) => metrics::describe_gauge!(self.name, self.description),
            (MetricType::Gauge, Some(unit)) => {
                metrics::describe_gauge!(self.name, unit, self.description)
            }
            (MetricType::Histogram, None) => {
                metrics::describe_histogram!(self.name, self.description)
            }
            (MetricType::Histogram, Some(unit)) => {
                metrics::describe_histogram!(self.name, unit, self.description)
            }
        }
    }
}

/// Registers the description and unit of every metric with the global
/// recorder.
pub fn describe_metrics(defs: &[MetricDef]) {
    for def in defs {
        def.describe();
    }
}

/// `counter!(DEF)` or `counter!(DEF, "label" => value, ...)`.
#[macro_export]
macro_rules! counter {
    ($def:expr $(, $key:expr => $value:expr)* $(,)?) => {
        metrics::counter!($def.name $(, $key => $value)*)
    };
}

#[macro_export]
macro_rules! gauge {
    ($def:expr $(, $key:expr => $value:expr)* $(,)?) => {
        metrics::gauge!($def.name $(, $key => $value)*)
    };
}

#[macro_export]
macro_rules! histogram {
    ($def:expr $(, $key:expr => $value:expr)* $(,)?) => {
        metrics::histogram!($def.name $(, $key => $value)*)
    };
}
