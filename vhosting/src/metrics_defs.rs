//! Metrics definitions for virtual hosting.

use metrics::Unit;
use shared::metrics_defs::{MetricDef, MetricType};

pub const RESOLVE_PASSTHROUGH: MetricDef = MetricDef {
    name: "vhosting.resolve.passthrough",
    metric_type: MetricType::Counter,
    unit: None,
    description: "Requests left untouched: no X-VHM-Url header, unknown origin or hosting inactive",
};

pub const RESOLVE_APPLIED: MetricDef = MetricDef {
    name: "vhosting.resolve.applied",
    metric_type: MetricType::Counter,
    unit: None,
    description: "Requests rewritten by a virtual host rule",
};

pub const RESOLVE_UNROUTABLE: MetricDef = MetricDef {
    name: "vhosting.resolve.unroutable",
    metric_type: MetricType::Counter,
    unit: None,
    description: "Requests for a known virtual host that no rule matches",
};

pub const RESOLVE_FELL_BACK_TO_ROOT: MetricDef = MetricDef {
    name: "vhosting.resolve.fell_back_to_root",
    metric_type: MetricType::Counter,
    unit: None,
    description: "Rewrites whose internal path no longer resolves and that used the application root",
};

pub const SKIN_MISSING: MetricDef = MetricDef {
    name: "vhosting.skin.missing",
    metric_type: MetricType::Counter,
    unit: None,
    description: "Rules naming a skin that is not installed",
};

pub const REGISTRY_REBUILD_SUCCESS: MetricDef = MetricDef {
    name: "vhosting.registry.rebuild.success",
    metric_type: MetricType::Counter,
    unit: None,
    description: "Configuration changes applied to the host registry",
};

pub const REGISTRY_REBUILD_FAILURE: MetricDef = MetricDef {
    name: "vhosting.registry.rebuild.failure",
    metric_type: MetricType::Counter,
    unit: None,
    description: "Configuration changes rejected by the host registry",
};

pub const REGISTRY_REBUILD_DURATION: MetricDef = MetricDef {
    name: "vhosting.registry.rebuild.duration",
    metric_type: MetricType::Histogram,
    unit: Some(Unit::Seconds),
    description: "Time to build and validate the host registry in seconds",
};

pub const REGISTRY_HOSTS: MetricDef = MetricDef {
    name: "vhosting.registry.hosts",
    metric_type: MetricType::Gauge,
    unit: None,
    description: "Number of virtual hosts in the active registry",
};

pub const REGISTRY_ORIGINS: MetricDef = MetricDef {
    name: "vhosting.registry.origins",
    metric_type: MetricType::Gauge,
    unit: None,
    description: "Number of origins (canonical and aliases) in the active registry",
};

pub const ALL_METRICS: &[MetricDef] = &[
    RESOLVE_PASSTHROUGH,
    RESOLVE_APPLIED,
    RESOLVE_UNROUTABLE,
    RESOLVE_FELL_BACK_TO_ROOT,
    SKIN_MISSING,
    REGISTRY_REBUILD_SUCCESS,
    REGISTRY_REBUILD_FAILURE,
    REGISTRY_REBUILD_DURATION,
    REGISTRY_HOSTS,
    REGISTRY_ORIGINS,
];
