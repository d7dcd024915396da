//! Metric names emitted by the pipeline.
//!
//! Metrics go through the `metrics` facade; nothing is recorded unless the
//! host process installs a recorder (the demo site installs the Prometheus
//! exporter). Call [`describe_metrics`] once after installing it.

use metrics::{describe_counter, describe_histogram, Unit};

/// Pages that went through enrichment and rendering successfully.
pub const PAGES_RENDERED: &str = "pageflow_pages_rendered_total";

/// Interceptions that failed, labelled by `kind`.
pub const RENDER_FAILURES: &str = "pageflow_render_failures_total";

/// Time spent enriching and rendering one page.
pub const RENDER_DURATION: &str = "pageflow_render_duration_seconds";

/// Navigation resolutions that fell back to the default entry.
pub const NAVIGATION_FALLBACKS: &str = "pageflow_navigation_fallbacks_total";

/// Register descriptions for all pipeline metrics.
pub fn describe_metrics() {
    describe_counter!(
        PAGES_RENDERED,
        "Total number of pages enriched and rendered"
    );
    describe_counter!(
        RENDER_FAILURES,
        "Total number of page interceptions that failed, by failure kind"
    );
    describe_histogram!(
        RENDER_DURATION,
        Unit::Seconds,
        "Time from page detection to rendered bytes"
    );
    describe_counter!(
        NAVIGATION_FALLBACKS,
        "Total number of navigation resolutions that used the fallback entry"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_without_recorder() {
        // No recorder installed: describing is a no-op and must not panic.
        describe_metrics();
    }

    #[test]
    fn test_duration_metric_uses_seconds_suffix() {
        assert!(RENDER_DURATION.ends_with("duration_seconds"));
    }
}
