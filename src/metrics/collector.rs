//! Named accumulators for per-batch metric values.

use std::collections::BTreeMap;

/// Collects metric values by name and reduces them to means.
#[derive(Debug, Clone, Default)]
pub struct MetricCollector {
    values: BTreeMap<String, Vec<f32>>,
}

impl MetricCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, value: f32) {
        self.values.entry(name.into()).or_default().push(value);
    }

    /// Values recorded under `name`, in insertion order.
    pub fn get(&self, name: &str) -> Option<&[f32]> {
        self.values.get(name).map(Vec::as_slice)
    }

    /// Mean of the values recorded under `name`.
    pub fn mean(&self, name: &str) -> Option<f32> {
        self.values.get(name).and_then(|v| mean_of(v))
    }

    /// Means of every metric, keyed by name.
    pub fn means(&self) -> BTreeMap<String, f32> {
        self.values
            .iter()
            .filter_map(|(name, v)| mean_of(v).map(|m| (name.clone(), m)))
            .collect()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Appends all values of `other`.
    pub fn merge(&mut self, other: MetricCollector) {
        for (name, values) in other.values {
            self.values.entry(name).or_default().extend(values);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn mean_of(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f32>() / values.len() as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_means() {
        let mut collector = MetricCollector::new();
        collector.add("segm_loss", 1.0);
        collector.add("segm_loss", 3.0);
        collector.add("metric_iou", 0.5);

        assert_eq!(collector.mean("segm_loss"), Some(2.0));
        assert_eq!(collector.mean("missing"), None);
        assert_eq!(
            collector.keys().collect::<Vec<_>>(),
            vec!["metric_iou", "segm_loss"]
        );

        let means = collector.means();
        assert_eq!(means.len(), 2);
        assert_eq!(means["metric_iou"], 0.5);
    }

    #[test]
    fn test_collector_merge() {
        let mut a = MetricCollector::new();
        a.add("x", 1.0);
        let mut b = MetricCollector::new();
        b.add("x", 2.0);
        b.add("y", 4.0);

        a.merge(b);
        assert_eq!(a.get("x"), Some(&[1.0, 2.0][..]));
        assert_eq!(a.mean("y"), Some(4.0));
    }
}
