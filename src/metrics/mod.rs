//! Metrics for scoring segmentation and region classification against ground
//! truth.

pub mod accuracy;
pub mod average_precision;
pub mod collector;
pub mod iou;
pub mod loss;

pub use accuracy::{accuracy, found_fraction, region_accuracy};
pub use average_precision::{
    BoundingBoxes, ClassMetrics, DetectedBox, GroundTruthBox, mean_ap, voc_metrics,
};
pub use collector::MetricCollector;
pub use iou::{mask_iou, threshold_iou, thresholded_iou};
pub use loss::{bce_with_logits, cross_entropy};
