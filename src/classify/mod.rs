//! Heuristic target classification by size and hovering behavior.

mod classifier;

pub use classifier::{
    BehaviorClassifier, ClassifiedDetection, ConfidenceTier, HoverAnalysis, SizeClass,
    analyze_hover,
};
