use std::collections::BTreeSet;

use crate::types::LabelDetection;

/// Collect the deny-listed labels seen across all frames, deduplicated.
/// A label counts on an exact name match; confidence scores are ignored.
pub fn filter_forbidden_objects<'a, I>(per_frame_labels: I, forbidden: &[String]) -> Vec<String>
where
    I: IntoIterator<Item = &'a [LabelDetection]>,
{
    let mut seen = BTreeSet::new();
    for labels in per_frame_labels {
        for label in labels {
            if forbidden.iter().any(|f| f == &label.name) {
                seen.insert(label.name.clone());
            }
        }
    }
    seen.into_iter().collect()
}
