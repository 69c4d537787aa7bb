use crate::types::Pose;

/// Scan detected poses in frame order and return the attention verdict.
///
/// The session starts attentive and stays that way unless any single step
/// between consecutive detected poses drifts further than `threshold`. The
/// verdict is sticky: once a disqualifying jump is seen, later small steps
/// never restore it. Fewer than two detected poses leave the default in
/// place.
pub fn estimate_attention<I>(poses: I, threshold: f64) -> bool
where
    I: IntoIterator<Item = Pose>,
{
    let mut attentive = true;
    let mut previous: Option<Pose> = None;

    for pose in poses {
        if let Some(prev) = previous {
            if prev.drift(&pose) > threshold {
                attentive = false;
            }
        }
        previous = Some(pose);
    }

    attentive
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ATTENTION_DRIFT_THRESHOLD;

    fn pose(roll: f64, yaw: f64, pitch: f64) -> Pose {
        Pose { roll, yaw, pitch }
    }

    #[test]
    fn no_detected_faces_default_to_attentive() {
        assert!(estimate_attention(std::iter::empty::<Pose>(), ATTENTION_DRIFT_THRESHOLD));
    }

    #[test]
    fn a_single_pose_is_attentive() {
        assert!(estimate_attention(
            [pose(10.0, -5.0, 2.0)],
            ATTENTION_DRIFT_THRESHOLD
        ));
    }

    #[test]
    fn small_steps_stay_attentive() {
        let poses = [
            pose(0.0, 0.0, 0.0),
            pose(10.0, 5.0, 0.0),
            pose(20.0, 10.0, 5.0),
            pose(5.0, 0.0, 0.0),
        ];
        assert!(estimate_attention(poses, ATTENTION_DRIFT_THRESHOLD));
    }

    #[test]
    fn one_large_jump_is_inattentive_and_sticky() {
        let poses = [
            pose(0.0, 0.0, 0.0),
            pose(0.0, 45.0, 0.0),
            // small step afterwards must not restore the verdict
            pose(1.0, 46.0, 0.0),
        ];
        assert!(!estimate_attention(poses, ATTENTION_DRIFT_THRESHOLD));
    }

    #[test]
    fn a_step_exactly_at_the_threshold_is_attentive() {
        let poses = [pose(0.0, 0.0, 0.0), pose(30.0, 0.0, 0.0)];
        assert!(estimate_attention(poses, ATTENTION_DRIFT_THRESHOLD));
    }
}
