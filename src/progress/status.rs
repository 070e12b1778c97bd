use crate::hierarchy::NodeStatus;

/// Roll child statuses up into one parent status.
///
/// Precedence, first match wins: blocked, failed, all completed,
/// any in progress, pending. An empty list is pending.
pub fn determine_status(children: &[NodeStatus]) -> NodeStatus {
    if children.is_empty() {
        return NodeStatus::Pending;
    }
    if children.contains(&NodeStatus::Blocked) {
        NodeStatus::Blocked
    } else if children.contains(&NodeStatus::Failed) {
        NodeStatus::Failed
    } else if children.iter().all(|s| *s == NodeStatus::Completed) {
        NodeStatus::Completed
    } else if children.contains(&NodeStatus::InProgress) {
        NodeStatus::InProgress
    } else {
        NodeStatus::Pending
    }
}

/// Round a mean completion to a percentage.
///
/// 100 is reserved for finished work: while anything is unfinished the
/// result is capped at 99.
pub fn rounded_completion(mean: f64, finished: bool) -> u8 {
    let rounded = mean.round().clamp(0.0, 100.0) as u8;
    if finished {
        rounded
    } else {
        rounded.min(99)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use NodeStatus::*;

    const ALL: [NodeStatus; 5] = [Pending, InProgress, Completed, Blocked, Failed];

    fn expected(statuses: &[NodeStatus]) -> NodeStatus {
        if statuses.contains(&Blocked) {
            Blocked
        } else if statuses.contains(&Failed) {
            Failed
        } else if statuses.iter().all(|s| *s == Completed) {
            Completed
        } else if statuses.contains(&InProgress) {
            InProgress
        } else {
            Pending
        }
    }

    #[test]
    fn test_empty_is_pending() {
        assert_eq!(determine_status(&[]), Pending);
    }

    #[test]
    fn test_precedence() {
        assert_eq!(determine_status(&[Completed, Failed, Blocked]), Blocked);
        assert_eq!(determine_status(&[Completed, Failed, InProgress]), Failed);
        assert_eq!(determine_status(&[Completed, Completed]), Completed);
        assert_eq!(determine_status(&[Completed, Pending, InProgress]), InProgress);
        assert_eq!(determine_status(&[Completed, Pending]), Pending);
    }

    #[test]
    fn test_every_pair_and_triple_is_order_independent() {
        for a in ALL {
            for b in ALL {
                assert_eq!(determine_status(&[a, b]), determine_status(&[b, a]));
                assert_eq!(determine_status(&[a, b]), expected(&[a, b]));
                for c in ALL {
                    let forward = determine_status(&[a, b, c]);
                    assert_eq!(forward, determine_status(&[c, a, b]));
                    assert_eq!(forward, determine_status(&[b, c, a]));
                    assert_eq!(forward, expected(&[a, b, c]));
                }
            }
        }
    }

    #[test]
    fn test_rounded_completion_reserves_100() {
        assert_eq!(rounded_completion(99.5, false), 99);
        assert_eq!(rounded_completion(99.5, true), 100);
        assert_eq!(rounded_completion(66.6, false), 67);
        assert_eq!(rounded_completion(100.0, true), 100);
    }
}
