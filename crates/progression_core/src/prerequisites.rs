//! crates/progression_core/src/prerequisites.rs
//!
//! Guards the single-parent prerequisite forests of quizzes and modules and
//! resolves whether a subject is locked for a student.

use std::collections::HashSet;
use std::future::Future;
use uuid::Uuid;

/// Longest prerequisite chain the walk will follow before giving up.
pub const DEFAULT_MAX_DEPTH: usize = 50;

/// Returns whether pointing `subject` at `candidate` would break the forest.
///
/// Walks the chain upwards from `candidate` through `parent_of`. Fails closed:
/// reaching `subject`, revisiting any node, or following more than
/// `depth_limit` links all count as a cycle. A self-reference is rejected
/// before any lookup.
pub fn has_cycle<F>(candidate: Uuid, subject: Uuid, depth_limit: usize, mut parent_of: F) -> bool
where
    F: FnMut(Uuid) -> Option<Uuid>,
{
    if candidate == subject {
        return true;
    }

    let mut visited = HashSet::new();
    let mut current = candidate;
    let mut depth = 0;

    loop {
        if current == subject || !visited.insert(current) {
            return true;
        }
        match parent_of(current) {
            None => return false,
            Some(parent) => {
                depth += 1;
                if depth > depth_limit {
                    return true;
                }
                current = parent;
            }
        }
    }
}

/// A subject is locked iff it declares a prerequisite the student has not completed.
///
/// Resolved on every read; the completion lookup is only awaited when there
/// is a prerequisite to check.
pub async fn is_locked<F, Fut, E>(prerequisite: Option<Uuid>, has_completed: F) -> Result<bool, E>
where
    F: FnOnce(Uuid) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    match prerequisite {
        None => Ok(false),
        Some(prerequisite_id) => Ok(!has_completed(prerequisite_id).await?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn chain(len: usize) -> (Vec<Uuid>, HashMap<Uuid, Uuid>) {
        let ids: Vec<Uuid> = (0..len).map(|_| Uuid::new_v4()).collect();
        let edges = ids.windows(2).map(|w| (w[1], w[0])).collect();
        (ids, edges)
    }

    #[test]
    fn closing_a_two_node_loop_is_rejected() {
        // B requires A; making A require B must fail.
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let edges = HashMap::from([(b, a)]);
        assert!(has_cycle(b, a, DEFAULT_MAX_DEPTH, |id| edges.get(&id).copied()));
        assert!(!has_cycle(a, b, DEFAULT_MAX_DEPTH, |id| edges.get(&id).copied()));
    }

    #[test]
    fn self_reference_is_rejected_without_walking() {
        let a = Uuid::new_v4();
        assert!(has_cycle(a, a, DEFAULT_MAX_DEPTH, |_| {
            panic!("self-reference must not trigger a lookup")
        }));
    }

    #[test]
    fn depth_limit_fails_closed() {
        let (ids, edges) = chain(52);
        let subject = Uuid::new_v4();
        let tail = *ids.last().unwrap();
        // 51 links above the candidate: one too many.
        assert!(has_cycle(tail, subject, DEFAULT_MAX_DEPTH, |id| edges.get(&id).copied()));
        // 50 links is still fine.
        let below = ids[50];
        assert!(!has_cycle(below, subject, DEFAULT_MAX_DEPTH, |id| edges.get(&id).copied()));
    }

    #[test]
    fn corrupted_loop_elsewhere_fails_closed() {
        let (x, y, subject) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let edges = HashMap::from([(x, y), (y, x)]);
        assert!(has_cycle(x, subject, 1_000, |id| edges.get(&id).copied()));
    }

    #[tokio::test]
    async fn lock_follows_completion() {
        let prereq = Uuid::new_v4();

        let free: Result<bool, ()> = is_locked(None, |_| async { Ok(false) }).await;
        assert_eq!(free, Ok(false));

        let locked: Result<bool, ()> = is_locked(Some(prereq), |_| async { Ok(false) }).await;
        assert_eq!(locked, Ok(true));

        let unlocked: Result<bool, ()> =
            is_locked(Some(prereq), |id| async move { Ok(id == prereq) }).await;
        assert_eq!(unlocked, Ok(false));
    }
}
