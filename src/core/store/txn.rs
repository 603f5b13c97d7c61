//! Optimistic-commit combinators.
//!
//! Every mutating action follows the same shape: swap the mutated collection
//! into place so readers see it immediately, await the backend call, and put
//! the snapshot back if persistence failed. These helpers capture that shape
//! once instead of hand-rolling it per entity type.

use std::future::Future;
use std::mem;

/// Replace `slot` with `next`, await `persist`, restore the old value on
/// failure. The snapshot covers exactly one collection.
pub(crate) async fn commit<T, F>(slot: &mut T, next: T, persist: F) -> anyhow::Result<()>
where
    F: Future<Output = anyhow::Result<()>>,
{
    let snapshot = mem::replace(slot, next);
    if let Err(err) = persist.await {
        *slot = snapshot;
        return Err(err);
    }
    Ok(())
}

/// Two-collection variant for mutations that touch a pair of collections
/// (bucket moves). Both snapshots are restored together, so a failure can
/// never leave the pair half-updated.
pub(crate) async fn commit2<A, B, F>(
    slot_a: &mut A,
    next_a: A,
    slot_b: &mut B,
    next_b: B,
    persist: F,
) -> anyhow::Result<()>
where
    F: Future<Output = anyhow::Result<()>>,
{
    let snapshot_a = mem::replace(slot_a, next_a);
    let snapshot_b = mem::replace(slot_b, next_b);
    if let Err(err) = persist.await {
        *slot_a = snapshot_a;
        *slot_b = snapshot_b;
        return Err(err);
    }
    Ok(())
}

/// Variant for backend calls that report success as a boolean (deletes).
pub(crate) async fn commit_checked<T, F>(slot: &mut T, next: T, persist: F) -> bool
where
    F: Future<Output = bool>,
{
    let snapshot = mem::replace(slot, next);
    if persist.await {
        true
    } else {
        *slot = snapshot;
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn commit_keeps_next_on_success() {
        let mut slot = vec![1];
        commit(&mut slot, vec![1, 2], async { Ok(()) }).await.unwrap();
        assert_eq!(slot, vec![1, 2]);
    }

    #[tokio::test]
    async fn commit_restores_snapshot_on_failure() {
        let mut slot = vec![1];
        let result = commit(&mut slot, vec![1, 2], async {
            anyhow::bail!("disk on fire")
        })
        .await;
        assert!(result.is_err());
        assert_eq!(slot, vec![1]);
    }

    #[tokio::test]
    async fn commit2_restores_both_on_failure() {
        let mut a = vec!["x"];
        let mut b = vec!["y"];
        let result = commit2(&mut a, vec![], &mut b, vec!["y", "x"], async {
            anyhow::bail!("no")
        })
        .await;
        assert!(result.is_err());
        assert_eq!(a, vec!["x"]);
        assert_eq!(b, vec!["y"]);
    }

    #[tokio::test]
    async fn commit_checked_restores_on_false() {
        let mut slot = 1u32;
        assert!(!commit_checked(&mut slot, 2, async { false }).await);
        assert_eq!(slot, 1);
        assert!(commit_checked(&mut slot, 2, async { true }).await);
        assert_eq!(slot, 2);
    }
}
