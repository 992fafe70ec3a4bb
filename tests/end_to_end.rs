//! End-to-end scenarios through the ShardTx facade

use shardtx::{CommitOutcome, Error, ShardTx, TransactionStatus, Value};

/// The canonical lifecycle: commit, snapshot reads, a stale writer losing
/// to a later committer, and the final state becoming visible.
#[test]
fn versioned_write_read_conflict_scenario() {
    let db = ShardTx::in_memory(["s"]);

    // 1. T1 creates "x"
    let t1 = db.begin().unwrap();
    db.write(t1, "s", "x", Value::from("v1")).unwrap();
    assert!(db.commit(t1).unwrap().is_committed());

    // 2. T2 sees the committed value
    let t2 = db.begin().unwrap();
    assert_eq!(db.read(t2, "s", "x").unwrap(), Some(Value::from("v1")));

    // 3. T3 reads "x" and stages (but does not commit) an update
    let t3 = db.begin().unwrap();
    assert_eq!(db.read(t3, "s", "x").unwrap(), Some(Value::from("v1")));
    db.write(t3, "s", "x", Value::from("v2")).unwrap();

    // 4. T4 overwrites "x" and commits first
    let t4 = db.begin().unwrap();
    db.write(t4, "s", "x", Value::from("v3")).unwrap();
    assert!(db.commit(t4).unwrap().is_committed());

    // 5. T3's baseline for "x" is now stale; its commit aborts
    match db.commit(t3).unwrap() {
        CommitOutcome::Aborted(validation) => assert_eq!(validation.conflict_count(), 1),
        CommitOutcome::Committed { .. } => panic!("T3 must abort"),
    }

    // 6. A fresh transaction sees T4's value
    let t5 = db.begin().unwrap();
    assert_eq!(db.read(t5, "s", "x").unwrap(), Some(Value::from("v3")));
}

#[test]
fn cross_shard_transfer_is_atomic() {
    let db = ShardTx::in_memory(["accounts_a", "accounts_b"]);

    let seed = db.begin().unwrap();
    db.write(seed, "accounts_a", "alice", Value::from("100")).unwrap();
    db.write(seed, "accounts_b", "bob", Value::from("0")).unwrap();
    db.commit(seed).unwrap();

    // Transfer 40 from alice to bob in one transaction
    let t = db.begin().unwrap();
    db.write(t, "accounts_a", "alice", Value::from("60")).unwrap();
    db.write(t, "accounts_b", "bob", Value::from("40")).unwrap();
    assert!(db.commit(t).unwrap().is_committed());

    let check = db.begin().unwrap();
    assert_eq!(
        db.read(check, "accounts_a", "alice").unwrap(),
        Some(Value::from("60"))
    );
    assert_eq!(
        db.read(check, "accounts_b", "bob").unwrap(),
        Some(Value::from("40"))
    );
}

#[test]
fn rollback_then_status_and_purge() {
    let db = ShardTx::in_memory(["s"]);

    let t = db.begin().unwrap();
    db.write(t, "s", "x", Value::from("v")).unwrap();
    db.rollback(t).unwrap();

    assert!(matches!(
        db.manager().status(t).unwrap(),
        TransactionStatus::Aborted { .. }
    ));
    assert!(matches!(
        db.rollback(t).unwrap_err(),
        Error::InvalidState { .. }
    ));

    assert_eq!(db.manager().purge_finished(), 1);
    assert!(matches!(
        db.manager().status(t).unwrap_err(),
        Error::TransactionNotFound(_)
    ));
}

#[test]
fn delete_creates_tombstone_not_absence() {
    let db = ShardTx::in_memory(["s"]);

    let t1 = db.begin().unwrap();
    db.write(t1, "s", "x", Value::from("v1")).unwrap();
    db.commit(t1).unwrap();

    // An old snapshot taken before the delete keeps seeing the value
    let old = db.begin().unwrap();

    let t2 = db.begin().unwrap();
    db.delete(t2, "s", "x").unwrap();
    db.commit(t2).unwrap();

    assert_eq!(db.read(old, "s", "x").unwrap(), Some(Value::from("v1")));

    // Re-creating after the tombstone works and conflicts correctly
    let t3 = db.begin().unwrap();
    assert_eq!(db.read(t3, "s", "x").unwrap(), None);
    db.write(t3, "s", "x", Value::from("v2")).unwrap();
    assert!(db.commit(t3).unwrap().is_committed());

    let fresh = db.begin().unwrap();
    assert_eq!(db.read(fresh, "s", "x").unwrap(), Some(Value::from("v2")));
}
