// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Gateway behavior against namespaces that fail or stall on purpose

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tinyns::{DirectoryListing, MemoryNamespace, Namespace, Node, Permission};
use tokio::sync::Notify;
use upcall::{Error, Gateway, OpNum, ReadIsolation, Reply, Request, ServerConfig, Upcalls};

/// Delegates to a `MemoryNamespace` unless told to fail.
#[derive(Default)]
struct FailingNamespace {
    inner: MemoryNamespace,
    fail_mkdirs: AtomicBool,
    fail_delete: AtomicBool,
    fail_restore: AtomicBool,
}

#[async_trait]
impl Namespace for FailingNamespace {
    async fn get_listing(
        &self,
        path: &Path,
        start_after: &[u8],
        need_location: bool,
    ) -> tinyns::Result<DirectoryListing> {
        self.inner.get_listing(path, start_after, need_location).await
    }

    async fn mkdirs(
        &self,
        path: &Path,
        permission: Permission,
        create_parents: bool,
    ) -> tinyns::Result<bool> {
        if self.fail_mkdirs.load(Ordering::SeqCst) {
            return Err(tinyns::Error::invalid_path(path));
        }
        self.inner.mkdirs(path, permission, create_parents).await
    }

    async fn delete(&self, path: &Path, recursive: bool) -> tinyns::Result<bool> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(tinyns::Error::directory_not_empty(path));
        }
        self.inner.delete(path, recursive).await
    }

    async fn missing_segments(&self, path: &Path) -> tinyns::Result<Vec<PathBuf>> {
        self.inner.missing_segments(path).await
    }

    async fn snapshot(&self, path: &Path) -> tinyns::Result<Option<Node>> {
        self.inner.snapshot(path).await
    }

    async fn remove_empty_dir(&self, path: &Path) -> tinyns::Result<()> {
        self.inner.remove_empty_dir(path).await
    }

    async fn restore(&self, path: &Path, node: Node) -> tinyns::Result<()> {
        if self.fail_restore.load(Ordering::SeqCst) {
            return Err(tinyns::Error::already_exists(path));
        }
        self.inner.restore(path, node).await
    }
}

/// Parks every mkdirs until released.
#[derive(Default)]
struct GatedNamespace {
    inner: MemoryNamespace,
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl Namespace for GatedNamespace {
    async fn get_listing(
        &self,
        path: &Path,
        start_after: &[u8],
        need_location: bool,
    ) -> tinyns::Result<DirectoryListing> {
        self.inner.get_listing(path, start_after, need_location).await
    }

    async fn mkdirs(
        &self,
        path: &Path,
        permission: Permission,
        create_parents: bool,
    ) -> tinyns::Result<bool> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.mkdirs(path, permission, create_parents).await
    }

    async fn delete(&self, path: &Path, recursive: bool) -> tinyns::Result<bool> {
        self.inner.delete(path, recursive).await
    }

    async fn missing_segments(&self, path: &Path) -> tinyns::Result<Vec<PathBuf>> {
        self.inner.missing_segments(path).await
    }

    async fn snapshot(&self, path: &Path) -> tinyns::Result<Option<Node>> {
        self.inner.snapshot(path).await
    }

    async fn remove_empty_dir(&self, path: &Path) -> tinyns::Result<()> {
        self.inner.remove_empty_dir(path).await
    }

    async fn restore(&self, path: &Path, node: Node) -> tinyns::Result<()> {
        self.inner.restore(path, node).await
    }
}

async fn replica(gw: &Gateway, opnum: i64, request: &Request) -> Reply {
    let raw = request.encode().unwrap();
    Reply::decode(&gw.replica_upcall(opnum, &raw).await).unwrap()
}

#[tokio::test]
async fn test_failed_mkdirs_leaves_no_record() {
    let ns = Arc::new(FailingNamespace::default());
    let gw = Gateway::new(ns.clone());

    assert_eq!(
        replica(&gw, 1, &Request::mkdir("/ok", 0o755, false)).await,
        Reply::Success(true)
    );

    ns.fail_mkdirs.store(true, Ordering::SeqCst);
    let reply = replica(&gw, 2, &Request::mkdir("/bad/deep", 0o755, true)).await;
    assert!(matches!(reply, Reply::Exception(_)));
    assert_eq!(gw.pending().await, vec![OpNum::new(1)]);

    // The failed opnum was never logged, so it can be retried.
    ns.fail_mkdirs.store(false, Ordering::SeqCst);
    assert_eq!(
        replica(&gw, 2, &Request::mkdir("/bad/deep", 0o755, true)).await,
        Reply::Success(true)
    );

    gw.rollback_upcall(2, 1).await.unwrap();
    assert!(!ns.inner.exists("/ok").await);
    assert!(!ns.inner.exists("/bad").await);
}

#[tokio::test]
async fn test_failed_delete_leaves_no_record() {
    let ns = Arc::new(FailingNamespace::default());
    let gw = Gateway::new(ns.clone());
    ns.inner.mkdirs(Path::new("/keep"), 0o755, false).await.unwrap();

    ns.fail_delete.store(true, Ordering::SeqCst);
    let reply = replica(&gw, 1, &Request::remove("/keep", true)).await;
    assert!(matches!(reply, Reply::Exception(_)));
    assert!(gw.pending().await.is_empty());
    assert!(ns.inner.exists("/keep").await);
}

#[tokio::test]
async fn test_failed_undo_keeps_record() {
    let ns = Arc::new(FailingNamespace::default());
    let gw = Gateway::new(ns.clone());
    ns.inner.mkdirs(Path::new("/victim"), 0o700, false).await.unwrap();
    let before = ns.inner.tree().await;

    assert_eq!(
        replica(&gw, 1, &Request::mkdir("/new", 0o755, false)).await,
        Reply::Success(true)
    );
    assert_eq!(
        replica(&gw, 2, &Request::remove("/victim", false)).await,
        Reply::Success(true)
    );
    assert_eq!(
        replica(&gw, 3, &Request::mkdir("/later", 0o755, false)).await,
        Reply::Success(true)
    );

    ns.fail_restore.store(true, Ordering::SeqCst);
    let err = gw
        .handle_rollback(OpNum::new(3), OpNum::new(1))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Undo { opnum, .. } if opnum == OpNum::new(2)));
    // Operation 3 was undone; 2 and everything older stay.
    assert_eq!(gw.pending().await, vec![OpNum::new(1), OpNum::new(2)]);
    assert!(!ns.inner.exists("/later").await);

    // The transport-facing entry point reports the same failure.
    assert!(gw.rollback_upcall(2, 1).await.is_err());

    ns.fail_restore.store(false, Ordering::SeqCst);
    gw.rollback_upcall(2, 1).await.unwrap();
    assert!(gw.pending().await.is_empty());
    assert_eq!(ns.inner.tree().await, before);
}

#[tokio::test]
async fn test_shared_listing_does_not_wait_for_writer() {
    let ns = Arc::new(GatedNamespace::default());
    let gw = Arc::new(Gateway::new(ns.clone()));

    let writer = {
        let gw = gw.clone();
        tokio::spawn(async move { replica(&gw, 1, &Request::mkdir("/w", 0o755, false)).await })
    };
    ns.entered.notified().await;

    // The write is parked inside the namespace, holding the write lock.
    let reply = tokio::time::timeout(
        Duration::from_secs(5),
        replica(&gw, 2, &Request::list("/", b"", false)),
    )
    .await
    .unwrap();
    let listing = reply.listing().unwrap().unwrap();
    assert!(listing.partial_listing.is_empty());

    ns.release.notify_one();
    assert_eq!(writer.await.unwrap(), Reply::Success(true));
}

#[tokio::test]
async fn test_exclusive_listing_waits_for_writer() {
    let ns = Arc::new(GatedNamespace::default());
    let config = ServerConfig {
        read_isolation: ReadIsolation::Exclusive,
        ..ServerConfig::default()
    };
    let gw = Arc::new(Gateway::with_config(ns.clone(), config));

    let writer = {
        let gw = gw.clone();
        tokio::spawn(async move { replica(&gw, 1, &Request::mkdir("/w", 0o755, false)).await })
    };
    ns.entered.notified().await;

    let mut reader = {
        let gw = gw.clone();
        tokio::spawn(async move { replica(&gw, 2, &Request::list("/", b"", false)).await })
    };
    assert!(
        tokio::time::timeout(Duration::from_millis(50), &mut reader)
            .await
            .is_err()
    );

    ns.release.notify_one();
    assert_eq!(writer.await.unwrap(), Reply::Success(true));

    let listing = reader.await.unwrap().listing().unwrap().unwrap();
    assert_eq!(listing.partial_listing.len(), 1);
    assert_eq!(listing.partial_listing[0].name, "w");
}
