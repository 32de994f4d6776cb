//! Change propagation across and within execution contexts

use docket_model::DocVersion;
use docket_store::{
    AggregateLoader, ChangeBus, DocumentStore, DocumentWriter, MemoryMedium, MemoryStore,
    NoticeOrigin, Role, DEFAULT_CATALOG_KEY,
};
use docket_test_utils::{april_2025, create_catalog, seed_store, ATLAS_ID};
use docket_view::{Reconciler, ViewPhase};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

struct Tab {
    store: Arc<MemoryStore>,
    bus: ChangeBus,
    reconciler: Arc<Reconciler>,
}

async fn open_tab(medium: &MemoryMedium) -> Tab {
    let store = Arc::new(medium.open_context());
    let bus = ChangeBus::new(16);
    let loader = AggregateLoader::new(store.clone(), DEFAULT_CATALOG_KEY);
    let reconciler = Arc::new(Reconciler::new(loader, april_2025()));
    reconciler.mount(ATLAS_ID).await.unwrap();
    let _listener = reconciler.listen(bus.subscribe(store.as_ref()));
    Tab {
        store,
        bus,
        reconciler,
    }
}

fn goal_version(phase: &ViewPhase) -> Option<DocVersion> {
    phase
        .state()
        .and_then(|s| s.release_goal.as_ref())
        .map(|g| g.version.clone())
}

async fn wait_for_goal_version(phases: &mut watch::Receiver<ViewPhase>, version: u64) {
    let expected = DocVersion::from_major(version);
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if goal_version(&phases.borrow_and_update()) == Some(expected.clone()) {
                return;
            }
            phases.changed().await.unwrap();
        }
    })
    .await
    .expect("view never showed the expected goal version");
}

#[tokio::test]
async fn write_in_one_tab_reaches_both_tabs() {
    let medium = MemoryMedium::default();
    seed_store(&medium.open_context(), &create_catalog()).await;

    let tab_a = open_tab(&medium).await;
    let tab_b = open_tab(&medium).await;
    assert_eq!(goal_version(&tab_a.reconciler.phase()), Some(DocVersion::from_major(2)));
    assert_eq!(goal_version(&tab_b.reconciler.phase()), Some(DocVersion::from_major(2)));

    let mut phases_a = tab_a.reconciler.subscribe();
    let mut phases_b = tab_b.reconciler.subscribe();

    let writer = DocumentWriter::new(tab_a.store.clone(), tab_a.bus.clone(), Role::Editor);
    let published = writer
        .publish_release_goal(ATLAS_ID, april_2025(), Vec::new())
        .await
        .unwrap();
    assert_eq!(published.version, DocVersion::from_major(3));

    wait_for_goal_version(&mut phases_a, 3).await;
    wait_for_goal_version(&mut phases_b, 3).await;
}

#[tokio::test]
async fn write_landing_before_listen_is_not_missed() {
    let medium = MemoryMedium::default();
    seed_store(&medium.open_context(), &create_catalog()).await;

    let tab_a = Arc::new(medium.open_context());
    let tab_b = Arc::new(medium.open_context());
    let bus_b = ChangeBus::new(16);
    let reconciler = Arc::new(Reconciler::new(
        AggregateLoader::new(tab_b.clone(), DEFAULT_CATALOG_KEY),
        april_2025(),
    ));
    reconciler.mount(ATLAS_ID).await.unwrap();

    // after tab B's mount read, before it subscribes
    let writer = DocumentWriter::new(tab_a, ChangeBus::default(), Role::Editor);
    writer
        .publish_release_goal(ATLAS_ID, april_2025(), Vec::new())
        .await
        .unwrap();
    assert_eq!(goal_version(&reconciler.phase()), Some(DocVersion::from_major(2)));

    let mut phases = reconciler.subscribe();
    let _listener = reconciler.listen(bus_b.subscribe(tab_b.as_ref()));
    wait_for_goal_version(&mut phases, 3).await;
}

#[tokio::test]
async fn writer_tab_is_notified_in_context_only() {
    let medium = MemoryMedium::default();
    seed_store(&medium.open_context(), &create_catalog()).await;

    let tab_a = Arc::new(medium.open_context());
    let bus_a = ChangeBus::new(16);
    let mut notices = bus_a.subscribe(tab_a.as_ref());
    let mut cross = tab_a.watch();

    let writer = DocumentWriter::new(tab_a.clone(), bus_a.clone(), Role::Editor);
    writer
        .publish_release_note(ATLAS_ID, april_2025(), "https://notes/v2")
        .await
        .unwrap();

    let notice = notices.recv().await.unwrap();
    assert_eq!(notice.origin, NoticeOrigin::InContext);
    assert_eq!(notice.product_id.as_deref(), Some(ATLAS_ID));

    // own write never echoes on the cross-context channel
    let echo = tokio::time::timeout(Duration::from_millis(50), cross.recv()).await;
    assert!(echo.is_err());
}

#[tokio::test]
async fn unannounced_write_is_seen_on_next_refresh() {
    let medium = MemoryMedium::default();
    let seed = medium.open_context();
    seed_store(&seed, &create_catalog()).await;

    let store = Arc::new(medium.open_context());
    let reconciler = Reconciler::new(
        AggregateLoader::new(store.clone(), DEFAULT_CATALOG_KEY),
        april_2025(),
    );
    reconciler.mount(ATLAS_ID).await.unwrap();

    // another context rewrites the catalog without telling anyone
    let before = store.revision(DEFAULT_CATALOG_KEY).await.unwrap();
    let writer = DocumentWriter::new(Arc::new(seed), ChangeBus::default(), Role::Editor);
    writer
        .publish_release_goal(ATLAS_ID, april_2025(), Vec::new())
        .await
        .unwrap();
    assert!(store.revision(DEFAULT_CATALOG_KEY).await.unwrap() > before);

    reconciler.refresh().await.unwrap();
    assert_eq!(goal_version(&reconciler.phase()), Some(DocVersion::from_major(3)));
}
