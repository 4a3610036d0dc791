use pvault_database::*;
use pvault_domain::config::DatabaseConfig;
use pvault_domain::records::{AuditKind, AuditRecord, ProviderRecord, VaultEntry};
use std::sync::Arc;

const DAY: i64 = 86_400;

fn provider(sid: i64) -> ProviderRecord {
    ProviderRecord {
        sid,
        password: format!("secret-{sid}"),
        allowed_ip: "127.0.0.1".to_owned(),
        name: format!("provider {sid}"),
        description: String::new(),
        creation_date: 0,
    }
}

fn entry(vid: char, sid: i64, created: i64, duration: i64) -> VaultEntry {
    VaultEntry {
        vid: vid.to_string().repeat(32),
        payload: format!("payload-{vid}"),
        provider_id: sid,
        creation_date: created,
        duration,
    }
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| (*w).to_owned()).collect()
}

async fn surreal_db() -> Database {
    Database::builder()
        .url("mem://")
        .session("test_ns", "test_db")
        .init()
        .await
        .expect("connect to mem://")
}

async fn surreal() -> Arc<dyn VaultRepository> {
    Arc::new(SurrealRepository::new(surreal_db().await, 4))
}

fn memory() -> Arc<dyn VaultRepository> {
    Arc::new(MemoryRepository::new())
}

async fn providers_roundtrip(repo: Arc<dyn VaultRepository>) {
    repo.save_provider(provider(1)).await.unwrap();
    repo.save_provider(provider(2)).await.unwrap();

    let mut changed = provider(1);
    changed.password = "rotated".to_owned();
    repo.save_provider(changed).await.unwrap();

    let found = repo.find_provider(1).await.unwrap().expect("provider 1");
    assert_eq!(found.password, "rotated");
    assert_eq!(repo.list_providers().await.unwrap().len(), 2);

    assert!(repo.remove_provider(2).await.unwrap());
    assert!(!repo.remove_provider(2).await.unwrap());
    assert!(repo.find_provider(2).await.unwrap().is_none());
}

async fn entries_roundtrip(repo: Arc<dyn VaultRepository>) {
    let a = entry('a', 1, 0, 0);
    let vid_a = a.vid.clone();
    assert_eq!(
        repo.insert_entry(a.clone(), words(&["ab12cd", "ef"])).await.unwrap(),
        InsertOutcome::Stored
    );
    assert_eq!(repo.insert_entry(a, Vec::new()).await.unwrap(), InsertOutcome::Collision);

    let b = entry('b', 2, 0, 0);
    let vid_b = b.vid.clone();
    repo.insert_entry(b, words(&["ab12cd"])).await.unwrap();

    assert_eq!(repo.search(1, &words(&["ab12"])).await.unwrap(), vec![vid_a.clone()]);
    assert_eq!(repo.search(1, &words(&["ab", "ef"])).await.unwrap(), vec![vid_a.clone()]);
    assert!(repo.search(1, &words(&["ab", "zz"])).await.unwrap().is_empty());

    let both = vec![vid_a.clone(), vid_b.clone()];
    let private = repo.fetch_private(1, &both).await.unwrap();
    assert_eq!(private, vec![(vid_a.clone(), "payload-a".to_owned())]);
    assert!(repo.fetch_published(&both).await.unwrap().is_empty());

    assert_eq!(repo.entry_meta(&vid_a, 1).await.unwrap().map(|m| m.duration), Some(0));
    assert!(repo.entry_meta(&vid_a, 2).await.unwrap().is_none());

    assert!(repo.replace_entry(1, &vid_a, "fresh".to_owned(), words(&["99aa"])).await.unwrap());
    assert!(repo.search(1, &words(&["ab"])).await.unwrap().is_empty());
    assert_eq!(repo.search(1, &words(&["99"])).await.unwrap(), vec![vid_a.clone()]);

    assert_eq!(repo.delete_entries(1, &both).await.unwrap(), 1);
    assert!(repo.fetch_private(1, &both).await.unwrap().is_empty());
    assert_eq!(repo.fetch_private(2, &both).await.unwrap().len(), 1);
    assert!(repo.search(1, &words(&["99"])).await.unwrap().is_empty());
    assert_eq!(repo.search(2, &words(&["ab12"])).await.unwrap(), vec![vid_b]);
}

/// A replace racing a delete must not resurrect words for a vanished entry.
async fn replace_after_delete(repo: Arc<dyn VaultRepository>) -> String {
    let gone = entry('d', 1, 0, 0);
    let vid = gone.vid.clone();
    repo.insert_entry(gone, words(&["1234"])).await.unwrap();
    assert_eq!(repo.delete_entries(1, &[vid.clone()]).await.unwrap(), 1);

    assert!(!repo.replace_entry(1, &vid, "new".to_owned(), words(&["abcd"])).await.unwrap());
    assert!(repo.fetch_private(1, &[vid.clone()]).await.unwrap().is_empty());
    assert!(repo.search(1, &words(&["abcd"])).await.unwrap().is_empty());

    let foreign = entry('e', 2, 0, 0);
    let foreign_vid = foreign.vid.clone();
    repo.insert_entry(foreign, Vec::new()).await.unwrap();
    assert!(!repo.replace_entry(1, &foreign_vid, "x".to_owned(), words(&["ab"])).await.unwrap());

    let published = entry('f', 1, 0, 3);
    let published_vid = published.vid.clone();
    repo.insert_entry(published, Vec::new()).await.unwrap();
    assert!(!repo.replace_entry(1, &published_vid, "x".to_owned(), Vec::new()).await.unwrap());
    assert_eq!(
        repo.fetch_published(&[published_vid]).await.unwrap(),
        vec![(entry('f', 1, 0, 3).vid, "payload-f".to_owned())]
    );
    vid
}

async fn expiry_and_nodes(repo: Arc<dyn VaultRepository>) {
    let published = entry('c', 1, 0, 1);
    let vid = published.vid.clone();
    repo.insert_entry(published, Vec::new()).await.unwrap();
    let ids = vec![vid.clone()];

    assert_eq!(repo.fetch_published(&ids).await.unwrap().len(), 1);
    assert!(repo.fetch_private(1, &ids).await.unwrap().is_empty());

    assert_eq!(repo.purge_expired(DAY).await.unwrap(), 0);
    assert_eq!(repo.purge_expired(DAY + 1).await.unwrap(), 1);
    assert!(repo.fetch_published(&ids).await.unwrap().is_empty());

    repo.touch_node(5, 100).await.unwrap();
    repo.touch_node(3, 100).await.unwrap();
    repo.touch_node(9, 100).await.unwrap();
    assert_eq!(repo.min_node().await.unwrap(), Some(3));

    repo.touch_node(5, 5000).await.unwrap();
    repo.touch_node(9, 5000).await.unwrap();
    assert_eq!(repo.prune_nodes(1000).await.unwrap(), 1);
    assert_eq!(repo.min_node().await.unwrap(), Some(5));

    repo.append_audit(AuditRecord {
        kind: AuditKind::Notice,
        provider_id: 0,
        message: "started".to_owned(),
        log_date: 1,
    })
    .await
    .unwrap();
    repo.ping().await.unwrap();
}

#[tokio::test]
async fn memory_backend_honours_contract() {
    providers_roundtrip(memory()).await;
    entries_roundtrip(memory()).await;
    expiry_and_nodes(memory()).await;
}

#[tokio::test]
async fn surreal_backend_honours_contract() {
    providers_roundtrip(surreal().await).await;
    entries_roundtrip(surreal().await).await;
    expiry_and_nodes(surreal().await).await;
}

#[tokio::test]
async fn memory_replace_after_delete_writes_nothing() {
    let repo = MemoryRepository::new();
    let vid = replace_after_delete(Arc::new(repo.clone())).await;
    assert!(repo.entry(&vid).is_none());
    assert!(repo.words(&vid).is_empty());
}

#[tokio::test]
async fn surreal_replace_after_delete_leaves_no_orphan_words() {
    let db = surreal_db().await;
    let vid = replace_after_delete(Arc::new(SurrealRepository::new(db.clone(), 4))).await;
    let orphans = db
        .query("SELECT VALUE word FROM search_word WHERE vid = $vid")
        .bind(("vid", vid))
        .await
        .unwrap()
        .take::<Vec<String>>(0)
        .unwrap();
    assert!(orphans.is_empty(), "orphan words: {orphans:?}");
}

#[tokio::test]
async fn open_selects_memory_backend() {
    let config = DatabaseConfig { url: MEMORY_URL.to_owned(), ..DatabaseConfig::default() };
    let repo = open(&config).await.expect("open memory backend");
    repo.ping().await.expect("ping");
}

#[tokio::test]
async fn missing_parameters_fail_validation() {
    let err = Database::builder().init().await.unwrap_err();
    assert!(matches!(err, DatabaseError::Validation { .. }));
}
