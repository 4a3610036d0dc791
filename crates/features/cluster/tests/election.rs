use pvault_cluster::{BackgroundJobs, HeartbeatElection, LeaderElection, Role, run_cleanup_cycle};
use pvault_database::{MemoryRepository, VaultRepository};
use pvault_domain::config::ClusterConfig;
use pvault_domain::records::VaultEntry;
use pvault_kernel::clock::ManualClock;
use std::sync::Arc;
use std::time::Duration;

const T0: i64 = 1_700_000_000;
const HOUR: i64 = 3_600;
const DAY: i64 = 86_400;

fn election(repo: &MemoryRepository, node_id: i64) -> HeartbeatElection {
    HeartbeatElection::new(Arc::new(repo.clone()), node_id, HOUR)
}

fn published(vid: &str, created: i64, days: i64) -> VaultEntry {
    VaultEntry {
        vid: vid.to_owned(),
        payload: "p".to_owned(),
        provider_id: 1,
        creation_date: created,
        duration: days,
    }
}

#[tokio::test]
async fn lowest_live_node_leads_until_it_goes_silent() {
    let repo = MemoryRepository::new();
    let (n3, n5, n9) = (election(&repo, 3), election(&repo, 5), election(&repo, 9));

    assert_eq!(n5.elect(T0).await.unwrap(), Role::Leader, "alone so far");
    assert_eq!(n9.elect(T0).await.unwrap(), Role::Follower);
    assert_eq!(n3.elect(T0).await.unwrap(), Role::Leader);
    assert_eq!(n5.elect(T0).await.unwrap(), Role::Follower);

    // node 3 stops heartbeating, the others keep going
    n9.elect(T0 + HOUR / 2).await.unwrap();
    n5.elect(T0 + HOUR / 2).await.unwrap();

    assert_eq!(n5.elect(T0 + HOUR + 1).await.unwrap(), Role::Leader);
    let nodes: Vec<i64> = repo.nodes().into_iter().map(|(id, _)| id).collect();
    assert_eq!(nodes, vec![5, 9]);
}

#[tokio::test]
async fn node_exactly_at_ttl_is_still_live() {
    let repo = MemoryRepository::new();
    election(&repo, 1).elect(T0).await.unwrap();

    assert_eq!(election(&repo, 2).elect(T0 + HOUR).await.unwrap(), Role::Follower);
}

#[tokio::test]
async fn leader_purges_and_follower_does_not() {
    let repo = MemoryRepository::new();
    let expired = "a".repeat(32);
    let fresh = "b".repeat(32);
    repo.insert_entry(published(&expired, T0, 1), Vec::new()).await.unwrap();
    repo.insert_entry(published(&fresh, T0, 30), Vec::new()).await.unwrap();
    let now = T0 + DAY + 1;

    let alone = run_cleanup_cycle(&election(&repo, 9), &repo, now).await.unwrap();
    assert_eq!(alone, Some(1), "a single node always leads");

    repo.insert_entry(published(&expired, T0, 1), Vec::new()).await.unwrap();
    election(&repo, 2).elect(now).await.unwrap();
    let follower = run_cleanup_cycle(&election(&repo, 9), &repo, now).await.unwrap();
    assert_eq!(follower, None);
    assert!(repo.entry(&expired).is_some());

    let leader = run_cleanup_cycle(&election(&repo, 2), &repo, now).await.unwrap();
    assert_eq!(leader, Some(1));
    assert!(repo.entry(&expired).is_none());
    assert!(repo.entry(&fresh).is_some());
}

#[tokio::test]
async fn failed_cycle_purges_nothing() {
    let repo = MemoryRepository::new();
    repo.insert_entry(published(&"c".repeat(32), T0, 1), Vec::new()).await.unwrap();
    repo.set_offline(true);

    assert!(run_cleanup_cycle(&election(&repo, 1), &repo, T0 + 2 * DAY).await.is_err());
    repo.set_offline(false);
    assert!(repo.entry(&"c".repeat(32)).is_some());
}

#[tokio::test(start_paused = true)]
async fn cleanup_loop_sweeps_after_one_period() {
    let repo = MemoryRepository::new();
    let vid = "d".repeat(32);
    repo.insert_entry(published(&vid, T0, 1), Vec::new()).await.unwrap();
    let clock = ManualClock::new(T0 + DAY + 1);
    let config = ClusterConfig { cleanup_secs: 600, keep_alive_secs: 60, ..ClusterConfig::default() };
    let election: Arc<dyn LeaderElection> = Arc::new(election(&repo, 7));

    let jobs = BackgroundJobs::spawn(Arc::new(repo.clone()), Arc::new(clock), &config, Some(election));
    assert_eq!(jobs.len(), 2);

    tokio::time::sleep(Duration::from_secs(599)).await;
    assert!(repo.entry(&vid).is_some(), "no sweep before the first period");

    for _ in 0..10 {
        if repo.entry(&vid).is_none() {
            break;
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    assert!(repo.entry(&vid).is_none());
    assert_eq!(repo.nodes(), vec![(7, T0 + DAY + 1)]);

    jobs.shutdown().await.expect("loops stop");
}

#[tokio::test]
async fn disabled_cluster_starts_nothing() {
    let repo = MemoryRepository::new();
    let config = ClusterConfig { enabled: false, ..ClusterConfig::default() };
    let jobs = BackgroundJobs::start(Arc::new(repo), Arc::new(ManualClock::new(0)), &config).await;

    assert_eq!(jobs.len(), 0);
    jobs.shutdown().await.unwrap();
}

#[tokio::test]
async fn missing_identity_keeps_only_keep_alive() {
    let repo = MemoryRepository::new();
    let jobs = BackgroundJobs::spawn(
        Arc::new(repo),
        Arc::new(ManualClock::new(0)),
        &ClusterConfig::default(),
        None,
    );

    assert_eq!(jobs.len(), 1);
    jobs.shutdown().await.unwrap();
}
