use sop_core::model::{EnvironmentId, Process, ProcessId, Rect, Rgb, Step, Zone, ZoneId};
use storage::{InMemoryRepository, StorageError};
use storage::demo::seed_demo;
use storage::repository::{ProcessRepository, Storage, ZoneRepository};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let repo = SqliteRepository::connect(&format!("sqlite:file:{name}?mode=memory&cache=shared"))
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn zone(id: u64, name: &str, rect: Rect) -> Zone {
    Zone::new(ZoneId::new(id), name, rect, "#12AB34".parse::<Rgb>().unwrap()).unwrap()
}

#[tokio::test]
async fn sqlite_zones_roundtrip_geometry_and_color() {
    let repo = connect("memdb_zones").await;
    let env = EnvironmentId::new(7);

    repo.upsert_zone(env, &zone(2, "Bin", Rect::new(10.0, 20.0, 30.5, 40.25)))
        .await
        .unwrap();
    repo.upsert_zone(env, &zone(1, "Fixture", Rect::new(0.0, 0.0, 5.0, 5.0)))
        .await
        .unwrap();
    repo.upsert_zone(EnvironmentId::new(8), &zone(3, "Other", Rect::new(0.0, 0.0, 1.0, 1.0)))
        .await
        .unwrap();

    let zones = repo.get_zones(env).await.unwrap();
    assert_eq!(zones.len(), 2);
    assert_eq!(zones[0].id(), ZoneId::new(1));
    assert_eq!(zones[1].name(), "Bin");
    assert_eq!(*zones[1].rect(), Rect::new(10.0, 20.0, 30.5, 40.25));
    assert_eq!(zones[1].color(), Rgb::new(0x12, 0xAB, 0x34));
}

#[tokio::test]
async fn sqlite_upsert_zone_updates_in_place() {
    let repo = connect("memdb_zone_update").await;
    let env = EnvironmentId::new(1);

    repo.upsert_zone(env, &zone(1, "Before", Rect::new(0.0, 0.0, 1.0, 1.0)))
        .await
        .unwrap();
    repo.upsert_zone(env, &zone(1, "After", Rect::new(0.0, 0.0, 2.0, 2.0)))
        .await
        .unwrap();

    let zones = repo.get_zones(env).await.unwrap();
    assert_eq!(zones.len(), 1);
    assert_eq!(zones[0].name(), "After");
}

#[tokio::test]
async fn sqlite_steps_are_replaced_and_ordered() {
    let repo = connect("memdb_steps").await;
    let env = EnvironmentId::new(1);
    repo.upsert_zone(env, &zone(1, "A", Rect::new(0.0, 0.0, 1.0, 1.0)))
        .await
        .unwrap();
    repo.upsert_zone(env, &zone(2, "B", Rect::new(2.0, 2.0, 3.0, 3.0)))
        .await
        .unwrap();

    let process = Process::new(ProcessId::new(3), env, "Assembly", Some("demo".into())).unwrap();
    repo.upsert_process(&process).await.unwrap();

    let steps = vec![
        Step::new(2, "Second", ZoneId::new(2), 10, None).unwrap(),
        Step::new(1, "First", ZoneId::new(1), 5, Some("grab".into())).unwrap(),
    ];
    repo.replace_steps(process.id(), &steps).await.unwrap();

    let fetched = repo.get_steps(process.id()).await.unwrap();
    assert_eq!(fetched.len(), 2);
    assert_eq!(fetched[0].name(), "First");
    assert_eq!(fetched[0].description(), Some("grab"));
    assert_eq!(fetched[1].target_duration_secs(), 10);

    repo.replace_steps(
        process.id(),
        &[Step::new(1, "Only", ZoneId::new(2), 7, None).unwrap()],
    )
    .await
    .unwrap();
    let fetched = repo.get_steps(process.id()).await.unwrap();
    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].target_zone(), ZoneId::new(2));

    let loaded = repo.get_process(process.id()).await.unwrap().unwrap();
    assert_eq!(loaded.name(), "Assembly");
    assert_eq!(loaded.environment_id(), env);
    assert!(repo.get_process(ProcessId::new(99)).await.unwrap().is_none());
}

#[tokio::test]
async fn sqlite_replace_steps_requires_process() {
    let repo = connect("memdb_missing_process").await;
    let err = repo
        .replace_steps(
            ProcessId::new(42),
            &[Step::new(1, "Orphan", ZoneId::new(1), 5, None).unwrap()],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_storage_seeds_demo_environment() {
    let storage = Storage::sqlite("sqlite:file:memdb_seed?mode=memory&cache=shared")
        .await
        .expect("storage");
    let env = EnvironmentId::new(1);
    let pid = ProcessId::new(1);

    seed_demo(&storage, env, pid).await.unwrap();
    seed_demo(&storage, env, pid).await.unwrap();

    assert_eq!(storage.zones.get_zones(env).await.unwrap().len(), 3);
    let steps = storage.processes.get_steps(pid).await.unwrap();
    let names: Vec<&str> = steps.iter().map(Step::name).collect();
    assert_eq!(names, vec!["Pick part", "Assemble", "Inspect"]);
}

async fn zone_names(repo: &dyn ZoneRepository, env: EnvironmentId) -> Vec<String> {
    repo.get_zones(env)
        .await
        .unwrap()
        .iter()
        .map(|z| z.name().to_string())
        .collect()
}

#[tokio::test]
async fn zone_ids_are_global_in_both_backends() {
    let sqlite = connect("memdb_global_zone_ids").await;
    let in_memory = InMemoryRepository::new();
    let backends: [&dyn ZoneRepository; 2] = [&sqlite, &in_memory];
    let (env1, env2) = (EnvironmentId::new(1), EnvironmentId::new(2));

    for repo in backends {
        repo.upsert_zone(env1, &zone(1, "Bin", Rect::new(0.0, 0.0, 1.0, 1.0)))
            .await
            .unwrap();
        repo.upsert_zone(env1, &zone(2, "Press", Rect::new(2.0, 2.0, 3.0, 3.0)))
            .await
            .unwrap();
        repo.upsert_zone(env2, &zone(1, "Tray", Rect::new(0.0, 0.0, 1.0, 1.0)))
            .await
            .unwrap();

        assert_eq!(zone_names(repo, env1).await, vec!["Press"]);
        assert_eq!(zone_names(repo, env2).await, vec!["Tray"]);
    }
}
