use std::sync::Arc;

use serde_json::json;

use firegeo_backend::error::AppError;
use firegeo_backend::geo;
use firegeo_backend::index::{GeoIndexOperations, INDEX_PRECISION, STORAGE_PRECISION};
use firegeo_backend::models::{Coordinate, DenormalizedFields, LocationUpdate};
use firegeo_backend::store::{DocumentStore, MemoryStore, WriteOp, paths};

fn test_store() -> (Arc<MemoryStore>, Arc<dyn DocumentStore>) {
    let mem = Arc::new(MemoryStore::new());
    let store: Arc<dyn DocumentStore> = mem.clone();
    (mem, store)
}

async fn seed_user(store: &Arc<dyn DocumentStore>, user_id: &str, display_name: &str) {
    store
        .batch_write(vec![
            WriteOp::Set {
                path: paths::user_public(user_id),
                data: json!({
                    "display_name": display_name,
                    "photo_url": format!("https://cdn.example.com/{}.png", user_id),
                    "mood_temperature": "warm",
                }),
            },
            WriteOp::Set {
                path: paths::user_private(user_id),
                data: json!({}),
            },
        ])
        .await
        .unwrap();
}

fn location_update(latitude: f64, longitude: f64) -> LocationUpdate {
    LocationUpdate {
        coordinate: Coordinate::new(latitude, longitude).unwrap(),
        accuracy: 5.0,
        altitude: None,
        heading: None,
        speed: None,
        battery_level: Some(0.8),
        location_method: "gps".to_string(),
        movement_state: "walking".to_string(),
    }
}

fn index_paths_for(mem: &MemoryStore, user_id: &str) -> Vec<String> {
    let suffix = format!("/users/{}", user_id);
    mem.document_paths()
        .into_iter()
        .filter(|path| path.starts_with("geo_index/") && path.ends_with(&suffix))
        .collect()
}

async fn recorded_path(store: &Arc<dyn DocumentStore>, user_id: &str) -> Option<String> {
    let doc = store.get(&paths::user_private(user_id)).await.unwrap()?;
    doc["current_geo_index_path"].as_str().map(str::to_string)
}

#[tokio::test]
async fn single_bucket_invariant_across_moves() {
    let (mem, store) = test_store();
    seed_user(&store, "u1", "张伟").await;

    let stops = [
        (37.7749, -122.4194),
        (37.8249, -122.4194),
        (37.7749, -122.4194),
        (37.7750, -122.4195),
    ];

    for (latitude, longitude) in stops {
        GeoIndexOperations::record_location(&store, "u1", &location_update(latitude, longitude))
            .await
            .unwrap();

        let entries = index_paths_for(&mem, "u1");
        assert_eq!(entries.len(), 1, "user must occupy exactly one bucket");

        let expected_bucket: String = geo::encode(latitude, longitude, STORAGE_PRECISION)
            .chars()
            .take(INDEX_PRECISION)
            .collect();
        assert_eq!(entries[0], paths::geo_entry(&expected_bucket, "u1"));
        assert_eq!(recorded_path(&store, "u1").await.as_deref(), Some(entries[0].as_str()));
    }
}

#[tokio::test]
async fn upsert_reports_relocation() {
    let (mem, store) = test_store();
    seed_user(&store, "u2", "李娜").await;
    let fields = DenormalizedFields {
        display_name: "李娜".to_string(),
        profile_image_url: String::new(),
        mood_temperature: "neutral".to_string(),
    };

    let here = Coordinate::new(37.7749, -122.4194).unwrap();
    let first = GeoIndexOperations::upsert(&store, "u2", here, &fields)
        .await
        .unwrap();
    assert_eq!(first.geohash.len(), STORAGE_PRECISION);
    assert!(!first.was_relocated);
    assert!(!first.suppressed);
    assert!(first.bucket.is_some());

    // 同一个桶内的小幅移动不算迁移
    let nudge = Coordinate::new(37.7750, -122.4195).unwrap();
    let second = GeoIndexOperations::upsert(&store, "u2", nudge, &fields)
        .await
        .unwrap();
    assert!(!second.was_relocated);

    let far = Coordinate::new(37.8249, -122.4194).unwrap();
    let third = GeoIndexOperations::upsert(&store, "u2", far, &fields)
        .await
        .unwrap();
    assert!(third.was_relocated);
    assert_ne!(third.bucket, first.bucket);
    assert_eq!(index_paths_for(&mem, "u2").len(), 1);
}

#[tokio::test]
async fn ghost_mode_suppresses_indexing() {
    let (mem, store) = test_store();
    seed_user(&store, "u3", "王芳").await;

    GeoIndexOperations::record_location(&store, "u3", &location_update(37.7749, -122.4194))
        .await
        .unwrap();
    assert_eq!(index_paths_for(&mem, "u3").len(), 1);

    let settings = GeoIndexOperations::update_privacy(&store, "u3", Some(true), None)
        .await
        .unwrap();
    assert!(settings.ghost_mode);
    assert!(index_paths_for(&mem, "u3").is_empty());
    assert_eq!(recorded_path(&store, "u3").await, None);

    // 幽灵模式下继续上报位置：记录照写，索引保持为空
    let outcome =
        GeoIndexOperations::record_location(&store, "u3", &location_update(37.7750, -122.4195))
            .await
            .unwrap();
    assert!(outcome.ghost_mode);
    assert!(index_paths_for(&mem, "u3").is_empty());
    assert!(store.get(&paths::location("u3")).await.unwrap().is_some());
    // 实时流里同样不能留下痕迹
    assert!(store.get(&paths::live_location("u3")).await.unwrap().is_none());

    // 关闭幽灵模式不自动回填，下一次上报才重建条目
    GeoIndexOperations::update_privacy(&store, "u3", Some(false), None)
        .await
        .unwrap();
    assert!(index_paths_for(&mem, "u3").is_empty());
    GeoIndexOperations::record_location(&store, "u3", &location_update(37.7750, -122.4195))
        .await
        .unwrap();
    assert_eq!(index_paths_for(&mem, "u3").len(), 1);
}

#[tokio::test]
async fn set_ghost_mode_and_remove_are_idempotent() {
    let (mem, store) = test_store();
    seed_user(&store, "u4", "赵磊").await;

    GeoIndexOperations::record_location(&store, "u4", &location_update(37.7749, -122.4194))
        .await
        .unwrap();

    GeoIndexOperations::set_ghost_mode(&store, "u4", true)
        .await
        .unwrap();
    assert!(index_paths_for(&mem, "u4").is_empty());

    // 重复移除和对不存在条目的移除都不报错
    GeoIndexOperations::remove(&store, "u4").await.unwrap();
    GeoIndexOperations::remove(&store, "u4").await.unwrap();
    GeoIndexOperations::remove(&store, "missing").await.unwrap();

    GeoIndexOperations::set_ghost_mode(&store, "u4", false)
        .await
        .unwrap();
    assert!(index_paths_for(&mem, "u4").is_empty());
}

#[tokio::test]
async fn record_location_requires_profile() {
    let (mem, store) = test_store();

    let err = GeoIndexOperations::record_location(
        &store,
        "nobody",
        &location_update(37.7749, -122.4194),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::UserProfileNotFound(_)));
    // 写入路径在触达索引前终止
    assert!(store.get(&paths::location("nobody")).await.unwrap().is_none());
    assert!(index_paths_for(&mem, "nobody").is_empty());
}

#[tokio::test]
async fn privacy_zone_flags_record_but_keeps_indexing() {
    let (mem, store) = test_store();
    store
        .batch_write(vec![
            WriteOp::Set {
                path: paths::user_public("u5"),
                data: json!({ "display_name": "刘洋" }),
            },
            WriteOp::Set {
                path: paths::user_private("u5"),
                data: json!({
                    "privacy_settings": {
                        "ghost_mode": false,
                        "privacy_zones": [{
                            "zone_id": "zone-home",
                            "name": "家",
                            "center": { "latitude": 37.7749, "longitude": -122.4194 },
                            "radius_meters": 500.0,
                        }],
                    },
                }),
            },
        ])
        .await
        .unwrap();

    let outcome =
        GeoIndexOperations::record_location(&store, "u5", &location_update(37.7755, -122.4201))
            .await
            .unwrap();

    assert!(outcome.in_privacy_zone);
    assert!(!outcome.ghost_mode);
    // 隐私区域只打标记，不抑制索引
    assert_eq!(index_paths_for(&mem, "u5").len(), 1);

    let record = store.get(&paths::location("u5")).await.unwrap().unwrap();
    assert_eq!(record["in_privacy_zone"], true);
    assert_eq!(record["privacy_zone_id"], "zone-home");
}

#[tokio::test]
async fn sign_out_clears_presence() {
    let (mem, store) = test_store();
    seed_user(&store, "u6", "陈静").await;

    GeoIndexOperations::record_location(&store, "u6", &location_update(37.7749, -122.4194))
        .await
        .unwrap();
    GeoIndexOperations::sign_out(&store, "u6").await.unwrap();

    assert!(index_paths_for(&mem, "u6").is_empty());
    let private = store.get(&paths::user_private("u6")).await.unwrap().unwrap();
    assert_eq!(private["is_online"], false);
    assert!(private["current_geo_index_path"].is_null());
    let record = store.get(&paths::location("u6")).await.unwrap().unwrap();
    assert!(record["last_active"].is_string());
}
