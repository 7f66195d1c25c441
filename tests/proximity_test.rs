use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;

use firegeo_backend::geo;
use firegeo_backend::index::GeoIndexOperations;
use firegeo_backend::index::query::ProximityQuery;
use firegeo_backend::models::{Coordinate, LocationUpdate};
use firegeo_backend::store::{DocumentStore, MemoryStore, WriteOp, paths};

// 球面上 1 度纬线的长度（公里），用于按距离布置测试用户
const KM_PER_DEGREE_LAT: f64 = std::f64::consts::PI / 180.0 * geo::EARTH_RADIUS_KM;

const CENTER_LAT: f64 = 37.7749;
const CENTER_LNG: f64 = -122.4194;

fn test_store() -> (Arc<MemoryStore>, Arc<dyn DocumentStore>) {
    let mem = Arc::new(MemoryStore::new());
    let store: Arc<dyn DocumentStore> = mem.clone();
    (mem, store)
}

async fn seed_user(store: &Arc<dyn DocumentStore>, user_id: &str) {
    store
        .batch_write(vec![
            WriteOp::Set {
                path: paths::user_public(user_id),
                data: json!({
                    "display_name": format!("用户{}", user_id),
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
        battery_level: None,
        location_method: "gps".to_string(),
        movement_state: "stationary".to_string(),
    }
}

/// 在中心点正北方 distance_km 处放置一个已上报位置的用户
async fn place_user_north(store: &Arc<dyn DocumentStore>, user_id: &str, distance_km: f64) {
    seed_user(store, user_id).await;
    let latitude = CENTER_LAT + distance_km / KM_PER_DEGREE_LAT;
    GeoIndexOperations::record_location(store, user_id, &location_update(latitude, CENTER_LNG))
        .await
        .unwrap();
}

#[tokio::test]
async fn radius_filter_keeps_exactly_the_users_inside() {
    let (_, store) = test_store();
    seed_user(&store, "me").await;
    GeoIndexOperations::record_location(&store, "me", &location_update(CENTER_LAT, CENTER_LNG))
        .await
        .unwrap();

    for (user_id, distance_km) in [
        ("u05", 0.5),
        ("u10", 1.0),
        ("u15", 1.5),
        ("u49", 4.9),
        ("u51", 5.1),
    ] {
        place_user_north(&store, user_id, distance_km).await;
    }

    let center = Coordinate::new(CENTER_LAT, CENTER_LNG).unwrap();
    let users = ProximityQuery::find_nearby(&store, "me", center, 5.0, 50)
        .await
        .unwrap();

    let ids: Vec<&str> = users.iter().map(|u| u.user_id.as_str()).collect();
    assert_eq!(ids, vec!["u05", "u10", "u15", "u49"]);

    let distances: Vec<f64> = users.iter().map(|u| u.distance_km).collect();
    assert_eq!(distances, vec![0.5, 1.0, 1.5, 4.9]);
}

#[tokio::test]
async fn requester_and_blockers_are_excluded() {
    let (_, store) = test_store();

    store
        .batch_write(vec![
            WriteOp::Set {
                path: paths::user_public("alice"),
                data: json!({ "display_name": "Alice" }),
            },
            WriteOp::Set {
                path: paths::user_private("alice"),
                data: json!({ "connections": { "blocked_by": ["bob"] } }),
            },
        ])
        .await
        .unwrap();
    GeoIndexOperations::record_location(&store, "alice", &location_update(CENTER_LAT, CENTER_LNG))
        .await
        .unwrap();

    place_user_north(&store, "bob", 0.3).await;
    place_user_north(&store, "carol", 0.6).await;

    let center = Coordinate::new(CENTER_LAT, CENTER_LNG).unwrap();
    let users = ProximityQuery::find_nearby(&store, "alice", center, 5.0, 50)
        .await
        .unwrap();

    let ids: Vec<&str> = users.iter().map(|u| u.user_id.as_str()).collect();
    assert_eq!(ids, vec!["carol"]);
}

#[tokio::test]
async fn ghost_user_is_invisible_to_queries() {
    let (_, store) = test_store();
    seed_user(&store, "seeker").await;
    GeoIndexOperations::record_location(&store, "seeker", &location_update(CENTER_LAT, CENTER_LNG))
        .await
        .unwrap();

    place_user_north(&store, "ghost", 0.4).await;
    GeoIndexOperations::update_privacy(&store, "ghost", Some(true), None)
        .await
        .unwrap();

    // 位置记录仍在半径内，但索引条目已被抑制
    assert!(store.get(&paths::location("ghost")).await.unwrap().is_some());

    let center = Coordinate::new(CENTER_LAT, CENTER_LNG).unwrap();
    let users = ProximityQuery::find_nearby(&store, "seeker", center, 5.0, 50)
        .await
        .unwrap();
    assert!(users.iter().all(|u| u.user_id != "ghost"));
}

#[tokio::test]
async fn two_users_meet_end_to_end() {
    let (_, store) = test_store();
    seed_user(&store, "a").await;
    seed_user(&store, "b").await;

    GeoIndexOperations::record_location(&store, "a", &location_update(37.7749, -122.4194))
        .await
        .unwrap();
    GeoIndexOperations::record_location(&store, "b", &location_update(37.7755, -122.4201))
        .await
        .unwrap();

    let center = Coordinate::new(37.7749, -122.4194).unwrap();
    let users = ProximityQuery::find_nearby(&store, "a", center, 1.0, 50)
        .await
        .unwrap();

    assert_eq!(users.len(), 1);
    assert_eq!(users[0].user_id, "b");
    assert_eq!(users[0].distance_km, 0.09);
    assert_eq!(users[0].movement_state, "stationary");

    // 半径缩到 10 米后空手而归，但仍是成功结果
    let none = ProximityQuery::find_nearby(&store, "a", center, 0.01, 50)
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn corrupt_index_entries_are_skipped() {
    let (_, store) = test_store();
    seed_user(&store, "viewer").await;
    place_user_north(&store, "valid", 0.5).await;

    // 往 valid 所在的桶里塞一条坏文档
    let bucket: String = geo::encode(CENTER_LAT, CENTER_LNG, 9).chars().take(5).collect();
    store
        .batch_write(vec![WriteOp::Set {
            path: paths::geo_entry(&bucket, "broken"),
            data: json!({ "user_id": 42 }),
        }])
        .await
        .unwrap();

    let center = Coordinate::new(CENTER_LAT, CENTER_LNG).unwrap();
    let users = ProximityQuery::find_nearby(&store, "viewer", center, 5.0, 50)
        .await
        .unwrap();
    let ids: Vec<&str> = users.iter().map(|u| u.user_id.as_str()).collect();
    assert_eq!(ids, vec!["valid"]);
}

#[tokio::test]
async fn live_mode_batches_profile_fetches() {
    let (mem, store) = test_store();

    let base = Utc::now();
    let mut ops = Vec::new();

    // 请求者自己也在范围内，必须被排除
    ops.push(WriteOp::Set {
        path: paths::live_location("q"),
        data: json!({
            "user_id": "q",
            "latitude": CENTER_LAT,
            "longitude": CENTER_LNG,
            "geohash": geo::encode(CENTER_LAT, CENTER_LNG, 9),
            "updated_at": base,
        }),
    });

    for i in 0..23 {
        let user_id = format!("p{:02}", i);
        let latitude = CENTER_LAT + 0.0001 * i as f64;
        ops.push(WriteOp::Set {
            path: paths::live_location(&user_id),
            data: json!({
                "user_id": user_id,
                "latitude": latitude,
                "longitude": CENTER_LNG,
                "geohash": geo::encode(latitude, CENTER_LNG, 9),
                "updated_at": base + Duration::seconds(i),
            }),
        });
        ops.push(WriteOp::Set {
            path: paths::user_public(&format!("p{:02}", i)),
            data: json!({ "display_name": format!("P{:02}", i) }),
        });
    }
    store.batch_write(ops).await.unwrap();

    let center = Coordinate::new(CENTER_LAT, CENTER_LNG).unwrap();
    let users = ProximityQuery::find_nearby_live(&store, "q", center, 5.0)
        .await
        .unwrap();

    assert_eq!(users.len(), 23);
    // 23 个候选按 10/10/3 拆成 3 次 IN 查询
    assert_eq!(mem.get_many_calls(), 3);

    let mut ids: Vec<&str> = users.iter().map(|u| u.user_id.as_str()).collect();
    assert!(users.iter().all(|u| u.user_id != "q"));
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 23);

    // 最近刷新的排在最前
    assert_eq!(users[0].user_id, "p22");
}

#[tokio::test]
async fn empty_area_returns_empty_success() {
    let (_, store) = test_store();
    seed_user(&store, "lonely").await;

    let center = Coordinate::new(CENTER_LAT, CENTER_LNG).unwrap();
    let users = ProximityQuery::find_nearby(&store, "lonely", center, 5.0, 50)
        .await
        .unwrap();
    assert!(users.is_empty());
}
