use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::future;
use serde::Serialize;

use super::{INDEX_PRECISION, load_private};
use crate::error::AppError;
use crate::geo;
use crate::models::{Coordinate, GeoIndexEntry, LiveLocation, LocationRecord, PublicProfile};
use crate::store::{DocumentStore, IN_QUERY_LIMIT, paths};

/// 查询半径上限（公里）
pub const MAX_RADIUS_KM: f64 = 50.0;

/// 单次查询默认返回条数上限
pub const DEFAULT_LIMIT: usize = 50;

// 实时流查询的半径下限和细前缀精度
const LIVE_MIN_RADIUS_KM: f64 = 0.1;
const LIVE_FINE_PRECISION: usize = 6;

#[derive(Debug, Serialize)]
pub struct NearbySnapshot {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f64,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct NearbyUser {
    pub user_id: String,
    pub display_name: String,
    pub profile_image_url: String,
    pub mood_temperature: String,
    pub location: NearbySnapshot,
    pub distance_km: f64,
    pub movement_state: String,
}

#[derive(Debug, Serialize)]
pub struct LiveNearbyUser {
    pub user_id: String,
    pub display_name: String,
    pub profile_image_url: String,
    pub mood_temperature: String,
    pub last_updated: DateTime<Utc>,
}

/// 两阶段邻近查询：先按桶粗筛，再按真实距离精筛。
/// geohash 前缀是圆形半径的矩形近似，第二阶段负责纠正
/// 桶角落的误报和半径略超桶覆盖造成的漏报。
pub struct ProximityQuery;

impl ProximityQuery {
    pub async fn find_nearby(
        store: &Arc<dyn DocumentStore>,
        requester_id: &str,
        center: Coordinate,
        radius_km: f64,
        limit: usize,
    ) -> Result<Vec<NearbyUser>, AppError> {
        let radius_km = radius_km.min(MAX_RADIUS_KM);

        // 请求者的 blocked_by 名单只读一次
        let blocked_by: HashSet<String> = match load_private(store, requester_id).await? {
            Some(private) => private.connections.blocked_by.into_iter().collect(),
            None => HashSet::new(),
        };

        // 中心桶加相邻桶，去重后并发拉取
        let center_hash = geo::encode(center.latitude, center.longitude, INDEX_PRECISION);
        let mut buckets = vec![center_hash.clone()];
        for neighbor in geo::neighbors(&center_hash)? {
            if !buckets.contains(&neighbor) {
                buckets.push(neighbor);
            }
        }

        let bucket_paths: Vec<String> = buckets.iter().map(|b| paths::geo_bucket(b)).collect();
        let bucket_docs =
            future::try_join_all(bucket_paths.iter().map(|path| store.list(path))).await?;

        let mut candidates: Vec<GeoIndexEntry> = Vec::new();
        for doc in bucket_docs.into_iter().flatten() {
            match serde_json::from_value::<GeoIndexEntry>(doc) {
                Ok(entry) => {
                    if entry.user_id != requester_id && !blocked_by.contains(&entry.user_id) {
                        candidates.push(entry);
                    }
                }
                // 坏条目是数据完整性故障：大声记录并从结果中排除
                Err(e) => tracing::error!("corrupt geo index entry: {}", e),
            }
        }

        // 并发读取每个候选的位置记录，按真实距离过滤
        let lookups = candidates.into_iter().map(|entry| async move {
            let path = paths::location(&entry.user_id);
            let Some(value) = store.get(&path).await? else {
                return Ok(None);
            };
            let record: LocationRecord = match serde_json::from_value(value) {
                Ok(record) => record,
                Err(e) => {
                    tracing::error!("corrupt location record at {}: {}", path, e);
                    return Ok(None);
                }
            };

            let distance = geo::distance_km(
                center.latitude,
                center.longitude,
                record.location.latitude,
                record.location.longitude,
            );
            if distance > radius_km {
                return Ok(None);
            }

            Ok::<_, AppError>(Some(NearbyUser {
                user_id: entry.user_id,
                display_name: entry.display_name,
                profile_image_url: entry.profile_image_url,
                mood_temperature: entry.mood_temperature,
                location: NearbySnapshot {
                    latitude: record.location.latitude,
                    longitude: record.location.longitude,
                    accuracy: record.location.accuracy,
                    last_updated: record.last_updated,
                },
                distance_km: (distance * 100.0).round() / 100.0,
                movement_state: record.movement_state,
            }))
        });

        let mut users: Vec<NearbyUser> = future::try_join_all(lookups)
            .await?
            .into_iter()
            .flatten()
            .collect();

        users.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        users.truncate(limit);
        Ok(users)
    }

    /// 实时流查询：单个 geohash 前缀范围扫描加分批资料拉取。
    /// 没有相邻桶扩展，也不做距离过滤，换取实现简单和数据新鲜，
    /// 属于近似半径模式。
    pub async fn find_nearby_live(
        store: &Arc<dyn DocumentStore>,
        requester_id: &str,
        center: Coordinate,
        radius_km: f64,
    ) -> Result<Vec<LiveNearbyUser>, AppError> {
        let radius_km = radius_km.clamp(LIVE_MIN_RADIUS_KM, MAX_RADIUS_KM);

        // 半径不超过 1 公里时用更细的前缀
        let precision = if radius_km <= 1.0 {
            LIVE_FINE_PRECISION
        } else {
            INDEX_PRECISION
        };
        let prefix = geo::encode(center.latitude, center.longitude, precision);
        // '~' 排在所有 base32 字符之后，构成前缀范围的上界
        let upper = format!("{}~", prefix);

        let rows = store
            .query_range(paths::LIVE_LOCATIONS, "geohash", &prefix, &upper)
            .await?;

        // 去重收集候选 id，并记下各自的刷新时间
        let mut ids: Vec<String> = Vec::new();
        let mut freshness: HashMap<String, DateTime<Utc>> = HashMap::new();
        for (doc_id, value) in rows {
            if doc_id == requester_id || freshness.contains_key(&doc_id) {
                continue;
            }
            let row: LiveLocation = match serde_json::from_value(value) {
                Ok(row) => row,
                Err(e) => {
                    tracing::error!("corrupt live location row {}: {}", doc_id, e);
                    continue;
                }
            };
            ids.push(doc_id.clone());
            freshness.insert(doc_id, row.updated_at);
        }

        if ids.is_empty() {
            return Ok(Vec::new());
        }

        // 受后端 IN 查询上限约束，分批拉取公开资料
        let batches = ids
            .chunks(IN_QUERY_LIMIT)
            .map(|chunk| store.get_many(paths::USERS_PUBLIC, chunk));
        let profile_batches = future::try_join_all(batches).await?;

        let mut users = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for (user_id, value) in profile_batches.into_iter().flatten() {
            if !seen.insert(user_id.clone()) {
                continue;
            }
            let profile: PublicProfile = match serde_json::from_value(value) {
                Ok(profile) => profile,
                Err(e) => {
                    tracing::error!("corrupt public profile for {}: {}", user_id, e);
                    continue;
                }
            };
            let Some(&last_updated) = freshness.get(&user_id) else {
                continue;
            };
            users.push(LiveNearbyUser {
                user_id,
                display_name: profile.display_name,
                profile_image_url: profile.photo_url,
                mood_temperature: profile.mood_temperature,
                last_updated,
            });
        }

        // 最近刷新的在前
        users.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        Ok(users)
    }
}
