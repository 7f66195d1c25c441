pub mod query;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::error::AppError;
use crate::geo;
use crate::models::{Coordinate, DenormalizedFields, LocationUpdate, PrivateProfile, PublicProfile};
use crate::store::{DocumentStore, WriteOp, parse_document, paths};

/// 位置记录上存储的完整 geohash 精度
pub const STORAGE_PRECISION: usize = 9;

/// 空间索引桶的固定前缀精度（约 4.9 公里见方）
pub const INDEX_PRECISION: usize = 5;

/// 一次桶迁移的写操作序列。
/// 旧桶到新桶是显式的状态转移，所有操作在同一批次中提交，
/// 保证用户在任意时刻至多出现在一个桶里。
#[derive(Debug)]
pub struct BucketTransition {
    pub ops: Vec<WriteOp>,
    pub bucket: Option<String>,
    pub index_path: Option<String>,
    pub was_relocated: bool,
}

#[derive(Debug)]
pub struct UpsertResult {
    pub geohash: String,
    pub bucket: Option<String>,
    pub was_relocated: bool,
    /// 幽灵模式下条目被抑制
    pub suppressed: bool,
}

#[derive(Debug)]
pub struct LocationOutcome {
    pub geohash: String,
    pub in_privacy_zone: bool,
    pub ghost_mode: bool,
}

pub(crate) async fn load_public(
    store: &Arc<dyn DocumentStore>,
    user_id: &str,
) -> Result<Option<PublicProfile>, AppError> {
    let path = paths::user_public(user_id);
    match store.get(&path).await? {
        Some(value) => Ok(Some(parse_document(&path, value)?)),
        None => Ok(None),
    }
}

pub(crate) async fn load_private(
    store: &Arc<dyn DocumentStore>,
    user_id: &str,
) -> Result<Option<PrivateProfile>, AppError> {
    let path = paths::user_private(user_id);
    match store.get(&path).await? {
        Some(value) => Ok(Some(parse_document(&path, value)?)),
        None => Ok(None),
    }
}

/// 空间索引维护操作
pub struct GeoIndexOperations;

impl GeoIndexOperations {
    /// 计算旧桶到新桶的迁移操作，纯函数，不触达存储
    pub fn plan_transition(
        user_id: &str,
        geohash: &str,
        fields: &DenormalizedFields,
        ghost_mode: bool,
        previous_path: Option<&str>,
        has_private_doc: bool,
        now: DateTime<Utc>,
    ) -> BucketTransition {
        let bucket: String = geohash.chars().take(INDEX_PRECISION).collect();
        let new_path = paths::geo_entry(&bucket, user_id);
        let mut ops = Vec::new();

        if ghost_mode {
            // 幽灵模式：清除现有条目，不建新条目
            if let Some(previous) = previous_path {
                ops.push(WriteOp::Delete {
                    path: previous.to_string(),
                });
            }
            if has_private_doc {
                ops.push(WriteOp::Update {
                    path: paths::user_private(user_id),
                    data: json!({ "current_geo_index_path": null }),
                });
            }
            return BucketTransition {
                ops,
                bucket: None,
                index_path: None,
                was_relocated: false,
            };
        }

        let was_relocated = match previous_path {
            Some(previous) if previous != new_path => {
                ops.push(WriteOp::Delete {
                    path: previous.to_string(),
                });
                true
            }
            _ => false,
        };

        ops.push(WriteOp::Set {
            path: new_path.clone(),
            data: json!({
                "user_id": user_id,
                "geohash": geohash,
                "last_updated": now,
                "display_name": fields.display_name,
                "profile_image_url": fields.profile_image_url,
                "mood_temperature": fields.mood_temperature,
            }),
        });
        if has_private_doc {
            ops.push(WriteOp::Update {
                path: paths::user_private(user_id),
                data: json!({ "current_geo_index_path": new_path }),
            });
        }

        BucketTransition {
            ops,
            bucket: Some(bucket),
            index_path: Some(new_path),
            was_relocated,
        }
    }

    /// 写入或迁移用户的索引条目，单批提交
    pub async fn upsert(
        store: &Arc<dyn DocumentStore>,
        user_id: &str,
        coordinate: Coordinate,
        fields: &DenormalizedFields,
    ) -> Result<UpsertResult, AppError> {
        let private = load_private(store, user_id).await?;
        let geohash = geo::encode(coordinate.latitude, coordinate.longitude, STORAGE_PRECISION);

        let ghost_mode = private
            .as_ref()
            .map(|p| p.privacy_settings.ghost_mode)
            .unwrap_or(false);
        let previous_path = private
            .as_ref()
            .and_then(|p| p.current_geo_index_path.as_deref());

        let transition = Self::plan_transition(
            user_id,
            &geohash,
            fields,
            ghost_mode,
            previous_path,
            private.is_some(),
            Utc::now(),
        );

        let BucketTransition {
            ops,
            bucket,
            was_relocated,
            ..
        } = transition;
        if !ops.is_empty() {
            store.batch_write(ops).await?;
        }

        Ok(UpsertResult {
            geohash,
            bucket,
            was_relocated,
            suppressed: ghost_mode,
        })
    }

    /// 删除用户的当前索引条目并清掉记录的路径。幂等：无条目时直接成功
    pub async fn remove(store: &Arc<dyn DocumentStore>, user_id: &str) -> Result<(), AppError> {
        let Some(private) = load_private(store, user_id).await? else {
            return Ok(());
        };

        let mut ops = Vec::new();
        if let Some(path) = private.current_geo_index_path {
            if paths::bucket_of_entry(&path).is_some() {
                ops.push(WriteOp::Delete { path });
            } else {
                // 路径被写坏属于数据完整性故障，但删除流程照常把记录清掉
                tracing::error!("malformed geo index path for {}: {}", user_id, path);
            }
        }
        ops.push(WriteOp::Delete {
            path: paths::live_location(user_id),
        });
        ops.push(WriteOp::Update {
            path: paths::user_private(user_id),
            data: json!({ "current_geo_index_path": null }),
        });

        store.batch_write(ops).await?;
        Ok(())
    }

    /// 切换幽灵模式对索引的影响：开启即移除条目，
    /// 关闭不自动回填，下一次定位上报会重建条目
    pub async fn set_ghost_mode(
        store: &Arc<dyn DocumentStore>,
        user_id: &str,
        enabled: bool,
    ) -> Result<(), AppError> {
        if enabled {
            Self::remove(store, user_id).await
        } else {
            Ok(())
        }
    }

    /// 完整写入路径：资料检查、隐私评估、位置记录与索引迁移一次提交。
    ///
    /// 与并发读者之间没有跨批次隔离，读者可能在相邻两次提交之间看到
    /// 旧桶或新桶；同一用户的乱序上报按后写覆盖处理。
    pub async fn record_location(
        store: &Arc<dyn DocumentStore>,
        user_id: &str,
        update: &LocationUpdate,
    ) -> Result<LocationOutcome, AppError> {
        // 资料缺失立即失败，不触达索引
        let profile = load_public(store, user_id)
            .await?
            .ok_or_else(|| AppError::UserProfileNotFound(user_id.to_string()))?;
        let private = load_private(store, user_id).await?;

        let now = Utc::now();
        let coordinate = update.coordinate;
        let geohash = geo::encode(coordinate.latitude, coordinate.longitude, STORAGE_PRECISION);

        let ghost_mode = private
            .as_ref()
            .map(|p| p.privacy_settings.ghost_mode)
            .unwrap_or(false);
        let zone = private
            .as_ref()
            .and_then(|p| p.privacy_settings.zone_containing(coordinate));
        let in_privacy_zone = zone.is_some();

        // 位置记录始终写入（用户自己的客户端要用），
        // 幽灵模式只抑制对外可见的索引和实时流
        let mut ops = vec![WriteOp::Set {
            path: paths::location(user_id),
            data: json!({
                "user_id": user_id,
                "location": {
                    "latitude": coordinate.latitude,
                    "longitude": coordinate.longitude,
                    "accuracy": update.accuracy,
                    "altitude": update.altitude,
                    "heading": update.heading,
                    "speed": update.speed,
                    "timestamp": now,
                },
                "geohash": geohash,
                "movement_state": update.movement_state,
                "battery_level": update.battery_level,
                "location_method": update.location_method,
                "last_updated": now,
                "last_active": now,
                "in_privacy_zone": in_privacy_zone,
                "privacy_zone_id": zone.map(|z| z.zone_id.clone()),
            }),
        }];
        if ghost_mode {
            ops.push(WriteOp::Delete {
                path: paths::live_location(user_id),
            });
        } else {
            ops.push(WriteOp::Set {
                path: paths::live_location(user_id),
                data: json!({
                    "user_id": user_id,
                    "latitude": coordinate.latitude,
                    "longitude": coordinate.longitude,
                    "geohash": geohash,
                    "updated_at": now,
                }),
            });
        }

        let fields = DenormalizedFields::from(&profile);
        let previous_path = private
            .as_ref()
            .and_then(|p| p.current_geo_index_path.as_deref());
        let transition = Self::plan_transition(
            user_id,
            &geohash,
            &fields,
            ghost_mode,
            previous_path,
            private.is_some(),
            now,
        );
        ops.extend(transition.ops);

        store.batch_write(ops).await?;

        Ok(LocationOutcome {
            geohash,
            in_privacy_zone,
            ghost_mode,
        })
    }

    /// 退出登录：下线标记、清除索引条目、刷新活跃时间，单批提交
    pub async fn sign_out(store: &Arc<dyn DocumentStore>, user_id: &str) -> Result<(), AppError> {
        let Some(private) = load_private(store, user_id).await? else {
            return Ok(());
        };

        let now = Utc::now();
        let mut ops = vec![WriteOp::Update {
            path: paths::user_private(user_id),
            data: json!({
                "is_online": false,
                "current_geo_index_path": null,
                "last_active": now,
            }),
        }];

        if let Some(path) = private.current_geo_index_path {
            if paths::bucket_of_entry(&path).is_some() {
                ops.push(WriteOp::Delete { path });
            } else {
                tracing::error!("malformed geo index path for {}: {}", user_id, path);
            }
        }
        ops.push(WriteOp::Delete {
            path: paths::live_location(user_id),
        });

        let location_path = paths::location(user_id);
        if store.get(&location_path).await?.is_some() {
            ops.push(WriteOp::Update {
                path: location_path,
                data: json!({ "last_active": now }),
            });
        }

        store.batch_write(ops).await?;
        Ok(())
    }

    /// 更新隐私设置；开启幽灵模式时在同一批次里摘除索引条目
    pub async fn update_privacy(
        store: &Arc<dyn DocumentStore>,
        user_id: &str,
        ghost_mode: Option<bool>,
        privacy_zones: Option<Vec<crate::models::PrivacyZone>>,
    ) -> Result<crate::models::PrivacySettings, AppError> {
        let private = load_private(store, user_id)
            .await?
            .ok_or_else(|| AppError::UserProfileNotFound(user_id.to_string()))?;

        let settings = crate::models::PrivacySettings {
            ghost_mode: ghost_mode.unwrap_or(private.privacy_settings.ghost_mode),
            privacy_zones: privacy_zones.unwrap_or(private.privacy_settings.privacy_zones),
        };

        let mut update = json!({ "privacy_settings": settings });
        let mut ops = Vec::new();

        if settings.ghost_mode {
            if let Some(path) = private.current_geo_index_path {
                if paths::bucket_of_entry(&path).is_some() {
                    ops.push(WriteOp::Delete { path });
                }
            }
            ops.push(WriteOp::Delete {
                path: paths::live_location(user_id),
            });
            update["current_geo_index_path"] = serde_json::Value::Null;
        }
        ops.push(WriteOp::Update {
            path: paths::user_private(user_id),
            data: update,
        });

        store.batch_write(ops).await?;
        Ok(settings)
    }
}
