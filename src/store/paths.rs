//! 集合名与文档路径约定

/// 公开资料集合
pub const USERS_PUBLIC: &str = "users_public";

/// 私有资料集合
pub const USERS_PRIVATE: &str = "users_private";

/// 当前位置记录集合
pub const LOCATIONS: &str = "locations";

/// 空间索引根集合
pub const GEO_INDEX: &str = "geo_index";

/// 实时位置流集合
pub const LIVE_LOCATIONS: &str = "live_locations";

/// 公开资料文档路径
pub fn user_public(user_id: &str) -> String {
    format!("{}/{}", USERS_PUBLIC, user_id)
}

/// 私有资料文档路径
pub fn user_private(user_id: &str) -> String {
    format!("{}/{}", USERS_PRIVATE, user_id)
}

/// 位置记录文档路径
pub fn location(user_id: &str) -> String {
    format!("{}/{}", LOCATIONS, user_id)
}

/// 实时位置行文档路径
pub fn live_location(user_id: &str) -> String {
    format!("{}/{}", LIVE_LOCATIONS, user_id)
}

/// 某个桶对应的索引子集合
pub fn geo_bucket(bucket: &str) -> String {
    format!("{}/{}/users", GEO_INDEX, bucket)
}

/// 桶内某用户的索引条目路径
pub fn geo_entry(bucket: &str, user_id: &str) -> String {
    format!("{}/{}/users/{}", GEO_INDEX, bucket, user_id)
}

/// 从索引条目路径中取出桶前缀，形状不对时返回 None
pub fn bucket_of_entry(path: &str) -> Option<&str> {
    let mut parts = path.split('/');
    match (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) {
        (Some(root), Some(bucket), Some(kind), Some(_), None)
            if root == GEO_INDEX && kind == "users" =>
        {
            Some(bucket)
        }
        _ => None,
    }
}
