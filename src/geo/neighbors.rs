use super::codec::{GeohashError, decode, encode};

/// 计算同精度的 8 个相邻单元格。
///
/// 先解码得到中心点和误差，再按 8 个罗盘方向平移两倍误差后重新编码。
/// 这种近似在极点和反子午线附近可能丢失单元格，属于既定行为而非缺陷；
/// 越界的候选点会被直接丢弃。
pub fn neighbors(geohash: &str) -> Result<Vec<String>, GeohashError> {
    let precision = geohash.chars().count();
    let center = decode(geohash)?;

    let lat_delta = center.latitude_error * 2.0;
    let lng_delta = center.longitude_error * 2.0;

    // 北、东北、东、东南、南、西南、西、西北
    let candidates = [
        (center.latitude + lat_delta, center.longitude),
        (center.latitude + lat_delta, center.longitude + lng_delta),
        (center.latitude, center.longitude + lng_delta),
        (center.latitude - lat_delta, center.longitude + lng_delta),
        (center.latitude - lat_delta, center.longitude),
        (center.latitude - lat_delta, center.longitude - lng_delta),
        (center.latitude, center.longitude - lng_delta),
        (center.latitude + lat_delta, center.longitude - lng_delta),
    ];

    let mut result = Vec::with_capacity(8);
    for (lat, lng) in candidates {
        if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng) {
            result.push(encode(lat, lng, precision));
        }
    }

    Ok(result)
}
