use thiserror::Error;

// geohash base32 字母表（不含 a i l o）
const BASE32_CHARS: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

#[derive(Debug, Error, PartialEq)]
pub enum GeohashError {
    #[error("invalid geohash character {0:?}")]
    InvalidCharacter(char),
}

/// 解码结果：单元格中心点和半宽误差
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedGeohash {
    pub latitude: f64,
    pub longitude: f64,
    pub latitude_error: f64,
    pub longitude_error: f64,
}

/// 将经纬度编码为指定长度的 geohash。
///
/// 区间二分，从经度开始交替细分，每 5 位输出一个 base32 字符。
/// 调用方负责保证坐标已在有效范围内；precision 为 0 时返回空串。
pub fn encode(latitude: f64, longitude: f64, precision: usize) -> String {
    let mut is_even = true;
    let (mut lat_min, mut lat_max) = (-90.0_f64, 90.0_f64);
    let (mut lng_min, mut lng_max) = (-180.0_f64, 180.0_f64);
    let mut bit = 0u32;
    let mut ch = 0usize;
    let mut geohash = String::with_capacity(precision);

    while geohash.len() < precision {
        if is_even {
            let mid = (lng_min + lng_max) / 2.0;
            if longitude >= mid {
                ch |= 1 << (4 - bit);
                lng_min = mid;
            } else {
                lng_max = mid;
            }
        } else {
            let mid = (lat_min + lat_max) / 2.0;
            if latitude >= mid {
                ch |= 1 << (4 - bit);
                lat_min = mid;
            } else {
                lat_max = mid;
            }
        }

        is_even = !is_even;

        if bit < 4 {
            bit += 1;
        } else {
            geohash.push(BASE32_CHARS[ch] as char);
            bit = 0;
            ch = 0;
        }
    }

    geohash
}

/// 将 geohash 解码为单元格中心点及误差范围。
///
/// 与 encode 保持相同的起始奇偶性（经度在前），否则往返不一致。
pub fn decode(geohash: &str) -> Result<DecodedGeohash, GeohashError> {
    let mut is_even = true;
    let (mut lat_min, mut lat_max) = (-90.0_f64, 90.0_f64);
    let (mut lng_min, mut lng_max) = (-180.0_f64, 180.0_f64);

    for c in geohash.chars() {
        let cd = BASE32_CHARS
            .iter()
            .position(|&b| b as char == c)
            .ok_or(GeohashError::InvalidCharacter(c))?;

        for j in (0..5).rev() {
            let mask = 1usize << j;

            if is_even {
                if cd & mask != 0 {
                    lng_min = (lng_min + lng_max) / 2.0;
                } else {
                    lng_max = (lng_min + lng_max) / 2.0;
                }
            } else {
                if cd & mask != 0 {
                    lat_min = (lat_min + lat_max) / 2.0;
                } else {
                    lat_max = (lat_min + lat_max) / 2.0;
                }
            }

            is_even = !is_even;
        }
    }

    Ok(DecodedGeohash {
        latitude: (lat_min + lat_max) / 2.0,
        longitude: (lng_min + lng_max) / 2.0,
        latitude_error: (lat_max - lat_min) / 2.0,
        longitude_error: (lng_max - lng_min) / 2.0,
    })
}

// 赤道附近各精度对应的近似单元格宽度
const PRECISION_WIDTHS_KM: [(usize, f64); 9] = [
    (1, 5000.0),
    (2, 1250.0),
    (3, 156.0),
    (4, 39.0),
    (5, 4.9),
    (6, 1.2),
    (7, 0.152),
    (8, 0.038),
    (9, 0.005),
];

/// 给定查询半径，返回建议的 geohash 精度
pub fn precision_for_radius(radius_km: f64) -> usize {
    for (precision, width_km) in PRECISION_WIDTHS_KM {
        if radius_km > width_km {
            return precision.max(1);
        }
    }
    9
}
