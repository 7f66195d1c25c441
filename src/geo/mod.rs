mod codec;
mod distance;
mod neighbors;

pub use codec::{DecodedGeohash, GeohashError, decode, encode, precision_for_radius};
pub use distance::{EARTH_RADIUS_KM, distance_km};
pub use neighbors::neighbors;
