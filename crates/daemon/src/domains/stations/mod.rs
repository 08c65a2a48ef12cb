mod map_stations;

pub use map_stations::*;
