mod map_forecasts;

pub use map_forecasts::*;
