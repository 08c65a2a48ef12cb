pub mod forecasts;
pub mod stations;

pub use forecasts::*;
pub use stations::*;

use crate::{records::Record, Error};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wind {
    pub speed: String,
    pub direction: Option<String>,
}

impl Wind {
    /// Splits `"<direction>, <speed>"`; anything else is taken as a bare speed.
    pub fn parse(text: &str) -> Self {
        let parts: Vec<&str> = text.split(", ").collect();
        match parts.as_slice() {
            [direction, speed] => Wind {
                speed: speed.to_string(),
                direction: Some(direction.to_string()),
            },
            _ => Wind {
                speed: text.to_string(),
                direction: None,
            },
        }
    }
}

pub(crate) fn required<'a>(
    record: &'a Record,
    field: &str,
    location: &str,
) -> Result<&'a str, Error> {
    record
        .get(field)
        .ok_or_else(|| Error::missing_field(location, field))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_and_speed() {
        assert_eq!(
            Wind::parse("СВ, 5 м/с"),
            Wind {
                speed: String::from("5 м/с"),
                direction: Some(String::from("СВ")),
            }
        );
    }

    #[test]
    fn speed_only() {
        for text in ["штиль", "5 м/с", "", "С,5 м/с"] {
            let wind = Wind::parse(text);
            assert_eq!(wind.direction, None);
            assert_eq!(wind.speed, text);
        }
    }

    #[test]
    fn more_than_one_separator_is_kept_whole() {
        let wind = Wind::parse("С, СЗ, 7 м/с");
        assert_eq!(wind.direction, None);
        assert_eq!(wind.speed, "С, СЗ, 7 м/с");
    }
}
