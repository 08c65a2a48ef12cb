use scraper::{ElementRef, Html};
use slog::{debug, info, Logger};
use std::sync::Arc;

use crate::{
    domains::{required, Wind},
    records::{parse_selector, table_records, text_content, Record, TITLE_ROWS},
    Error, PageFetcher, Session, Zone,
};

/// Present only on pages carrying the forecast tables.
pub const FORECAST_PAGE_MARKER: &str = "Прогноз погоды";
pub const FORECAST_TABLE_SELECTOR: &str = "span.datatable > table";
const SECTION_HEADER_SELECTOR: &str = "div.section_header";

pub const PERIOD_FIELD: &str = "Период прогноза";
pub const WIND_DIRECTION_FIELD: &str = "Направление ветра";
pub const WIND_SPEED_FIELD: &str = "Скорость ветра";
pub const SKY_FIELD: &str = "Атмосферные явления";
pub const PRECIPITATION_FIELD: &str = "Осадки";
pub const VISIBILITY_FIELD: &str = "Видимость";
pub const WAVE_HEIGHT_FIELD: &str = "Высота волн";
pub const TEMPERATURE_FIELD: &str = "Температура воздуха";

/// Period label of night rows; every other label is daytime.
pub const NIGHT_MARKER: &str = "Ночь";
const TEMPERATURE_UNIT: &str = " °C";
const RANGE_SEPARATOR: &str = "...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForecastPeriod {
    Day,
    Night,
}

impl ForecastPeriod {
    pub fn from_label(label: Option<&str>) -> Self {
        match label {
            Some(NIGHT_MARKER) => ForecastPeriod::Night,
            _ => ForecastPeriod::Day,
        }
    }
}

/// Air temperature bounds in °C, in the order the page lists them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemperatureRange {
    pub low: i32,
    pub high: i32,
}

impl TemperatureRange {
    /// Parses `"<low>...<high> °C"`.
    pub fn parse(text: &str) -> Result<Self, String> {
        let bounds = text.replace(TEMPERATURE_UNIT, "");
        let parts: Vec<&str> = bounds.split(RANGE_SEPARATOR).collect();
        let [low, high] = parts.as_slice() else {
            return Err(format!("`{}` is not <low>...<high> °C", text));
        };
        let bound = |value: &str| {
            value
                .trim()
                .parse::<i32>()
                .map_err(|e| format!("`{}` has a bad bound `{}`: {}", text, value, e))
        };
        Ok(TemperatureRange {
            low: bound(*low)?,
            high: bound(*high)?,
        })
    }

    /// The page does not guarantee `low <= high`.
    pub fn is_ordered(&self) -> bool {
        self.low <= self.high
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodForecast {
    pub period: ForecastPeriod,
    pub wind: Wind,
    pub sky: String,
    pub precipitation: String,
    pub visibility: String,
    pub wave_height: String,
    pub temperature: TemperatureRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneForecast {
    pub zone_name: String,
    pub day: Option<PeriodForecast>,
    pub night: Option<PeriodForecast>,
}

impl ZoneForecast {
    pub fn new(zone_name: String) -> Self {
        Self {
            zone_name,
            day: None,
            night: None,
        }
    }

    /// Puts `forecast` in its period slot, replacing an earlier one.
    pub fn set(&mut self, forecast: PeriodForecast) {
        match forecast.period {
            ForecastPeriod::Day => self.day = Some(forecast),
            ForecastPeriod::Night => self.night = Some(forecast),
        }
    }
}

/// Forecast rows of one sea zone, titled by its section header.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneTable {
    pub zone_name: String,
    pub records: Vec<Record>,
}

pub fn map_period(record: &Record, location: &str) -> Result<PeriodForecast, Error> {
    let direction = required(record, WIND_DIRECTION_FIELD, location)?;
    let speed = required(record, WIND_SPEED_FIELD, location)?;
    let sky = required(record, SKY_FIELD, location)?;
    let precipitation = required(record, PRECIPITATION_FIELD, location)?;
    let visibility = required(record, VISIBILITY_FIELD, location)?;
    let wave_height = required(record, WAVE_HEIGHT_FIELD, location)?;
    let temperature_text = required(record, TEMPERATURE_FIELD, location)?;

    let temperature = TemperatureRange::parse(temperature_text).map_err(|reason| Error::Parse {
        location: location.to_string(),
        field: TEMPERATURE_FIELD.to_string(),
        reason,
    })?;

    Ok(PeriodForecast {
        period: ForecastPeriod::from_label(record.get(PERIOD_FIELD)),
        wind: Wind {
            speed: speed.to_string(),
            direction: Some(direction.to_string()),
        },
        sky: sky.to_string(),
        precipitation: precipitation.to_string(),
        visibility: visibility.to_string(),
        wave_height: wave_height.to_string(),
        temperature,
    })
}

/// One [`ZoneForecast`] per table, in input order.
pub fn map_forecasts(zones: &[ZoneTable]) -> Result<Vec<ZoneForecast>, Error> {
    let mut forecasts = Vec::with_capacity(zones.len());
    for zone in zones {
        let mut forecast = ZoneForecast::new(zone.zone_name.clone());
        for (index, record) in zone.records.iter().enumerate() {
            let location = format!("zone `{}` record {}", zone.zone_name, index);
            forecast.set(map_period(record, &location)?);
        }
        forecasts.push(forecast);
    }
    Ok(forecasts)
}

/// Forecast tables on a zone page, each named after its section header.
pub fn parse_forecast_page(body: &str, zone: Zone) -> Result<Vec<ZoneTable>, Error> {
    if !body.contains(FORECAST_PAGE_MARKER) {
        return Err(Error::IncorrectPage {
            zone,
            marker: FORECAST_PAGE_MARKER,
        });
    }

    let document = Html::parse_document(body);
    let tables = parse_selector(FORECAST_TABLE_SELECTOR)?;
    let header = parse_selector(SECTION_HEADER_SELECTOR)?;

    let parsed = document
        .select(&tables)
        .enumerate()
        .map(|(index, table)| -> Result<ZoneTable, Error> {
            let zone_name = table
                .parent()
                .and_then(ElementRef::wrap)
                .and_then(|span| span.select(&header).next())
                .map(|title| text_content(&title))
                .ok_or_else(|| Error::Parse {
                    location: format!("forecast table {} of zone {}", index, zone),
                    field: SECTION_HEADER_SELECTOR.to_string(),
                    reason: String::from("is missing"),
                })?;

            Ok(ZoneTable {
                zone_name,
                records: table_records(table, TITLE_ROWS)?,
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;

    Ok(collapse_by_name(parsed))
}

/// Keeps one table per zone name: a repeated name replaces the earlier
/// table's rows but keeps its position.
fn collapse_by_name(tables: Vec<ZoneTable>) -> Vec<ZoneTable> {
    let mut unique: Vec<ZoneTable> = Vec::with_capacity(tables.len());
    for table in tables {
        match unique.iter_mut().find(|seen| seen.zone_name == table.zone_name) {
            Some(seen) => seen.records = table.records,
            None => unique.push(table),
        }
    }
    unique
}

pub struct ForecastService {
    pub logger: Logger,
    pub fetcher: Arc<PageFetcher>,
}

impl ForecastService {
    pub fn new(logger: Logger, fetcher: Arc<PageFetcher>) -> Self {
        ForecastService { logger, fetcher }
    }

    pub async fn get_forecasts(
        &self,
        session: &Session,
        zone: Zone,
    ) -> Result<Vec<ZoneForecast>, Error> {
        let body = self.fetcher.fetch(session, zone).await?;
        let tables = parse_forecast_page(&body, zone)?;
        debug!(self.logger, "forecast tables: {}", tables.len(); "zone" => %zone);

        let forecasts = map_forecasts(&tables)?;
        info!(self.logger, "parsed {} zone forecasts", forecasts.len(); "zone" => %zone);
        Ok(forecasts)
    }
}
