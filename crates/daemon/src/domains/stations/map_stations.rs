use scraper::Html;
use slog::{debug, info, Logger};
use std::sync::Arc;
use time::{macros::format_description, OffsetDateTime, PrimitiveDateTime, UtcOffset};

use crate::{
    domains::{required, Wind},
    records::{parse_selector, table_records, Record},
    Error, PageFetcher, Session, Zone,
};

/// Present only on pages carrying current observations.
pub const STATION_PAGE_MARKER: &str = "Текущие метеоданные";
pub const STATION_TABLE_SELECTOR: &str = "table.datatable";

pub const STATION_NAME_FIELD: &str = "Станция";
pub const OBSERVED_AT_FIELD: &str = "Время наблюдения";
pub const WIND_FIELD: &str = "Ветер";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Station {
    pub name: String,
    pub observed_at: OffsetDateTime,
    pub wind: Wind,
}

/// Parses `DD.MM.YYYY HH:MM`, a wall-clock time at `source_offset`.
pub fn parse_observation_time(
    text: &str,
    source_offset: UtcOffset,
) -> Result<OffsetDateTime, time::error::Parse> {
    let format = format_description!("[day].[month].[year] [hour]:[minute]");
    Ok(PrimitiveDateTime::parse(text.trim(), format)?.assume_offset(source_offset))
}

/// One [`Station`] per record; the first bad record fails the whole batch.
pub fn map_stations(records: &[Record], source_offset: UtcOffset) -> Result<Vec<Station>, Error> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| -> Result<Station, Error> {
            let location = format!("station record {}", index);

            // Non-breaking spaces would hide the ", " separator
            let wind_text = required(record, WIND_FIELD, &location)?.replace('\u{a0}', " ");
            let name = required(record, STATION_NAME_FIELD, &location)?;
            let observed_text = required(record, OBSERVED_AT_FIELD, &location)?;
            let observed_at =
                parse_observation_time(observed_text, source_offset).map_err(|e| Error::Parse {
                    location: location.clone(),
                    field: OBSERVED_AT_FIELD.to_string(),
                    reason: format!("`{}` is not DD.MM.YYYY HH:MM: {}", observed_text, e),
                })?;

            Ok(Station {
                name: name.to_string(),
                observed_at,
                wind: Wind::parse(&wind_text),
            })
        })
        .collect()
}

/// Records of the station table on a zone page.
pub fn parse_station_page(body: &str, zone: Zone) -> Result<Vec<Record>, Error> {
    if !body.contains(STATION_PAGE_MARKER) {
        return Err(Error::IncorrectPage {
            zone,
            marker: STATION_PAGE_MARKER,
        });
    }

    let document = Html::parse_document(body);
    let selector = parse_selector(STATION_TABLE_SELECTOR)?;
    let table = document
        .select(&selector)
        .next()
        .ok_or(Error::TableNotFound {
            zone,
            selector: STATION_TABLE_SELECTOR,
        })?;

    // The station table starts straight with its header row
    table_records(table, 0)
}

pub struct StationService {
    pub logger: Logger,
    pub fetcher: Arc<PageFetcher>,
    pub source_offset: UtcOffset,
}

impl StationService {
    pub fn new(logger: Logger, fetcher: Arc<PageFetcher>, source_offset: UtcOffset) -> Self {
        StationService {
            logger,
            fetcher,
            source_offset,
        }
    }

    pub async fn get_stations(
        &self,
        session: &Session,
        zone: Zone,
    ) -> Result<Vec<Station>, Error> {
        let body = self.fetcher.fetch(session, zone).await?;
        let records = parse_station_page(&body, zone)?;
        debug!(self.logger, "station rows: {}", records.len(); "zone" => %zone);

        let stations = map_stations(&records, self.source_offset)?;
        info!(self.logger, "parsed {} stations", stations.len(); "zone" => %zone);
        Ok(stations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{datetime, offset};

    fn record(name: &str, time: &str, wind: &str) -> Record {
        [
            (STATION_NAME_FIELD, name),
            (OBSERVED_AT_FIELD, time),
            (WIND_FIELD, wind),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn maps_single_station() {
        let stations = map_stations(
            &[record("Владивосток", "01.01.2024 09:00", "СВ, 5 м/с")],
            offset!(+10),
        )
        .unwrap();

        assert_eq!(
            stations,
            vec![Station {
                name: String::from("Владивосток"),
                observed_at: datetime!(2024-01-01 09:00 +10),
                wind: Wind {
                    speed: String::from("5 м/с"),
                    direction: Some(String::from("СВ")),
                },
            }]
        );
        assert_eq!(stations[0].observed_at.unix_timestamp(), 1_704_063_600);
    }

    #[test]
    fn calm_has_no_direction() {
        let stations =
            map_stations(&[record("Ольга", "15.07.2024 21:30", "штиль")], offset!(+10)).unwrap();
        assert_eq!(stations[0].wind.direction, None);
        assert_eq!(stations[0].wind.speed, "штиль");
    }

    #[test]
    fn non_breaking_space_after_comma_still_splits() {
        let stations = map_stations(
            &[record("Посьет", "15.07.2024 21:30", "З,\u{a0}3 м/с")],
            offset!(+10),
        )
        .unwrap();
        assert_eq!(stations[0].wind.direction.as_deref(), Some("З"));
        assert_eq!(stations[0].wind.speed, "3 м/с");
    }

    #[test]
    fn bad_timestamp_fails_whole_batch() {
        let result = map_stations(
            &[
                record("Находка", "01.01.2024 09:00", "С, 2 м/с"),
                record("Врангель", "2024-01-01 09:00", "С, 2 м/с"),
            ],
            offset!(+10),
        );

        match result {
            Err(Error::Parse {
                location, field, ..
            }) => {
                assert_eq!(location, "station record 1");
                assert_eq!(field, OBSERVED_AT_FIELD);
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn missing_column_names_the_field() {
        let record: Record = [(STATION_NAME_FIELD, "Вера"), (WIND_FIELD, "Ю, 1 м/с")]
            .into_iter()
            .collect();
        match map_stations(&[record], offset!(+10)) {
            Err(Error::Parse { field, .. }) => assert_eq!(field, OBSERVED_AT_FIELD),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn station_page_needs_marker() {
        let body = r#"<html><body><table class="datatable"></table></body></html>"#;
        assert!(matches!(
            parse_station_page(body, Zone::Vera),
            Err(Error::IncorrectPage {
                zone: Zone::Vera,
                marker: STATION_PAGE_MARKER
            })
        ));
    }

    #[test]
    fn station_page_without_table() {
        let body = "<html><body><h1>Текущие метеоданные</h1></body></html>";
        assert!(matches!(
            parse_station_page(body, Zone::Olga),
            Err(Error::TableNotFound { .. })
        ));
    }

    #[test]
    fn station_page_end_to_end() {
        let body = r#"<html><body>
            <h1>Текущие метеоданные</h1>
            <table class="datatable">
                <tr><th>Станция</th><th>Время наблюдения</th><th>Ветер</th></tr>
                <tr><td>Владивосток</td><td>01.01.2024 09:00</td><td>СВ, 5 м/с</td></tr>
            </table>
            <table class="datatable">
                <tr><th>ignored</th></tr>
                <tr><td>second table</td></tr>
            </table>
        </body></html>"#;

        let records = parse_station_page(body, Zone::Vladivostok).unwrap();
        let stations = map_stations(&records, offset!(+10)).unwrap();

        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].name, "Владивосток");
        assert_eq!(stations[0].observed_at, datetime!(2024-01-01 09:00 +10));
        assert_eq!(stations[0].wind.direction.as_deref(), Some("СВ"));
        assert_eq!(stations[0].wind.speed, "5 м/с");
    }
}
