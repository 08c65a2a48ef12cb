//! Turns `<table>` markup into ordered field → text records.
//!
//! The first row after any title rows is the header; its cell texts become
//! the field names. Every following row is paired with the header by cell
//! position, never by text.
//!
//! Known limitation: header names are assumed unique. When a table repeats a
//! header, [`Record::get`] returns the right-most column with that name.

use scraper::{ElementRef, Html, Selector};

use crate::Error;

/// Number of decorative rows above the header in forecast tables.
pub const TITLE_ROWS: usize = 1;

/// One table row keyed by header text, in column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .rev()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Records of every table matching `table_selector`, in document order.
pub fn extract_records(markup: &str, table_selector: &str) -> Result<Vec<Record>, Error> {
    let document = Html::parse_document(markup);
    let selector = parse_selector(table_selector)?;

    let mut records = vec![];
    for table in document.select(&selector) {
        records.extend(table_records(table, TITLE_ROWS)?);
    }
    Ok(records)
}

/// Records of a single table element, skipping `title_rows` rows above the header.
///
/// A table without a header row yields no records.
pub fn table_records(table: ElementRef<'_>, title_rows: usize) -> Result<Vec<Record>, Error> {
    let mut rows = own_rows(table)?.into_iter().skip(title_rows);
    let Some(header_row) = rows.next() else {
        return Ok(vec![]);
    };
    let header: Vec<String> = cells(header_row).iter().map(text_content).collect();

    rows.enumerate()
        .map(|(row, tr)| -> Result<Record, Error> {
            let values: Vec<String> = cells(tr).iter().map(text_content).collect();
            if values.len() != header.len() {
                return Err(Error::MalformedRow {
                    row,
                    expected: header.len(),
                    found: values.len(),
                });
            }
            Ok(header.iter().cloned().zip(values).collect())
        })
        .collect()
}

pub(crate) fn parse_selector(selector: &str) -> Result<Selector, Error> {
    Selector::parse(selector).map_err(|_| Error::Selector(selector.to_string()))
}

pub(crate) fn text_content(element: &ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join("").trim().to_string()
}

// Rows of `table` itself; rows of nested tables are left out.
fn own_rows(table: ElementRef<'_>) -> Result<Vec<ElementRef<'_>>, Error> {
    let tr = parse_selector("tr")?;
    Ok(table
        .select(&tr)
        .filter(|row| {
            row.ancestors()
                .filter_map(ElementRef::wrap)
                .find(|el| el.value().name() == "table")
                .map(|el| el.id())
                == Some(table.id())
        })
        .collect())
}

fn cells(row: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| matches!(el.value().name(), "td" | "th"))
        .collect()
}
