use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Format tried first for the `date` column, e.g. `05-Jan-24`.
const PRIMARY_DATE_FORMAT: &str = "%d-%b-%y";

const GENERIC_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y_%m_%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d-%b-%Y",
];

const GENERIC_DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

const NORMALIZED_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("file is not valid utf-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("line {line}: expected {expected} fields, found {found}")]
    RowWidth {
        line: u64,
        expected: usize,
        found: usize,
    },
}

/// How the `date` column ended up after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateColumn {
    Absent,
    Primary,
    Generic,
    Unparsed,
}

/// Header plus string cells of a delimited file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl CsvTable {
    /// Decode `bytes` as UTF-8 and read them as comma-separated values with
    /// a header row. Short rows are padded with empty cells.
    pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        let text = std::str::from_utf8(bytes)?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = reader
            .headers()?
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.len() > headers.len() {
                return Err(ParseError::RowWidth {
                    line: record.position().map(|pos| pos.line()).unwrap_or(0),
                    expected: headers.len(),
                    found: record.len(),
                });
            }
            let mut row = record.iter().map(ToString::to_string).collect::<Vec<_>>();
            row.resize(headers.len(), String::new());
            rows.push(row);
        }
        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    pub fn missing_columns<'n>(&self, required: &[&'n str]) -> Vec<&'n str> {
        required
            .iter()
            .filter(|name| self.column_index(name).is_none())
            .copied()
            .collect()
    }

    /// Rewrite the `date` column as `YYYY-MM-DD`.
    ///
    /// The whole column must parse with the primary format, otherwise with
    /// the generic formats; if neither works the column is left untouched.
    /// Empty cells are ignored.
    pub fn normalize_date_column(&mut self) -> DateColumn {
        let Some(index) = self.column_index("date") else {
            return DateColumn::Absent;
        };
        let values = self
            .rows
            .iter()
            .map(|row| row[index].trim())
            .collect::<Vec<_>>();

        let (parsed, outcome) = match parse_all(&values, parse_primary_date) {
            Some(parsed) => (parsed, DateColumn::Primary),
            None => match parse_all(&values, parse_generic_date) {
                Some(parsed) => (parsed, DateColumn::Generic),
                None => return DateColumn::Unparsed,
            },
        };

        for (row, date) in self.rows.iter_mut().zip(parsed) {
            if let Some(date) = date {
                row[index] = date.format(NORMALIZED_DATE_FORMAT).to_string();
            }
        }
        outcome
    }
}

fn parse_all(
    values: &[&str],
    parse: fn(&str) -> Option<NaiveDate>,
) -> Option<Vec<Option<NaiveDate>>> {
    values
        .iter()
        .map(|value| {
            if value.is_empty() {
                Some(None)
            } else {
                parse(value).map(Some)
            }
        })
        .collect()
}

fn parse_primary_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, PRIMARY_DATE_FORMAT).ok()
}

fn parse_generic_date(value: &str) -> Option<NaiveDate> {
    GENERIC_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .or_else(|| {
            GENERIC_DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
                .map(|datetime| datetime.date())
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|datetime| datetime.date_naive())
        })
}

/// Token counts: integers as-is, decimals truncated, anything else 0.
pub fn parse_token_count(value: &str) -> i64 {
    let value = value.trim();
    if value.is_empty() {
        return 0;
    }
    if let Ok(parsed) = value.parse::<i64>() {
        return parsed;
    }
    match value.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() => parsed.trunc() as i64,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_format_wins_when_whole_column_matches() {
        let mut table = CsvTable::parse(b"date,client_id\n05-Jan-24,c1\n06-Jan-24,c2\n")
            .expect("parse");
        assert_eq!(table.normalize_date_column(), DateColumn::Primary);
        assert_eq!(table.rows()[0][0], "2024-01-05");
        assert_eq!(table.rows()[1][0], "2024-01-06");
    }

    #[test]
    fn mixed_column_falls_back_to_generic_formats() {
        let mut table =
            CsvTable::parse(b"date,client_id\n2024-01-05,c1\n2024/01/06,c2\n").expect("parse");
        assert_eq!(table.normalize_date_column(), DateColumn::Generic);
        assert_eq!(table.rows()[1][0], "2024-01-06");
    }

    #[test]
    fn unparseable_column_is_left_alone() {
        let mut table =
            CsvTable::parse(b"date,client_id\nyesterday,c1\n2024-01-06,c2\n").expect("parse");
        assert_eq!(table.normalize_date_column(), DateColumn::Unparsed);
        assert_eq!(table.rows()[0][0], "yesterday");
        assert_eq!(table.rows()[1][0], "2024-01-06");
    }

    #[test]
    fn short_rows_are_padded_and_long_rows_rejected() {
        let table = CsvTable::parse(b"a,b,c\n1,2\n").expect("parse");
        assert_eq!(table.rows()[0], vec!["1", "2", ""]);
        assert!(matches!(
            CsvTable::parse(b"a,b\n1,2,3\n"),
            Err(ParseError::RowWidth { found: 3, .. })
        ));
    }

    #[test]
    fn invalid_utf8_is_a_parse_error() {
        assert!(matches!(
            CsvTable::parse(&[b'a', b'\n', 0xff, b'\n']),
            Err(ParseError::Utf8(_))
        ));
    }

    #[test]
    fn token_counts_default_to_zero() {
        assert_eq!(parse_token_count("1200"), 1200);
        assert_eq!(parse_token_count("12.9"), 12);
        assert_eq!(parse_token_count(""), 0);
        assert_eq!(parse_token_count("n/a"), 0);
        assert_eq!(parse_token_count("nan"), 0);
    }

    #[test]
    fn missing_columns_lists_required_names_in_order() {
        let table = CsvTable::parse(b"date,client_name\n").expect("parse");
        assert!(table.is_empty());
        assert_eq!(
            table.missing_columns(&["date", "client_id", "service_name"]),
            vec!["client_id", "service_name"]
        );
    }
}
