//! Record parsing and column-equality filtering
//!
//! Lines are tab-separated with a fixed positional schema. No quoting or
//! escaping is supported; IMDb marks missing values with a literal `\N`.

use std::fmt;

pub const FIELD_SEPARATOR: char = '\t';

/// Positional columns of `title.basics.tsv`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Id,
    TitleType,
    PrimaryTitle,
    OriginalTitle,
    IsAdult,
    StartYear,
    EndYear,
    RuntimeMinutes,
    Genres,
}

impl Column {
    pub const fn index(self) -> usize {
        match self {
            Column::Id => 0,
            Column::TitleType => 1,
            Column::PrimaryTitle => 2,
            Column::OriginalTitle => 3,
            Column::IsAdult => 4,
            Column::StartYear => 5,
            Column::EndYear => 6,
            Column::RuntimeMinutes => 7,
            Column::Genres => 8,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Column::Id => "tconst",
            Column::TitleType => "titleType",
            Column::PrimaryTitle => "primaryTitle",
            Column::OriginalTitle => "originalTitle",
            Column::IsAdult => "isAdult",
            Column::StartYear => "startYear",
            Column::EndYear => "endYear",
            Column::RuntimeMinutes => "runtimeMinutes",
            Column::Genres => "genres",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Columns every stored row needs, whatever the filters
pub const ROW_COLUMNS: [Column; 2] = [Column::Id, Column::PrimaryTitle];

/// One parsed line, borrowing from its data unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record<'a> {
    fields: Vec<&'a str>,
}

impl<'a> Record<'a> {
    pub fn parse(line: &'a str) -> Self {
        Self {
            fields: line.split(FIELD_SEPARATOR).collect(),
        }
    }

    /// Bounds-checked column access; short records yield `None`
    pub fn get(&self, column: Column) -> Option<&'a str> {
        self.fields.get(column.index()).copied()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn id(&self) -> Option<&'a str> {
        self.get(Column::Id)
    }

    pub fn title(&self) -> Option<&'a str> {
        self.get(Column::PrimaryTitle)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: Column,
    pub expected: String,
}

impl Filter {
    pub fn new(column: Column, expected: impl Into<String>) -> Self {
        Self {
            column,
            expected: expected.into(),
        }
    }

    pub fn matches(&self, record: &Record<'_>) -> bool {
        record.get(self.column) == Some(self.expected.as_str())
    }
}

/// Ordered conjunction of column-equality filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    filters: Vec<Filter>,
}

impl FilterSet {
    pub fn new(filters: Vec<Filter>) -> Self {
        Self { filters }
    }

    pub fn push(&mut self, filter: Filter) {
        self.filters.push(filter);
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Smallest field count a record needs to be considered at all
    pub fn required_fields(&self) -> usize {
        self.filters
            .iter()
            .map(|f| f.column)
            .chain(ROW_COLUMNS)
            .map(|c| c.index() + 1)
            .max()
            .unwrap_or(0)
    }

    /// `true` iff every filter holds. Stops at the first mismatch; a record
    /// missing a filtered column never matches.
    pub fn matches(&self, record: &Record<'_>) -> bool {
        self.filters.iter().all(|filter| filter.matches(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOVIE: &str = "tt1\tmovie\tA\tA\t\\N\t2000\t\\N\t90\tDrama";

    #[test]
    fn test_column_indices_follow_schema() {
        assert_eq!(Column::Id.index(), 0);
        assert_eq!(Column::TitleType.index(), 1);
        assert_eq!(Column::PrimaryTitle.index(), 2);
        assert_eq!(Column::OriginalTitle.index(), 3);
        assert_eq!(Column::StartYear.index(), 5);
        assert_eq!(Column::EndYear.index(), 6);
        assert_eq!(Column::RuntimeMinutes.index(), 7);
        assert_eq!(Column::Genres.index(), 8);
    }

    #[test]
    fn test_parse_and_access() {
        let record = Record::parse(MOVIE);
        assert_eq!(record.len(), 9);
        assert_eq!(record.id(), Some("tt1"));
        assert_eq!(record.title(), Some("A"));
        assert_eq!(record.get(Column::Genres), Some("Drama"));
    }

    #[test]
    fn test_empty_filter_set_matches_everything() {
        assert!(FilterSet::default().matches(&Record::parse(MOVIE)));
        assert!(FilterSet::default().matches(&Record::parse("")));
    }

    #[test]
    fn test_all_filters_must_hold() {
        let record = Record::parse(MOVIE);
        let filters = FilterSet::new(vec![
            Filter::new(Column::TitleType, "movie"),
            Filter::new(Column::StartYear, "2000"),
        ]);
        assert!(filters.matches(&record));

        let filters = FilterSet::new(vec![
            Filter::new(Column::TitleType, "movie"),
            Filter::new(Column::Genres, "Comedy"),
        ]);
        assert!(!filters.matches(&record));
    }

    #[test]
    fn test_short_record_never_matches() {
        let record = Record::parse("tt9\tmovie\tShort");
        let filters = FilterSet::new(vec![
            Filter::new(Column::TitleType, "movie"),
            Filter::new(Column::Genres, "Drama"),
        ]);
        assert!(!filters.matches(&record));
    }

    #[test]
    fn test_filter_matches_null_marker_literally() {
        let record = Record::parse(MOVIE);
        assert!(Filter::new(Column::EndYear, "\\N").matches(&record));
    }

    #[test]
    fn test_required_fields() {
        assert_eq!(FilterSet::default().required_fields(), 3);
        let filters = FilterSet::new(vec![Filter::new(Column::Genres, "Drama")]);
        assert_eq!(filters.required_fields(), 9);
    }

    #[test]
    fn test_column_display_uses_header_name() {
        assert_eq!(Column::RuntimeMinutes.to_string(), "runtimeMinutes");
    }
}
