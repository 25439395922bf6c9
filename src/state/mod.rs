use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

use crate::api::{Artwork, PageRequest};

pub const ALLOWED_PAGE_SIZES: [u64; 4] = [12, 25, 50, 100];
pub const DEFAULT_PAGE_SIZE: u64 = 12;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("invalid page size {value}, expected one of 12, 25, 50, 100")]
    InvalidPageSize { value: u64 },

    #[error("invalid page {value}, pages start at 1")]
    InvalidPage { value: u64 },

    #[error("page {value} is out of range")]
    PageOutOfRange { value: u64 },

    #[error("unknown sort field '{value}'")]
    UnknownSortField { value: String },

    #[error("unknown sort direction '{value}', expected asc or desc")]
    UnknownSortDirection { value: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Title,
    ArtistDisplay,
    PlaceOfOrigin,
    DateStart,
    DateEnd,
}

impl SortField {
    pub fn parse(value: &str) -> Result<Self, StateError> {
        match value.trim().to_lowercase().as_str() {
            "title" => Ok(Self::Title),
            "artist" | "artist_display" => Ok(Self::ArtistDisplay),
            "origin" | "place_of_origin" => Ok(Self::PlaceOfOrigin),
            "start" | "date_start" => Ok(Self::DateStart),
            "end" | "date_end" => Ok(Self::DateEnd),
            _ => Err(StateError::UnknownSortField {
                value: value.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::ArtistDisplay => "artist_display",
            Self::PlaceOfOrigin => "place_of_origin",
            Self::DateStart => "date_start",
            Self::DateEnd => "date_end",
        }
    }

    fn compare(&self, a: &Artwork, b: &Artwork) -> Ordering {
        match self {
            Self::Title => a.title.cmp(&b.title),
            Self::ArtistDisplay => a.artist_display.cmp(&b.artist_display),
            Self::PlaceOfOrigin => a.place_of_origin.cmp(&b.place_of_origin),
            Self::DateStart => a.date_start.cmp(&b.date_start),
            Self::DateEnd => a.date_end.cmp(&b.date_end),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
    #[default]
    None,
}

impl SortDirection {
    pub fn parse(value: &str) -> Result<Self, StateError> {
        match value.trim().to_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Ascending),
            "desc" | "descending" => Ok(Self::Descending),
            _ => Err(StateError::UnknownSortDirection {
                value: value.to_string(),
            }),
        }
    }
}

// Replaced wholesale on every pagination or sort interaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PageState {
    offset: u64,
    page_size: u64,
    sort_field: Option<SortField>,
    sort_direction: SortDirection,
}

impl Default for PageState {
    fn default() -> Self {
        Self {
            offset: 0,
            page_size: DEFAULT_PAGE_SIZE,
            sort_field: None,
            sort_direction: SortDirection::None,
        }
    }
}

pub fn validate_page_size(page_size: u64) -> Result<u64, StateError> {
    if ALLOWED_PAGE_SIZES.contains(&page_size) {
        Ok(page_size)
    } else {
        Err(StateError::InvalidPageSize { value: page_size })
    }
}

impl PageState {
    pub fn new(offset: u64, page_size: u64) -> Result<Self, StateError> {
        Ok(Self {
            offset,
            page_size: validate_page_size(page_size)?,
            ..Self::default()
        })
    }

    pub fn for_page(page: u64, page_size: u64) -> Result<Self, StateError> {
        if page == 0 {
            return Err(StateError::InvalidPage { value: page });
        }
        let page_size = validate_page_size(page_size)?;
        let offset = (page - 1)
            .checked_mul(page_size)
            .ok_or(StateError::PageOutOfRange { value: page })?;
        Self::new(offset, page_size)
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn sort_field(&self) -> Option<SortField> {
        self.sort_field
    }

    pub fn sort_direction(&self) -> SortDirection {
        self.sort_direction
    }

    pub fn page_number(&self) -> u64 {
        self.offset / self.page_size + 1
    }

    pub fn request(&self) -> PageRequest {
        PageRequest {
            page: self.page_number(),
            limit: self.page_size,
        }
    }

    pub fn next_page(&self) -> Result<Self, StateError> {
        let offset = self
            .offset
            .checked_add(self.page_size)
            .ok_or(StateError::PageOutOfRange {
                value: self.page_number() + 1,
            })?;
        Ok(Self { offset, ..*self })
    }

    pub fn previous_page(&self) -> Self {
        Self {
            offset: self.offset.saturating_sub(self.page_size),
            ..*self
        }
    }

    pub fn with_page_size(&self, page_size: u64) -> Result<Self, StateError> {
        Ok(Self {
            offset: 0,
            page_size: validate_page_size(page_size)?,
            ..*self
        })
    }

    pub fn with_sort(&self, field: SortField, direction: SortDirection) -> Self {
        Self {
            sort_field: Some(field),
            sort_direction: direction,
            ..*self
        }
    }

    pub fn without_sort(&self) -> Self {
        Self {
            sort_field: None,
            sort_direction: SortDirection::None,
            ..*self
        }
    }

    pub fn sort_records(&self, records: &mut [Artwork]) {
        let field = match self.sort_field {
            Some(field) => field,
            None => return,
        };
        match self.sort_direction {
            SortDirection::Ascending => records.sort_by(|a, b| field.compare(a, b)),
            SortDirection::Descending => records.sort_by(|a, b| field.compare(b, a)),
            SortDirection::None => {}
        }
    }
}

// Keyed by id, insertion ordered. A repeated id keeps its first record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionSet {
    records: Vec<Artwork>,
    index: HashMap<u64, usize>,
}

impl SelectionSet {
    pub fn from_records(records: impl IntoIterator<Item = Artwork>) -> Self {
        let mut set = Self::default();
        for record in records {
            set.insert(record);
        }
        set
    }

    pub fn contains(&self, id: u64) -> bool {
        self.index.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Artwork] {
        &self.records
    }

    pub fn insert(&mut self, record: Artwork) -> bool {
        if self.contains(record.id) {
            return false;
        }
        self.index.insert(record.id, self.records.len());
        self.records.push(record);
        true
    }

    // returns whether the record is selected afterwards
    pub fn toggle(&mut self, record: Artwork) -> bool {
        if self.contains(record.id) {
            self.remove(record.id);
            false
        } else {
            self.insert(record)
        }
    }

    pub fn remove(&mut self, id: u64) -> Option<Artwork> {
        let pos = self.index.remove(&id)?;
        let removed = self.records.remove(pos);
        for slot in self.index.values_mut() {
            if *slot > pos {
                *slot -= 1;
            }
        }
        Some(removed)
    }
}

/// Reads a count the way the browser's `parseInt` does: optional sign, then
/// leading digits.
pub fn parse_count(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let value = digits.parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -value } else { value })
}
