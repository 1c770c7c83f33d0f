//! Catalog filtering and home quick search.
//!
//! Both surfaces feed a [`SearchController`], which numbers every request it
//! issues and only lets the newest one update results.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use crate::model::{
    is_calendar_date, is_category, is_color, is_venue, Item, ItemId, ItemType, SearchFilters,
};
use crate::{AppError, ErrorKind, HOME_PAGE_SIZE, QUICK_SEARCH_DEBOUNCE_MS};

pub const ALL_CATEGORIES: &str = "All";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("unknown location '{0}'")]
    UnknownVenue(String),

    #[error("unknown category '{0}'")]
    UnknownCategory(String),

    #[error("unknown color '{0}'")]
    UnknownColor(String),

    #[error("date must be YYYY-MM-DD, got '{0}'")]
    InvalidDate(String),
}

impl From<FilterError> for AppError {
    fn from(err: FilterError) -> Self {
        AppError::new(ErrorKind::Validation, err.to_string())
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusFilter {
    Lost,
    Found,
}

impl StatusFilter {
    pub fn item_type(self) -> ItemType {
        match self {
            Self::Lost => ItemType::Lost,
            Self::Found => ItemType::Found,
        }
    }
}

/// A removable badge for one active filter value.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum FilterChip {
    Date(String),
    Location(String),
    Category(String),
    Color(String),
    Keywords(String),
    Status(StatusFilter),
}

impl FilterChip {
    pub fn label(&self) -> String {
        match self {
            Self::Date(d) => format!("Date: {d}"),
            Self::Location(l) => format!("Location: {l}"),
            Self::Category(c) => format!("Category: {c}"),
            Self::Color(c) => format!("Color: {c}"),
            Self::Keywords(k) => format!("Search: {k}"),
            Self::Status(StatusFilter::Lost) => "Lost items".to_string(),
            Self::Status(StatusFilter::Found) => "Found items".to_string(),
        }
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// What the user has picked in the catalog sidebar.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterSelection {
    date: Option<String>,
    location: Option<String>,
    category: Option<String>,
    colors: Vec<String>,
    keywords: String,
    status: Option<StatusFilter>,
}

impl FilterSelection {
    pub fn date(&self) -> Option<&str> {
        self.date.as_deref()
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn colors(&self) -> &[String] {
        &self.colors
    }

    pub fn keywords(&self) -> &str {
        &self.keywords
    }

    pub fn status(&self) -> Option<StatusFilter> {
        self.status
    }

    /// Returns whether the selection changed.
    pub fn set_date(&mut self, date: Option<String>) -> Result<bool, FilterError> {
        let date = blank_to_none(date);
        if let Some(d) = &date {
            if !is_calendar_date(d) {
                return Err(FilterError::InvalidDate(d.clone()));
            }
        }
        Ok(replace(&mut self.date, date))
    }

    pub fn set_location(&mut self, location: Option<String>) -> Result<bool, FilterError> {
        let location = blank_to_none(location);
        if let Some(l) = &location {
            if !is_venue(l) {
                return Err(FilterError::UnknownVenue(l.clone()));
            }
        }
        Ok(replace(&mut self.location, location))
    }

    pub fn set_category(&mut self, category: Option<String>) -> Result<bool, FilterError> {
        let category = blank_to_none(category);
        if let Some(c) = &category {
            if !is_category(c) {
                return Err(FilterError::UnknownCategory(c.clone()));
            }
        }
        Ok(replace(&mut self.category, category))
    }

    /// Add the color if absent, remove it if present. Selection order is kept.
    pub fn toggle_color(&mut self, color: &str) -> Result<(), FilterError> {
        if let Some(pos) = self.colors.iter().position(|c| c == color) {
            self.colors.remove(pos);
            return Ok(());
        }
        if !is_color(color) {
            return Err(FilterError::UnknownColor(color.to_string()));
        }
        self.colors.push(color.to_string());
        Ok(())
    }

    pub fn set_keywords(&mut self, keywords: String) -> bool {
        if self.keywords == keywords {
            return false;
        }
        self.keywords = keywords;
        true
    }

    /// Selecting the active status again turns the status filter off.
    pub fn toggle_status(&mut self, status: StatusFilter) {
        self.status = if self.status == Some(status) {
            None
        } else {
            Some(status)
        };
    }

    pub fn remove_chip(&mut self, chip: &FilterChip) -> bool {
        match chip {
            FilterChip::Date(_) => self.date.take().is_some(),
            FilterChip::Location(_) => self.location.take().is_some(),
            FilterChip::Category(_) => self.category.take().is_some(),
            FilterChip::Keywords(_) => {
                let had = !self.keywords.is_empty();
                self.keywords.clear();
                had
            }
            FilterChip::Color(color) => {
                let before = self.colors.len();
                self.colors.retain(|c| c != color);
                before != self.colors.len()
            }
            FilterChip::Status(_) => self.status.take().is_some(),
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_active(&self) -> bool {
        !self.chips().is_empty()
    }

    pub fn chips(&self) -> Vec<FilterChip> {
        let mut chips = Vec::new();
        if let Some(d) = &self.date {
            chips.push(FilterChip::Date(d.clone()));
        }
        if let Some(l) = &self.location {
            chips.push(FilterChip::Location(l.clone()));
        }
        if let Some(c) = &self.category {
            chips.push(FilterChip::Category(c.clone()));
        }
        chips.extend(self.colors.iter().cloned().map(FilterChip::Color));
        if !self.keywords.trim().is_empty() {
            chips.push(FilterChip::Keywords(self.keywords.trim().to_string()));
        }
        if let Some(s) = self.status {
            chips.push(FilterChip::Status(s));
        }
        chips
    }

    /// Only the first selected color is sent; the backend filters on one.
    pub fn to_filters(&self) -> SearchFilters {
        SearchFilters {
            date: self.date.clone(),
            location: self.location.clone(),
            category: self.category.clone(),
            color: self.colors.first().cloned(),
            keywords: blank_to_none(Some(self.keywords.clone())),
            item_type: self.status.map(StatusFilter::item_type),
        }
    }
}

fn replace(slot: &mut Option<String>, value: Option<String>) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

/// Result of handing a response back to a controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    Fresh,
    Failed(AppError),
    Stale,
}

/// Sequenced search requests with last-one-wins semantics. A failed latest
/// request leaves the previous results in place.
#[derive(Debug, Default, Clone)]
pub struct SearchController {
    next_seq: u64,
    latest: Option<u64>,
    in_flight: bool,
    loaded_once: bool,
    results: Vec<Item>,
    last_filters: Option<SearchFilters>,
    last_error: Option<AppError>,
}

impl SearchController {
    pub fn begin(&mut self, filters: SearchFilters) -> u64 {
        self.next_seq += 1;
        let seq = self.next_seq;
        self.latest = Some(seq);
        self.in_flight = true;
        self.last_filters = Some(filters);
        trace!(seq, "search issued");
        seq
    }

    pub fn settle(&mut self, seq: u64, outcome: Result<Vec<Item>, AppError>) -> Applied {
        if self.latest != Some(seq) {
            debug!(seq, latest = ?self.latest, "dropping stale search response");
            return Applied::Stale;
        }
        self.in_flight = false;
        match outcome {
            Ok(items) => {
                self.results = items;
                self.loaded_once = true;
                self.last_error = None;
                Applied::Fresh
            }
            Err(err) => {
                self.last_error = Some(err.clone());
                Applied::Failed(err)
            }
        }
    }

    pub fn latest_seq(&self) -> Option<u64> {
        self.latest
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight
    }

    /// Loading before anything has ever been shown. Later refreshes are
    /// silent.
    pub fn is_initial_load(&self) -> bool {
        self.in_flight && !self.loaded_once
    }

    pub fn has_loaded(&self) -> bool {
        self.loaded_once
    }

    pub fn results(&self) -> &[Item] {
        &self.results
    }

    pub fn last_filters(&self) -> Option<&SearchFilters> {
        self.last_filters.as_ref()
    }

    pub fn last_error(&self) -> Option<&AppError> {
        self.last_error.as_ref()
    }

    pub fn remove_item(&mut self, id: ItemId) -> bool {
        let before = self.results.len();
        self.results.retain(|item| item.id != id);
        before != self.results.len()
    }

    pub fn reset(&mut self) {
        let next_seq = self.next_seq;
        *self = Self {
            next_seq,
            ..Self::default()
        };
    }
}

/// Trailing-edge debounce driven by shell ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Debouncer {
    quiet_ms: u64,
    deadline_ms: Option<u64>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(QUICK_SEARCH_DEBOUNCE_MS)
    }
}

impl Debouncer {
    pub fn new(quiet_ms: u64) -> Self {
        Self {
            quiet_ms,
            deadline_ms: None,
        }
    }

    pub fn touch(&mut self, now_ms: u64) {
        self.deadline_ms = Some(now_ms.saturating_add(self.quiet_ms));
    }

    pub fn cancel(&mut self) {
        self.deadline_ms = None;
    }

    pub fn fire_if_due(&mut self, now_ms: u64) -> bool {
        match self.deadline_ms {
            Some(deadline) if now_ms >= deadline => {
                self.deadline_ms = None;
                true
            }
            _ => false,
        }
    }
}

/// Catalog page: sidebar filters, searched immediately on every change.
#[derive(Debug, Default, Clone)]
pub struct CatalogSearch {
    pub selection: FilterSelection,
    pub controller: SearchController,
}

impl CatalogSearch {
    pub fn filters(&self) -> SearchFilters {
        self.selection.to_filters()
    }
}

/// Home page: keywords plus one category, debounced, shown a page at a time.
#[derive(Debug, Clone)]
pub struct QuickSearch {
    keywords: String,
    category: Option<String>,
    pub debounce: Debouncer,
    pub controller: SearchController,
    display_count: usize,
}

impl Default for QuickSearch {
    fn default() -> Self {
        Self {
            keywords: String::new(),
            category: None,
            debounce: Debouncer::default(),
            controller: SearchController::default(),
            display_count: HOME_PAGE_SIZE,
        }
    }
}

impl QuickSearch {
    pub fn keywords(&self) -> &str {
        &self.keywords
    }

    pub fn category(&self) -> &str {
        self.category.as_deref().unwrap_or(ALL_CATEGORIES)
    }

    pub fn set_keywords(&mut self, keywords: String, now_ms: u64) -> bool {
        if self.keywords == keywords {
            return false;
        }
        self.keywords = keywords;
        self.debounce.touch(now_ms);
        true
    }

    /// "All" clears the category.
    pub fn set_category(&mut self, category: String, now_ms: u64) -> bool {
        let category = Some(category)
            .filter(|c| !c.trim().is_empty() && c != ALL_CATEGORIES);
        if self.category == category {
            return false;
        }
        self.category = category;
        self.debounce.touch(now_ms);
        true
    }

    pub fn filters(&self) -> SearchFilters {
        SearchFilters {
            keywords: blank_to_none(Some(self.keywords.clone())),
            category: self.category.clone(),
            ..Default::default()
        }
    }

    pub fn visible(&self) -> &[Item] {
        let results = self.controller.results();
        &results[..results.len().min(self.display_count)]
    }

    pub fn has_more(&self) -> bool {
        self.controller.results().len() > self.display_count
    }

    pub fn show_more(&mut self) {
        self.display_count += HOME_PAGE_SIZE;
    }

    pub fn reset_paging(&mut self) {
        self.display_count = HOME_PAGE_SIZE;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    fn item(id: u64) -> Item {
        serde_json::from_value(serde_json::json!({ "id": id, "item_type": 1 })).unwrap()
    }

    #[test]
    fn empty_selection_sends_nothing() {
        let selection = FilterSelection::default();
        assert!(selection.to_filters().is_empty());
        assert!(!selection.is_active());
    }

    #[test]
    fn status_toggles_off_when_repeated() {
        let mut selection = FilterSelection::default();
        selection.toggle_status(StatusFilter::Lost);
        assert_eq!(selection.to_filters().item_type, Some(ItemType::Lost));
        selection.toggle_status(StatusFilter::Found);
        assert_eq!(selection.to_filters().item_type, Some(ItemType::Found));
        selection.toggle_status(StatusFilter::Found);
        assert_eq!(selection.to_filters().item_type, None);
    }

    #[test]
    fn only_first_color_is_forwarded() {
        let mut selection = FilterSelection::default();
        selection.toggle_color("Blue").unwrap();
        selection.toggle_color("Red").unwrap();
        assert_eq!(selection.to_filters().color.as_deref(), Some("Blue"));
        assert_eq!(selection.chips().len(), 2);

        selection.toggle_color("Blue").unwrap();
        assert_eq!(selection.to_filters().color.as_deref(), Some("Red"));
    }

    #[test]
    fn unknown_values_are_rejected() {
        let mut selection = FilterSelection::default();
        assert_matches!(
            selection.set_location(Some("Mars".into())),
            Err(FilterError::UnknownVenue(_))
        );
        assert_matches!(
            selection.set_category(Some("Pets".into())),
            Err(FilterError::UnknownCategory(_))
        );
        assert_matches!(selection.toggle_color("Teal"), Err(FilterError::UnknownColor(_)));
        assert_matches!(
            selection.set_date(Some("03/01/2024".into())),
            Err(FilterError::InvalidDate(_))
        );
        assert_matches!(
            selection.set_date(Some("2024-13-01".into())),
            Err(FilterError::InvalidDate(_))
        );
        assert_matches!(
            selection.set_date(Some("2024-02-31".into())),
            Err(FilterError::InvalidDate(_))
        );
        assert!(!selection.is_active());
    }

    #[test]
    fn setters_report_changes_only() {
        let mut selection = FilterSelection::default();
        assert_eq!(selection.set_location(Some("Gym".into())), Ok(true));
        assert_eq!(selection.set_location(Some("Gym".into())), Ok(false));
        assert_eq!(selection.set_location(Some(String::new())), Ok(true));
        assert_eq!(selection.location(), None);
        assert!(selection.set_keywords("wallet".into()));
        assert!(!selection.set_keywords("wallet".into()));
    }

    #[test]
    fn chips_cover_every_active_value_and_remove_cleanly() {
        let mut selection = FilterSelection::default();
        selection.set_date(Some("2024-03-01".into())).unwrap();
        selection.set_category(Some("Keys".into())).unwrap();
        selection.toggle_color("Red").unwrap();
        selection.set_keywords(" ring ".into());
        selection.toggle_status(StatusFilter::Found);

        let chips = selection.chips();
        assert_eq!(chips.len(), 5);
        assert!(chips.contains(&FilterChip::Keywords("ring".into())));

        for chip in chips {
            assert!(selection.remove_chip(&chip));
        }
        assert!(!selection.is_active());
        assert_eq!(selection.to_filters(), SearchFilters::default());
    }

    #[test]
    fn stale_responses_are_dropped() {
        let mut controller = SearchController::default();
        let first = controller.begin(SearchFilters::default());
        let second = controller.begin(SearchFilters::default());

        assert_eq!(controller.settle(second, Ok(vec![item(2)])), Applied::Fresh);
        assert_eq!(controller.settle(first, Ok(vec![item(1)])), Applied::Stale);
        assert_eq!(controller.results()[0].id, ItemId(2));
        assert!(!controller.is_loading());
    }

    #[test]
    fn failure_keeps_previous_results() {
        let mut controller = SearchController::default();
        let seq = controller.begin(SearchFilters::default());
        controller.settle(seq, Ok(vec![item(1), item(2)]));

        let seq = controller.begin(SearchFilters::default());
        assert!(!controller.is_initial_load());
        let err = AppError::new(ErrorKind::Network, "down");
        assert_matches!(controller.settle(seq, Err(err)), Applied::Failed(_));
        assert_eq!(controller.results().len(), 2);
        assert!(!controller.is_loading());
    }

    #[test]
    fn first_load_is_flagged() {
        let mut controller = SearchController::default();
        controller.begin(SearchFilters::default());
        assert!(controller.is_initial_load());
    }

    #[test]
    fn reset_keeps_sequence_monotonic() {
        let mut controller = SearchController::default();
        let old = controller.begin(SearchFilters::default());
        controller.reset();
        let new = controller.begin(SearchFilters::default());
        assert!(new > old);
        assert_eq!(controller.settle(old, Ok(vec![])), Applied::Stale);
    }

    #[test]
    fn debounce_fires_once_after_quiet_period() {
        let mut debounce = Debouncer::new(300);
        debounce.touch(1_000);
        debounce.touch(1_200);
        assert!(!debounce.fire_if_due(1_400));
        assert!(debounce.fire_if_due(1_500));
        assert!(!debounce.fire_if_due(1_600));
    }

    #[test]
    fn quick_search_all_means_no_category() {
        let mut quick = QuickSearch::default();
        assert!(quick.set_category("Books".into(), 0));
        assert_eq!(quick.filters().category.as_deref(), Some("Books"));
        assert!(quick.set_category(ALL_CATEGORIES.into(), 10));
        assert_eq!(quick.filters().category, None);
        assert_eq!(quick.category(), ALL_CATEGORIES);
        assert!(!quick.set_category(ALL_CATEGORIES.into(), 20));
    }

    #[test]
    fn quick_search_pages_by_four() {
        let mut quick = QuickSearch::default();
        let seq = quick.controller.begin(SearchFilters::default());
        quick
            .controller
            .settle(seq, Ok((1..=9).map(item).collect()));

        assert_eq!(quick.visible().len(), 4);
        assert!(quick.has_more());
        quick.show_more();
        quick.show_more();
        assert_eq!(quick.visible().len(), 9);
        assert!(!quick.has_more());
    }

    proptest! {
        #[test]
        fn only_the_latest_sequence_ever_applies(
            issued in 1usize..12,
            order in proptest::collection::vec(0usize..12, 1..24),
        ) {
            let mut controller = SearchController::default();
            let seqs: Vec<u64> = (0..issued)
                .map(|_| controller.begin(SearchFilters::default()))
                .collect();
            let latest = *seqs.last().unwrap();

            for idx in order {
                let seq = seqs[idx % seqs.len()];
                let applied = controller.settle(seq, Ok(vec![item(seq)]));
                if seq == latest {
                    prop_assert_eq!(applied, Applied::Fresh);
                } else {
                    prop_assert_eq!(applied, Applied::Stale);
                }
            }

            if let Some(first) = controller.results().first() {
                prop_assert_eq!(first.id, ItemId(latest));
            }
        }

        #[test]
        fn no_blank_value_reaches_the_query(keywords in "[ a-z]{0,8}") {
            let mut selection = FilterSelection::default();
            selection.set_keywords(keywords.clone());
            let pairs = selection.to_filters().query_pairs();
            for (_, value) in &pairs {
                prop_assert!(!value.trim().is_empty());
            }
            prop_assert_eq!(pairs.is_empty(), keywords.trim().is_empty());
        }

        #[test]
        fn sent_keys_match_non_empty_inputs(
            date in proptest::option::of(prop_oneof![Just(""), Just("2024-05-01")]),
            location in proptest::option::of(prop_oneof![Just(""), Just("Gym")]),
            category in proptest::option::of(prop_oneof![Just("  "), Just("Keys")]),
            color in proptest::option::of(Just("Blue")),
            keywords in "[ a-z]{0,4}",
            status in proptest::option::of(prop_oneof![Just(StatusFilter::Lost), Just(StatusFilter::Found)]),
        ) {
            let mut selection = FilterSelection::default();
            selection.set_date(date.map(str::to_string)).unwrap();
            selection.set_location(location.map(str::to_string)).unwrap();
            selection.set_category(category.map(str::to_string)).unwrap();
            if let Some(c) = color {
                selection.toggle_color(c).unwrap();
            }
            selection.set_keywords(keywords.clone());
            if let Some(s) = status {
                selection.toggle_status(s);
            }

            let filled = |v: Option<&str>| v.is_some_and(|v| !v.trim().is_empty());
            let mut expected = Vec::new();
            for (key, present) in [
                ("date", filled(date)),
                ("location", filled(location)),
                ("category", filled(category)),
                ("color", color.is_some()),
                ("keywords", !keywords.trim().is_empty()),
                ("item_type", status.is_some()),
            ] {
                if present {
                    expected.push(key);
                }
            }

            let sent: Vec<&str> = selection
                .to_filters()
                .query_pairs()
                .into_iter()
                .map(|(k, _)| k)
                .collect();
            prop_assert_eq!(sent, expected);
        }
    }
}
