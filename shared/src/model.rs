use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::auth::{SignInDialog, SignUpDialog};
use crate::config::ApiConfig;
use crate::detail::DetailController;
use crate::listing::{DeleteConfirmation, EditDialog, ReportDialog};
use crate::my_items::MyItems;
use crate::search::{CatalogSearch, QuickSearch};
use crate::session::Session;
use crate::{AppError, ToastMessage};

/// Sidebar categories on the catalog page.
pub const CATEGORIES: &[&str] = &[
    "Clothing",
    "Electronics",
    "ID Cards",
    "Books",
    "Keys",
    "Bags",
    "Other",
];

/// Categories offered when reporting an item.
pub const REPORT_CATEGORIES: &[&str] =
    &["ID Cards", "Electronics", "Books", "Clothing", "Keys", "Other"];

/// Home quick-search categories. "All" means no category filter.
pub const QUICK_SEARCH_CATEGORIES: &[&str] =
    &["All", "Electronics", "Clothing", "Books", "Keys", "ID Cards", "Other"];

pub const VENUES: &[&str] = &[
    "Library",
    "Student Center",
    "Cafeteria",
    "Gym",
    "Classroom Building",
    "Dormitory",
    "Parking Lot",
];

/// Color names with their swatch hex values.
pub const COLORS: &[(&str, &str)] = &[
    ("Red", "#ef4444"),
    ("Blue", "#3b82f6"),
    ("Green", "#22c55e"),
    ("Yellow", "#eab308"),
    ("Purple", "#a855f7"),
    ("Pink", "#ec4899"),
    ("Black", "#000000"),
    ("White", "#ffffff"),
    ("Gray", "#6b7280"),
    ("Brown", "#92400e"),
];

/// Categories the edit dialog offers on top of the catalog list.
pub const EDIT_CATEGORIES: &[&str] = &[
    "Electronics",
    "Clothing",
    "Accessories",
    "Documents",
    "Keys",
    "Bags",
    "Jewelry",
    "Books",
    "Sports",
    "Other",
];

pub fn is_category(name: &str) -> bool {
    CATEGORIES.contains(&name) || REPORT_CATEGORIES.contains(&name)
}

pub fn is_editable_category(name: &str) -> bool {
    is_category(name) || EDIT_CATEGORIES.contains(&name)
}

/// A real `YYYY-MM-DD` calendar day.
pub fn is_calendar_date(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return false;
    }
    let number = |range: std::ops::Range<usize>| -> Option<u32> {
        let part = &value[range];
        part.bytes()
            .all(|b| b.is_ascii_digit())
            .then(|| part.parse().ok())
            .flatten()
    };
    let (Some(year), Some(month), Some(day)) = (number(0..4), number(5..7), number(8..10)) else {
        return false;
    };
    let leap = year % 4 == 0 && (year % 100 != 0 || year % 400 == 0);
    let days_in_month = match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if leap => 29,
        2 => 28,
        _ => return false,
    };
    (1..=days_in_month).contains(&day)
}

/// Reduce a backend timestamp such as `2024-05-01T00:00:00.000Z` to its
/// calendar day. Values without a leading date are returned trimmed.
pub fn calendar_day(value: &str) -> &str {
    let value = value.trim();
    match value.get(..10) {
        Some(day)
            if is_calendar_date(day)
                && matches!(value.as_bytes().get(10), None | Some(b'T') | Some(b' ')) =>
        {
            day
        }
        _ => value,
    }
}

pub fn is_venue(name: &str) -> bool {
    VENUES.contains(&name)
}

pub fn is_color(name: &str) -> bool {
    COLORS.iter().any(|(c, _)| *c == name)
}

macro_rules! typed_id {
    ($name:ident) => {
        #[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

typed_id!(ItemId);
typed_id!(ImageId);
typed_id!(UserId);

/// Wire value: 0 = lost, 1 = found.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(into = "u8", try_from = "u8")]
pub enum ItemType {
    Lost,
    Found,
}

impl ItemType {
    pub fn label(self) -> &'static str {
        match self {
            Self::Lost => "Lost",
            Self::Found => "Found",
        }
    }
}

impl From<ItemType> for u8 {
    fn from(value: ItemType) -> Self {
        match value {
            ItemType::Lost => 0,
            ItemType::Found => 1,
        }
    }
}

impl TryFrom<u8> for ItemType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Lost),
            1 => Ok(Self::Found),
            other => Err(format!("unknown item_type {other}")),
        }
    }
}

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Reporter {
    pub id: UserId,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub faculty: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ItemImage {
    pub id: ImageId,
    #[serde(rename = "imagePath")]
    pub image_path: String,
    #[serde(default, deserialize_with = "nullable")]
    pub status: i64,
}

/// A reported item as the backend returns it. Text fields may arrive as
/// `null` and are read as empty.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Item {
    pub id: ItemId,
    pub item_type: ItemType,
    #[serde(default, deserialize_with = "nullable")]
    pub category: String,
    #[serde(default, deserialize_with = "nullable")]
    pub title: String,
    #[serde(rename = "descs", default, deserialize_with = "nullable")]
    pub description: String,
    #[serde(default, deserialize_with = "nullable")]
    pub location: String,
    #[serde(default, deserialize_with = "nullable")]
    pub date: String,
    #[serde(default, deserialize_with = "nullable")]
    pub time: String,
    #[serde(default, deserialize_with = "nullable")]
    pub color: String,
    #[serde(rename = "conatct_info", default, deserialize_with = "nullable")]
    pub contact_info: String,
    #[serde(default, deserialize_with = "nullable")]
    pub status: i64,
    #[serde(rename = "addedBy", default)]
    pub added_by: Option<Reporter>,
    #[serde(default, deserialize_with = "nullable")]
    pub images: Vec<ItemImage>,
}

impl Item {
    pub fn first_image(&self) -> Option<&ItemImage> {
        self.images.first()
    }

    /// Case-insensitive match against title, description and location.
    pub fn matches_text(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        [&self.title, &self.description, &self.location]
            .iter()
            .any(|field| field.to_lowercase().contains(&query))
    }
}

/// Query sent to `/items/search`. Absent fields are never sent.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_type: Option<ItemType>,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        self.query_pairs().is_empty()
    }

    /// Query-string pairs in a stable order. Blank values are dropped.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let text = [
            ("date", &self.date),
            ("location", &self.location),
            ("category", &self.category),
            ("color", &self.color),
            ("keywords", &self.keywords),
        ];

        let mut pairs: Vec<(&'static str, String)> = text
            .into_iter()
            .filter_map(|(key, value)| {
                value
                    .as_deref()
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(|v| (key, v.to_string()))
            })
            .collect();

        if let Some(item_type) = self.item_type {
            pairs.push(("item_type", u8::from(item_type).to_string()));
        }
        pairs
    }
}

/// An image picked by the user, handed over by the shell.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for ImageFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Page {
    #[default]
    Home,
    Catalog,
    MyItems,
    About,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub enum AppState {
    #[default]
    Starting,
    Ready,
    /// No usable API base URL; nothing is fetched.
    Misconfigured,
}

#[derive(Default)]
pub struct Model {
    pub state: AppState,
    pub config: Option<ApiConfig>,
    pub session: Session,
    pub page: Page,

    pub home: QuickSearch,
    pub catalog: CatalogSearch,
    pub detail: DetailController,
    pub my_items: MyItems,

    pub sign_in: SignInDialog,
    pub sign_up: SignUpDialog,
    pub report: ReportDialog,
    pub edit: EditDialog,
    pub delete: DeleteConfirmation,

    pub active_error: Option<AppError>,
    pub active_toast: Option<ToastMessage>,
    pub now_ms: u64,
}

impl Model {
    pub fn is_ready(&self) -> bool {
        self.state == AppState::Ready && self.config.is_some()
    }

    pub fn show_toast(&mut self, toast: ToastMessage) {
        self.active_toast = Some(toast);
    }

    pub fn show_error(&mut self, error: &AppError) {
        self.active_toast = Some(ToastMessage::from_error(error));
    }
}
