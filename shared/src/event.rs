use serde::{Deserialize, Serialize};
use std::fmt;

use crate::auth::{SignInField, SignUpField};
use crate::capabilities::{ApiOutcome, KvResult};
use crate::listing::ItemField;
use crate::model::{ImageFile, ImageId, ItemId, Page};
use crate::my_items::TypeTab;
use crate::search::{FilterChip, StatusFilter};

// --- Redacted: user-typed secrets in transit from the shell ---

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Redacted(String);

impl Redacted {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn into_secret(self) -> secrecy::SecretString {
        secrecy::SecretString::new(self.0)
    }
}

impl fmt::Debug for Redacted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Event {
    Noop,

    // Lifecycle
    AppStarted { api_base_url: Option<String> },
    Tick { now_ms: u64 },
    Navigate(Page),
    DismissToast,

    // Session
    SessionRefreshRequested,
    SessionLoaded(KvResult<Option<String>>),
    SessionStored(KvResult<()>),
    SessionCleared(KvResult<()>),
    SignOutRequested,

    SignInDialogOpenChanged(bool),
    SignInFieldChanged(SignInField),
    SignInSubmitted,
    SignInResponse(ApiOutcome),

    SignUpDialogOpenChanged(bool),
    SignUpFieldChanged(SignUpField),
    SignUpSubmitted,
    SignUpResponse(ApiOutcome),

    // Catalog filters
    FilterDateChanged(Option<String>),
    FilterLocationChanged(Option<String>),
    FilterCategoryChanged(Option<String>),
    FilterColorToggled(String),
    FilterKeywordsChanged(String),
    FilterStatusToggled(StatusFilter),
    FilterChipRemoved(FilterChip),
    FiltersCleared,
    CatalogSearchResponse { seq: u64, outcome: ApiOutcome },

    // Home quick search
    QuickSearchKeywordsChanged { text: String, now_ms: u64 },
    QuickSearchCategoryChanged { category: String, now_ms: u64 },
    HomeShowMore,
    HomeSearchResponse { seq: u64, outcome: ApiOutcome },

    // Item detail
    DetailOpenChanged { item_id: ItemId, open: bool },
    DetailRetryRequested,
    DetailResponse {
        item_id: ItemId,
        generation: u64,
        outcome: ApiOutcome,
    },
    DetailImageFailed(ImageId),

    // Report
    ReportDialogOpenChanged(bool),
    ReportFieldChanged(ItemField),
    ReportImagesAdded(Vec<ImageFile>),
    ReportImageRemoved(usize),
    ReportSubmitted,
    ReportCreateResponse(ApiOutcome),
    ReportUploadResponse(ApiOutcome),
    ReportAttachResponse(ApiOutcome),

    // Edit
    EditRequested(ItemId),
    EditDialogOpenChanged(bool),
    EditFieldChanged(ItemField),
    EditImagesAdded(Vec<ImageFile>),
    EditNewImageRemoved(usize),
    EditExistingImageRemoved(ImageId),
    EditImageDeleteResponse { image_id: ImageId, outcome: ApiOutcome },
    EditSubmitted,
    EditUpdateResponse(ApiOutcome),
    EditUploadResponse(ApiOutcome),
    EditAttachResponse(ApiOutcome),

    // Delete
    DeleteRequested(ItemId),
    DeleteCancelled,
    DeleteConfirmed,
    DeleteResponse { item_id: ItemId, outcome: ApiOutcome },

    // My items
    MyItemsQueryChanged(String),
    MyItemsTabChanged(TypeTab),
    MyItemsResponse { seq: u64, outcome: ApiOutcome },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Noop => "noop",
            Event::AppStarted { .. } => "app_started",
            Event::Tick { .. } => "tick",
            Event::Navigate(_) => "navigate",
            Event::DismissToast => "dismiss_toast",
            Event::SessionRefreshRequested => "session_refresh_requested",
            Event::SessionLoaded(_) => "session_loaded",
            Event::SessionStored(_) => "session_stored",
            Event::SessionCleared(_) => "session_cleared",
            Event::SignOutRequested => "sign_out_requested",
            Event::SignInDialogOpenChanged(_) => "sign_in_dialog_open_changed",
            Event::SignInFieldChanged(_) => "sign_in_field_changed",
            Event::SignInSubmitted => "sign_in_submitted",
            Event::SignInResponse(_) => "sign_in_response",
            Event::SignUpDialogOpenChanged(_) => "sign_up_dialog_open_changed",
            Event::SignUpFieldChanged(_) => "sign_up_field_changed",
            Event::SignUpSubmitted => "sign_up_submitted",
            Event::SignUpResponse(_) => "sign_up_response",
            Event::FilterDateChanged(_) => "filter_date_changed",
            Event::FilterLocationChanged(_) => "filter_location_changed",
            Event::FilterCategoryChanged(_) => "filter_category_changed",
            Event::FilterColorToggled(_) => "filter_color_toggled",
            Event::FilterKeywordsChanged(_) => "filter_keywords_changed",
            Event::FilterStatusToggled(_) => "filter_status_toggled",
            Event::FilterChipRemoved(_) => "filter_chip_removed",
            Event::FiltersCleared => "filters_cleared",
            Event::CatalogSearchResponse { .. } => "catalog_search_response",
            Event::QuickSearchKeywordsChanged { .. } => "quick_search_keywords_changed",
            Event::QuickSearchCategoryChanged { .. } => "quick_search_category_changed",
            Event::HomeShowMore => "home_show_more",
            Event::HomeSearchResponse { .. } => "home_search_response",
            Event::DetailOpenChanged { .. } => "detail_open_changed",
            Event::DetailRetryRequested => "detail_retry_requested",
            Event::DetailResponse { .. } => "detail_response",
            Event::DetailImageFailed(_) => "detail_image_failed",
            Event::ReportDialogOpenChanged(_) => "report_dialog_open_changed",
            Event::ReportFieldChanged(_) => "report_field_changed",
            Event::ReportImagesAdded(_) => "report_images_added",
            Event::ReportImageRemoved(_) => "report_image_removed",
            Event::ReportSubmitted => "report_submitted",
            Event::ReportCreateResponse(_) => "report_create_response",
            Event::ReportUploadResponse(_) => "report_upload_response",
            Event::ReportAttachResponse(_) => "report_attach_response",
            Event::EditRequested(_) => "edit_requested",
            Event::EditDialogOpenChanged(_) => "edit_dialog_open_changed",
            Event::EditFieldChanged(_) => "edit_field_changed",
            Event::EditImagesAdded(_) => "edit_images_added",
            Event::EditNewImageRemoved(_) => "edit_new_image_removed",
            Event::EditExistingImageRemoved(_) => "edit_existing_image_removed",
            Event::EditImageDeleteResponse { .. } => "edit_image_delete_response",
            Event::EditSubmitted => "edit_submitted",
            Event::EditUpdateResponse(_) => "edit_update_response",
            Event::EditUploadResponse(_) => "edit_upload_response",
            Event::EditAttachResponse(_) => "edit_attach_response",
            Event::DeleteRequested(_) => "delete_requested",
            Event::DeleteCancelled => "delete_cancelled",
            Event::DeleteConfirmed => "delete_confirmed",
            Event::DeleteResponse { .. } => "delete_response",
            Event::MyItemsQueryChanged(_) => "my_items_query_changed",
            Event::MyItemsTabChanged(_) => "my_items_tab_changed",
            Event::MyItemsResponse { .. } => "my_items_response",
        }
    }

    /// Events that carry results back from a capability rather than user
    /// intent.
    pub fn is_capability_response(&self) -> bool {
        matches!(
            self,
            Event::SessionLoaded(_)
                | Event::SessionStored(_)
                | Event::SessionCleared(_)
                | Event::SignInResponse(_)
                | Event::SignUpResponse(_)
                | Event::CatalogSearchResponse { .. }
                | Event::HomeSearchResponse { .. }
                | Event::DetailResponse { .. }
                | Event::ReportCreateResponse(_)
                | Event::ReportUploadResponse(_)
                | Event::ReportAttachResponse(_)
                | Event::EditImageDeleteResponse { .. }
                | Event::EditUpdateResponse(_)
                | Event::EditUploadResponse(_)
                | Event::EditAttachResponse(_)
                | Event::DeleteResponse { .. }
                | Event::MyItemsResponse { .. }
        )
    }

    pub fn is_user_initiated(&self) -> bool {
        !self.is_capability_response() && !matches!(self, Event::Noop | Event::Tick { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacted_debug_hides_value() {
        let secret = Redacted::new("hunter2");
        assert_eq!(format!("{secret:?}"), "[REDACTED]");
    }

    #[test]
    fn password_fields_never_reach_debug_output() {
        let event = Event::SignInFieldChanged(SignInField::Password(Redacted::new("hunter2")));
        assert!(!format!("{event:?}").contains("hunter2"));
    }

    #[test]
    fn responses_are_not_user_initiated() {
        assert!(!Event::MyItemsResponse {
            seq: 1,
            outcome: Ok(crate::capabilities::ApiReply::new(200, "{}")),
        }
        .is_user_initiated());
        assert!(!Event::Tick { now_ms: 5 }.is_user_initiated());
        assert!(Event::FiltersCleared.is_user_initiated());
    }

    #[test]
    fn events_round_trip_through_serde() {
        let event = Event::FilterChipRemoved(FilterChip::Color("Red".into()));
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(serde_json::from_str::<Event>(&json).unwrap(), event);
    }
}
