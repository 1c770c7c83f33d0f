//! Report, edit and delete flows for a user's own items.
//!
//! Every flow is a short chain of server calls. A dialog only reaches
//! [`DialogPhase::Succeeded`] after the last call in its chain is
//! acknowledged.

use serde::{Deserialize, Serialize};

use crate::model::{
    calendar_day, is_editable_category, ImageFile, ImageId, Item, ItemId, ItemImage, ItemType,
    REPORT_CATEGORIES,
};
use crate::{AppError, FormError, MAX_IMAGES_PER_ITEM};

/// Server-side status of a newly reported, active item.
pub const ACTIVE_ITEM_STATUS: i64 = 1;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum ItemField {
    Type(ItemType),
    Category(String),
    Title(String),
    Description(String),
    Location(String),
    Contact(String),
    Date(String),
    Time(String),
    Color(String),
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitStep {
    Saving,
    Uploading,
    Attaching,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum DialogPhase {
    #[default]
    Editing,
    Submitting(SubmitStep),
    Succeeded,
    Failed(AppError),
}

impl DialogPhase {
    pub fn is_submitting(&self) -> bool {
        matches!(self, Self::Submitting(_))
    }
}

/// Editable item fields shared by the report and edit dialogs.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ItemForm {
    pub item_type: Option<ItemType>,
    pub category: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub contact_info: String,
    pub date: String,
    pub time: String,
    pub color: String,
}

impl ItemForm {
    pub fn from_item(item: &Item) -> Self {
        Self {
            item_type: Some(item.item_type),
            category: item.category.clone(),
            title: item.title.clone(),
            description: item.description.clone(),
            location: item.location.clone(),
            contact_info: item.contact_info.clone(),
            date: calendar_day(&item.date).to_string(),
            time: item.time.clone(),
            color: item.color.clone(),
        }
    }

    pub fn apply(&mut self, field: ItemField) {
        match field {
            ItemField::Type(t) => self.item_type = Some(t),
            ItemField::Category(v) => self.category = v,
            ItemField::Title(v) => self.title = v,
            ItemField::Description(v) => self.description = v,
            ItemField::Location(v) => self.location = v,
            ItemField::Contact(v) => self.contact_info = v,
            ItemField::Date(v) => self.date = v,
            ItemField::Time(v) => self.time = v,
            ItemField::Color(v) => self.color = v,
        }
    }

    /// Title, type, category, location, date and contact are mandatory when
    /// reporting. Location and colour are free text.
    pub fn create_body(&self) -> Result<CreateItemBody, FormError> {
        let item_type = self
            .item_type
            .ok_or_else(|| FormError::Missing("Item type".into()))?;
        for (label, value) in [
            ("Title", &self.title),
            ("Category", &self.category),
            ("Location", &self.location),
            ("Date", &self.date),
            ("Contact information", &self.contact_info),
        ] {
            if value.trim().is_empty() {
                return Err(FormError::Missing(label.to_string()));
            }
        }
        let category = self.category.trim();
        if !REPORT_CATEGORIES.contains(&category) {
            return Err(FormError::UnknownOption(category.to_string()));
        }

        Ok(CreateItemBody {
            item_type,
            category: self.category.trim().to_string(),
            date: self.date.trim().to_string(),
            color: self.color.trim().to_string(),
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            time: self.time.trim().to_string(),
            location: self.location.trim().to_string(),
            contact_info: self.contact_info.trim().to_string(),
            status: ACTIVE_ITEM_STATUS,
        })
    }

    /// Only fields that differ from `original` are sent.
    pub fn update_body(&self, original: &Item) -> Result<UpdateItemBody, FormError> {
        if self.title.trim().is_empty() {
            return Err(FormError::Missing("Title".into()));
        }
        let changed = |new: &str, old: &str| {
            let new = new.trim();
            (new != old.trim()).then(|| new.to_string())
        };

        // Stored values are never re-validated, only the ones being changed.
        let category = changed(&self.category, &original.category);
        if let Some(c) = category.as_deref().filter(|c| !c.is_empty()) {
            if !is_editable_category(c) {
                return Err(FormError::UnknownOption(c.to_string()));
            }
        }

        Ok(UpdateItemBody {
            item_type: self.item_type.filter(|t| *t != original.item_type),
            category,
            date: changed(&self.date, calendar_day(&original.date)),
            color: changed(&self.color, &original.color),
            title: changed(&self.title, &original.title),
            description: changed(&self.description, &original.description),
            time: changed(&self.time, &original.time),
            location: changed(&self.location, &original.location),
            contact_info: changed(&self.contact_info, &original.contact_info),
        })
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CreateItemBody {
    pub item_type: ItemType,
    pub category: String,
    pub date: String,
    pub color: String,
    pub title: String,
    #[serde(rename = "descs")]
    pub description: String,
    pub time: String,
    pub location: String,
    #[serde(rename = "conatct_info")]
    pub contact_info: String,
    pub status: i64,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateItemBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_type: Option<ItemType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "descs", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(rename = "conatct_info", skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<String>,
}

impl UpdateItemBody {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct AttachImagesBody {
    pub item_id: ItemId,
    pub image_paths: Vec<String>,
}

/// Staged uploads, capped per item together with images already stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingImages {
    files: Vec<ImageFile>,
}

impl PendingImages {
    pub fn files(&self) -> &[ImageFile] {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn add(&mut self, files: Vec<ImageFile>, already_stored: usize) -> Result<(), FormError> {
        if already_stored + self.files.len() + files.len() > MAX_IMAGES_PER_ITEM {
            return Err(FormError::TooManyImages {
                max: MAX_IMAGES_PER_ITEM,
            });
        }
        self.files.extend(files);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> bool {
        if index < self.files.len() {
            self.files.remove(index);
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }
}

/// Uploaded paths as returned by `/items/upload`.
pub fn uploaded_paths(data: &serde_json::Value) -> Option<Vec<String>> {
    let list = data.as_array()?;
    let paths: Vec<String> = list
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .filter(|p| !p.trim().is_empty())
        .collect();
    (!paths.is_empty()).then_some(paths)
}

#[derive(Debug, Default)]
pub struct ReportDialog {
    pub open: bool,
    pub form: ItemForm,
    pub images: PendingImages,
    pub phase: DialogPhase,
    /// Set once the server has created the item, so a retry after a failed
    /// upload does not create it twice.
    pub created: Option<ItemId>,
}

impl ReportDialog {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn can_close(&self) -> bool {
        !self.phase.is_submitting()
    }
}

#[derive(Debug, Default)]
pub struct EditDialog {
    pub open: bool,
    pub original: Option<Item>,
    pub form: ItemForm,
    pub existing_images: Vec<ItemImage>,
    pub images: PendingImages,
    pub removing_image: Option<ImageId>,
    pub phase: DialogPhase,
    /// The field update was acknowledged; image failures after this point
    /// are partial successes.
    pub fields_saved: bool,
}

impl EditDialog {
    pub fn start(&mut self, item: &Item) {
        *self = Self {
            open: true,
            original: Some(item.clone()),
            form: ItemForm::from_item(item),
            existing_images: item.images.clone(),
            ..Self::default()
        };
    }

    pub fn item_id(&self) -> Option<ItemId> {
        self.original.as_ref().map(|i| i.id)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn can_close(&self) -> bool {
        !self.phase.is_submitting()
    }

    pub fn drop_existing_image(&mut self, id: ImageId) {
        self.existing_images.retain(|img| img.id != id);
        if let Some(original) = &mut self.original {
            original.images.retain(|img| img.id != id);
        }
    }
}

/// Two-step delete: pick a target, then confirm.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeleteConfirmation {
    pub target: Option<ItemId>,
    pub in_flight: bool,
}

impl DeleteConfirmation {
    pub fn request(&mut self, id: ItemId) {
        if !self.in_flight {
            self.target = Some(id);
        }
    }

    pub fn cancel(&mut self) {
        if !self.in_flight {
            self.target = None;
        }
    }

    pub fn confirm(&mut self) -> Option<ItemId> {
        if self.in_flight {
            return None;
        }
        let id = self.target?;
        self.in_flight = true;
        Some(id)
    }

    pub fn finish(&mut self) {
        self.target = None;
        self.in_flight = false;
    }
}
