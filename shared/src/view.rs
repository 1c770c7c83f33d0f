//! Projection of the model into what shells draw.

use serde::{Deserialize, Serialize};

use crate::config::ApiConfig;
use crate::detail::DetailPhase;
use crate::listing::{DialogPhase, ItemForm, SubmitStep};
use crate::model::{
    AppState, ImageId, Item, ItemId, ItemType, Model, Page, CATEGORIES, COLORS,
    QUICK_SEARCH_CATEGORIES, REPORT_CATEGORIES, VENUES,
};
use crate::my_items::{ItemStats, TypeTab};
use crate::search::{FilterChip, StatusFilter};
use crate::{ToastMessage, DESCRIPTION_PREVIEW_LENGTH, MAX_IMAGES_PER_ITEM};

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub enum ViewState {
    #[default]
    Starting,
    Ready,
    Misconfigured {
        message: String,
    },
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavAction {
    SignIn,
    ReportItem,
    MyItems,
    SignOut,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ItemCard {
    pub id: ItemId,
    pub item_type: ItemType,
    pub tag: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: String,
    pub date: String,
    pub image_url: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct HomeView {
    pub keywords: String,
    pub category: String,
    pub categories: Vec<String>,
    pub cards: Vec<ItemCard>,
    pub is_loading: bool,
    pub has_more: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ChipView {
    pub label: String,
    pub chip: FilterChip,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ColorOption {
    pub name: String,
    pub hex: String,
    pub selected: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct CatalogView {
    pub date: Option<String>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub keywords: String,
    pub status: Option<StatusFilter>,
    pub colors: Vec<ColorOption>,
    pub venues: Vec<String>,
    pub categories: Vec<String>,
    pub chips: Vec<ChipView>,
    pub has_active_filters: bool,
    pub cards: Vec<ItemCard>,
    pub is_loading: bool,
    pub is_refreshing: bool,
    pub is_empty: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ImageView {
    pub id: ImageId,
    pub url: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DetailItemView {
    pub id: ItemId,
    pub tag: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: String,
    pub date: String,
    pub time: String,
    pub color: String,
    pub contact_info: String,
    pub reporter_name: Option<String>,
    pub reporter_faculty: Option<String>,
    pub images: Vec<ImageView>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct DetailView {
    pub open: bool,
    pub is_loading: bool,
    pub error: Option<String>,
    pub can_retry: bool,
    pub item: Option<DetailItemView>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct SignInView {
    pub open: bool,
    pub email: String,
    pub submitting: bool,
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct SignUpView {
    pub open: bool,
    pub email: String,
    pub name: String,
    pub age: String,
    pub phone: String,
    pub faculty: String,
    pub submitting: bool,
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ReportView {
    pub open: bool,
    pub form: ItemForm,
    pub image_names: Vec<String>,
    pub can_add_images: bool,
    pub submitting: bool,
    pub step: Option<SubmitStep>,
    pub error: Option<String>,
    pub categories: Vec<String>,
    pub venues: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct EditView {
    pub open: bool,
    pub item_id: Option<ItemId>,
    pub form: ItemForm,
    pub existing_images: Vec<ImageView>,
    pub new_image_names: Vec<String>,
    pub can_add_images: bool,
    pub removing_image: Option<ImageId>,
    pub submitting: bool,
    pub step: Option<SubmitStep>,
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DeleteView {
    pub item_id: ItemId,
    pub title: String,
    pub in_flight: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct MyItemsView {
    pub cards: Vec<ItemCard>,
    pub stats: ItemStats,
    pub query: String,
    pub tab: TypeTab,
    pub is_loading: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewModel {
    pub state: ViewState,
    pub page: Page,
    pub signed_in: bool,
    pub nav: Vec<NavAction>,
    pub home: HomeView,
    pub catalog: CatalogView,
    pub detail: DetailView,
    pub sign_in: SignInView,
    pub sign_up: SignUpView,
    pub report: ReportView,
    pub edit: EditView,
    pub delete: Option<DeleteView>,
    pub my_items: MyItemsView,
    pub toast: Option<ToastMessage>,
    /// The animated background is a static decoration with no state.
    pub show_decorations: bool,
}

pub fn nav_actions(signed_in: bool) -> Vec<NavAction> {
    if signed_in {
        vec![NavAction::ReportItem, NavAction::MyItems, NavAction::SignOut]
    } else {
        vec![NavAction::SignIn]
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn preview(text: &str) -> String {
    if text.chars().count() <= DESCRIPTION_PREVIEW_LENGTH {
        return text.to_string();
    }
    let cut: String = text.chars().take(DESCRIPTION_PREVIEW_LENGTH).collect();
    format!("{}...", cut.trim_end())
}

pub fn card(item: &Item, config: Option<&ApiConfig>) -> ItemCard {
    ItemCard {
        id: item.id,
        item_type: item.item_type,
        tag: item.item_type.label().to_string(),
        title: item.title.clone(),
        description: preview(&item.description),
        category: item.category.clone(),
        location: item.location.clone(),
        date: item.date.clone(),
        image_url: config
            .zip(item.first_image())
            .map(|(c, img)| c.image_url(&img.image_path)),
    }
}

fn phase_parts(phase: &DialogPhase) -> (bool, Option<SubmitStep>, Option<String>) {
    match phase {
        DialogPhase::Submitting(step) => (true, Some(*step), None),
        DialogPhase::Failed(err) => (false, None, Some(err.user_facing_message())),
        DialogPhase::Editing | DialogPhase::Succeeded => (false, None, None),
    }
}

fn detail_view(model: &Model) -> DetailView {
    let detail = &model.detail;
    if !detail.is_open() {
        return DetailView::default();
    }

    let mut view = DetailView {
        open: true,
        ..DetailView::default()
    };

    match detail.phase() {
        DetailPhase::Closed => {}
        DetailPhase::Loading => view.is_loading = true,
        DetailPhase::Failed(err) => {
            view.error = Some(err.user_facing_message());
            view.can_retry = true;
        }
        DetailPhase::Loaded(item) => {
            let images = match &model.config {
                Some(config) => item
                    .images
                    .iter()
                    .filter(|img| !detail.is_image_hidden(img.id))
                    .map(|img| ImageView {
                        id: img.id,
                        url: config.image_url(&img.image_path),
                    })
                    .collect(),
                None => Vec::new(),
            };
            view.item = Some(DetailItemView {
                id: item.id,
                tag: item.item_type.label().to_string(),
                title: item.title.clone(),
                description: item.description.clone(),
                category: item.category.clone(),
                location: item.location.clone(),
                date: item.date.clone(),
                time: item.time.clone(),
                color: item.color.clone(),
                contact_info: item.contact_info.clone(),
                reporter_name: item
                    .added_by
                    .as_ref()
                    .map(|r| r.name.clone())
                    .filter(|n| !n.is_empty()),
                reporter_faculty: item
                    .added_by
                    .as_ref()
                    .map(|r| r.faculty.clone())
                    .filter(|f| !f.is_empty()),
                images,
            });
        }
    }
    view
}

fn catalog_view(model: &Model) -> CatalogView {
    let catalog = &model.catalog;
    let selection = &catalog.selection;
    let controller = &catalog.controller;
    let config = model.config.as_ref();

    CatalogView {
        date: selection.date().map(str::to_string),
        location: selection.location().map(str::to_string),
        category: selection.category().map(str::to_string),
        keywords: selection.keywords().to_string(),
        status: selection.status(),
        colors: COLORS
            .iter()
            .map(|(name, hex)| ColorOption {
                name: name.to_string(),
                hex: hex.to_string(),
                selected: selection.colors().iter().any(|c| c == name),
            })
            .collect(),
        venues: strings(VENUES),
        categories: strings(CATEGORIES),
        chips: selection
            .chips()
            .into_iter()
            .map(|chip| ChipView {
                label: chip.label(),
                chip,
            })
            .collect(),
        has_active_filters: selection.is_active(),
        cards: controller.results().iter().map(|i| card(i, config)).collect(),
        is_loading: controller.is_initial_load(),
        is_refreshing: controller.is_loading() && controller.has_loaded(),
        is_empty: controller.has_loaded() && controller.results().is_empty(),
    }
}

fn edit_view(model: &Model) -> EditView {
    let edit = &model.edit;
    if !edit.open {
        return EditView::default();
    }
    let (submitting, step, error) = phase_parts(&edit.phase);
    let stored = edit.existing_images.len();
    EditView {
        open: true,
        item_id: edit.item_id(),
        form: edit.form.clone(),
        existing_images: model
            .config
            .as_ref()
            .map(|config| {
                edit.existing_images
                    .iter()
                    .map(|img| ImageView {
                        id: img.id,
                        url: config.image_url(&img.image_path),
                    })
                    .collect()
            })
            .unwrap_or_default(),
        new_image_names: edit
            .images
            .files()
            .iter()
            .map(|f| f.file_name.clone())
            .collect(),
        can_add_images: stored + edit.images.files().len() < MAX_IMAGES_PER_ITEM,
        removing_image: edit.removing_image,
        submitting,
        step,
        error,
    }
}

pub fn project(model: &Model) -> ViewModel {
    let state = match (&model.state, &model.active_error) {
        (AppState::Misconfigured, Some(err)) => ViewState::Misconfigured {
            message: err.user_facing_message(),
        },
        (AppState::Misconfigured, None) => ViewState::Misconfigured {
            message: "The app is not configured with a server address.".to_string(),
        },
        (AppState::Ready, _) => ViewState::Ready,
        (AppState::Starting, _) => ViewState::Starting,
    };

    let signed_in = model.session.is_authenticated();
    let config = model.config.as_ref();

    let home = &model.home;
    let (report_submitting, report_step, report_error) = phase_parts(&model.report.phase);

    ViewModel {
        state,
        page: model.page,
        signed_in,
        nav: nav_actions(signed_in),
        home: HomeView {
            keywords: home.keywords().to_string(),
            category: home.category().to_string(),
            categories: strings(QUICK_SEARCH_CATEGORIES),
            cards: home.visible().iter().map(|i| card(i, config)).collect(),
            is_loading: home.controller.is_initial_load(),
            has_more: home.has_more(),
        },
        catalog: catalog_view(model),
        detail: detail_view(model),
        sign_in: SignInView {
            open: model.sign_in.open,
            email: model.sign_in.email.clone(),
            submitting: model.sign_in.submitting,
            error: model.sign_in.error.clone(),
        },
        sign_up: SignUpView {
            open: model.sign_up.open,
            email: model.sign_up.email.clone(),
            name: model.sign_up.name.clone(),
            age: model.sign_up.age.clone(),
            phone: model.sign_up.phone.clone(),
            faculty: model.sign_up.faculty.clone(),
            submitting: model.sign_up.submitting,
            error: model.sign_up.error.clone(),
        },
        report: ReportView {
            open: model.report.open,
            form: model.report.form.clone(),
            image_names: model
                .report
                .images
                .files()
                .iter()
                .map(|f| f.file_name.clone())
                .collect(),
            can_add_images: model.report.images.files().len() < MAX_IMAGES_PER_ITEM,
            submitting: report_submitting,
            step: report_step,
            error: report_error,
            categories: strings(REPORT_CATEGORIES),
            venues: strings(VENUES),
        },
        edit: edit_view(model),
        delete: model.delete.target.map(|id| DeleteView {
            item_id: id,
            title: model
                .my_items
                .find(id)
                .map(|i| i.title.clone())
                .unwrap_or_default(),
            in_flight: model.delete.in_flight,
        }),
        my_items: MyItemsView {
            cards: model
                .my_items
                .visible()
                .into_iter()
                .map(|i| card(i, config))
                .collect(),
            stats: model.my_items.stats(),
            query: model.my_items.query.clone(),
            tab: model.my_items.tab,
            is_loading: model.my_items.controller.is_initial_load(),
        },
        toast: model.active_toast.clone(),
        show_decorations: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nav_depends_on_session() {
        assert_eq!(nav_actions(false), vec![NavAction::SignIn]);
        assert_eq!(
            nav_actions(true),
            vec![NavAction::ReportItem, NavAction::MyItems, NavAction::SignOut]
        );
    }

    #[test]
    fn card_uses_first_image_and_shortens_description() {
        let config = ApiConfig::new("https://api.unifind.test").unwrap();
        let item: Item = serde_json::from_value(json!({
            "id": 2, "item_type": 1, "title": "Wallet", "descs": "x".repeat(200),
            "images": [{ "id": 1, "imagePath": "w1.jpg" }, { "id": 2, "imagePath": "w2.jpg" }]
        }))
        .unwrap();

        let card = card(&item, Some(&config));
        assert_eq!(card.tag, "Found");
        assert_eq!(
            card.image_url.as_deref(),
            Some("https://api.unifind.test/uploads/items/w1.jpg")
        );
        assert!(card.description.ends_with("..."));
        assert_eq!(card.description.chars().count(), DESCRIPTION_PREVIEW_LENGTH + 3);
    }

    #[test]
    fn default_model_projects_a_starting_view() {
        let view = project(&Model::default());
        assert_eq!(view.state, ViewState::Starting);
        assert_eq!(view.nav, vec![NavAction::SignIn]);
        assert!(view.show_decorations);
        assert!(!view.detail.open);
        assert!(view.delete.is_none());
    }
}
