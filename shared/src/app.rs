use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::auth::extract_token;
use crate::capabilities::{
    acknowledge, decode, extract_list, extract_record, Acknowledged, ApiOperation, ApiOutcome,
    ApiRequest, Capabilities, Multipart, TokenStore,
};
use crate::config::ApiConfig;
use crate::detail::OpenDecision;
use crate::event::Event;
use crate::listing::{
    uploaded_paths, AttachImagesBody, DeleteConfirmation, DialogPhase, EditDialog, ReportDialog,
    SubmitStep,
};
use crate::model::{AppState, ImageId, Item, ItemId, Model, Page};
use crate::search::Applied;
use crate::view::{self, ViewModel};
use crate::{AppError, ErrorKind, ToastKind, ToastMessage};

#[derive(Default)]
pub struct App;

fn parse_items(operation: ApiOperation, outcome: ApiOutcome) -> Result<Vec<Item>, AppError> {
    let ack = acknowledge(operation, outcome)?;
    match extract_list(&ack) {
        Some(list) => decode(operation, list),
        None if ack.data.is_null() => Ok(Vec::new()),
        None => Err(AppError::new(ErrorKind::Deserialization, "Failed to load items")
            .with_context("operation", operation.name())),
    }
}

fn parse_item(outcome: ApiOutcome) -> Result<Item, AppError> {
    let ack = acknowledge(ApiOperation::ItemDetail, outcome)?;
    let record = extract_record(&ack).ok_or_else(|| {
        AppError::new(
            ErrorKind::Deserialization,
            "Item details could not be read. Please try again.",
        )
    })?;
    decode(ApiOperation::ItemDetail, record)
}

fn created_item_id(ack: &Acknowledged) -> Option<ItemId> {
    ack.data
        .get("id")
        .or_else(|| ack.data.get("data").and_then(|d| d.get("id")))
        .and_then(Value::as_u64)
        .map(ItemId)
}

fn success(message: &str) -> ToastMessage {
    ToastMessage::new("Success", message, ToastKind::Success)
}

impl App {
    fn config(model: &Model) -> Option<&ApiConfig> {
        if model.is_ready() {
            model.config.as_ref()
        } else {
            None
        }
    }

    fn run_catalog_search(model: &mut Model, caps: &Capabilities) {
        let filters = model.catalog.filters();
        let Some(config) = Self::config(model) else {
            return;
        };
        let request = ApiRequest::search(config, &filters);
        let seq = model.catalog.controller.begin(filters);
        request.send(&caps.http, move |outcome| Event::CatalogSearchResponse {
            seq,
            outcome,
        });
    }

    fn run_home_search(model: &mut Model, caps: &Capabilities) {
        model.home.debounce.cancel();
        let filters = model.home.filters();
        let Some(config) = Self::config(model) else {
            return;
        };
        let request = ApiRequest::search(config, &filters);
        let seq = model.home.controller.begin(filters);
        request.send(&caps.http, move |outcome| Event::HomeSearchResponse { seq, outcome });
    }

    fn refresh_my_items(model: &mut Model, caps: &Capabilities) {
        let Some(config) = Self::config(model) else {
            return;
        };
        let Ok(request) = ApiRequest::my_items(config).authorized(&model.session) else {
            return;
        };
        let seq = model.my_items.begin();
        request.send(&caps.http, move |outcome| Event::MyItemsResponse { seq, outcome });
    }

    fn fetch_detail(model: &mut Model, caps: &Capabilities, id: ItemId, generation: u64) {
        let Some(config) = Self::config(model) else {
            return;
        };
        match ApiRequest::item_detail(config, id).authorized(&model.session) {
            Ok(request) => request.send(&caps.http, move |outcome| Event::DetailResponse {
                item_id: id,
                generation,
                outcome,
            }),
            Err(e) => {
                model.detail.close();
                model.show_error(&e.into());
            }
        }
    }

    /// Something the user owns was created, changed or removed. Active
    /// searches and the dashboard are refreshed in the background.
    fn item_changed(model: &mut Model, caps: &Capabilities) {
        if model.catalog.controller.last_filters().is_some() {
            Self::run_catalog_search(model, caps);
        }
        if model.home.controller.last_filters().is_some() {
            Self::run_home_search(model, caps);
        }
        if model.session.is_authenticated()
            && (model.my_items.controller.has_loaded() || model.page == Page::MyItems)
        {
            Self::refresh_my_items(model, caps);
        }
    }

    /// A 401 means the stored token may have been replaced or removed;
    /// re-read it.
    fn check_unauthorized(error: &AppError, caps: &Capabilities) {
        if error.kind == ErrorKind::Authentication && error.http_status() == Some(401) {
            info!("server rejected session, re-reading stored token");
            TokenStore::new(&caps.kv).load(Event::SessionLoaded);
        }
    }

    fn fail(model: &mut Model, caps: &Capabilities, error: &AppError) {
        warn!(code = error.code(), message = %error.message, "operation failed");
        model.show_error(error);
        Self::check_unauthorized(error, caps);
    }

    fn clear_user_state(model: &mut Model) {
        model.my_items.clear();
        model.detail.close();
        model.report.reset();
        model.edit.reset();
        model.delete = DeleteConfirmation::default();
        model.sign_in.reset();
        model.sign_up.reset();
        if model.page == Page::MyItems {
            model.page = Page::Home;
        }
    }

    fn persist_session(model: &Model, caps: &Capabilities) {
        if let Some(token) = model.session.token() {
            TokenStore::new(&caps.kv).save(token, Event::SessionStored);
        }
    }

    fn navigate(model: &mut Model, caps: &Capabilities, page: Page) {
        match page {
            Page::MyItems if !model.session.is_authenticated() => {
                model.show_error(&AppError::new(
                    ErrorKind::Authentication,
                    "Please sign in to view your items.",
                ));
                model.page = Page::Home;
                return;
            }
            Page::MyItems => Self::refresh_my_items(model, caps),
            Page::Catalog if model.catalog.controller.last_filters().is_none() => {
                Self::run_catalog_search(model, caps)
            }
            Page::Home if model.home.controller.last_filters().is_none() => {
                Self::run_home_search(model, caps)
            }
            Page::Home | Page::Catalog | Page::About => {}
        }
        model.page = page;
    }

    // --- Sign in / sign up ---

    fn submit_sign_in(model: &mut Model, caps: &Capabilities) {
        if model.sign_in.submitting {
            return;
        }
        let Some(config) = Self::config(model) else {
            return;
        };
        let request = match model.sign_in.body() {
            Ok(body) => ApiRequest::sign_in(config)
                .with_json(&body)
                .map_err(AppError::from),
            Err(e) => Err(e.into()),
        };
        match request {
            Ok(request) => {
                model.sign_in.submitting = true;
                model.sign_in.error = None;
                request.send(&caps.http, Event::SignInResponse);
            }
            Err(e) => model.sign_in.error = Some(e.user_facing_message()),
        }
    }

    fn submit_sign_up(model: &mut Model, caps: &Capabilities) {
        if model.sign_up.submitting {
            return;
        }
        let Some(config) = Self::config(model) else {
            return;
        };
        let request = match model.sign_up.body() {
            Ok(body) => ApiRequest::sign_up(config)
                .with_json(&body)
                .map_err(AppError::from),
            Err(e) => Err(e.into()),
        };
        match request {
            Ok(request) => {
                model.sign_up.submitting = true;
                model.sign_up.error = None;
                request.send(&caps.http, Event::SignUpResponse);
            }
            Err(e) => model.sign_up.error = Some(e.user_facing_message()),
        }
    }

    fn token_from(operation: ApiOperation, outcome: ApiOutcome) -> Result<Option<String>, AppError> {
        let ack = acknowledge(operation, outcome)?;
        Ok(extract_token(operation, &ack))
    }

    fn complete_sign_in(model: &mut Model, caps: &Capabilities, token: String) {
        model.session.sign_in(token);
        Self::persist_session(model, caps);
        model.sign_in.reset();
        model.sign_up.reset();
        info!("signed in");
    }

    // --- Report ---

    fn submit_report(model: &mut Model, caps: &Capabilities) {
        if model.report.phase.is_submitting() {
            return;
        }
        if model.report.created.is_some() {
            Self::upload_report_images(model, caps);
            return;
        }
        let Some(config) = Self::config(model) else {
            return;
        };
        let request = model
            .report
            .form
            .create_body()
            .map_err(AppError::from)
            .and_then(|body| {
                ApiRequest::create_item(config)
                    .authorized(&model.session)?
                    .with_json(&body)
                    .map_err(AppError::from)
            });
        match request {
            Ok(request) => {
                model.report.phase = DialogPhase::Submitting(SubmitStep::Saving);
                request.send(&caps.http, Event::ReportCreateResponse);
            }
            Err(e) => Self::fail_report(model, caps, e),
        }
    }

    fn upload_report_images(model: &mut Model, caps: &Capabilities) {
        let Some(config) = Self::config(model) else {
            return;
        };
        let request = ApiRequest::upload_images(config)
            .authorized(&model.session)
            .and_then(|r| r.with_multipart(Multipart::images(model.report.images.files())));
        match request {
            Ok(request) => {
                model.report.phase = DialogPhase::Submitting(SubmitStep::Uploading);
                request.send(&caps.http, Event::ReportUploadResponse);
            }
            Err(e) => Self::fail_report(model, caps, e.into()),
        }
    }

    fn attach_report_images(model: &mut Model, caps: &Capabilities, paths: Vec<String>) {
        let Some(item_id) = model.report.created else {
            return;
        };
        let Some(config) = Self::config(model) else {
            return;
        };
        let body = AttachImagesBody {
            item_id,
            image_paths: paths,
        };
        let request = ApiRequest::attach_images(config)
            .authorized(&model.session)
            .and_then(|r| r.with_json(&body));
        match request {
            Ok(request) => {
                model.report.phase = DialogPhase::Submitting(SubmitStep::Attaching);
                request.send(&caps.http, Event::ReportAttachResponse);
            }
            Err(e) => Self::fail_report(model, caps, e.into()),
        }
    }

    fn fail_report(model: &mut Model, caps: &Capabilities, error: AppError) {
        model.report.phase = DialogPhase::Failed(error.clone());
        Self::fail(model, caps, &error);
        if model.report.created.is_some() {
            Self::item_changed(model, caps);
        }
    }

    fn finish_report(model: &mut Model, caps: &Capabilities, toast: ToastMessage) {
        model.report = ReportDialog {
            phase: DialogPhase::Succeeded,
            ..ReportDialog::default()
        };
        model.show_toast(toast);
        info!("item reported");
        Self::item_changed(model, caps);
    }

    // --- Edit ---

    fn submit_edit(model: &mut Model, caps: &Capabilities) {
        if model.edit.phase.is_submitting() {
            return;
        }
        let Some(original) = model.edit.original.clone() else {
            return;
        };
        if model.edit.fields_saved {
            Self::upload_edit_images(model, caps);
            return;
        }
        let body = match model.edit.form.update_body(&original) {
            Ok(body) => body,
            Err(e) => {
                let err = AppError::from(e);
                model.edit.phase = DialogPhase::Failed(err.clone());
                model.show_error(&err);
                return;
            }
        };

        if body.is_empty() {
            model.edit.fields_saved = true;
            if model.edit.images.is_empty() {
                model.edit.reset();
                model.show_toast(ToastMessage::new("No changes", "Nothing to update.", ToastKind::Info));
            } else {
                Self::upload_edit_images(model, caps);
            }
            return;
        }

        let Some(config) = Self::config(model) else {
            return;
        };
        let request = ApiRequest::update_item(config, original.id)
            .authorized(&model.session)
            .and_then(|r| r.with_json(&body));
        match request {
            Ok(request) => {
                model.edit.phase = DialogPhase::Submitting(SubmitStep::Saving);
                request.send(&caps.http, Event::EditUpdateResponse);
            }
            Err(e) => Self::fail_edit(model, caps, e.into()),
        }
    }

    fn upload_edit_images(model: &mut Model, caps: &Capabilities) {
        let Some(config) = Self::config(model) else {
            return;
        };
        let request = ApiRequest::upload_images(config)
            .authorized(&model.session)
            .and_then(|r| r.with_multipart(Multipart::images(model.edit.images.files())));
        match request {
            Ok(request) => {
                model.edit.phase = DialogPhase::Submitting(SubmitStep::Uploading);
                request.send(&caps.http, Event::EditUploadResponse);
            }
            Err(e) => Self::edit_images_failed(model, caps, e.into()),
        }
    }

    fn attach_edit_images(model: &mut Model, caps: &Capabilities, paths: Vec<String>) {
        let Some(item_id) = model.edit.item_id() else {
            return;
        };
        let Some(config) = Self::config(model) else {
            return;
        };
        let body = AttachImagesBody {
            item_id,
            image_paths: paths,
        };
        let request = ApiRequest::attach_images(config)
            .authorized(&model.session)
            .and_then(|r| r.with_json(&body));
        match request {
            Ok(request) => {
                model.edit.phase = DialogPhase::Submitting(SubmitStep::Attaching);
                request.send(&caps.http, Event::EditAttachResponse);
            }
            Err(e) => Self::edit_images_failed(model, caps, e.into()),
        }
    }

    /// Images failed after the fields were saved: report a partial success.
    fn edit_images_failed(model: &mut Model, caps: &Capabilities, error: AppError) {
        if !model.edit.fields_saved {
            Self::fail_edit(model, caps, error);
            return;
        }
        warn!(code = error.code(), "image upload failed after item update");
        Self::check_unauthorized(&error, caps);
        Self::finish_edit(
            model,
            caps,
            ToastMessage::new(
                "Partially saved",
                "Item updated successfully, but some images failed to upload.",
                ToastKind::Info,
            ),
        );
    }

    fn fail_edit(model: &mut Model, caps: &Capabilities, error: AppError) {
        model.edit.phase = DialogPhase::Failed(error.clone());
        Self::fail(model, caps, &error);
    }

    fn finish_edit(model: &mut Model, caps: &Capabilities, toast: ToastMessage) {
        model.edit = EditDialog {
            phase: DialogPhase::Succeeded,
            ..EditDialog::default()
        };
        model.show_toast(toast);
        info!("item updated");
        Self::item_changed(model, caps);
    }

    fn delete_existing_image(model: &mut Model, caps: &Capabilities, image_id: ImageId) {
        if model.edit.removing_image.is_some() || model.edit.phase.is_submitting() {
            return;
        }
        let Some(config) = Self::config(model) else {
            return;
        };
        match ApiRequest::delete_image(config, image_id).authorized(&model.session) {
            Ok(request) => {
                model.edit.removing_image = Some(image_id);
                request.send(&caps.http, move |outcome| Event::EditImageDeleteResponse {
                    image_id,
                    outcome,
                });
            }
            Err(e) => Self::fail(model, caps, &e.into()),
        }
    }

    // --- Delete ---

    fn confirm_delete(model: &mut Model, caps: &Capabilities) {
        let Some(config) = Self::config(model) else {
            return;
        };
        let Some(target) = model.delete.target else {
            return;
        };
        match ApiRequest::delete_item(config, target).authorized(&model.session) {
            Ok(request) => {
                if model.delete.confirm().is_some() {
                    request.send(&caps.http, move |outcome| Event::DeleteResponse {
                        item_id: target,
                        outcome,
                    });
                }
            }
            Err(e) => {
                model.delete.finish();
                Self::fail(model, caps, &e.into());
            }
        }
    }

    fn item_deleted(model: &mut Model, caps: &Capabilities, id: ItemId) {
        model.my_items.remove(id);
        model.catalog.controller.remove_item(id);
        model.home.controller.remove_item(id);
        if model.detail.target() == Some(id) {
            model.detail.close();
        }
        if model.edit.item_id() == Some(id) {
            model.edit.reset();
        }
        model.show_toast(success("Item deleted successfully"));
        info!(%id, "item deleted");
        Self::item_changed(model, caps);
    }

    fn start(model: &mut Model, caps: &Capabilities, api_base_url: Option<String>) {
        let config = match api_base_url {
            Some(raw) => ApiConfig::new(raw),
            None => ApiConfig::from_env(),
        };

        match config {
            Ok(config) => {
                info!(base = config.base(), "starting");
                model.config = Some(config);
                model.state = AppState::Ready;
                model.active_error = None;
                TokenStore::new(&caps.kv).load(Event::SessionLoaded);
                Self::run_home_search(model, caps);
            }
            Err(e) => {
                error!(error = %e, "no usable API configuration");
                model.config = None;
                model.state = AppState::Misconfigured;
                model.active_error = Some(e.into());
            }
        }
    }

    /// Returns whether the view changed.
    fn handle(&self, event: Event, model: &mut Model, caps: &Capabilities) -> bool {
        match event {
            Event::Noop => false,

            Event::AppStarted { api_base_url } => {
                Self::start(model, caps, api_base_url);
                true
            }

            Event::Tick { now_ms } => {
                model.now_ms = now_ms;
                if model.home.debounce.fire_if_due(now_ms) {
                    Self::run_home_search(model, caps);
                    return true;
                }
                false
            }

            Event::Navigate(page) => {
                Self::navigate(model, caps, page);
                true
            }

            Event::DismissToast => {
                model.active_toast = None;
                true
            }

            // --- Session ---
            Event::SessionRefreshRequested => {
                TokenStore::new(&caps.kv).load(Event::SessionLoaded);
                false
            }

            Event::SessionLoaded(result) => {
                let token = result.unwrap_or_else(|e| {
                    warn!(error = %e, "could not read stored token");
                    None
                });
                if model.session.restore(token) {
                    info!(signed_in = model.session.is_authenticated(), "session changed");
                    if !model.session.is_authenticated() {
                        Self::clear_user_state(model);
                    }
                }
                true
            }

            Event::SessionStored(result) => {
                if let Err(e) = result {
                    warn!(error = %e, "could not persist token");
                    model.show_error(&e.into());
                    return true;
                }
                false
            }

            Event::SessionCleared(result) => {
                if let Err(e) = result {
                    warn!(error = %e, "could not remove stored token");
                }
                false
            }

            Event::SignOutRequested => {
                model.session.sign_out();
                Self::clear_user_state(model);
                TokenStore::new(&caps.kv).clear(Event::SessionCleared);
                model.show_toast(ToastMessage::new(
                    "Signed out",
                    "You have been signed out.",
                    ToastKind::Info,
                ));
                info!("signed out");
                true
            }

            Event::SignInDialogOpenChanged(open) => {
                if open {
                    model.sign_in.reset();
                    model.sign_in.open = true;
                    model.sign_up.open = false;
                } else if !model.sign_in.submitting {
                    model.sign_in.reset();
                }
                true
            }

            Event::SignInFieldChanged(field) => {
                model.sign_in.apply(field);
                true
            }

            Event::SignInSubmitted => {
                Self::submit_sign_in(model, caps);
                true
            }

            Event::SignInResponse(outcome) => {
                if !model.sign_in.submitting {
                    return false;
                }
                model.sign_in.submitting = false;
                match Self::token_from(ApiOperation::SignIn, outcome) {
                    Ok(Some(token)) => {
                        Self::complete_sign_in(model, caps, token);
                        model.show_toast(success("Signed in successfully"));
                    }
                    Ok(None) => {
                        let err = AppError::new(ErrorKind::ServerLogic, "No access token received");
                        model.sign_in.error = Some(err.user_facing_message());
                    }
                    Err(e) => {
                        debug!(code = e.code(), "sign in rejected");
                        model.sign_in.error = Some(e.user_facing_message());
                    }
                }
                true
            }

            Event::SignUpDialogOpenChanged(open) => {
                if open {
                    model.sign_up.reset();
                    model.sign_up.open = true;
                    model.sign_in.open = false;
                } else if !model.sign_up.submitting {
                    model.sign_up.reset();
                }
                true
            }

            Event::SignUpFieldChanged(field) => {
                model.sign_up.apply(field);
                true
            }

            Event::SignUpSubmitted => {
                Self::submit_sign_up(model, caps);
                true
            }

            Event::SignUpResponse(outcome) => {
                if !model.sign_up.submitting {
                    return false;
                }
                model.sign_up.submitting = false;
                match Self::token_from(ApiOperation::SignUp, outcome) {
                    Ok(Some(token)) => {
                        Self::complete_sign_in(model, caps, token);
                        model.show_toast(success("Account created successfully"));
                    }
                    Ok(None) => {
                        model.sign_up.reset();
                        model.sign_in.open = true;
                        model.show_toast(success("Account created. Please sign in."));
                    }
                    Err(e) => model.sign_up.error = Some(e.user_facing_message()),
                }
                true
            }

            // --- Catalog ---
            Event::FilterDateChanged(date) => {
                match model.catalog.selection.set_date(date) {
                    Ok(true) => Self::run_catalog_search(model, caps),
                    Ok(false) => return false,
                    Err(e) => model.show_error(&e.into()),
                }
                true
            }

            Event::FilterLocationChanged(location) => {
                match model.catalog.selection.set_location(location) {
                    Ok(true) => Self::run_catalog_search(model, caps),
                    Ok(false) => return false,
                    Err(e) => model.show_error(&e.into()),
                }
                true
            }

            Event::FilterCategoryChanged(category) => {
                match model.catalog.selection.set_category(category) {
                    Ok(true) => Self::run_catalog_search(model, caps),
                    Ok(false) => return false,
                    Err(e) => model.show_error(&e.into()),
                }
                true
            }

            Event::FilterColorToggled(color) => {
                match model.catalog.selection.toggle_color(&color) {
                    Ok(()) => Self::run_catalog_search(model, caps),
                    Err(e) => model.show_error(&e.into()),
                }
                true
            }

            Event::FilterKeywordsChanged(keywords) => {
                if !model.catalog.selection.set_keywords(keywords) {
                    return false;
                }
                Self::run_catalog_search(model, caps);
                true
            }

            Event::FilterStatusToggled(status) => {
                model.catalog.selection.toggle_status(status);
                Self::run_catalog_search(model, caps);
                true
            }

            Event::FilterChipRemoved(chip) => {
                if !model.catalog.selection.remove_chip(&chip) {
                    return false;
                }
                Self::run_catalog_search(model, caps);
                true
            }

            Event::FiltersCleared => {
                model.catalog.selection.clear();
                Self::run_catalog_search(model, caps);
                true
            }

            Event::CatalogSearchResponse { seq, outcome } => {
                let result = parse_items(ApiOperation::SearchItems, outcome);
                match model.catalog.controller.settle(seq, result) {
                    Applied::Fresh => true,
                    Applied::Failed(e) => {
                        Self::fail(model, caps, &e);
                        true
                    }
                    Applied::Stale => false,
                }
            }

            // --- Home ---
            Event::QuickSearchKeywordsChanged { text, now_ms } => {
                model.now_ms = now_ms;
                if model.home.set_keywords(text, now_ms) {
                    model.home.reset_paging();
                }
                true
            }

            Event::QuickSearchCategoryChanged { category, now_ms } => {
                model.now_ms = now_ms;
                if model.home.set_category(category, now_ms) {
                    model.home.reset_paging();
                }
                true
            }

            Event::HomeShowMore => {
                model.home.show_more();
                true
            }

            Event::HomeSearchResponse { seq, outcome } => {
                let result = parse_items(ApiOperation::SearchItems, outcome);
                match model.home.controller.settle(seq, result) {
                    Applied::Fresh => true,
                    Applied::Failed(e) => {
                        Self::fail(model, caps, &e);
                        true
                    }
                    Applied::Stale => false,
                }
            }

            // --- Detail ---
            Event::DetailOpenChanged { item_id, open } => {
                if !open {
                    model.detail.close();
                    return true;
                }
                match model.detail.open(item_id, model.session.is_authenticated()) {
                    OpenDecision::Fetch { id, generation } => {
                        Self::fetch_detail(model, caps, id, generation)
                    }
                    OpenDecision::AlreadyFetched => {}
                    OpenDecision::AuthRequired => model.show_error(&AppError::auth_required()),
                }
                true
            }

            Event::DetailRetryRequested => {
                if let Some(OpenDecision::Fetch { id, generation }) = model.detail.retry() {
                    Self::fetch_detail(model, caps, id, generation);
                    return true;
                }
                false
            }

            Event::DetailResponse {
                item_id,
                generation,
                outcome,
            } => {
                let result = parse_item(outcome);
                if let Err(e) = &result {
                    Self::check_unauthorized(e, caps);
                }
                model.detail.settle(item_id, generation, result)
            }

            Event::DetailImageFailed(image_id) => {
                model.detail.hide_image(image_id);
                true
            }

            // --- Report ---
            Event::ReportDialogOpenChanged(true) => {
                if !model.session.is_authenticated() {
                    model.show_error(&AppError::new(
                        ErrorKind::Authentication,
                        "Please sign in to report an item.",
                    ));
                } else if !model.report.open {
                    model.report.reset();
                    model.report.open = true;
                }
                true
            }

            Event::ReportDialogOpenChanged(false) => {
                if !model.report.can_close() {
                    return false;
                }
                let created = model.report.created.is_some();
                model.report.reset();
                if created {
                    Self::item_changed(model, caps);
                }
                true
            }

            Event::ReportFieldChanged(field) => {
                model.report.form.apply(field);
                true
            }

            Event::ReportImagesAdded(files) => {
                if let Err(e) = model.report.images.add(files, 0) {
                    model.show_error(&e.into());
                }
                true
            }

            Event::ReportImageRemoved(index) => model.report.images.remove(index),

            Event::ReportSubmitted => {
                Self::submit_report(model, caps);
                true
            }

            Event::ReportCreateResponse(outcome) => {
                if model.report.phase != DialogPhase::Submitting(SubmitStep::Saving) {
                    return false;
                }
                match acknowledge(ApiOperation::CreateItem, outcome) {
                    Ok(ack) => {
                        let id = created_item_id(&ack);
                        model.report.created = id;
                        match id {
                            Some(_) if !model.report.images.is_empty() => {
                                Self::upload_report_images(model, caps)
                            }
                            None if !model.report.images.is_empty() => {
                                warn!("create reply carried no item id, images skipped");
                                Self::finish_report(
                                    model,
                                    caps,
                                    ToastMessage::new(
                                        "Item reported",
                                        "Your item was reported, but its images could not be attached.",
                                        ToastKind::Info,
                                    ),
                                );
                            }
                            _ => Self::finish_report(
                                model,
                                caps,
                                success("Item reported successfully"),
                            ),
                        }
                    }
                    Err(e) => Self::fail_report(model, caps, e),
                }
                true
            }

            Event::ReportUploadResponse(outcome) => {
                if model.report.phase != DialogPhase::Submitting(SubmitStep::Uploading) {
                    return false;
                }
                let paths = acknowledge(ApiOperation::UploadImages, outcome).and_then(|ack| {
                    uploaded_paths(&ack.data).ok_or_else(|| {
                        AppError::new(ErrorKind::Deserialization, "Failed to upload images")
                    })
                });
                match paths {
                    Ok(paths) => Self::attach_report_images(model, caps, paths),
                    Err(e) => Self::fail_report(model, caps, e),
                }
                true
            }

            Event::ReportAttachResponse(outcome) => {
                if model.report.phase != DialogPhase::Submitting(SubmitStep::Attaching) {
                    return false;
                }
                match acknowledge(ApiOperation::AttachImages, outcome) {
                    Ok(_) => Self::finish_report(model, caps, success("Item reported successfully")),
                    Err(e) => Self::fail_report(model, caps, e),
                }
                true
            }

            // --- Edit ---
            Event::EditRequested(id) => {
                if !model.session.is_authenticated() {
                    model.show_error(&AppError::new(
                        ErrorKind::Authentication,
                        "Please sign in to edit your items.",
                    ));
                    return true;
                }
                match model.my_items.find(id).cloned() {
                    Some(item) => model.edit.start(&item),
                    None => model.show_error(&AppError::new(ErrorKind::NotFound, "Item not found")),
                }
                true
            }

            Event::EditDialogOpenChanged(open) => {
                if open {
                    if model.edit.original.is_none() {
                        return false;
                    }
                    model.edit.open = true;
                } else {
                    if !model.edit.can_close() {
                        return false;
                    }
                    model.edit.reset();
                }
                true
            }

            Event::EditFieldChanged(field) => {
                model.edit.form.apply(field);
                true
            }

            Event::EditImagesAdded(files) => {
                let stored = model.edit.existing_images.len();
                if let Err(e) = model.edit.images.add(files, stored) {
                    model.show_error(&e.into());
                }
                true
            }

            Event::EditNewImageRemoved(index) => model.edit.images.remove(index),

            Event::EditExistingImageRemoved(image_id) => {
                Self::delete_existing_image(model, caps, image_id);
                true
            }

            Event::EditImageDeleteResponse { image_id, outcome } => {
                if model.edit.removing_image != Some(image_id) {
                    return false;
                }
                model.edit.removing_image = None;
                match acknowledge(ApiOperation::DeleteImage, outcome) {
                    Ok(_) => {
                        model.edit.drop_existing_image(image_id);
                        model.show_toast(success("Image deleted successfully"));
                        Self::item_changed(model, caps);
                    }
                    Err(e) => Self::fail(model, caps, &e),
                }
                true
            }

            Event::EditSubmitted => {
                Self::submit_edit(model, caps);
                true
            }

            Event::EditUpdateResponse(outcome) => {
                if model.edit.phase != DialogPhase::Submitting(SubmitStep::Saving) {
                    return false;
                }
                match acknowledge(ApiOperation::UpdateItem, outcome) {
                    Ok(_) => {
                        model.edit.fields_saved = true;
                        if model.edit.images.is_empty() {
                            Self::finish_edit(model, caps, success("Item updated successfully"));
                        } else {
                            Self::upload_edit_images(model, caps);
                        }
                    }
                    Err(e) => Self::fail_edit(model, caps, e),
                }
                true
            }

            Event::EditUploadResponse(outcome) => {
                if model.edit.phase != DialogPhase::Submitting(SubmitStep::Uploading) {
                    return false;
                }
                let paths = acknowledge(ApiOperation::UploadImages, outcome).and_then(|ack| {
                    uploaded_paths(&ack.data).ok_or_else(|| {
                        AppError::new(ErrorKind::Deserialization, "Failed to upload images")
                    })
                });
                match paths {
                    Ok(paths) => Self::attach_edit_images(model, caps, paths),
                    Err(e) => Self::edit_images_failed(model, caps, e),
                }
                true
            }

            Event::EditAttachResponse(outcome) => {
                if model.edit.phase != DialogPhase::Submitting(SubmitStep::Attaching) {
                    return false;
                }
                match acknowledge(ApiOperation::AttachImages, outcome) {
                    Ok(_) => Self::finish_edit(model, caps, success("Item updated successfully")),
                    Err(e) => Self::edit_images_failed(model, caps, e),
                }
                true
            }

            // --- Delete ---
            Event::DeleteRequested(id) => {
                if !model.session.is_authenticated() {
                    model.show_error(&AppError::new(
                        ErrorKind::Authentication,
                        "Please sign in to delete your items.",
                    ));
                    return true;
                }
                model.delete.request(id);
                true
            }

            Event::DeleteCancelled => {
                model.delete.cancel();
                true
            }

            Event::DeleteConfirmed => {
                Self::confirm_delete(model, caps);
                true
            }

            Event::DeleteResponse { item_id, outcome } => {
                if model.delete.target != Some(item_id) || !model.delete.in_flight {
                    return false;
                }
                model.delete.finish();
                match acknowledge(ApiOperation::DeleteItem, outcome) {
                    Ok(_) => Self::item_deleted(model, caps, item_id),
                    Err(e) => Self::fail(model, caps, &e),
                }
                true
            }

            // --- My items ---
            Event::MyItemsQueryChanged(query) => {
                model.my_items.query = query;
                true
            }

            Event::MyItemsTabChanged(tab) => {
                model.my_items.tab = tab;
                true
            }

            Event::MyItemsResponse { seq, outcome } => {
                let result = parse_items(ApiOperation::MyItems, outcome);
                match model.my_items.controller.settle(seq, result) {
                    Applied::Fresh => true,
                    Applied::Failed(e) => {
                        Self::fail(model, caps, &e);
                        true
                    }
                    Applied::Stale => false,
                }
            }
        }
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        debug!(
            event = event.name(),
            user_initiated = event.is_user_initiated(),
            "update"
        );

        if model.state == AppState::Misconfigured
            && !matches!(event, Event::AppStarted { .. } | Event::DismissToast)
        {
            debug!(event = event.name(), "ignored while misconfigured");
            return;
        }

        if self.handle(event, model, caps) {
            caps.render.render();
        }
    }

    fn view(&self, model: &Model) -> ViewModel {
        view::project(model)
    }
}
