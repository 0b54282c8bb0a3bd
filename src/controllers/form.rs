use crate::app_state::AppState;
use crate::model::{ChipsetBrand, FeatureRecord, OsFamily};
use crate::views::page::{ResultView, render_page};
use axum::Form;
use axum::extract::State;
use axum::extract::rejection::FormRejection;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use serde::Deserialize;
use tracing::warn;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FiveGSupport {
    No,
    Yes,
}

/// The fields posted by the page's form, as the browser sends them.
#[derive(Deserialize, Debug)]
pub struct SpecsForm {
    os_family: OsFamily,
    chipset_brand: ChipsetBrand,
    ram_gb: f64,
    storage_gb: f64,
    screen_in: f64,
    refresh_hz: f64,
    supports_5g: FiveGSupport,
}

impl From<SpecsForm> for FeatureRecord {
    fn from(form: SpecsForm) -> Self {
        Self {
            os_family: form.os_family,
            chipset_brand: form.chipset_brand,
            ram_gb: form.ram_gb,
            storage_gb: form.storage_gb,
            screen_in: form.screen_in,
            refresh_hz: form.refresh_hz,
            supports_5g: match form.supports_5g {
                FiveGSupport::Yes => 1,
                FiveGSupport::No => 0,
            },
        }
    }
}

pub async fn get_form(State(state): State<AppState>) -> Html<String> {
    render_page(&state.page_title, &FeatureRecord::default(), None)
}

pub async fn post_form(
    State(state): State<AppState>,
    form: Result<Form<SpecsForm>, FormRejection>,
) -> Response {
    let record = match form {
        Ok(Form(form)) => FeatureRecord::from(form),
        Err(rejection) => {
            let reason = rejection.body_text();
            warn!("Rejected form submission: {}", reason);
            return (
                rejection.status(),
                render_page(
                    &state.page_title,
                    &FeatureRecord::default(),
                    Some(ResultView::Rejected(&reason)),
                ),
            )
                .into_response();
        }
    };

    // The browser enforces these bounds too, but a hand-made POST does not.
    if let Err(err) = record.check_ranges() {
        warn!("Rejected form submission: {}", err);
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            render_page(&state.page_title, &record, Some(ResultView::Invalid(&err))),
        )
            .into_response();
    }

    let outcome = state.handler.handle(&record);
    render_page(&state.page_title, &record, Some(ResultView::Outcome(&outcome))).into_response()
}
