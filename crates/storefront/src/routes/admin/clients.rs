//! Back-office client accounts.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use wholesale_core::UserId;

use super::{Pager, list_href, parse_page};
use crate::api::{AdminListQuery, ApiError, Client, NewClient};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::routes::{NavView, safe_return_path};
use crate::state::AppState;

const LIST_PATH: &str = "/admin/clients";

/// Client list query. `created`/`error` carry the outcome of a create.
#[derive(Debug, Default, Deserialize)]
pub struct ClientsQuery {
    pub search: Option<String>,
    pub page: Option<String>,
    pub created: Option<String>,
    pub error: Option<String>,
}

/// Client row display data for templates.
#[derive(Clone)]
pub struct ClientView {
    pub id: i64,
    pub client_number: String,
    pub company: String,
    pub contact: String,
    pub email: String,
    pub phone: String,
    pub province: String,
    pub tax_id: String,
    /// Discount as a percentage, e.g. `"10"`.
    pub discount: String,
    pub is_active: bool,
}

impl From<&Client> for ClientView {
    fn from(client: &Client) -> Self {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        Self {
            id: client.id.as_i64(),
            client_number: text(&client.client_number),
            company: client
                .company_name
                .clone()
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| client.username.clone()),
            contact: text(&client.contact_name),
            email: text(&client.email),
            phone: text(&client.phone),
            province: text(&client.province),
            tax_id: text(&client.tax_id),
            discount: (client.discount_rate * Decimal::ONE_HUNDRED)
                .normalize()
                .to_string(),
            is_active: client.is_active,
        }
    }
}

/// Admin client list template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/clients.html")]
pub struct AdminClientsTemplate {
    pub nav: NavView,
    pub clients: Vec<ClientView>,
    pub total: usize,
    pub search: String,
    pub pager: Pager,
    pub return_to: String,
    pub created: Option<String>,
    pub error: Option<String>,
}

fn create_error_message(code: &str) -> &'static str {
    match code {
        "missing" => "Company name and password are required.",
        "discount" => "The discount must be a percentage between 0 and 100.",
        "rejected" => "The API rejected the new client. Check for a duplicate email or client number.",
        _ => "The client could not be created.",
    }
}

/// List client accounts.
#[instrument(skip(state, session, auth))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(auth): RequireAdmin,
    Query(query): Query<ClientsQuery>,
) -> Result<AdminClientsTemplate> {
    let search = query.search.unwrap_or_default().trim().to_string();
    let page = parse_page(query.page.as_deref());

    let listing = state
        .api()
        .admin_clients(
            &auth.token,
            &AdminListQuery {
                search: search.clone(),
                is_active: None,
                page,
            },
        )
        .await?;
    tracing::debug!(count = listing.items.len(), total = listing.total, "Clients loaded");

    let mut pairs = vec![("search", search.clone())];
    let pager = Pager::new(LIST_PATH, &pairs, page, listing.has_next);
    if page > 1 {
        pairs.push(("page", page.to_string()));
    }

    Ok(AdminClientsTemplate {
        nav: NavView::load(&session, Some(&auth.user)).await,
        clients: listing.items.iter().map(ClientView::from).collect(),
        total: listing.total,
        search,
        pager,
        return_to: list_href(LIST_PATH, &pairs),
        created: query.created.filter(|name| !name.is_empty()),
        error: query.error.as_deref().map(|code| create_error_message(code).to_string()),
    })
}

/// New client form data.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NewClientForm {
    pub client_number: String,
    pub company_name: String,
    pub contact_name: String,
    pub email: String,
    pub phone: String,
    pub province: String,
    pub tax_id: String,
    /// Percentage, e.g. `"12.5"`.
    pub discount: String,
    pub password: String,
}

impl NewClientForm {
    /// Validate the form; the error is the code shown back on the list page.
    fn to_new_client(&self) -> std::result::Result<NewClient, &'static str> {
        let company_name = self.company_name.trim();
        if company_name.is_empty() || self.password.is_empty() {
            return Err("missing");
        }

        let percent = match self.discount.trim() {
            "" => Decimal::ZERO,
            raw => raw
                .parse::<Decimal>()
                .ok()
                .filter(|p| *p >= Decimal::ZERO && *p <= Decimal::ONE_HUNDRED)
                .ok_or("discount")?,
        };

        let client_number = self.client_number.trim();
        Ok(NewClient {
            client_number: (!client_number.is_empty()).then(|| client_number.to_string()),
            company_name: company_name.to_string(),
            contact_name: self.contact_name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
            province: self.province.trim().to_string(),
            tax_id: self.tax_id.trim().to_string(),
            discount_rate: percent / Decimal::ONE_HUNDRED,
            password: self.password.clone(),
        })
    }
}

fn error_redirect(code: &str) -> Response {
    Redirect::to(&list_href(LIST_PATH, &[("error", code.to_string())])).into_response()
}

/// Create a client account.
#[instrument(skip(state, auth, form))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(auth): RequireAdmin,
    Form(form): Form<NewClientForm>,
) -> Result<Response> {
    let new_client = match form.to_new_client() {
        Ok(client) => client,
        Err(code) => return Ok(error_redirect(code)),
    };

    match state.api().create_client(&auth.token, &new_client).await {
        Ok(client) => {
            tracing::info!(client_id = %client.id, "Client created");
            let name = client.company_name.unwrap_or(client.username);
            Ok(Redirect::to(&list_href(LIST_PATH, &[("created", name)])).into_response())
        }
        Err(ApiError::Status { status: 400, .. }) => {
            tracing::warn!("Client rejected by the API");
            Ok(error_redirect("rejected"))
        }
        Err(e) => Err(AppError::from(e)),
    }
}

/// Account activation form data.
#[derive(Debug, Deserialize)]
pub struct ActiveForm {
    pub is_active: bool,
    pub return_to: Option<String>,
}

/// Enable or disable a client's login.
#[instrument(skip(state, auth, form), fields(client_id = %id, is_active = form.is_active))]
pub async fn set_active(
    State(state): State<AppState>,
    RequireAdmin(auth): RequireAdmin,
    Path(id): Path<UserId>,
    Form(form): Form<ActiveForm>,
) -> Result<Response> {
    state
        .api()
        .set_client_active(&auth.token, id, form.is_active)
        .await?;
    tracing::info!(client_id = %id, is_active = form.is_active, "Client access changed");

    Ok(Redirect::to(&safe_return_path(form.return_to.as_deref(), LIST_PATH)).into_response())
}

/// Delete confirmation form data.
#[derive(Debug, Deserialize)]
pub struct DeleteForm {
    pub return_to: Option<String>,
}

/// Delete a client account.
#[instrument(skip(state, auth, form), fields(client_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(auth): RequireAdmin,
    Path(id): Path<UserId>,
    Form(form): Form<DeleteForm>,
) -> Result<Response> {
    state.api().delete_client(&auth.token, id).await?;
    tracing::info!(client_id = %id, "Client deleted");

    Ok(Redirect::to(&safe_return_path(form.return_to.as_deref(), LIST_PATH)).into_response())
}
