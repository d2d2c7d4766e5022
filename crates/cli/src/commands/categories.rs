//! Category tree commands.
//!
//! # Usage
//!
//! ```bash
//! # Print a tree saved from the API
//! ws-cli categories tree --file tree.json
//!
//! # Fetch and print the live tree, marking one category as selected
//! ws-cli categories tree --api-url http://localhost:8000 --token "$TOKEN" --select bujes
//! ```
//!
//! # Environment Variables
//!
//! - `WHOLESALE_API_URL` - Base URL of the wholesale API
//! - `WHOLESALE_API_TOKEN` - Access token used for the API call

use std::fmt::Write as _;
use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;
use wholesale_core::category::{
    CategoryNode, Expansion, Selection, TreeError, TreeRow, render_rows,
};
use wholesale_storefront::api::{ApiClient, ApiError, Listing};
use wholesale_storefront::config::{ApiConfig, ConfigError};

/// Errors that can occur while loading or printing the tree.
#[derive(Debug, Error)]
pub enum CategoriesError {
    /// Tree file could not be read.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Tree file is not a category list.
    #[error("Invalid category JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// API URL is not valid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// API call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Tree could not be rendered.
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// Neither a file nor an API URL was given.
    #[error("Pass --file or --api-url (or set WHOLESALE_API_URL)")]
    NoSource,

    /// An API URL was given without a token.
    #[error("--token (or WHOLESALE_API_TOKEN) is required with --api-url")]
    MissingToken,
}

/// Where the tree comes from.
#[derive(Debug)]
pub enum TreeSource {
    File(PathBuf),
    Api { url: String, token: SecretString },
}

impl TreeSource {
    /// Pick a source from command-line options; a file wins over the API.
    ///
    /// # Errors
    ///
    /// Returns `CategoriesError` if no usable source was given.
    pub fn from_options(
        file: Option<PathBuf>,
        api_url: Option<String>,
        token: Option<String>,
    ) -> Result<Self, CategoriesError> {
        if let Some(path) = file {
            return Ok(Self::File(path));
        }
        let url = api_url.ok_or(CategoriesError::NoSource)?;
        let token = token
            .filter(|t| !t.trim().is_empty())
            .ok_or(CategoriesError::MissingToken)?;
        Ok(Self::Api {
            url,
            token: SecretString::from(token),
        })
    }
}

/// Parse a saved tree; accepts a bare array or a paginated page.
///
/// # Errors
///
/// Returns `CategoriesError::Json` if the text is not a category list.
pub fn parse_tree(raw: &str) -> Result<Vec<CategoryNode>, CategoriesError> {
    let listing: Listing<CategoryNode> = serde_json::from_str(raw)?;
    Ok(listing.into_vec())
}

async fn load(source: TreeSource) -> Result<Vec<CategoryNode>, CategoriesError> {
    match source {
        TreeSource::File(path) => {
            let raw = std::fs::read_to_string(&path)
                .map_err(|source| CategoriesError::Read { path, source })?;
            parse_tree(&raw)
        }
        TreeSource::Api { url, token } => {
            let client = ApiClient::new(&ApiConfig::new(&url)?)?;
            tracing::info!(api = %client.base_url(), "Fetching category tree");
            let tree = client.category_tree(&token).await?;
            Ok(tree.as_ref().clone())
        }
    }
}

fn format_row(out: &mut String, row: &TreeRow) {
    let marker = if row.selected { '*' } else { ' ' };
    let indent = "  ".repeat(row.depth);
    let _ = write!(out, "{marker} {indent}{} ({})", row.name, row.slug);
    if row.show_badge {
        let _ = write!(out, " [{}]", row.product_count);
    }
    out.push('\n');
}

/// Render every level of the tree, one indented line per category.
///
/// # Errors
///
/// Returns `TreeError` if the tree is too large to render.
pub fn format_tree(roots: &[CategoryNode], selection: &Selection) -> Result<String, TreeError> {
    let rows = render_rows(roots, selection, Expansion::All)?;
    let mut out = String::new();
    for row in &rows {
        format_row(&mut out, row);
    }
    Ok(out)
}

/// Load the tree and print it.
///
/// # Errors
///
/// Returns `CategoriesError` if the tree cannot be loaded or rendered.
#[allow(clippy::print_stdout)]
pub async fn tree(source: TreeSource, select: Option<String>) -> Result<(), CategoriesError> {
    let roots = load(source).await?;
    let selection = Selection::new(select.unwrap_or_default());
    let text = format_tree(&roots, &selection)?;
    if text.is_empty() {
        tracing::warn!("Category tree is empty");
    }
    print!("{text}");
    Ok(())
}
