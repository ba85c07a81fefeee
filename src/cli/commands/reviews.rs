use tabled::{Table, Tabled};

use crate::cli::error::CliResult;
use crate::cli::utils::{apply_table_style, or_dash, truncate_with_ellipsis};
use crate::client::MarketplaceApi;
use crate::db::ReviewEntry;

#[derive(Tabled)]
pub(crate) struct ReviewDisplay {
    #[tabled(rename = "Rating")]
    pub(crate) rating: String,
    #[tabled(rename = "User")]
    pub(crate) user: String,
    #[tabled(rename = "Review")]
    pub(crate) review: String,
    #[tabled(rename = "Date")]
    pub(crate) date: String,
}

fn stars(rating: i64) -> String {
    let filled = usize::try_from(rating.clamp(0, 5)).unwrap_or_default();
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}

impl From<&ReviewEntry> for ReviewDisplay {
    fn from(review: &ReviewEntry) -> Self {
        Self {
            rating: stars(review.rating),
            user: or_dash(Some(review.user_name.as_str())),
            review: truncate_with_ellipsis(review.review.as_deref().unwrap_or("-"), 60),
            date: review
                .updated_at
                .as_deref()
                .unwrap_or(&review.created_at)
                .chars()
                .take(10)
                .collect(),
        }
    }
}

pub async fn list_reviews(api: &impl MarketplaceApi, id: &str, format: &str) -> CliResult<String> {
    let reviews = api.get_reviews(id).await?;
    match format {
        "json" => Ok(serde_json::to_string_pretty(&reviews)?),
        _ => {
            if reviews.is_empty() {
                return Ok("No reviews yet.".to_string());
            }
            let rows: Vec<ReviewDisplay> = reviews.iter().map(|r| r.into()).collect();
            let mut table = Table::new(rows);
            apply_table_style(&mut table);
            Ok(table.to_string())
        }
    }
}

/// Rate a server. Rating again replaces the earlier review.
pub async fn create_review(
    api: &impl MarketplaceApi,
    id: &str,
    rating: i64,
    text: Option<&str>,
) -> CliResult<String> {
    let review = api.create_review(id, rating, text).await?;
    Ok(format!("✓ Rated {}: {}", id, stars(review.rating)))
}
