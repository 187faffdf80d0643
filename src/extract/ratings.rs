//! Team ratings export
//!
//! Pages through the members of a team and writes one CSV row per member with
//! their rating in each requested variant.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::io::Write;
use tracing::{debug, info};

use super::ExtractError;
use crate::query::{Query, QueryEngine, Transport};

/// Variants exported when none are given
pub const DEFAULT_VARIANTS: [&str; 3] = ["bullet", "blitz", "classical"];

/// Members requested per page
pub const DEFAULT_PER_PAGE: u32 = 50;

/// What to export
#[derive(Debug, Clone, PartialEq)]
pub struct RatingsExport {
    /// Team identifier, e.g. "mXKFB7l2"
    pub team: String,
    /// Page size requested from the API
    pub per_page: u32,
    /// Perf keys to export, in column order
    pub variants: Vec<String>,
}

impl RatingsExport {
    pub fn new(team: impl Into<String>) -> Self {
        Self {
            team: team.into(),
            per_page: DEFAULT_PER_PAGE,
            variants: DEFAULT_VARIANTS.iter().map(|v| v.to_string()).collect(),
        }
    }

    /// Query for one page of team members
    pub fn page_query(&self, page: u32) -> Query {
        Query::new("user")
            .param("team", &self.team)
            .param("nb", self.per_page)
            .param("page", page)
    }
}

#[derive(Debug, Deserialize)]
struct PageDocument {
    paginator: Paginator,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Paginator {
    current_page_results: Vec<Member>,
    next_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct Member {
    username: String,
    #[serde(default)]
    perfs: HashMap<String, Perf>,
}

#[derive(Debug, Deserialize)]
struct Perf {
    #[serde(default)]
    rating: i64,
    #[serde(default)]
    prov: bool,
}

impl Member {
    /// Established rating in a variant; provisional or unplayed counts as 0
    fn rating(&self, variant: &str) -> i64 {
        match self.perfs.get(variant) {
            Some(perf) if !perf.prov => perf.rating,
            _ => 0,
        }
    }
}

fn parse_page(value: Value) -> Result<Paginator, ExtractError> {
    serde_json::from_value::<PageDocument>(value)
        .map(|doc| doc.paginator)
        .map_err(|e| ExtractError::UnexpectedShape(e.to_string()))
}

/// Exports the ratings of every member of a team
///
/// Writes a header row (`username` followed by the variants) and one row per
/// member, following `paginator.nextPage` until the API reports no further page.
///
/// # Returns
/// The number of member rows written
pub async fn export_team_ratings<T: Transport, W: Write>(
    engine: &mut QueryEngine<T>,
    export: &RatingsExport,
    writer: &mut csv::Writer<W>,
) -> Result<usize, ExtractError> {
    let mut header = vec!["username"];
    header.extend(export.variants.iter().map(String::as_str));
    writer.write_record(&header)?;

    let mut rows = 0;
    let mut page = Some(1);
    while let Some(current) = page {
        let paginator = parse_page(engine.perform_query(&export.page_query(current)).await?)?;
        for member in &paginator.current_page_results {
            debug!("{}", member.username);
            let mut record = vec![member.username.clone()];
            record.extend(export.variants.iter().map(|v| member.rating(v).to_string()));
            writer.write_record(&record)?;
            rows += 1;
        }
        page = paginator.next_page;
    }
    writer.flush()?;

    info!("Exported {} members of team {}", rows, export.team);
    Ok(rows)
}
