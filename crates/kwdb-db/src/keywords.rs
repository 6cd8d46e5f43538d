//! Database operations for the `keywords` table.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use kwdb_core::{CompetitionLevel, DocumentCounts, EnrichedKeyword};
use kwdb_research::{KeywordFlag, KeywordSort, StoredKeyword};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const KEYWORD_COLUMNS: &str = "id, public_id, term, pc_search_volume, mobile_search_volume, \
     total_search_volume, pc_click_count, mobile_click_count, pc_ctr, mobile_ctr, ad_depth, \
     competition, blog_count, news_count, web_count, cafe_count, total_docs, potential_score, \
     raw_response, is_used_as_seed, source_seed, fetched_at, created_at";

/// A row from the `keywords` table.
///
/// Counts are `BIGINT` columns constrained to be non-negative.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct KeywordRow {
    pub id: i64,
    pub public_id: Uuid,
    pub term: String,
    pub pc_search_volume: i64,
    pub mobile_search_volume: i64,
    pub total_search_volume: i64,
    pub pc_click_count: f64,
    pub mobile_click_count: f64,
    pub pc_ctr: f64,
    pub mobile_ctr: f64,
    pub ad_depth: f64,
    pub competition: String,
    pub blog_count: i64,
    pub news_count: i64,
    pub web_count: i64,
    pub cafe_count: i64,
    pub total_docs: i64,
    pub potential_score: f64,
    pub raw_response: serde_json::Value,
    pub is_used_as_seed: bool,
    pub source_seed: Option<String>,
    pub fetched_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<KeywordRow> for StoredKeyword {
    fn from(row: KeywordRow) -> Self {
        Self {
            id: row.id,
            public_id: row.public_id,
            term: row.term,
            pc_search_volume: to_u64(row.pc_search_volume),
            mobile_search_volume: to_u64(row.mobile_search_volume),
            total_search_volume: to_u64(row.total_search_volume),
            competition: CompetitionLevel::from_label(&row.competition),
            documents: DocumentCounts {
                blog: to_u64(row.blog_count),
                news: to_u64(row.news_count),
                web: to_u64(row.web_count),
                cafe: to_u64(row.cafe_count),
            },
            total_docs: to_u64(row.total_docs),
            potential_score: row.potential_score,
            is_used_as_seed: row.is_used_as_seed,
            source_seed: row.source_seed,
            created_at: row.created_at,
        }
    }
}

fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn order_by(sort: KeywordSort) -> &'static str {
    match sort {
        KeywordSort::Volume => "total_search_volume DESC, id ASC",
        KeywordSort::Potential => "potential_score DESC, id ASC",
        KeywordSort::Recent => "created_at DESC, id DESC",
    }
}

/// Inserts `records` in one transaction, tagging each with `source_seed`.
///
/// Generates a fresh `public_id` per row. Returns the number of rows written.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any insert fails; the transaction is then
/// rolled back and nothing is written.
pub async fn insert_keywords(
    pool: &PgPool,
    source_seed: &str,
    records: &[EnrichedKeyword],
) -> Result<usize, DbError> {
    if records.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    for record in records {
        let candidate = &record.candidate;
        sqlx::query(
            "INSERT INTO keywords (public_id, term, pc_search_volume, mobile_search_volume, \
                 total_search_volume, pc_click_count, mobile_click_count, pc_ctr, mobile_ctr, \
                 ad_depth, competition, blog_count, news_count, web_count, cafe_count, \
                 total_docs, potential_score, raw_response, source_seed, fetched_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, \
                     $16, $17, $18, $19, $20)",
        )
        .bind(Uuid::new_v4())
        .bind(&candidate.term)
        .bind(to_i64(candidate.pc_search_volume))
        .bind(to_i64(candidate.mobile_search_volume))
        .bind(to_i64(candidate.total_search_volume()))
        .bind(candidate.pc_click_count)
        .bind(candidate.mobile_click_count)
        .bind(candidate.pc_ctr)
        .bind(candidate.mobile_ctr)
        .bind(candidate.ad_depth)
        .bind(candidate.competition.as_str())
        .bind(to_i64(record.documents.blog))
        .bind(to_i64(record.documents.news))
        .bind(to_i64(record.documents.web))
        .bind(to_i64(record.documents.cafe))
        .bind(to_i64(record.total_docs()))
        .bind(record.potential_score())
        .bind(&candidate.raw_response)
        .bind(source_seed)
        .bind(candidate.fetched_at)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    Ok(records.len())
}

/// Returns the stored spellings of `terms` created at or after `since`.
///
/// Terms are compared with whitespace removed and case folded, so
/// `"Digital Marketing"` matches a request for `"digitalmarketing"`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn terms_seen_since(
    pool: &PgPool,
    terms: &[String],
    since: DateTime<Utc>,
) -> Result<HashSet<String>, DbError> {
    if terms.is_empty() {
        return Ok(HashSet::new());
    }

    let rows = sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT term FROM keywords \
         WHERE lower(regexp_replace(term, '\\s', '', 'g')) IN ( \
                   SELECT lower(regexp_replace(t, '\\s', '', 'g')) FROM unnest($1::text[]) AS t) \
           AND created_at >= $2",
    )
    .bind(terms)
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().collect())
}

/// Sets one boolean flag column on a keyword row.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has the given `id`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn set_keyword_flag(
    pool: &PgPool,
    id: i64,
    flag: KeywordFlag,
    value: bool,
) -> Result<(), DbError> {
    // Column names come from a closed enum, never from input.
    let sql = format!("UPDATE keywords SET {} = $1 WHERE id = $2", flag.column());
    let result = sqlx::query(&sql)
        .bind(value)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Sets one boolean flag column on every row matching `term`, compared the
/// same way as [`terms_seen_since`]. Returns the number of rows updated.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn set_keyword_flag_by_term(
    pool: &PgPool,
    term: &str,
    flag: KeywordFlag,
    value: bool,
) -> Result<u64, DbError> {
    let sql = format!(
        "UPDATE keywords SET {} = $1 \
         WHERE lower(regexp_replace(term, '\\s', '', 'g')) = lower(regexp_replace($2, '\\s', '', 'g'))",
        flag.column()
    );
    let result = sqlx::query(&sql)
        .bind(value)
        .bind(term)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Highest total search volume first, optionally skipping rows already
/// used as seeds.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn top_keywords_by_volume(
    pool: &PgPool,
    limit: i64,
    exclude_used_as_seed: bool,
) -> Result<Vec<KeywordRow>, DbError> {
    let sql = format!(
        "SELECT {KEYWORD_COLUMNS} FROM keywords \
         WHERE ($2 = false OR is_used_as_seed = false) \
         ORDER BY {} \
         LIMIT $1",
        order_by(KeywordSort::Volume)
    );
    let rows = sqlx::query_as::<_, KeywordRow>(&sql)
        .bind(limit)
        .bind(exclude_used_as_seed)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_keywords(
    pool: &PgPool,
    limit: i64,
    sort: KeywordSort,
) -> Result<Vec<KeywordRow>, DbError> {
    let sql = format!(
        "SELECT {KEYWORD_COLUMNS} FROM keywords ORDER BY {} LIMIT $1",
        order_by(sort)
    );
    let rows = sqlx::query_as::<_, KeywordRow>(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}
