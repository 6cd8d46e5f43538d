//! Postgres-backed [`KeywordStore`].

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kwdb_core::EnrichedKeyword;
use kwdb_research::{KeywordFlag, KeywordSort, KeywordStore, StoreError, StoredKeyword};
use sqlx::PgPool;

use crate::{keywords, DbError};

#[derive(Debug, Clone)]
pub struct PgKeywordStore {
    pool: PgPool,
}

impl PgKeywordStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn store_error(err: DbError) -> StoreError {
    match err {
        DbError::NotFound => StoreError::NotFound("keyword".to_string()),
        other => StoreError::backend(other),
    }
}

#[async_trait]
impl KeywordStore for PgKeywordStore {
    async fn insert_many(
        &self,
        source_seed: &str,
        records: &[EnrichedKeyword],
    ) -> Result<usize, StoreError> {
        keywords::insert_keywords(&self.pool, source_seed, records)
            .await
            .map_err(store_error)
    }

    async fn terms_seen_since(
        &self,
        terms: &[String],
        since: DateTime<Utc>,
    ) -> Result<HashSet<String>, StoreError> {
        keywords::terms_seen_since(&self.pool, terms, since)
            .await
            .map_err(store_error)
    }

    async fn set_flag(&self, id: i64, flag: KeywordFlag, value: bool) -> Result<(), StoreError> {
        keywords::set_keyword_flag(&self.pool, id, flag, value)
            .await
            .map_err(|e| match e {
                DbError::NotFound => StoreError::NotFound(id.to_string()),
                other => store_error(other),
            })
    }

    async fn set_flag_by_term(
        &self,
        term: &str,
        flag: KeywordFlag,
        value: bool,
    ) -> Result<u64, StoreError> {
        keywords::set_keyword_flag_by_term(&self.pool, term, flag, value)
            .await
            .map_err(store_error)
    }

    async fn top_by_volume(
        &self,
        limit: i64,
        exclude_used_as_seed: bool,
    ) -> Result<Vec<StoredKeyword>, StoreError> {
        let rows = keywords::top_keywords_by_volume(&self.pool, limit, exclude_used_as_seed)
            .await
            .map_err(store_error)?;
        Ok(rows.into_iter().map(StoredKeyword::from).collect())
    }

    async fn list_keywords(
        &self,
        limit: i64,
        sort: KeywordSort,
    ) -> Result<Vec<StoredKeyword>, StoreError> {
        let rows = keywords::list_keywords(&self.pool, limit, sort)
            .await
            .map_err(store_error)?;
        Ok(rows.into_iter().map(StoredKeyword::from).collect())
    }
}
