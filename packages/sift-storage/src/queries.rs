use sqlx::{Postgres, QueryBuilder, Transaction};
use time::OffsetDateTime;

use crate::{Error, Result, db::Db, models::ListingMatch};

/// The query vector is always the first bind so later clauses can reuse `$1`.
const QUERY_VECTOR: &str = "$1::text::vector";

/// Equality filters; `None` and `false` leave the column unconstrained.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListingFilters<'a> {
	pub slot_type: Option<&'a str>,
	pub category: Option<&'a str>,
	pub available_only: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct NearestListingsQuery<'a> {
	pub embedding: &'a [f32],
	pub filters: ListingFilters<'a>,
	pub similarity_threshold: f32,
	pub limit: u32,
	pub ef_search: u32,
}

pub fn vector_to_pg(vec: &[f32]) -> String {
	let mut out = String::with_capacity(vec.len() * 8);

	out.push('[');

	for (i, value) in vec.iter().enumerate() {
		if i > 0 {
			out.push(',');
		}

		out.push_str(&value.to_string());
	}

	out.push(']');

	out
}

pub async fn nearest_listings(
	db: &Db,
	query: &NearestListingsQuery<'_>,
) -> Result<Vec<ListingMatch>> {
	if query.embedding.is_empty() {
		return Err(Error::InvalidArgument("Query embedding must be non-empty.".to_string()));
	}
	if query.limit == 0 {
		return Err(Error::InvalidArgument("Listing limit must be greater than zero.".to_string()));
	}

	let vec_text = vector_to_pg(query.embedding);
	let mut tx = db.pool.begin().await?;

	set_local_ef_search(&mut tx, query.ef_search).await?;

	let mut builder = build_nearest_listings_query(query, &vec_text);
	let rows: Vec<ListingMatch> = builder.build_query_as().fetch_all(&mut *tx).await?;

	tx.commit().await?;

	Ok(rows)
}

/// Writes the text and vector the index serves for `slot_id`.
pub async fn upsert_listing_embedding(
	db: &Db,
	slot_id: &str,
	embedding_text: &str,
	embedding: &[f32],
	now: OffsetDateTime,
) -> Result<()> {
	let vec_text = vector_to_pg(embedding);
	let result = sqlx::query(
		"\
UPDATE ad_slots
SET
	embedding_text = $1,
	embedding = $2::text::vector,
	embedding_updated_at = $3
WHERE slot_id = $4",
	)
	.bind(embedding_text)
	.bind(vec_text.as_str())
	.bind(now)
	.bind(slot_id)
	.execute(&db.pool)
	.await?;

	if result.rows_affected() == 0 {
		return Err(Error::NotFound(format!("Listing {slot_id} does not exist.")));
	}

	Ok(())
}

/// `set_config(..., true)` is the bindable form of `SET LOCAL`; the value dies with the
/// transaction and never reaches other requests sharing the pooled connection.
async fn set_local_ef_search(tx: &mut Transaction<'_, Postgres>, ef_search: u32) -> Result<()> {
	sqlx::query("SELECT set_config('hnsw.ef_search', $1, true)")
		.bind(ef_search.to_string())
		.execute(&mut **tx)
		.await?;

	Ok(())
}

fn build_nearest_listings_query<'args>(
	query: &NearestListingsQuery<'args>,
	vec_text: &'args str,
) -> QueryBuilder<'args, Postgres> {
	let mut builder = QueryBuilder::new(
		"\
SELECT
	s.slot_id,
	s.name,
	s.slot_type,
	s.category,
	s.description,
	s.price,
	s.is_available,
	p.name AS sponsor_name,
	p.is_verified AS sponsor_verified,
	COALESCE(e.engagement_count, 0)::bigint AS engagement_count,
	(1 - (s.embedding <=> ",
	);

	builder.push_bind(vec_text);
	builder.push(
		"::text::vector))::real AS similarity
FROM ad_slots s
JOIN sponsors p ON p.sponsor_id = s.sponsor_id
LEFT JOIN (
	SELECT slot_id, count(*) AS engagement_count
	FROM placements
	GROUP BY slot_id
) e ON e.slot_id = s.slot_id
WHERE s.embedding IS NOT NULL",
	);

	if let Some(slot_type) = query.filters.slot_type {
		builder.push("\n\tAND s.slot_type = ");
		builder.push_bind(slot_type);
	}
	if let Some(category) = query.filters.category {
		builder.push("\n\tAND s.category = ");
		builder.push_bind(category);
	}
	if query.filters.available_only {
		builder.push("\n\tAND s.is_available = ");
		builder.push_bind(true);
	}

	builder.push(format!("\n\tAND (1 - (s.embedding <=> {QUERY_VECTOR})) >= "));
	builder.push_bind(query.similarity_threshold);
	builder.push(format!("\nORDER BY s.embedding <=> {QUERY_VECTOR} ASC, s.slot_id ASC\nLIMIT "));
	builder.push_bind(i64::from(query.limit));

	builder
}
