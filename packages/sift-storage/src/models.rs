/// One nearest-neighbor hit joined with its sponsor and engagement count.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ListingMatch {
	pub slot_id: String,
	pub name: String,
	pub slot_type: String,
	pub category: Option<String>,
	pub description: Option<String>,
	pub price: f64,
	pub is_available: bool,
	pub sponsor_name: String,
	pub sponsor_verified: bool,
	pub engagement_count: i64,
	/// `1 - cosine distance`, as computed by the database; not yet clamped.
	pub similarity: f32,
}
