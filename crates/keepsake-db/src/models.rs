/// Database row types — these map directly to SQLite rows.
/// Distinct from keepsake-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

pub struct MemoryRow {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub date: String,
    pub image_url: String,
    pub media_type: String,
    pub order_index: i64,
    pub created_at: String,
}

pub struct StoryRow {
    pub id: String,
    pub image_url: String,
    pub text_content: String,
    pub order_index: i64,
    pub layout_type: String,
    pub zoom_level: f64,
}

pub struct CouponRow {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub emoji: Option<String>,
    pub is_redeemed: bool,
    pub redeemed_at: Option<String>,
}

pub struct SiteContentRow {
    pub key: String,
    pub value: String,
    pub updated_at: String,
}
