use crate::Database;
use crate::models::{CouponRow, MemoryRow, SiteContentRow, StoryRow, UserRow};
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, email: &str, password_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, password) VALUES (?1, ?2, ?3)",
                (id, email, password_hash),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, email, password, created_at FROM users WHERE email = ?1")?;
            let row = stmt
                .query_row([email], |row| {
                    Ok(UserRow {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        password: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                })
                .optional()?;
            Ok(row)
        })
    }

    // -- Memories --

    pub fn insert_memory(
        &self,
        id: &str,
        title: &str,
        description: Option<&str>,
        date: &str,
        image_url: &str,
        media_type: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            // New entries always rank first; ranks become canonical again on
            // the next order save.
            conn.execute(
                "INSERT INTO memories (id, title, description, date, image_url, media_type, order_index)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)",
                rusqlite::params![id, title, description, date, image_url, media_type],
            )?;
            Ok(())
        })
    }

    /// All memories, rank first, newest date breaking ties.
    pub fn list_memories(&self) -> Result<Vec<MemoryRow>> {
        self.with_conn(|conn| query_memories(conn))
    }

    pub fn get_memory(&self, id: &str) -> Result<Option<MemoryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, description, date, image_url, media_type, order_index, created_at
                 FROM memories WHERE id = ?1",
            )?;
            let row = stmt.query_row([id], map_memory_row).optional()?;
            Ok(row)
        })
    }

    /// Non-media edit: the named fields are replaced wholesale.
    pub fn update_memory_fields(
        &self,
        id: &str,
        title: &str,
        description: Option<&str>,
        date: &str,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE memories SET title = ?1, description = ?2, date = ?3 WHERE id = ?4",
                rusqlite::params![title, description, date, id],
            )?;
            Ok(n > 0)
        })
    }

    pub fn update_memory_media(&self, id: &str, image_url: &str, media_type: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE memories SET image_url = ?1, media_type = ?2 WHERE id = ?3",
                rusqlite::params![image_url, media_type, id],
            )?;
            Ok(n > 0)
        })
    }

    pub fn delete_memory(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM memories WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }

    pub fn delete_memories(&self, ids: &[String]) -> Result<usize> {
        self.with_conn(|conn| {
            let mut deleted = 0;
            for id in ids {
                deleted += conn.execute("DELETE FROM memories WHERE id = ?1", [id])?;
            }
            Ok(deleted)
        })
    }

    /// Rewrite ranks to each row's position in `ids`. One independent update
    /// per row, no transaction: a failed row is reported while the rest stand.
    pub fn set_memory_order(&self, ids: &[String]) -> Result<(usize, Vec<(String, String)>)> {
        self.with_conn(|conn| Ok(rewrite_order(conn, "memories", ids)))
    }

    // -- Stories --

    pub fn insert_story(
        &self,
        id: &str,
        image_url: &str,
        text_content: &str,
        layout_type: &str,
        zoom_level: f64,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO stories (id, image_url, text_content, order_index, layout_type, zoom_level)
                 VALUES (?1, ?2, ?3, 0, ?4, ?5)",
                rusqlite::params![id, image_url, text_content, layout_type, zoom_level],
            )?;
            Ok(())
        })
    }

    pub fn list_stories(&self) -> Result<Vec<StoryRow>> {
        self.with_conn(|conn| query_stories(conn))
    }

    pub fn get_story(&self, id: &str) -> Result<Option<StoryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, image_url, text_content, order_index, layout_type, zoom_level
                 FROM stories WHERE id = ?1",
            )?;
            let row = stmt.query_row([id], map_story_row).optional()?;
            Ok(row)
        })
    }

    pub fn update_story(
        &self,
        id: &str,
        text_content: &str,
        layout_type: &str,
        zoom_level: f64,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE stories SET text_content = ?1, layout_type = ?2, zoom_level = ?3 WHERE id = ?4",
                rusqlite::params![text_content, layout_type, zoom_level, id],
            )?;
            Ok(n > 0)
        })
    }

    pub fn update_story_media(&self, id: &str, image_url: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE stories SET image_url = ?1 WHERE id = ?2",
                rusqlite::params![image_url, id],
            )?;
            Ok(n > 0)
        })
    }

    pub fn delete_story(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM stories WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }

    pub fn set_story_order(&self, ids: &[String]) -> Result<(usize, Vec<(String, String)>)> {
        self.with_conn(|conn| Ok(rewrite_order(conn, "stories", ids)))
    }

    // -- Coupons --

    pub fn list_coupons(&self) -> Result<Vec<CouponRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, description, emoji, is_redeemed, redeemed_at
                 FROM coupons ORDER BY title",
            )?;
            let rows = stmt
                .query_map([], map_coupon_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Flip a coupon to redeemed. Once redeemed it never reverts and
    /// `redeemed_at` is never rewritten; re-invoking is a no-op that returns
    /// the row as it stands. `None` when no such coupon exists.
    pub fn redeem_coupon(&self, id: &str) -> Result<Option<CouponRow>> {
        self.with_conn(|conn| {
            let now = chrono::Utc::now().to_rfc3339();
            conn.execute(
                "UPDATE coupons SET is_redeemed = 1, redeemed_at = ?2
                 WHERE id = ?1 AND is_redeemed = 0",
                rusqlite::params![id, now],
            )?;

            let mut stmt = conn.prepare(
                "SELECT id, title, description, emoji, is_redeemed, redeemed_at
                 FROM coupons WHERE id = ?1",
            )?;
            let row = stmt.query_row([id], map_coupon_row).optional()?;
            Ok(row)
        })
    }

    // -- Site content --

    pub fn upsert_content(&self, key: &str, value: &str) -> Result<()> {
        self.with_conn(|conn| {
            let now = chrono::Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO site_content (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                rusqlite::params![key, value, now],
            )?;
            Ok(())
        })
    }

    pub fn all_content(&self) -> Result<Vec<SiteContentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT key, value, updated_at FROM site_content")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(SiteContentRow {
                        key: row.get(0)?,
                        value: row.get(1)?,
                        updated_at: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_content(&self, key: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let value = conn
                .query_row("SELECT value FROM site_content WHERE key = ?1", [key], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(value)
        })
    }

    // -- Love reasons --

    pub fn list_reason_texts(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT texto FROM love_reasons")?;
            let rows = stmt
                .query_map([], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_memories(conn: &Connection) -> Result<Vec<MemoryRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, description, date, image_url, media_type, order_index, created_at
         FROM memories ORDER BY order_index ASC, date DESC",
    )?;
    let rows = stmt
        .query_map([], map_memory_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn query_stories(conn: &Connection) -> Result<Vec<StoryRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, image_url, text_content, order_index, layout_type, zoom_level
         FROM stories ORDER BY order_index ASC",
    )?;
    let rows = stmt
        .query_map([], map_story_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn rewrite_order(conn: &Connection, table: &str, ids: &[String]) -> (usize, Vec<(String, String)>) {
    let sql = format!("UPDATE {} SET order_index = ?1 WHERE id = ?2", table);
    let mut updated = 0;
    let mut failed = Vec::new();
    for (index, id) in ids.iter().enumerate() {
        match conn.execute(&sql, rusqlite::params![index as i64, id]) {
            Ok(n) if n > 0 => updated += 1,
            Ok(_) => failed.push((id.clone(), "no such row".to_string())),
            Err(e) => failed.push((id.clone(), e.to_string())),
        }
    }
    (updated, failed)
}

fn map_memory_row(row: &rusqlite::Row<'_>) -> std::result::Result<MemoryRow, rusqlite::Error> {
    Ok(MemoryRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        date: row.get(3)?,
        image_url: row.get(4)?,
        media_type: row.get(5)?,
        order_index: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn map_story_row(row: &rusqlite::Row<'_>) -> std::result::Result<StoryRow, rusqlite::Error> {
    Ok(StoryRow {
        id: row.get(0)?,
        image_url: row.get(1)?,
        text_content: row.get(2)?,
        order_index: row.get(3)?,
        layout_type: row.get(4)?,
        zoom_level: row.get(5)?,
    })
}

fn map_coupon_row(row: &rusqlite::Row<'_>) -> std::result::Result<CouponRow, rusqlite::Error> {
    Ok(CouponRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        emoji: row.get(3)?,
        is_redeemed: row.get::<_, i64>(4)? != 0,
        redeemed_at: row.get(5)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
