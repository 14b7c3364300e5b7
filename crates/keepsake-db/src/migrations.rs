use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS memories (
            id          TEXT PRIMARY KEY,
            title       TEXT NOT NULL,
            description TEXT,
            date        TEXT NOT NULL,
            image_url   TEXT NOT NULL,
            media_type  TEXT NOT NULL CHECK (media_type IN ('image', 'video', 'youtube')),
            order_index INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_memories_order
            ON memories(order_index, date DESC);

        CREATE TABLE IF NOT EXISTS stories (
            id           TEXT PRIMARY KEY,
            image_url    TEXT NOT NULL,
            text_content TEXT NOT NULL DEFAULT '',
            order_index  INTEGER NOT NULL DEFAULT 0,
            layout_type  TEXT NOT NULL DEFAULT 'text_overlay'
                         CHECK (layout_type IN ('text_overlay', 'text_top', 'text_bottom')),
            zoom_level   REAL NOT NULL DEFAULT 1.0
        );

        CREATE INDEX IF NOT EXISTS idx_stories_order
            ON stories(order_index);

        CREATE TABLE IF NOT EXISTS coupons (
            id          TEXT PRIMARY KEY,
            title       TEXT NOT NULL,
            description TEXT,
            emoji       TEXT,
            is_redeemed INTEGER NOT NULL DEFAULT 0,
            redeemed_at TEXT
        );

        CREATE TABLE IF NOT EXISTS site_content (
            key         TEXT PRIMARY KEY,
            value       TEXT NOT NULL,
            updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS love_reasons (
            id     TEXT PRIMARY KEY,
            texto  TEXT NOT NULL
        );

        -- Coupons are seeded, not created through the app's own flows
        INSERT OR IGNORE INTO coupons (id, title, description, emoji) VALUES
            ('00000000-0000-0000-0000-00000000c001', 'Jantar surpresa', 'Vale um jantar no lugar que voce escolher', '🍝'),
            ('00000000-0000-0000-0000-00000000c002', 'Dia de cinema', 'Filme, pipoca e cobertor, sem olhar o celular', '🎬'),
            ('00000000-0000-0000-0000-00000000c003', 'Cafe da manha na cama', 'Entrega garantida antes das 10h', '☕');
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
