use rusqlite::Connection;

pub const DEFAULT_POOL_SIZE: u32 = 4;

/// Pragmas applied to every pooled connection as it is opened.
pub fn configure_connection(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "
        PRAGMA busy_timeout = 5000;
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
    ",
    )
}
