//! SQL for the `characters` table.

/// Bootstrap the table; a no-op when it already exists.
pub fn create_characters_table() -> &'static str {
    "CREATE TABLE IF NOT EXISTS characters (
       id INTEGER PRIMARY KEY,
       name VARCHAR NOT NULL,
       status VARCHAR,
       species VARCHAR,
       episode_count INTEGER,
       location VARCHAR
     )"
}

/// Insert one character, overwriting every non-key column on id conflict.
pub fn upsert_character() -> &'static str {
    "INSERT INTO characters (id, name, status, species, episode_count, location)
     VALUES (?, ?, ?, ?, ?, ?)
     ON CONFLICT (id) DO UPDATE SET
       name = EXCLUDED.name,
       status = EXCLUDED.status,
       species = EXCLUDED.species,
       episode_count = EXCLUDED.episode_count,
       location = EXCLUDED.location"
}

/// Engine version and name of the attached database.
pub fn server_info() -> &'static str {
    "SELECT version(), current_database()"
}

/// 1 when the `characters` table exists, else 0.
pub fn characters_table_exists() -> &'static str {
    "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'characters'"
}

pub fn count_characters() -> &'static str {
    "SELECT COUNT(*) FROM characters"
}

pub fn select_characters() -> &'static str {
    "SELECT id, name, status, species, episode_count, location
     FROM characters
     ORDER BY id"
}
