//! FTS5 virtual table mirroring `observations.summary`, kept in sync via
//! triggers so lexical search never drifts from the canonical rows (spec
//! §4.1, §4.2 "BM25-style lexical search" Open Question: deferred to
//! SQLite's own FTS5 ranking rather than a hand-rolled BM25 implementation).

pub const CREATE_OBSERVATIONS_FTS_TABLE: &str = r#"
CREATE VIRTUAL TABLE IF NOT EXISTS observations_fts USING fts5(
    summary,
    content='observations',
    content_rowid='id',
    tokenize='porter unicode61'
)
"#;

pub const CREATE_OBSERVATIONS_FTS_TRIGGERS: &str = r#"
CREATE TRIGGER IF NOT EXISTS observations_ai AFTER INSERT ON observations BEGIN
    INSERT INTO observations_fts(rowid, summary) VALUES (new.id, new.summary);
END;

CREATE TRIGGER IF NOT EXISTS observations_ad AFTER DELETE ON observations BEGIN
    INSERT INTO observations_fts(observations_fts, rowid, summary) VALUES ('delete', old.id, old.summary);
END;

CREATE TRIGGER IF NOT EXISTS observations_au AFTER UPDATE ON observations BEGIN
    INSERT INTO observations_fts(observations_fts, rowid, summary) VALUES ('delete', old.id, old.summary);
    INSERT INTO observations_fts(rowid, summary) VALUES (new.id, new.summary);
END;
"#;
