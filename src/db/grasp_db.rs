use crate::rag::chunker::TranscriptChunk;
use crate::types::{
    AppError, Chunk, MessageRole, Note, NoteUpdateRequest, Result, StoredMessage, Video,
    VideoSummary,
};
use chrono::Utc;
use libsql::{Builder, Connection, Database, Row};
use std::ops::Deref;
use tokio::sync::{Mutex, MutexGuard};

/// SQLite store for videos, transcript chunks, the chat log and notes.
///
/// File databases open a connection per operation, so readers only ever
/// see committed data. Every write holds `write_lock`.
///
/// A `:memory:` database only lives as long as its one connection, which
/// is kept in `shared`; there reads take `write_lock` as well, so nothing
/// runs inside another operation's transaction.
pub struct GraspDb {
    db: Database,
    shared: Option<Connection>,
    write_lock: Mutex<()>,
}

/// A connection, plus the write lock when the operation needs it
struct DbHandle<'a> {
    conn: Connection,
    _guard: Option<MutexGuard<'a, ()>>,
}

impl Deref for DbHandle<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.conn
    }
}

/// Read a column, converting libsql errors
macro_rules! col {
    ($row:expr, $idx:expr) => {
        $row.get($idx)
            .map_err(|e| AppError::Database(e.to_string()))?
    };
}

fn db_err(context: &str) -> impl Fn(libsql::Error) -> AppError + '_ {
    move |e| AppError::Database(format!("{}: {}", context, e))
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

impl GraspDb {
    /// Open (or create) a database file
    pub async fn new_local(path: &str) -> Result<Self> {
        if path != ":memory:"
            && let Some(parent) = std::path::Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Database(format!(
                    "Failed to create database directory {:?}: {}",
                    parent, e
                ))
            })?;
        }

        let db = Builder::new_local(path)
            .build()
            .await
            .map_err(db_err("Failed to open database"))?;

        Self::from_database(db, path == ":memory:").await
    }

    /// In-memory database, used by tests
    pub async fn new_memory() -> Result<Self> {
        Self::new_local(":memory:").await
    }

    async fn from_database(db: Database, in_memory: bool) -> Result<Self> {
        let shared = if in_memory {
            Some(db.connect().map_err(db_err("Failed to get connection"))?)
        } else {
            None
        };
        let client = Self {
            db,
            shared,
            write_lock: Mutex::new(()),
        };
        client.initialize_schema().await?;
        Ok(client)
    }

    async fn connection(&self) -> Result<Connection> {
        if let Some(conn) = &self.shared {
            return Ok(conn.clone());
        }

        let conn = self
            .db
            .connect()
            .map_err(db_err("Failed to get connection"))?;
        // Wait for a committing writer instead of failing with SQLITE_BUSY
        pragma(&conn, "PRAGMA busy_timeout = 5000").await?;
        Ok(conn)
    }

    async fn reader(&self) -> Result<DbHandle<'_>> {
        let guard = if self.shared.is_some() {
            Some(self.write_lock.lock().await)
        } else {
            None
        };
        Ok(DbHandle {
            conn: self.connection().await?,
            _guard: guard,
        })
    }

    async fn writer(&self) -> Result<DbHandle<'_>> {
        let guard = self.write_lock.lock().await;
        Ok(DbHandle {
            conn: self.connection().await?,
            _guard: Some(guard),
        })
    }

    async fn initialize_schema(&self) -> Result<()> {
        let conn = self.writer().await?;

        if self.shared.is_none() {
            pragma(&conn, "PRAGMA journal_mode = WAL").await?;
        }

        conn.execute(
            "CREATE TABLE IF NOT EXISTS videos (
                id TEXT PRIMARY KEY,
                youtube_id TEXT NOT NULL,
                title TEXT NOT NULL,
                duration INTEGER NOT NULL,
                transcript TEXT NOT NULL,
                processed_at TEXT NOT NULL,
                watched_duration INTEGER NOT NULL DEFAULT 0
            )",
            (),
        )
        .await
        .map_err(db_err("Failed to create videos table"))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS chunks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                video_id TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                start_time REAL NOT NULL,
                end_time REAL NOT NULL,
                text TEXT NOT NULL,
                FOREIGN KEY (video_id) REFERENCES videos(id),
                UNIQUE(video_id, chunk_index)
            )",
            (),
        )
        .await
        .map_err(db_err("Failed to create chunks table"))?;

        // Append-only chat log; `id` gives creation order
        conn.execute(
            "CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                video_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                timestamp REAL NOT NULL,
                context_chunks TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL
            )",
            (),
        )
        .await
        .map_err(db_err("Failed to create messages table"))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS notes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                video_id TEXT NOT NULL,
                timestamp REAL NOT NULL,
                content TEXT NOT NULL,
                tags TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            (),
        )
        .await
        .map_err(db_err("Failed to create notes table"))?;

        for (name, table) in [
            ("idx_chunks_video", "chunks"),
            ("idx_messages_video", "messages"),
            ("idx_notes_video", "notes"),
        ] {
            conn.execute(
                &format!(
                    "CREATE INDEX IF NOT EXISTS {} ON {}(video_id)",
                    name, table
                ),
                (),
            )
            .await
            .map_err(db_err("Failed to create index"))?;
        }

        Ok(())
    }

    // ============= Videos =============

    /// Store a video together with its chunks in one transaction and return
    /// the stored chunks with their assigned ids.
    pub async fn insert_video_with_chunks(
        &self,
        video: &Video,
        chunks: &[TranscriptChunk],
    ) -> Result<Vec<Chunk>> {
        let conn = self.writer().await?;
        let tx = conn
            .transaction()
            .await
            .map_err(db_err("Failed to begin transaction"))?;

        tx.execute(
            "INSERT INTO videos (id, youtube_id, title, duration, transcript, processed_at, watched_duration)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            (
                video.id.as_str(),
                video.youtube_id.as_str(),
                video.title.as_str(),
                video.duration,
                video.transcript.as_str(),
                video.processed_at.as_str(),
                video.watched_duration,
            ),
        )
        .await
        .map_err(db_err("Failed to insert video"))?;

        let mut stored = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let mut rows = tx
                .query(
                    "INSERT INTO chunks (video_id, chunk_index, start_time, end_time, text)
                     VALUES (?, ?, ?, ?, ?) RETURNING id",
                    (
                        video.id.as_str(),
                        chunk.chunk_index as i64,
                        chunk.start_time,
                        chunk.end_time,
                        chunk.text.as_str(),
                    ),
                )
                .await
                .map_err(db_err("Failed to insert chunk"))?;
            let id = returned_id(&mut rows).await?;

            stored.push(Chunk {
                id,
                video_id: video.id.clone(),
                chunk_index: chunk.chunk_index as i64,
                start_time: chunk.start_time,
                end_time: chunk.end_time,
                text: chunk.text.clone(),
            });
        }

        tx.commit()
            .await
            .map_err(db_err("Failed to commit video"))?;

        Ok(stored)
    }

    pub async fn get_video(&self, id: &str) -> Result<Option<Video>> {
        let conn = self.reader().await?;
        let mut rows = conn
            .query(
                "SELECT id, youtube_id, title, duration, transcript, processed_at, watched_duration
                 FROM videos WHERE id = ?",
                [id],
            )
            .await
            .map_err(db_err("Failed to query video"))?;

        match rows.next().await.map_err(db_err("Failed to read video"))? {
            Some(row) => Ok(Some(Video {
                id: col!(row, 0),
                youtube_id: col!(row, 1),
                title: col!(row, 2),
                duration: col!(row, 3),
                transcript: col!(row, 4),
                processed_at: col!(row, 5),
                watched_duration: col!(row, 6),
            })),
            None => Ok(None),
        }
    }

    /// All videos, most recently processed first
    pub async fn list_videos(&self) -> Result<Vec<VideoSummary>> {
        let conn = self.reader().await?;
        let mut rows = conn
            .query(
                "SELECT id, youtube_id, title, duration, processed_at, watched_duration
                 FROM videos ORDER BY processed_at DESC, id ASC",
                (),
            )
            .await
            .map_err(db_err("Failed to list videos"))?;

        let mut videos = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err("Failed to read video"))? {
            videos.push(VideoSummary {
                id: col!(row, 0),
                youtube_id: col!(row, 1),
                title: col!(row, 2),
                duration: col!(row, 3),
                processed_at: col!(row, 4),
                watched_duration: col!(row, 5),
            });
        }
        Ok(videos)
    }

    /// Record playback progress. The stored value only moves forward.
    pub async fn update_watched_duration(&self, id: &str, watched: i64) -> Result<Option<Video>> {
        // The write lock is released before the re-read below
        let updated = {
            let conn = self.writer().await?;
            conn.execute(
                "UPDATE videos SET watched_duration = MAX(watched_duration, ?) WHERE id = ?",
                (watched, id),
            )
            .await
            .map_err(db_err("Failed to update progress"))?
        };

        if updated == 0 {
            return Ok(None);
        }
        self.get_video(id).await
    }

    /// Remove a video with its chunks, messages and notes.
    /// Returns false when no such video exists.
    pub async fn delete_video(&self, id: &str) -> Result<bool> {
        let conn = self.writer().await?;
        let tx = conn
            .transaction()
            .await
            .map_err(db_err("Failed to begin transaction"))?;

        for table in ["chunks", "messages", "notes"] {
            tx.execute(&format!("DELETE FROM {} WHERE video_id = ?", table), [id])
                .await
                .map_err(db_err("Failed to delete video data"))?;
        }
        let deleted = tx
            .execute("DELETE FROM videos WHERE id = ?", [id])
            .await
            .map_err(db_err("Failed to delete video"))?;

        tx.commit()
            .await
            .map_err(db_err("Failed to commit deletion"))?;

        Ok(deleted > 0)
    }

    // ============= Chunks =============

    pub async fn count_chunks(&self, video_id: &str) -> Result<usize> {
        let conn = self.reader().await?;
        let mut rows = conn
            .query("SELECT COUNT(*) FROM chunks WHERE video_id = ?", [video_id])
            .await
            .map_err(db_err("Failed to count chunks"))?;

        match rows.next().await.map_err(db_err("Failed to count chunks"))? {
            Some(row) => {
                let count: i64 = col!(row, 0);
                Ok(count as usize)
            }
            None => Ok(0),
        }
    }

    /// Chunks of a video in `chunk_index` order
    pub async fn get_chunks(&self, video_id: &str) -> Result<Vec<Chunk>> {
        let conn = self.reader().await?;
        let mut rows = conn
            .query(
                "SELECT id, video_id, chunk_index, start_time, end_time, text
                 FROM chunks WHERE video_id = ? ORDER BY chunk_index ASC",
                [video_id],
            )
            .await
            .map_err(db_err("Failed to query chunks"))?;

        let mut chunks = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err("Failed to read chunk"))? {
            chunks.push(Chunk {
                id: col!(row, 0),
                video_id: col!(row, 1),
                chunk_index: col!(row, 2),
                start_time: col!(row, 3),
                end_time: col!(row, 4),
                text: col!(row, 5),
            });
        }
        Ok(chunks)
    }

    // ============= Chat log =============

    /// Append a question and its answer atomically. Both share the playback
    /// timestamp and the ids of the chunks given to the model.
    pub async fn append_exchange(
        &self,
        video_id: &str,
        question: &str,
        answer: &str,
        timestamp: f64,
        context_chunks: &[i64],
    ) -> Result<(StoredMessage, StoredMessage)> {
        let context_json = serde_json::to_string(context_chunks)
            .map_err(|e| AppError::Internal(format!("Failed to encode chunk ids: {}", e)))?;

        let conn = self.writer().await?;
        let tx = conn
            .transaction()
            .await
            .map_err(db_err("Failed to begin transaction"))?;

        let mut stored = Vec::with_capacity(2);
        for (role, content) in [(MessageRole::User, question), (MessageRole::Assistant, answer)] {
            let created_at = now();
            let mut rows = tx
                .query(
                    "INSERT INTO messages (video_id, role, content, timestamp, context_chunks, created_at)
                     VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
                    (
                        video_id,
                        role.as_str(),
                        content,
                        timestamp,
                        context_json.as_str(),
                        created_at.as_str(),
                    ),
                )
                .await
                .map_err(db_err("Failed to store message"))?;
            let id = returned_id(&mut rows).await?;

            stored.push(StoredMessage {
                id,
                video_id: video_id.to_string(),
                role,
                content: content.to_string(),
                timestamp,
                context_chunks: context_chunks.to_vec(),
                created_at,
            });
        }

        tx.commit()
            .await
            .map_err(db_err("Failed to commit messages"))?;

        let answer = stored.pop();
        let question = stored.pop();
        match (question, answer) {
            (Some(q), Some(a)) => Ok((q, a)),
            _ => Err(AppError::Internal("Message exchange was not stored".to_string())),
        }
    }

    /// Full chat log of a video in creation order
    pub async fn get_messages(&self, video_id: &str) -> Result<Vec<StoredMessage>> {
        self.query_messages(
            "SELECT id, video_id, role, content, timestamp, context_chunks, created_at
             FROM messages WHERE video_id = ? ORDER BY id ASC",
            [video_id],
        )
        .await
    }

    /// The last `limit` messages of a video, oldest first
    pub async fn recent_messages(&self, video_id: &str, limit: usize) -> Result<Vec<StoredMessage>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut messages = self
            .query_messages(
                "SELECT id, video_id, role, content, timestamp, context_chunks, created_at
                 FROM messages WHERE video_id = ? ORDER BY id DESC LIMIT ?",
                (video_id, limit as i64),
            )
            .await?;
        messages.reverse();
        Ok(messages)
    }

    async fn query_messages(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Vec<StoredMessage>> {
        let conn = self.reader().await?;
        let mut rows = conn
            .query(sql, params)
            .await
            .map_err(db_err("Failed to query messages"))?;

        let mut messages = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err("Failed to read message"))? {
            let role: String = col!(row, 2);
            let context: String = col!(row, 5);
            messages.push(StoredMessage {
                id: col!(row, 0),
                video_id: col!(row, 1),
                role: role.parse()?,
                content: col!(row, 3),
                timestamp: col!(row, 4),
                context_chunks: serde_json::from_str(&context).map_err(|e| {
                    AppError::Database(format!("Corrupt context_chunks column: {}", e))
                })?,
                created_at: col!(row, 6),
            });
        }
        Ok(messages)
    }

    // ============= Notes =============

    pub async fn create_note(
        &self,
        video_id: &str,
        timestamp: f64,
        content: &str,
        tags: &[String],
    ) -> Result<Note> {
        let tags_json = encode_tags(tags)?;
        let created_at = now();

        let conn = self.writer().await?;
        let mut rows = conn
            .query(
                "INSERT INTO notes (video_id, timestamp, content, tags, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
                (
                    video_id,
                    timestamp,
                    content,
                    tags_json.as_str(),
                    created_at.as_str(),
                    created_at.as_str(),
                ),
            )
            .await
            .map_err(db_err("Failed to create note"))?;
        let id = returned_id(&mut rows).await?;

        Ok(Note {
            id,
            video_id: video_id.to_string(),
            timestamp,
            content: content.to_string(),
            tags: tags.to_vec(),
            created_at: created_at.clone(),
            updated_at: created_at,
        })
    }

    pub async fn get_note(&self, id: i64) -> Result<Option<Note>> {
        let conn = self.reader().await?;
        note_by_id(&conn, id).await
    }

    /// Notes of a video ordered by timestamp, then creation
    pub async fn list_notes(&self, video_id: &str) -> Result<Vec<Note>> {
        let conn = self.reader().await?;
        let mut rows = conn
            .query(
                "SELECT id, video_id, timestamp, content, tags, created_at, updated_at
                 FROM notes WHERE video_id = ? ORDER BY timestamp ASC, id ASC",
                [video_id],
            )
            .await
            .map_err(db_err("Failed to list notes"))?;

        let mut notes = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err("Failed to read note"))? {
            notes.push(note_from_row(&row)?);
        }
        Ok(notes)
    }

    /// Apply a partial update. Fields left out keep their value; `updated_at`
    /// is always refreshed. Returns `None` for an unknown id.
    pub async fn update_note(&self, id: i64, update: &NoteUpdateRequest) -> Result<Option<Note>> {
        let conn = self.writer().await?;

        let Some(mut note) = note_by_id(&conn, id).await? else {
            return Ok(None);
        };

        if let Some(content) = &update.content {
            note.content = content.clone();
        }
        if let Some(tags) = &update.tags {
            note.tags = tags.clone();
        }
        note.updated_at = now();

        let tags_json = encode_tags(&note.tags)?;
        conn.execute(
            "UPDATE notes SET content = ?, tags = ?, updated_at = ? WHERE id = ?",
            (
                note.content.as_str(),
                tags_json.as_str(),
                note.updated_at.as_str(),
                id,
            ),
        )
        .await
        .map_err(db_err("Failed to update note"))?;

        Ok(Some(note))
    }

    /// Returns false when the note did not exist
    pub async fn delete_note(&self, id: i64) -> Result<bool> {
        let conn = self.writer().await?;
        let deleted = conn
            .execute("DELETE FROM notes WHERE id = ?", [id])
            .await
            .map_err(db_err("Failed to delete note"))?;
        Ok(deleted > 0)
    }
}

async fn returned_id(rows: &mut libsql::Rows) -> Result<i64> {
    match rows.next().await.map_err(db_err("Failed to read inserted id"))? {
        Some(row) => Ok(col!(row, 0)),
        None => Err(AppError::Database("Insert returned no id".to_string())),
    }
}

/// Run a pragma that answers with a row
async fn pragma(conn: &Connection, sql: &str) -> Result<()> {
    let mut rows = conn
        .query(sql, ())
        .await
        .map_err(db_err("Failed to apply pragma"))?;
    rows.next().await.map_err(db_err("Failed to apply pragma"))?;
    Ok(())
}

async fn note_by_id(conn: &Connection, id: i64) -> Result<Option<Note>> {
    let mut rows = conn
        .query(
            "SELECT id, video_id, timestamp, content, tags, created_at, updated_at
             FROM notes WHERE id = ?",
            [id],
        )
        .await
        .map_err(db_err("Failed to query note"))?;

    match rows.next().await.map_err(db_err("Failed to read note"))? {
        Some(row) => Ok(Some(note_from_row(&row)?)),
        None => Ok(None),
    }
}

fn encode_tags(tags: &[String]) -> Result<String> {
    serde_json::to_string(tags).map_err(|e| AppError::Internal(format!("Failed to encode tags: {}", e)))
}

fn note_from_row(row: &Row) -> Result<Note> {
    let tags: String = col!(row, 4);
    Ok(Note {
        id: col!(row, 0),
        video_id: col!(row, 1),
        timestamp: col!(row, 2),
        content: col!(row, 3),
        tags: serde_json::from_str(&tags)
            .map_err(|e| AppError::Database(format!("Corrupt tags column: {}", e)))?,
        created_at: col!(row, 5),
        updated_at: col!(row, 6),
    })
}
