use anyhow::Result;
use chrono::{DateTime, Utc};
use engine::script::{Memory, Script};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    TextToVideo,
    ImageConstrained,
    VideoExtension,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::TextToVideo => "text_to_video",
            Mode::ImageConstrained => "image_constrained",
            Mode::VideoExtension => "video_extension",
        }
    }

    pub fn parse(s: &str) -> Option<Mode> {
        match s {
            "text_to_video" => Some(Mode::TextToVideo),
            "image_constrained" => Some(Mode::ImageConstrained),
            "video_extension" => Some(Mode::VideoExtension),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Created,
    Scripting,
    ScriptReady,
    GeneratingAssets,
    Rendering,
    Completed,
    Failed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Created => "created",
            Status::Scripting => "scripting",
            Status::ScriptReady => "script_ready",
            Status::GeneratingAssets => "generating_assets",
            Status::Rendering => "rendering",
            Status::Completed => "completed",
            Status::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Status> {
        match s {
            "created" => Some(Status::Created),
            "scripting" => Some(Status::Scripting),
            "script_ready" => Some(Status::ScriptReady),
            "generating_assets" => Some(Status::GeneratingAssets),
            "rendering" => Some(Status::Rendering),
            "completed" => Some(Status::Completed),
            "failed" => Some(Status::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Completed | Status::Failed)
    }
}

/// Root aggregate. Status, error, video_url and assets are written only by the
/// orchestrator; script and memory also change through explicit user edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub topic: String,
    pub mode: Mode,
    pub status: Status,
    pub script: Option<Script>,
    pub memory: Memory,
    pub assets: Vec<String>,
    pub video_url: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct ProjectStore {
    conn: Mutex<Connection>,
    storage_dir: PathBuf,
}

fn invalid(idx: usize) -> rusqlite::Error {
    rusqlite::Error::InvalidColumnType(idx, "TEXT".to_string(), rusqlite::types::Type::Text)
}

fn map_row(row: &Row) -> rusqlite::Result<Project> {
    let mode_str: String = row.get(3)?;
    let status_str: String = row.get(4)?;
    let script_json: Option<String> = row.get(5)?;
    let memory_json: String = row.get(6)?;
    let assets_json: String = row.get(7)?;
    let created_at_str: String = row.get(10)?;
    let updated_at_str: String = row.get(11)?;

    let script = script_json
        .map(|s| serde_json::from_str(&s))
        .transpose()
        .map_err(|_| invalid(5))?;
    let memory = serde_json::from_str(&memory_json).map_err(|_| invalid(6))?;
    let assets = serde_json::from_str(&assets_json).map_err(|_| invalid(7))?;

    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        topic: row.get(2)?,
        mode: Mode::parse(&mode_str).ok_or_else(|| invalid(3))?,
        status: Status::parse(&status_str).ok_or_else(|| invalid(4))?,
        script,
        memory,
        assets,
        video_url: row.get(8)?,
        error: row.get(9)?,
        created_at: DateTime::parse_from_rfc3339(&created_at_str)
            .map_err(|_| invalid(10))?
            .with_timezone(&Utc),
        updated_at: DateTime::parse_from_rfc3339(&updated_at_str)
            .map_err(|_| invalid(11))?
            .with_timezone(&Utc),
    })
}

const PROJECT_COLUMNS: &str =
    "id, name, topic, mode, status, script_json, memory_json, assets_json, video_url, error, created_at, updated_at";

impl ProjectStore {
    pub fn new(db_path: &Path, storage_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(storage_dir)?;
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)?;
        let store = ProjectStore {
            conn: Mutex::new(conn),
            storage_dir: storage_dir.to_path_buf(),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "CREATE TABLE IF NOT EXISTS projects (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                topic TEXT NOT NULL,
                mode TEXT NOT NULL,
                status TEXT NOT NULL,
                script_json TEXT,
                memory_json TEXT NOT NULL,
                assets_json TEXT NOT NULL,
                video_url TEXT,
                error TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// On-disk directory holding a project's generated assets. Created on
    /// demand; asset file names embed stable scene ids.
    pub fn project_dir(&self, project_id: &str) -> Result<PathBuf> {
        let dir = self.storage_dir.join(project_id);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    pub fn create(&self, name: &str, topic: &str, mode: Mode) -> Result<Project> {
        let now = Utc::now();
        let project = Project {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            topic: topic.to_string(),
            mode,
            status: Status::Created,
            script: None,
            memory: Memory::default(),
            assets: Vec::new(),
            video_url: None,
            error: None,
            created_at: now,
            updated_at: now,
        };

        {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO projects (id, name, topic, mode, status, script_json, memory_json, assets_json, video_url, error, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    project.id,
                    project.name,
                    project.topic,
                    project.mode.as_str(),
                    project.status.as_str(),
                    Option::<String>::None,
                    serde_json::to_string(&project.memory)?,
                    serde_json::to_string(&project.assets)?,
                    project.video_url,
                    project.error,
                    project.created_at.to_rfc3339(),
                    project.updated_at.to_rfc3339(),
                ],
            )?;
        }

        self.project_dir(&project.id)?;
        Ok(project)
    }

    pub fn get(&self, project_id: &str) -> Result<Option<Project>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM projects WHERE id = ?1",
            PROJECT_COLUMNS
        ))?;
        let mut rows = stmt.query_map(params![project_id], map_row)?;
        match rows.next() {
            Some(Ok(project)) => Ok(Some(project)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    /// Whole-record write. Bumps `updated_at`; the caller's copy is updated to
    /// match what was persisted.
    pub fn save(&self, project: &mut Project) -> Result<()> {
        project.updated_at = Utc::now();
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE projects SET name = ?2, topic = ?3, mode = ?4, status = ?5, script_json = ?6,
             memory_json = ?7, assets_json = ?8, video_url = ?9, error = ?10, updated_at = ?11
             WHERE id = ?1",
            params![
                project.id,
                project.name,
                project.topic,
                project.mode.as_str(),
                project.status.as_str(),
                project
                    .script
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?,
                serde_json::to_string(&project.memory)?,
                serde_json::to_string(&project.assets)?,
                project.video_url,
                project.error,
                project.updated_at.to_rfc3339(),
            ],
        )?;
        if changed == 0 {
            anyhow::bail!("project {} not found", project.id);
        }
        Ok(())
    }

    /// Explicit user edit. The script must already be validated by the caller;
    /// a valid script moves the project to `script_ready` and clears any
    /// leftover terminal fields from a previous run.
    pub fn update_script(&self, project_id: &str, script: Script) -> Result<Option<Project>> {
        let Some(mut project) = self.get(project_id)? else {
            return Ok(None);
        };
        project.script = Some(script);
        project.status = Status::ScriptReady;
        project.error = None;
        project.video_url = None;
        self.save(&mut project)?;
        Ok(Some(project))
    }

    /// Explicit user edit; does not touch status.
    pub fn update_memory(&self, project_id: &str, memory: Memory) -> Result<Option<Project>> {
        let Some(mut project) = self.get(project_id)? else {
            return Ok(None);
        };
        project.memory = memory;
        self.save(&mut project)?;
        Ok(Some(project))
    }

    /// All projects, most recently touched first.
    pub fn list(&self) -> Result<Vec<Project>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM projects ORDER BY updated_at DESC",
            PROJECT_COLUMNS
        ))?;
        let rows = stmt.query_map([], map_row)?;
        let mut projects = Vec::new();
        for row in rows {
            projects.push(row?);
        }
        Ok(projects)
    }
}
