//! Init command implementation
//!
//! Scaffolds a Grasp project: `grasp.toml`, `.env.example`, `.gitignore`
//! and the `data/` directory used by the database and vector file.

use super::output::{Output, Status};
use crate::llm::ProviderKind;
use std::fs;
use std::path::{Path, PathBuf};

/// Result of the init operation
#[derive(Debug)]
pub enum InitResult {
    /// Initialization completed successfully
    Success,
    /// Project already exists (grasp.toml found)
    AlreadyExists,
    /// An error occurred during initialization
    Error(String),
}

/// Configuration for the init command
pub struct InitConfig {
    /// Directory to initialize
    pub path: PathBuf,
    /// Overwrite existing files
    pub force: bool,
    /// Default chat provider, or "all"
    pub provider: String,
    /// Host address for the server
    pub host: String,
    /// Port for the server
    pub port: u16,
}

impl InitConfig {
    /// Providers to write sections for, default first
    fn providers(&self) -> Result<Vec<ProviderKind>, String> {
        if self.provider.eq_ignore_ascii_case("all") {
            return Ok(ProviderKind::ALL.to_vec());
        }
        self.provider
            .parse::<ProviderKind>()
            .map(|kind| vec![kind])
            .map_err(|e| e.to_string())
    }
}

/// Run the init command
pub fn run(config: InitConfig, output: &Output) -> InitResult {
    output.banner();
    output.section("Initializing Grasp Project");

    let providers = match config.providers() {
        Ok(providers) => providers,
        Err(e) => {
            output.status(Status::Fail, &e);
            output.hint("Valid providers: openai, anthropic, gemini, all");
            return InitResult::Error(e);
        }
    };

    let base_path = &config.path;
    let config_path = base_path.join("grasp.toml");
    if config_path.exists() && !config.force {
        output.status(Status::Warn, "grasp.toml already exists!");
        output.hint("Use --force to overwrite existing files");
        return InitResult::AlreadyExists;
    }

    output.group("Creating directories");
    let data_dir = base_path.join("data");
    if data_dir.exists() {
        output.kept("data/", "already exists");
    } else {
        if let Err(e) = fs::create_dir_all(&data_dir) {
            output.status(Status::Fail, &format!("Failed to create data: {}", e));
            return InitResult::Error(e.to_string());
        }
        output.wrote("data/");
    }

    output.group("Creating configuration files");

    let toml_content = generate_grasp_toml(&config, &providers);
    if let Err(e) = write_file(&config_path, &toml_content, config.force) {
        output.status(Status::Fail, &format!("Failed to create grasp.toml: {}", e));
        return InitResult::Error(e.to_string());
    }
    output.wrote("grasp.toml");

    let env_example_path = base_path.join(".env.example");
    if let Err(e) = write_file(&env_example_path, &generate_env_example(), config.force) {
        output.status(Status::Fail, &format!("Failed to create .env.example: {}", e));
        return InitResult::Error(e.to_string());
    }
    output.wrote(".env.example");

    let gitignore_path = base_path.join(".gitignore");
    if !gitignore_path.exists() {
        if let Err(e) = write_file(&gitignore_path, GITIGNORE, false) {
            output.status(Status::Warn, &format!("Failed to create .gitignore: {}", e));
        } else {
            output.wrote(".gitignore");
        }
    }

    output.status(Status::Done, "Grasp project initialized successfully!");

    output.section("Next Steps");
    output.blank();
    output.text("1. Set API keys (embeddings always use OPENAI_API_KEY):");
    output.command("cp .env.example .env");
    output.blank();
    output.text("2. Install yt-dlp for caption extraction:");
    output.command("pip install yt-dlp");
    output.blank();
    output.text("3. Start the server:");
    output.command("grasp-server");
    output.blank();

    output.hint(&format!(
        "Server will be available at http://{}:{}",
        config.host, config.port
    ));
    output.hint("OpenAPI document at /api-docs/openapi.json");

    InitResult::Success
}

fn write_file(path: &Path, content: &str, force: bool) -> std::io::Result<()> {
    if path.exists() && !force {
        return Ok(());
    }
    fs::write(path, content)
}

fn provider_section(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::OpenAI => {
            r#"[providers.openai]
api_key_env = "OPENAI_API_KEY"
model = "gpt-4o-mini"
max_tokens = 2048
temperature = 0.7
"#
        }
        ProviderKind::Anthropic => {
            r#"[providers.anthropic]
api_key_env = "ANTHROPIC_API_KEY"
model = "claude-sonnet-4-20250514"
max_tokens = 2048
temperature = 0.7
"#
        }
        ProviderKind::Gemini => {
            r#"[providers.gemini]
api_key_env = "GOOGLE_API_KEY"
model = "gemini-1.5-flash"
max_tokens = 2048
temperature = 0.7
"#
        }
    }
}

fn generate_grasp_toml(config: &InitConfig, providers: &[ProviderKind]) -> String {
    let default_provider = providers.first().copied().unwrap_or(ProviderKind::OpenAI);
    let provider_sections = providers
        .iter()
        .map(|kind| provider_section(*kind))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"# Grasp configuration
# Changes are picked up without a restart, except [server] and [database].

[server]
host = "{host}"
port = {port}
log_level = "info"

[database]
url = "./data/grasp.db"

[vector_store]
# Omit path to keep vectors in memory only
path = "./data/vectors.json"

# Chat providers. API keys are read from the named environment variables.
{provider_sections}
[chat]
default_provider = "{default_provider}"
# Previous messages sent along with each question
history_messages = 6
request_timeout_secs = 120

[embeddings]
api_key_env = "OPENAI_API_KEY"
model = "text-embedding-3-small"
batch_size = 64

[rag]
min_chunk_tokens = 500
max_chunk_tokens = 1000
top_k = 5
window_secs = 120.0

[youtube]
ytdlp_path = "yt-dlp"
caption_language = "en"
"#,
        host = config.host,
        port = config.port,
    )
}

fn generate_env_example() -> String {
    r#"# Grasp Environment Variables
# Copy this file to .env and fill in the values.

# REQUIRED: embeddings, and the OpenAI chat provider
OPENAI_API_KEY=sk-...

# Optional: Anthropic chat provider
# ANTHROPIC_API_KEY=sk-ant-...

# Optional: Gemini chat provider
# GOOGLE_API_KEY=...

# Optional: Logging level (trace, debug, info, warn, error)
RUST_LOG=info,grasp=debug
"#
    .to_string()
}

const GITIGNORE: &str = r#"# Grasp Generated Files
/data/
*.db
*.db-journal

# Environment
.env
.env.local

# Rust
/target/

# OS
.DS_Store
"#;
