//! Tasksmith - local AI-assisted task-management agent.
//!
//! Thin binary entry point: loads config, wires the tool registry and
//! pipeline, and drives an interactive read-eval-print loop over
//! `tasksmith_core::run_turn`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tasksmith_config::autonomy::AutonomyHandle;
use tasksmith_config::{resolve_workspace_root, AutonomyLevel, TasksmithConfig};
use tasksmith_core::audit::AuditJournal;
use tasksmith_core::conversation::{ConversationKey, InMemoryConversationStore};
use tasksmith_core::memory::{append_only_for, memory_dir_under, MemoryStore};
use tasksmith_core::prompts::{gather_system_context, load_section_or_default, SystemPromptBuilder};
use tasksmith_core::provider::{EchoProvider, InferenceProvider};
use tasksmith_core::sandbox::SandboxManager;
use tasksmith_core::subagents::SubagentManager;
use tasksmith_core::tools::{file_op_descriptors, BashTool, Executor, FileOpsContext, GitTool, PathGuard};

#[derive(Debug, Parser)]
#[command(name = "tasksmith", about = "Local AI-assisted task-management agent")]
struct Cli {
    /// One-shot prompt; if omitted, reads prompts from stdin until EOF.
    prompt: Option<String>,

    /// Workspace root; defaults to $TASKSMITH_WORKSPACE or ~/.tasksmith.
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// Autonomy level override for this run.
    #[arg(long, value_enum)]
    level: Option<CliAutonomyLevel>,
}

const DEFAULT_IDENTITY_TEXT: &str =
    "You are the tasksmith agent, a local assistant that manages tasks on this host.";

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliAutonomyLevel {
    None,
    Observe,
    Workspace,
    Home,
    Full,
}

impl From<CliAutonomyLevel> for AutonomyLevel {
    fn from(value: CliAutonomyLevel) -> Self {
        match value {
            CliAutonomyLevel::None => AutonomyLevel::None,
            CliAutonomyLevel::Observe => AutonomyLevel::Observe,
            CliAutonomyLevel::Workspace => AutonomyLevel::Workspace,
            CliAutonomyLevel::Home => AutonomyLevel::Home,
            CliAutonomyLevel::Full => AutonomyLevel::Full,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    initialize_tracing();

    let args = Cli::parse();
    let workspace_root = args.workspace.unwrap_or_else(resolve_workspace_root);
    std::fs::create_dir_all(&workspace_root)
        .with_context(|| format!("failed to prepare workspace root {workspace_root:?}"))?;

    let mut config = TasksmithConfig::load_or_default(&workspace_root.join("tasksmith.toml"))
        .context("failed to load tasksmith.toml")?;
    if let Some(level) = args.level {
        config.autonomy.level = level.into();
    }

    let home_dir = dirs::home_dir().unwrap_or_else(|| workspace_root.clone());
    let autonomy = AutonomyHandle::new(config.autonomy.clone());

    let audit_dir = workspace_root.join(".tasksmith");
    std::fs::create_dir_all(&audit_dir).context("failed to prepare .tasksmith directory")?;
    let audit = AuditJournal::spawn(
        audit_dir.join("audit.log"),
        config.limits.audit_rotation_bytes,
        config.limits.audit_rotation_keep,
    );

    let executor = build_executor(&workspace_root, &home_dir, autonomy, &config, audit)
        .await
        .context("failed to build tool executor")?;

    let memory = MemoryStore::new(memory_dir_under(&workspace_root));
    let subagents = SubagentManager::new(
        config.limits.subagent_pool_capacity,
        config.limits.subagent_max_depth,
        0,
        workspace_root.join(".tasksmith").join("subagents"),
    );
    let _ = &subagents; // reachable for future subagent-driving commands

    let store = InMemoryConversationStore::new();
    let provider = EchoProvider::default();
    let session_id = "cli";

    let project_id = workspace_root.display().to_string();
    let project_context = memory.render_scope(&project_id, tasksmith_core::memory::MemoryScope::User).await;
    let identity = load_section_or_default(&workspace_root, "identity.md", DEFAULT_IDENTITY_TEXT);
    let system_context = load_section_or_default(&workspace_root, "system.md", &gather_system_context());
    let system_prompt = SystemPromptBuilder::new()
        .with_identity(identity)
        .with_tool_catalog(executor.list_descriptions().await)
        .with_system_context(system_context)
        .with_level(config.autonomy.level)
        .with_project_context(project_context)
        .build(provider.context_window());

    if let Some(prompt) = args.prompt {
        let answer = run_one_turn(&provider, &store, &executor, &memory, &project_id, &config, &system_prompt, &prompt, session_id).await?;
        println!("{answer}");
        return Ok(());
    }

    println!("tasksmith ({:?} level, workspace {})", config.autonomy.level, workspace_root.display());
    let stdin = std::io::stdin();
    let mut line = String::new();
    loop {
        line.clear();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let prompt = line.trim();
        if prompt.is_empty() {
            continue;
        }
        executor.reset_prompt_counter().await;
        match run_one_turn(&provider, &store, &executor, &memory, &project_id, &config, &system_prompt, prompt, session_id).await {
            Ok(answer) => println!("{answer}"),
            Err(err) => eprintln!("error: {err}"),
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_one_turn(
    provider: &EchoProvider,
    store: &InMemoryConversationStore,
    executor: &Executor,
    memory: &MemoryStore,
    project_id: &str,
    config: &TasksmithConfig,
    system_prompt: &str,
    prompt: &str,
    session_id: &str,
) -> Result<String> {
    let key = ConversationKey::new(project_id, session_id);
    let answer = tasksmith_core::run_turn(
        provider,
        store,
        executor,
        &key,
        system_prompt,
        prompt,
        session_id,
        config.limits.max_tool_iterations,
    )
    .await
    .context("tool-use loop failed")?;

    let append_only = append_only_for(config.autonomy.level);
    let _ = memory
        .set(project_id, tasksmith_core::memory::MemoryScope::System, "last_prompt", prompt, append_only)
        .await;

    Ok(answer)
}

async fn build_executor(
    workspace_root: &PathBuf,
    home_dir: &PathBuf,
    autonomy: AutonomyHandle,
    config: &TasksmithConfig,
    audit: AuditJournal,
) -> Result<Executor> {
    let level = config.autonomy.level;
    let allowed_roots = match level {
        AutonomyLevel::Home | AutonomyLevel::Full => vec![workspace_root.clone(), home_dir.clone()],
        _ => vec![workspace_root.clone()],
    };
    let denied_globs = vec![
        format!("{}/**/.ssh/**", home_dir.display()),
        format!("{}/**/*.secret", workspace_root.display()),
    ];
    let guard = PathGuard::new(workspace_root.clone(), allowed_roots, denied_globs);
    let file_ops_ctx = FileOpsContext::new(guard, config.limits.clone());

    let executor = Executor::new(autonomy.clone(), config.commands.clone(), config.limits.clone(), audit);

    for descriptor in file_op_descriptors(file_ops_ctx, config.limits.registry_capacity) {
        executor.register(descriptor).await.context("failed to register filesystem tool")?;
    }

    let sandbox = Arc::new(SandboxManager::new());
    executor
        .register(tasksmith_core::tools::ToolDescriptor::new(
            "shell",
            "Runs a command through /bin/sh -c, subject to the command-policy gate and kernel sandbox.",
            tasksmith_core::tools::ToolKind::Shell,
            false,
            config.limits.max_tool_input_bytes,
            Arc::new(BashTool::new(workspace_root.clone(), home_dir.clone(), autonomy, sandbox)),
        ))
        .await
        .context("failed to register shell tool")?;

    executor
        .register(tasksmith_core::tools::ToolDescriptor::new(
            "git",
            "Runs a single git subcommand rooted at the workspace, bypassing a shell.",
            tasksmith_core::tools::ToolKind::Git,
            false,
            config.limits.max_tool_input_bytes,
            Arc::new(GitTool::new(workspace_root.clone(), config.limits.git_timeout_secs)),
        ))
        .await
        .context("failed to register git tool")?;

    Ok(executor)
}

fn initialize_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
