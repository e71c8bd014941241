//! The fourteen filesystem tools (`spec.md` §4.4). Tool input is literal
//! text between `TOOL_CALL:`/`END_TOOL_CALL` markers, never JSON, so each
//! tool defines its own line-oriented convention: the first line is almost
//! always a path, with remaining lines carrying content or options.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Utc};
use glob::Pattern;
use tasksmith_config::Limits;

use crate::error::AgentError;

use super::context::ExecutionContext;
use super::descriptor::{PathExtractor, ToolDescriptor, ToolHandler, ToolKind};
use super::path_validation::PathGuard;

/// Shared state every filesystem tool closes over: the path guard and the
/// configured size caps.
#[derive(Clone)]
pub struct FileOpsContext {
    pub guard: Arc<PathGuard>,
    pub limits: Limits,
}

impl FileOpsContext {
    pub fn new(guard: PathGuard, limits: Limits) -> Self {
        Self {
            guard: Arc::new(guard),
            limits,
        }
    }

    fn validate(&self, raw_path: &str) -> Result<PathBuf, AgentError> {
        self.guard.validate(raw_path.trim())
    }
}

/// Register all fourteen filesystem tools into `descriptors`, the way
/// `main` wires up a registry before the tool-use loop starts.
pub fn file_op_descriptors(ctx: FileOpsContext, registry_cap_hint: usize) -> Vec<ToolDescriptor> {
    let mut descriptors = Vec::with_capacity(registry_cap_hint.min(14));
    let max_read = ctx.limits.max_read_bytes as usize;
    let max_write = ctx.limits.max_write_bytes as usize;

    descriptors.push(
        ToolDescriptor::new(
            "read_text_file",
            "UTF-8 read with a size cap; first line is a path, optional second line 'head=N' or 'tail=N'.",
            ToolKind::Read,
            false,
            4096,
            Arc::new(ReadTextFileTool { ctx: ctx.clone() }),
        )
        .with_path_extractor(first_line_extractor()),
    );
    descriptors.push(
        ToolDescriptor::new(
            "read_binary_file",
            "Reads a file and returns its bytes as base64; first line is a path.",
            ToolKind::Read,
            false,
            4096,
            Arc::new(ReadBinaryFileTool { ctx: ctx.clone() }),
        )
        .with_path_extractor(first_line_extractor()),
    );
    descriptors.push(
        ToolDescriptor::new(
            "read_multiple_files",
            "Batched read; one path per line, returns a per-path result or error.",
            ToolKind::Read,
            false,
            max_read.max(4096),
            Arc::new(ReadMultipleFilesTool { ctx: ctx.clone() }),
        )
        .with_path_extractor(all_lines_extractor()),
    );
    descriptors.push(
        ToolDescriptor::new(
            "list_directory",
            "Lists entry names, sorted lexicographically; first line is the directory path.",
            ToolKind::Read,
            false,
            4096,
            Arc::new(ListDirectoryTool { ctx: ctx.clone() }),
        )
        .with_path_extractor(first_line_extractor()),
    );
    descriptors.push(
        ToolDescriptor::new(
            "list_directory_sizes",
            "Lists entries with byte sizes; first line is the path, optional second line 'sort=size' or 'sort=name'.",
            ToolKind::Read,
            false,
            4096,
            Arc::new(ListDirectorySizesTool { ctx: ctx.clone() }),
        )
        .with_path_extractor(first_line_extractor()),
    );
    descriptors.push(
        ToolDescriptor::new(
            "directory_tree",
            "Breadth-bounded recursive listing; line 1 path, optional line 2 max_depth, optional line 3 comma-separated exclude globs.",
            ToolKind::Read,
            false,
            4096,
            Arc::new(DirectoryTreeTool { ctx: ctx.clone() }),
        )
        .with_path_extractor(first_line_extractor()),
    );
    descriptors.push(
        ToolDescriptor::new(
            "search_files",
            "Name-glob search with a result cap; line 1 root, line 2 glob, optional 'max_depth=N'/'max_results=N' lines.",
            ToolKind::Read,
            false,
            4096,
            Arc::new(SearchFilesTool { ctx: ctx.clone() }),
        )
        .with_path_extractor(first_line_extractor()),
    );
    descriptors.push(
        ToolDescriptor::new(
            "get_file_info",
            "Reports size, mtime, kind and permissions for a path.",
            ToolKind::Read,
            false,
            4096,
            Arc::new(GetFileInfoTool { ctx: ctx.clone() }),
        )
        .with_path_extractor(first_line_extractor()),
    );
    descriptors.push(ToolDescriptor::new(
        "list_allowed_paths",
        "Emits the currently configured allowed roots.",
        ToolKind::Read,
        false,
        64,
        Arc::new(ListAllowedPathsTool { ctx: ctx.clone() }),
    ));
    descriptors.push(
        ToolDescriptor::new(
            "write_file",
            "Atomically replaces a file's content; line 1 path, remaining lines are the content.",
            ToolKind::Write,
            true,
            max_write.max(4096),
            Arc::new(WriteFileTool { ctx: ctx.clone() }),
        )
        .with_path_extractor(first_line_extractor()),
    );
    descriptors.push(
        ToolDescriptor::new(
            "edit_file",
            "Exact-substring replace; line 1 path, then an OLD>>>/<<<OLD block, a NEW>>>/<<<NEW block, optional trailing 'dry_run=true'.",
            ToolKind::Write,
            true,
            max_write.max(4096),
            Arc::new(EditFileTool { ctx: ctx.clone() }),
        )
        .with_path_extractor(first_line_extractor()),
    );
    descriptors.push(
        ToolDescriptor::new(
            "create_directory",
            "Mkdir -p bounded by the allowed roots; first line is the path.",
            ToolKind::Write,
            true,
            4096,
            Arc::new(CreateDirectoryTool { ctx: ctx.clone() }),
        )
        .with_path_extractor(first_line_extractor()),
    );
    descriptors.push(
        ToolDescriptor::new(
            "move_file",
            "Same-volume rename when possible, cross-volume copy+unlink otherwise; line 1 source, line 2 destination.",
            ToolKind::Write,
            true,
            4096,
            Arc::new(MoveFileTool { ctx: ctx.clone() }),
        )
        .with_path_extractor(all_lines_extractor()),
    );
    descriptors.push(
        ToolDescriptor::new(
            "delete_file",
            "Removes a single file; never recursive. First line is the path.",
            ToolKind::Write,
            true,
            4096,
            Arc::new(DeleteFileTool { ctx }),
        )
        .with_path_extractor(first_line_extractor()),
    );

    descriptors
}

fn first_line_extractor() -> PathExtractor {
    Arc::new(|input: &str| {
        input
            .lines()
            .next()
            .map(|line| vec![PathBuf::from(line.trim())])
            .unwrap_or_default()
    })
}

fn all_lines_extractor() -> PathExtractor {
    Arc::new(|input: &str| {
        input
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(PathBuf::from)
            .collect()
    })
}

fn parse_option(lines: &[&str], key: &str) -> Option<String> {
    lines.iter().find_map(|line| {
        line.trim()
            .strip_prefix(key)
            .and_then(|rest| rest.strip_prefix('='))
            .map(str::to_string)
    })
}

struct ReadTextFileTool {
    ctx: FileOpsContext,
}

#[async_trait]
impl ToolHandler for ReadTextFileTool {
    async fn call(&self, input: &str, _ctx: &ExecutionContext) -> Result<String, AgentError> {
        let lines: Vec<&str> = input.lines().collect();
        let path_line = lines.first().copied().unwrap_or("").trim();
        let path = self.ctx.validate(path_line)?;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| AgentError::Internal(format!("read failed: {e}")))?;
        if bytes.len() as u64 > self.ctx.limits.max_read_bytes {
            return Err(AgentError::InputTooLarge("read_text_file".to_string()));
        }
        let text = String::from_utf8_lossy(&bytes).into_owned();
        if let Some(n) = parse_option(&lines[1..], "head").and_then(|v| v.parse::<usize>().ok()) {
            return Ok(text.lines().take(n).collect::<Vec<_>>().join("\n"));
        }
        if let Some(n) = parse_option(&lines[1..], "tail").and_then(|v| v.parse::<usize>().ok()) {
            let all: Vec<&str> = text.lines().collect();
            let start = all.len().saturating_sub(n);
            return Ok(all[start..].join("\n"));
        }
        Ok(text)
    }
}

struct ReadBinaryFileTool {
    ctx: FileOpsContext,
}

#[async_trait]
impl ToolHandler for ReadBinaryFileTool {
    async fn call(&self, input: &str, _ctx: &ExecutionContext) -> Result<String, AgentError> {
        let path = self.ctx.validate(input)?;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| AgentError::Internal(format!("read failed: {e}")))?;
        if bytes.len() as u64 > self.ctx.limits.max_read_bytes {
            return Err(AgentError::InputTooLarge("read_binary_file".to_string()));
        }
        Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
    }
}

struct ReadMultipleFilesTool {
    ctx: FileOpsContext,
}

#[async_trait]
impl ToolHandler for ReadMultipleFilesTool {
    async fn call(&self, input: &str, _ctx: &ExecutionContext) -> Result<String, AgentError> {
        let mut out = String::new();
        for raw_path in input.lines().map(str::trim).filter(|l| !l.is_empty()) {
            out.push_str(&format!("== {raw_path} ==\n"));
            match self.ctx.validate(raw_path) {
                Ok(path) => match tokio::fs::read(&path).await {
                    Ok(bytes) if bytes.len() as u64 <= self.ctx.limits.max_read_bytes => {
                        out.push_str(&String::from_utf8_lossy(&bytes));
                    }
                    Ok(_) => out.push_str("error: file exceeds max_read_bytes"),
                    Err(e) => out.push_str(&format!("error: {e}")),
                },
                Err(e) => out.push_str(&format!("error: {e}")),
            }
            out.push('\n');
        }
        Ok(out)
    }
}

struct ListDirectoryTool {
    ctx: FileOpsContext,
}

#[async_trait]
impl ToolHandler for ListDirectoryTool {
    async fn call(&self, input: &str, _ctx: &ExecutionContext) -> Result<String, AgentError> {
        let path = self.ctx.validate(input)?;
        let mut names = read_entry_names(&path).await?;
        names.sort();
        Ok(names.join("\n"))
    }
}

struct ListDirectorySizesTool {
    ctx: FileOpsContext,
}

#[async_trait]
impl ToolHandler for ListDirectorySizesTool {
    async fn call(&self, input: &str, _ctx: &ExecutionContext) -> Result<String, AgentError> {
        let lines: Vec<&str> = input.lines().collect();
        let path_line = lines.first().copied().unwrap_or("").trim();
        let path = self.ctx.validate(path_line)?;
        let sort_by_size = parse_option(&lines[1..], "sort").as_deref() == Some("size");

        let mut entries = Vec::new();
        let mut read_dir = tokio::fs::read_dir(&path)
            .await
            .map_err(|e| AgentError::Internal(format!("list failed: {e}")))?;
        while let Ok(Some(entry)) = read_dir.next_entry().await {
            let metadata = entry
                .metadata()
                .await
                .map_err(|e| AgentError::Internal(format!("stat failed: {e}")))?;
            entries.push((entry.file_name().to_string_lossy().into_owned(), metadata.len()));
        }
        if sort_by_size {
            entries.sort_by(|a, b| b.1.cmp(&a.1));
        } else {
            entries.sort_by(|a, b| a.0.cmp(&b.0));
        }
        Ok(entries
            .into_iter()
            .map(|(name, size)| format!("{name}\t{size}"))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

struct DirectoryTreeTool {
    ctx: FileOpsContext,
}

#[async_trait]
impl ToolHandler for DirectoryTreeTool {
    async fn call(&self, input: &str, _ctx: &ExecutionContext) -> Result<String, AgentError> {
        let lines: Vec<&str> = input.lines().collect();
        let path_line = lines.first().copied().unwrap_or("").trim();
        let root = self.ctx.validate(path_line)?;
        let max_depth = lines
            .get(1)
            .and_then(|l| l.trim().parse::<usize>().ok())
            .unwrap_or(self.ctx.limits.max_search_depth as usize);
        let exclude_globs: Vec<Pattern> = lines
            .get(2)
            .map(|l| l.split(',').filter_map(|g| Pattern::new(g.trim()).ok()).collect())
            .unwrap_or_default();

        let mut out = String::new();
        walk_tree(&root, &root, 0, max_depth, &exclude_globs, &mut out);
        Ok(out)
    }
}

fn walk_tree(root: &Path, current: &Path, depth: usize, max_depth: usize, excludes: &[Pattern], out: &mut String) {
    if depth > max_depth {
        return;
    }
    let Ok(mut entries) = std::fs::read_dir(current).map(|it| it.flatten().collect::<Vec<_>>()) else {
        return;
    };
    entries.sort_by_key(|e| e.file_name());
    for entry in entries {
        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(&path).to_string_lossy().into_owned();
        if excludes.iter().any(|pattern| pattern.matches(&relative)) {
            continue;
        }
        let indent = "  ".repeat(depth);
        let is_dir = path.is_dir();
        out.push_str(&format!("{indent}{}{}\n", entry.file_name().to_string_lossy(), if is_dir { "/" } else { "" }));
        if is_dir {
            walk_tree(root, &path, depth + 1, max_depth, excludes, out);
        }
    }
}

struct SearchFilesTool {
    ctx: FileOpsContext,
}

#[async_trait]
impl ToolHandler for SearchFilesTool {
    async fn call(&self, input: &str, _ctx: &ExecutionContext) -> Result<String, AgentError> {
        let lines: Vec<&str> = input.lines().collect();
        let root_line = lines.first().copied().unwrap_or("").trim();
        let glob_line = lines.get(1).copied().unwrap_or("*").trim();
        let root = self.ctx.validate(root_line)?;
        let pattern = Pattern::new(glob_line).map_err(|e| AgentError::Internal(format!("bad glob: {e}")))?;
        let max_depth = parse_option(&lines[2..], "max_depth")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(self.ctx.limits.max_search_depth as usize);
        let max_results = parse_option(&lines[2..], "max_results")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(self.ctx.limits.max_search_results as usize);

        let mut matches = Vec::new();
        for entry in walkdir::WalkDir::new(&root).max_depth(max_depth).into_iter().flatten() {
            if matches.len() >= max_results {
                break;
            }
            if pattern.matches(&entry.file_name().to_string_lossy()) {
                matches.push(entry.path().display().to_string());
            }
        }
        Ok(matches.join("\n"))
    }
}

struct GetFileInfoTool {
    ctx: FileOpsContext,
}

#[async_trait]
impl ToolHandler for GetFileInfoTool {
    async fn call(&self, input: &str, _ctx: &ExecutionContext) -> Result<String, AgentError> {
        let path = self.ctx.validate(input)?;
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| AgentError::Internal(format!("stat failed: {e}")))?;
        let kind = if metadata.is_dir() {
            "directory"
        } else if metadata.is_file() {
            "file"
        } else {
            "other"
        };
        let modified: DateTime<Utc> = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .and_then(|d| DateTime::from_timestamp(d.as_secs() as i64, 0))
            .unwrap_or_else(Utc::now);
        let permissions = permissions_octal(&metadata);
        Ok(format!(
            "size={}\nkind={kind}\nmodified={}\npermissions={permissions}",
            metadata.len(),
            modified.to_rfc3339()
        ))
    }
}

#[cfg(unix)]
fn permissions_octal(metadata: &std::fs::Metadata) -> String {
    use std::os::unix::fs::PermissionsExt;
    format!("{:o}", metadata.permissions().mode() & 0o777)
}

#[cfg(not(unix))]
fn permissions_octal(metadata: &std::fs::Metadata) -> String {
    if metadata.permissions().readonly() {
        "r--r--r--".to_string()
    } else {
        "rw-rw-rw-".to_string()
    }
}

struct ListAllowedPathsTool {
    ctx: FileOpsContext,
}

#[async_trait]
impl ToolHandler for ListAllowedPathsTool {
    async fn call(&self, _input: &str, _ctx: &ExecutionContext) -> Result<String, AgentError> {
        Ok(format!("workspace_root={}", self.ctx.guard.workspace_root().display()))
    }
}

struct WriteFileTool {
    ctx: FileOpsContext,
}

#[async_trait]
impl ToolHandler for WriteFileTool {
    async fn call(&self, input: &str, _ctx: &ExecutionContext) -> Result<String, AgentError> {
        let mut lines = input.splitn(2, '\n');
        let path_line = lines.next().unwrap_or("").trim();
        let content = lines.next().unwrap_or("");
        if content.len() as u64 > self.ctx.limits.max_write_bytes {
            return Err(AgentError::InputTooLarge("write_file".to_string()));
        }
        let path = self.ctx.validate(path_line)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AgentError::Internal(format!("create parents failed: {e}")))?;
        }
        let tmp_path = path.with_extension("tasksmith-tmp");
        tokio::fs::write(&tmp_path, content)
            .await
            .map_err(|e| AgentError::Internal(format!("write failed: {e}")))?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| AgentError::Internal(format!("atomic replace failed: {e}")))?;
        Ok(format!("wrote {} bytes to {}", content.len(), path.display()))
    }
}

struct EditFileTool {
    ctx: FileOpsContext,
}

#[async_trait]
impl ToolHandler for EditFileTool {
    async fn call(&self, input: &str, _ctx: &ExecutionContext) -> Result<String, AgentError> {
        let lines: Vec<&str> = input.lines().collect();
        let path_line = lines.first().copied().unwrap_or("").trim();
        let path = self.ctx.validate(path_line)?;

        let old_text = extract_block(&lines, "OLD>>>", "<<<OLD")
            .ok_or_else(|| AgentError::Internal("edit_file: missing OLD>>> / <<<OLD block".to_string()))?;
        let new_text = extract_block(&lines, "NEW>>>", "<<<NEW")
            .ok_or_else(|| AgentError::Internal("edit_file: missing NEW>>> / <<<NEW block".to_string()))?;
        let dry_run = lines.iter().any(|l| l.trim() == "dry_run=true");

        let current = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| AgentError::Internal(format!("read failed: {e}")))?;
        let occurrences = current.matches(&old_text).count();
        if occurrences == 0 {
            return Err(AgentError::Internal("edit_file: old_text not found".to_string()));
        }
        if occurrences > 1 {
            return Err(AgentError::Internal("edit_file: old_text is not unique".to_string()));
        }
        let updated = current.replacen(&old_text, &new_text, 1);
        if dry_run {
            return Ok(format!("dry_run: would replace 1 occurrence in {}", path.display()));
        }
        tokio::fs::write(&path, updated)
            .await
            .map_err(|e| AgentError::Internal(format!("write failed: {e}")))?;
        Ok(format!("replaced 1 occurrence in {}", path.display()))
    }
}

fn extract_block(lines: &[&str], start_marker: &str, end_marker: &str) -> Option<String> {
    let start = lines.iter().position(|l| l.trim() == start_marker)? + 1;
    let end = lines[start..].iter().position(|l| l.trim() == end_marker)? + start;
    Some(lines[start..end].join("\n"))
}

struct CreateDirectoryTool {
    ctx: FileOpsContext,
}

#[async_trait]
impl ToolHandler for CreateDirectoryTool {
    async fn call(&self, input: &str, _ctx: &ExecutionContext) -> Result<String, AgentError> {
        let path = self.ctx.validate(input)?;
        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|e| AgentError::Internal(format!("mkdir failed: {e}")))?;
        Ok(format!("created {}", path.display()))
    }
}

struct MoveFileTool {
    ctx: FileOpsContext,
}

#[async_trait]
impl ToolHandler for MoveFileTool {
    async fn call(&self, input: &str, _ctx: &ExecutionContext) -> Result<String, AgentError> {
        let mut lines = input.lines().map(str::trim).filter(|l| !l.is_empty());
        let src_line = lines.next().ok_or_else(|| AgentError::Internal("move_file: missing source".to_string()))?;
        let dst_line = lines.next().ok_or_else(|| AgentError::Internal("move_file: missing destination".to_string()))?;
        let src = self.ctx.validate(src_line)?;
        let dst = self.ctx.validate(dst_line)?;

        match tokio::fs::rename(&src, &dst).await {
            Ok(()) => Ok(format!("moved {} to {}", src.display(), dst.display())),
            Err(_) => {
                tokio::fs::copy(&src, &dst)
                    .await
                    .map_err(|e| AgentError::Internal(format!("cross-volume copy failed: {e}")))?;
                tokio::fs::remove_file(&src)
                    .await
                    .map_err(|e| AgentError::Internal(format!("unlink source failed: {e}")))?;
                Ok(format!("copied+unlinked {} to {}", src.display(), dst.display()))
            }
        }
    }
}

struct DeleteFileTool {
    ctx: FileOpsContext,
}

#[async_trait]
impl ToolHandler for DeleteFileTool {
    async fn call(&self, input: &str, _ctx: &ExecutionContext) -> Result<String, AgentError> {
        let path = self.ctx.validate(input)?;
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| AgentError::Internal(format!("stat failed: {e}")))?;
        if metadata.is_dir() {
            return Err(AgentError::Internal("delete_file: refusing to remove a directory".to_string()));
        }
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| AgentError::Internal(format!("delete failed: {e}")))?;
        Ok(format!("deleted {}", path.display()))
    }
}

async fn read_entry_names(path: &Path) -> Result<Vec<String>, AgentError> {
    let mut read_dir = tokio::fs::read_dir(path)
        .await
        .map_err(|e| AgentError::Internal(format!("list failed: {e}")))?;
    let mut names = Vec::new();
    while let Ok(Some(entry)) = read_dir.next_entry().await {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::context::ExecutionContext;
    use tempfile::tempdir;

    fn ctx_for(dir: &Path) -> FileOpsContext {
        let guard = PathGuard::new(dir.to_path_buf(), vec![dir.to_path_buf()], Vec::new());
        FileOpsContext::new(guard, Limits::default())
    }

    fn exec_ctx() -> ExecutionContext {
        ExecutionContext {
            tool_name: "test".to_string(),
            session_id: "s1".to_string(),
            per_prompt_count: 0,
            per_session_count: 0,
        }
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let ctx = ctx_for(dir.path());
        let writer = WriteFileTool { ctx: ctx.clone() };
        writer.call("notes.txt\nhello world", &exec_ctx()).await.unwrap();

        let reader = ReadTextFileTool { ctx };
        let text = reader.call("notes.txt", &exec_ctx()).await.unwrap();
        assert_eq!(text, "hello world");
    }

    #[tokio::test]
    async fn edit_file_requires_unique_match() {
        let dir = tempdir().unwrap();
        let ctx = ctx_for(dir.path());
        std::fs::write(dir.path().join("dup.txt"), "foo foo").unwrap();
        let tool = EditFileTool { ctx };
        let input = "dup.txt\nOLD>>>\nfoo\n<<<OLD\nNEW>>>\nbar\n<<<NEW";
        let result = tool.call(input, &exec_ctx()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn edit_file_replaces_unique_match() {
        let dir = tempdir().unwrap();
        let ctx = ctx_for(dir.path());
        std::fs::write(dir.path().join("single.txt"), "foo bar").unwrap();
        let tool = EditFileTool { ctx: ctx.clone() };
        let input = "single.txt\nOLD>>>\nfoo\n<<<OLD\nNEW>>>\nbaz\n<<<NEW";
        tool.call(input, &exec_ctx()).await.unwrap();

        let reader = ReadTextFileTool { ctx };
        let text = reader.call("single.txt", &exec_ctx()).await.unwrap();
        assert_eq!(text, "baz bar");
    }

    #[tokio::test]
    async fn delete_file_refuses_directories() {
        let dir = tempdir().unwrap();
        let ctx = ctx_for(dir.path());
        std::fs::create_dir(dir.path().join("subdir")).unwrap();
        let tool = DeleteFileTool { ctx };
        let result = tool.call("subdir", &exec_ctx()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn list_directory_sorts_lexicographically() {
        let dir = tempdir().unwrap();
        let ctx = ctx_for(dir.path());
        std::fs::write(dir.path().join("b.txt"), "").unwrap();
        std::fs::write(dir.path().join("a.txt"), "").unwrap();
        let tool = ListDirectoryTool { ctx };
        let listing = tool.call(".", &exec_ctx()).await.unwrap();
        let names: Vec<&str> = listing.lines().collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }

    #[tokio::test]
    async fn move_file_renames_within_same_volume() {
        let dir = tempdir().unwrap();
        let ctx = ctx_for(dir.path());
        std::fs::write(dir.path().join("src.txt"), "data").unwrap();
        let tool = MoveFileTool { ctx: ctx.clone() };
        tool.call("src.txt\ndst.txt", &exec_ctx()).await.unwrap();
        assert!(!dir.path().join("src.txt").exists());
        assert!(dir.path().join("dst.txt").exists());
    }
}
