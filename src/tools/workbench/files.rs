/// Project File Tools
///
/// Listing, uploading and deleting files inside a project. Uploads read the
/// local file and send it as a multipart `PUT` to the project's `files`
/// endpoint.

use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use super::{SharedClient, add_tool, body, reply, with_project};
use crate::core::args::Arguments;
use crate::core::error::{RegistryError, ToolError};
use crate::core::registry::{Content, ToolRegistry};
use crate::core::schema::{InputSchema, ParamKind};

/// Directories skipped by `upload_folder_tool` unless overridden.
pub const DEFAULT_IGNORED: [&str; 5] = ["node_modules", ".git", ".vscode", "dist", "out"];

pub fn register(registry: &mut ToolRegistry, client: &SharedClient) -> Result<(), RegistryError> {
    add_tool(
        registry,
        client,
        "list_project_files_tool",
        "List files in a Cloudera ML project",
        with_project(InputSchema::new().optional(
            "path",
            ParamKind::String,
            "Directory inside the project to list (default: project root)",
        )),
        list_project_files,
    )?;
    add_tool(
        registry,
        client,
        "upload_file_tool",
        "Upload a single local file to a Cloudera ML project",
        with_project(
            InputSchema::new()
                .required("file_path", ParamKind::String, "Local path of the file to upload")
                .optional("target_name", ParamKind::String, "File name in the project (default: local name)")
                .optional("target_dir", ParamKind::String, "Directory in the project to upload into"),
        ),
        upload_file,
    )?;
    add_tool(
        registry,
        client,
        "upload_folder_tool",
        "Upload a local folder to a Cloudera ML project, preserving its structure",
        with_project(
            InputSchema::new()
                .required("folder_path", ParamKind::String, "Local folder to upload")
                .optional(
                    "ignore_folders",
                    ParamKind::StringList,
                    "Folder names to skip (default: node_modules, .git, .vscode, dist, out)",
                ),
        ),
        upload_folder,
    )?;
    add_tool(
        registry,
        client,
        "delete_project_file_tool",
        "Delete a file or directory from a Cloudera ML project",
        with_project(InputSchema::new().required(
            "file_path",
            ParamKind::String,
            "Path of the file relative to the project root",
        )),
        delete_project_file,
    )?;
    add_tool(
        registry,
        client,
        "update_project_file_metadata_tool",
        "Update metadata of a file in a Cloudera ML project",
        with_project(
            InputSchema::new()
                .required("file_path", ParamKind::String, "Path of the file relative to the project root")
                .optional("description", ParamKind::String, "New description for the file")
                .optional("hidden", ParamKind::Boolean, "Whether the file should be hidden"),
        ),
        update_project_file_metadata,
    )
}

async fn list_project_files(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = client.project_id(&args)?;
    let mut url = client.project_endpoint(project_id, &["files"])?;
    if let Some(path) = args.str("path") {
        url.query_pairs_mut().append_pair("path", path);
    }

    let response = client.get(url).await?;
    let count = super::items(&response, "files").len();
    Ok(reply(format!("Found {} files", count), response))
}

/// Destination path inside the project for an upload.
fn target_path(local: &Path, target_name: Option<&str>, target_dir: Option<&str>) -> Result<String, ToolError> {
    let name = match target_name {
        Some(name) => name.to_string(),
        None => local
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ToolError::invalid("file_path", "path has no file name"))?,
    };
    Ok(match target_dir.map(|d| d.trim_matches('/')).filter(|d| !d.is_empty()) {
        Some(dir) => format!("{}/{}", dir, name),
        None => name,
    })
}

async fn upload_file(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = client.project_id(&args)?;
    let local = PathBuf::from(args.required_str("file_path")?);
    if !local.is_file() {
        return Err(ToolError::Execution(format!("File not found: {}", local.display())));
    }

    let target = target_path(&local, args.str("target_name"), args.str("target_dir"))?;
    let bytes = tokio::fs::read(&local).await?;
    let size = bytes.len();

    let response = client
        .put_file(client.project_endpoint(project_id, &["files"])?, &target, bytes)
        .await?;
    info!("Uploaded {} to project {} as {}", local.display(), project_id, target);

    Ok(Content::Json(json!({
        "message": format!("Successfully uploaded {} to project", target),
        "file_path": target,
        "size": size,
        "data": response,
    })))
}

/// Files found under a folder, plus the entries that could not be read.
#[derive(Debug, Default)]
pub struct FolderScan {
    /// Paths relative to the root with `/` separators, sorted
    pub files: Vec<String>,
    /// `{"file", "error"}` for every entry the walk could not read
    pub failures: Vec<Value>,
}

fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Every regular file under `root`, skipping directories named in `ignored`.
/// An unreadable entry is recorded in `failures` and the walk carries on.
pub fn collect_files(root: &Path, ignored: &[String]) -> FolderScan {
    let mut scan = FolderScan::default();

    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        let name = entry.file_name().to_string_lossy();
        entry.depth() == 0 || !entry.file_type().is_dir() || !ignored.iter().any(|i| *i == name)
    });
    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_file() => {
                scan.files.push(relative_path(root, entry.path()));
            }
            Ok(_) => {}
            Err(e) => {
                let file = e
                    .path()
                    .map(|p| relative_path(root, p))
                    .unwrap_or_else(|| root.display().to_string());
                warn!("Skipping {}: {}", file, e);
                scan.failures.push(json!({ "file": file, "error": e.to_string() }));
            }
        }
    }

    scan.files.sort();
    scan
}

async fn upload_folder(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = client.project_id(&args)?;
    let root = PathBuf::from(args.required_str("folder_path")?);
    if !root.is_dir() {
        return Err(ToolError::Execution(format!("Folder not found: {}", root.display())));
    }

    let ignored: Vec<String> = match args.list("ignore_folders") {
        Some(list) if !list.is_empty() => list.to_vec(),
        _ => DEFAULT_IGNORED.iter().map(|s| s.to_string()).collect(),
    };

    let scan = {
        let root = root.clone();
        let ignored = ignored.clone();
        tokio::task::spawn_blocking(move || collect_files(&root, &ignored))
            .await
            .map_err(|e| ToolError::Execution(format!("Folder scan failed: {}", e)))?
    };
    let url = client.project_endpoint(project_id, &["files"])?;

    let mut uploaded = Vec::new();
    let mut failed = scan.failures;
    for relative in &scan.files {
        let result = match tokio::fs::read(root.join(relative)).await {
            Ok(bytes) => client.put_file(url.clone(), relative, bytes).await.map(|_| ()),
            Err(e) => Err(ToolError::from(e)),
        };
        match result {
            Ok(()) => uploaded.push(relative.clone()),
            Err(e) => {
                warn!("Failed to upload {}: {}", relative, e);
                failed.push(json!({ "file": relative, "error": e.to_string() }));
            }
        }
    }

    Ok(Content::Json(json!({
        "message": format!(
            "Uploaded {} of {} files from {}",
            uploaded.len(),
            scan.files.len(),
            root.display()
        ),
        "uploaded_files": uploaded,
        "failed_uploads": failed,
        "ignored_folders": ignored,
    })))
}

async fn delete_project_file(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = client.project_id(&args)?;
    let file_path = args.required_str("file_path")?;

    let mut url = client.project_endpoint(project_id, &["files"])?;
    url.query_pairs_mut().append_pair("path", file_path);
    let response = client.delete(url).await?;

    Ok(reply(format!("Successfully deleted {}", file_path), response))
}

async fn update_project_file_metadata(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = client.project_id(&args)?;
    let file_path = args.required_str("file_path")?;

    let mut segments = vec!["files"];
    segments.extend(file_path.split('/').filter(|s| !s.is_empty()));
    let url = client.project_endpoint(project_id, &segments)?;

    let payload: Value = body(&args, &["description", "hidden"]);
    if payload.as_object().is_some_and(|m| m.is_empty()) {
        return Err(ToolError::Execution("No fields to update were provided".to_string()));
    }

    let response = client.patch(url, &payload).await?;
    Ok(reply(format!("Successfully updated metadata for {}", file_path), response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_path_joins_directory_and_name() {
        let local = Path::new("/tmp/work/model.py");
        assert_eq!(target_path(local, None, None).unwrap(), "model.py");
        assert_eq!(target_path(local, Some("main.py"), Some("/src/")).unwrap(), "src/main.py");
        assert_eq!(target_path(local, None, Some("")).unwrap(), "model.py");
    }

    #[test]
    fn collect_files_skips_ignored_directories() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("src/nested")).unwrap();
        std::fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        std::fs::write(root.join("README.md"), "readme").unwrap();
        std::fs::write(root.join("src/nested/app.py"), "print()").unwrap();
        std::fs::write(root.join("node_modules/pkg/index.js"), "x").unwrap();

        let ignored: Vec<String> = DEFAULT_IGNORED.iter().map(|s| s.to_string()).collect();
        let scan = collect_files(root, &ignored);
        assert_eq!(scan.files, vec!["README.md".to_string(), "src/nested/app.py".to_string()]);
        assert!(scan.failures.is_empty());
    }

    #[test]
    fn ignored_names_only_apply_to_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("dist"), "a file, not a folder").unwrap();

        let scan = collect_files(dir.path(), &["dist".to_string()]);
        assert_eq!(scan.files, vec!["dist".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_directory_is_reported_and_the_walk_continues() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        std::fs::write(locked.join("secret.txt"), "x").unwrap();
        std::fs::write(dir.path().join("good.py"), "ok").unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        // Permission bits do not stop a privileged user
        if std::fs::read_dir(&locked).is_ok() {
            std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let scan = collect_files(dir.path(), &[]);
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(scan.files, vec!["good.py".to_string()]);
        assert_eq!(scan.failures.len(), 1);
        assert_eq!(scan.failures[0]["file"], json!("locked"));
    }
}
