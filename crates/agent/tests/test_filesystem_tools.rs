//! Tests for file system tools

use stepwise_agent::tools::{
    CreateDirectoryTool, ListFilesTool, ReadFileTool, ToolError, ToolTrait, Workspace,
    WriteFileTool,
};
use std::fs;
use tempfile::TempDir;

fn ws(temp: &TempDir) -> Workspace {
    Workspace::unrestricted(temp.path())
}

#[tokio::test]
async fn test_read_file() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("test.txt"), "Hello, World!").unwrap();

    let tool = ReadFileTool::new(ws(&temp));
    assert_eq!(tool.execute("test.txt").await.unwrap(), "Hello, World!");
}

#[tokio::test]
async fn test_read_file_absolute_path() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("abs.txt");
    fs::write(&file, "absolute").unwrap();

    let tool = ReadFileTool::new(Workspace::unrestricted("/"));
    assert_eq!(
        tool.execute(file.to_str().unwrap()).await.unwrap(),
        "absolute"
    );
}

#[tokio::test]
async fn test_read_empty_file() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("empty.txt"), "").unwrap();

    let tool = ReadFileTool::new(ws(&temp));
    assert_eq!(tool.execute("empty.txt").await.unwrap(), "(Empty file)");
}

#[tokio::test]
async fn test_read_missing_file() {
    let temp = TempDir::new().unwrap();
    let tool = ReadFileTool::new(ws(&temp));

    let err = tool.execute("missing.txt").await.unwrap_err();
    assert_eq!(err.to_string(), "File 'missing.txt' does not exist");
}

#[tokio::test]
async fn test_read_directory_is_not_a_file() {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join("src")).unwrap();

    let tool = ReadFileTool::new(ws(&temp));
    let err = tool.execute("src").await.unwrap_err();
    assert!(matches!(err, ToolError::NotAFile(_)));
}

#[tokio::test]
async fn test_write_file_scenario() {
    let temp = TempDir::new().unwrap();
    let tool = WriteFileTool::new(ws(&temp));

    let result = tool.execute("out.txt|||hello").await.unwrap();
    assert_eq!(result, "Successfully wrote 5 characters to 'out.txt'");
    assert_eq!(
        fs::read_to_string(temp.path().join("out.txt")).unwrap(),
        "hello"
    );
}

#[tokio::test]
async fn test_write_file_counts_characters_not_bytes() {
    let temp = TempDir::new().unwrap();
    let tool = WriteFileTool::new(ws(&temp));

    let result = tool.execute("utf8.txt|||héllo").await.unwrap();
    assert_eq!(result, "Successfully wrote 5 characters to 'utf8.txt'");
}

#[tokio::test]
async fn test_write_file_creates_parents_and_overwrites() {
    let temp = TempDir::new().unwrap();
    let tool = WriteFileTool::new(ws(&temp));

    tool.execute("site/css/style.css|||body {}").await.unwrap();
    tool.execute("site/css/style.css|||p {}").await.unwrap();

    assert_eq!(
        fs::read_to_string(temp.path().join("site/css/style.css")).unwrap(),
        "p {}"
    );
}

#[tokio::test]
async fn test_write_file_keeps_later_delimiters_in_content() {
    let temp = TempDir::new().unwrap();
    let tool = WriteFileTool::new(ws(&temp));

    tool.execute("pipes.txt|||a|||b").await.unwrap();
    assert_eq!(
        fs::read_to_string(temp.path().join("pipes.txt")).unwrap(),
        "a|||b"
    );
}

#[tokio::test]
async fn test_write_file_without_delimiter() {
    let temp = TempDir::new().unwrap();
    let tool = WriteFileTool::new(ws(&temp));

    let err = tool.execute("out.txt").await.unwrap_err();
    assert!(matches!(err, ToolError::InvalidInput(_)));
    assert!(!temp.path().join("out.txt").exists());
}

#[tokio::test]
async fn test_create_directory() {
    let temp = TempDir::new().unwrap();
    let tool = CreateDirectoryTool::new(ws(&temp));

    let result = tool.execute("bakery-website/assets").await.unwrap();
    assert_eq!(
        result,
        "Successfully created directory 'bakery-website/assets'"
    );
    assert!(temp.path().join("bakery-website/assets").is_dir());

    let again = tool.execute("bakery-website").await.unwrap();
    assert_eq!(again, "Directory 'bakery-website' already exists");
}

#[tokio::test]
async fn test_create_directory_over_file() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("taken"), "x").unwrap();

    let tool = CreateDirectoryTool::new(ws(&temp));
    let err = tool.execute("taken").await.unwrap_err();
    assert!(err.to_string().contains("exists but is not a directory"));
}

#[tokio::test]
async fn test_list_files_scenario() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("tools.py"), "t".repeat(5124)).unwrap();
    fs::write(temp.path().join("main.py"), "m".repeat(4818)).unwrap();

    let tool = ListFilesTool::new(ws(&temp));
    let result = tool.execute(".").await.unwrap();
    assert_eq!(
        result,
        "[FILE] main.py (4818 bytes)\n[FILE] tools.py (5124 bytes)"
    );
}

#[tokio::test]
async fn test_list_files_marks_directories_and_defaults_to_root() {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join("src")).unwrap();
    fs::write(temp.path().join("README.md"), "abc").unwrap();

    let tool = ListFilesTool::new(ws(&temp));
    let result = tool.execute("").await.unwrap();
    assert_eq!(result, "[FILE] README.md (3 bytes)\n[DIR]  src/");
}

#[tokio::test]
async fn test_list_files_empty_and_missing() {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join("empty")).unwrap();

    let tool = ListFilesTool::new(ws(&temp));
    assert_eq!(
        tool.execute("empty").await.unwrap(),
        "Directory 'empty' is empty"
    );

    let err = tool.execute("nowhere").await.unwrap_err();
    assert_eq!(err.to_string(), "Directory 'nowhere' does not exist");
}

#[tokio::test]
async fn test_list_files_on_a_file() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("f.txt"), "x").unwrap();

    let tool = ListFilesTool::new(ws(&temp));
    let err = tool.execute("f.txt").await.unwrap_err();
    assert!(matches!(err, ToolError::NotADirectory(_)));
}
