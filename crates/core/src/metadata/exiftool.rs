use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use serde::Deserialize;
use serde_json::Value;

use super::{MetadataFields, MetadataProvider, ProviderFactory};
use crate::error::{Error, Result};

const READY_SENTINEL: &str = "{ready}";

/// Tags requested for every file. Output is keyed by these names.
const REQUESTED_TAGS: &[&str] = &["-FileName", "-MIMEType", "-CreateDate", "-DateTimeOriginal"];

/// A long-running `exiftool -stay_open` process. The process is asked to exit
/// and reaped when this value drops.
pub struct ExifTool {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl ExifTool {
    pub fn spawn(program: &Path) -> Result<Self> {
        let mut child = Command::new(program)
            .args(["-stay_open", "True", "-@", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        match (stdin, stdout) {
            (Some(stdin), Some(stdout)) => Ok(Self {
                child,
                stdin,
                stdout: BufReader::new(stdout),
            }),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                Err(Error::Metadata {
                    path: program.to_path_buf(),
                    message: "exiftool pipes unavailable".to_string(),
                })
            }
        }
    }

    fn request(&mut self, path: &Path) -> Result<String> {
        let mut command = String::from("-json\n");
        for tag in REQUESTED_TAGS {
            command.push_str(tag);
            command.push('\n');
        }
        command.push_str(&path.to_string_lossy());
        command.push_str("\n-execute\n");
        self.stdin.write_all(command.as_bytes())?;
        self.stdin.flush()?;

        let mut output = String::new();
        let mut line = String::new();
        loop {
            line.clear();
            if self.stdout.read_line(&mut line)? == 0 {
                return Err(Error::Metadata {
                    path: path.to_path_buf(),
                    message: "exiftool exited unexpectedly".to_string(),
                });
            }
            if line.trim_end() == READY_SENTINEL {
                return Ok(output);
            }
            output.push_str(&line);
        }
    }
}

impl MetadataProvider for ExifTool {
    fn extract(&mut self, path: &Path) -> Result<MetadataFields> {
        let output = self.request(path)?;
        parse_response(path, &output)
    }
}

impl Drop for ExifTool {
    fn drop(&mut self) {
        let shutdown = self
            .stdin
            .write_all(b"-stay_open\nFalse\n")
            .and_then(|_| self.stdin.flush());
        if shutdown.is_err() {
            let _ = self.child.kill();
        }
        if let Err(e) = self.child.wait() {
            tracing::debug!(error = %e, "failed to reap exiftool");
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawFields {
    #[serde(rename = "FileName", default)]
    file_name: Option<Value>,
    #[serde(rename = "MIMEType", default)]
    mime_type: Option<Value>,
    #[serde(rename = "CreateDate", default)]
    create_date: Option<Value>,
    #[serde(rename = "DateTimeOriginal", default)]
    date_time_original: Option<Value>,
}

/// Only string-valued tags are kept; numbers and structures are dropped.
fn string_field(value: Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    }
}

/// Decode exiftool `-json` output for a single file.
fn parse_response(path: &Path, output: &str) -> Result<MetadataFields> {
    if output.trim().is_empty() {
        return Err(Error::Metadata {
            path: path.to_path_buf(),
            message: "exiftool returned no data".to_string(),
        });
    }
    let mut entries: Vec<RawFields> = serde_json::from_str(output)?;
    let raw = entries.pop().ok_or_else(|| Error::Metadata {
        path: path.to_path_buf(),
        message: "exiftool returned an empty result set".to_string(),
    })?;

    Ok(MetadataFields {
        file_name: string_field(raw.file_name),
        mime_type: string_field(raw.mime_type),
        create_date: string_field(raw.create_date),
        date_time_original: string_field(raw.date_time_original),
    })
}

/// Spawns one exiftool process per scan worker.
#[derive(Debug, Clone)]
pub struct ExifToolFactory {
    program: PathBuf,
}

impl ExifToolFactory {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for ExifToolFactory {
    fn default() -> Self {
        Self::new("exiftool")
    }
}

impl ProviderFactory for ExifToolFactory {
    fn create(&self) -> Result<Box<dyn MetadataProvider>> {
        Ok(Box::new(ExifTool::spawn(&self.program)?))
    }
}
