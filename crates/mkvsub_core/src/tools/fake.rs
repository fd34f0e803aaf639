//! Scripted runners for tests.
//!
//! [`FakeRunner`] records every invocation and answers through per-program
//! handlers. [`FakeMkvToolnix`] installs handlers that behave like
//! `mkvmerge` and `mkvextract` over an in-memory set of containers.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;

use super::{CommandRunner, ToolOutput, ToolResult};
use crate::models::{Attachment, ContainerMetadata, Track, TrackType, ASS_CODEC};

type Handler = Box<dyn Fn(&[String]) -> ToolOutput + Send + Sync>;

/// One recorded invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Call {
    pub program: String,
    pub args: Vec<String>,
}

/// Runner answering from registered handlers; unknown programs succeed
/// with empty output.
#[derive(Default)]
pub(crate) struct FakeRunner {
    handlers: Mutex<HashMap<String, Handler>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer calls to `program` with `handler`.
    pub fn on(
        &self,
        program: &str,
        handler: impl Fn(&[String]) -> ToolOutput + Send + Sync + 'static,
    ) {
        self.handlers
            .lock()
            .insert(program.to_string(), Box::new(handler));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn calls_to(&self, program: &str) -> Vec<Call> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.program == program)
            .cloned()
            .collect()
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, program: &str, args: &[String]) -> ToolResult<ToolOutput> {
        self.calls.lock().push(Call {
            program: program.to_string(),
            args: args.to_vec(),
        });

        let handlers = self.handlers.lock();
        Ok(match handlers.get(program) {
            Some(handler) => handler(args),
            None => ToolOutput::ok(""),
        })
    }
}

#[derive(Debug, Clone, Default)]
struct FakeContainer {
    metadata: ContainerMetadata,
    /// Attachment payloads by attachment id.
    attachments: HashMap<u32, Vec<u8>>,
    /// Track payloads by track id.
    tracks: HashMap<u32, Vec<u8>>,
}

/// In-memory mkvtoolnix.
#[derive(Clone, Default)]
pub(crate) struct FakeMkvToolnix {
    containers: Arc<Mutex<HashMap<PathBuf, FakeContainer>>>,
}

impl FakeMkvToolnix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a container and create a placeholder file for it on disk.
    ///
    /// `payloads` holds `(id, bytes)` for attachments first, then tracks,
    /// told apart by looking the id up in the metadata.
    pub fn add(&self, path: &Path, metadata: ContainerMetadata, payloads: &[(u32, &[u8])]) {
        let mut container = FakeContainer {
            metadata,
            ..Default::default()
        };
        for (id, bytes) in payloads {
            if container.metadata.attachments.iter().any(|a| a.id == *id) {
                container.attachments.insert(*id, bytes.to_vec());
            } else {
                container.tracks.insert(*id, bytes.to_vec());
            }
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"MKV").unwrap();
        self.containers.lock().insert(path.to_path_buf(), container);
    }

    /// Current metadata of a container, if known.
    pub fn metadata(&self, path: &Path) -> Option<ContainerMetadata> {
        self.containers.lock().get(path).map(|c| c.metadata.clone())
    }

    /// Route `mkvmerge` and `mkvextract` calls on `runner` to this fake.
    pub fn install(&self, runner: &FakeRunner) {
        let merge = self.clone();
        runner.on("mkvmerge", move |args| merge.mkvmerge(args));
        let extract = self.clone();
        runner.on("mkvextract", move |args| extract.mkvextract(args));
    }

    fn mkvmerge(&self, args: &[String]) -> ToolOutput {
        match args.first().map(String::as_str) {
            Some("-J") => self.identify(Path::new(&args[1])),
            Some("--output") => self.merge(args),
            _ => ToolOutput::failed(2, "Error: unsupported arguments"),
        }
    }

    fn identify(&self, path: &Path) -> ToolOutput {
        let containers = self.containers.lock();
        let Some(container) = containers.get(path) else {
            return ToolOutput::failed(2, "Error: The file could not be opened for reading");
        };

        let attachments: Vec<_> = container
            .metadata
            .attachments
            .iter()
            .map(|a| {
                json!({
                    "id": a.id,
                    "file_name": a.file_name,
                    "size": a.size,
                    "content_type": a.content_type,
                })
            })
            .collect();
        let tracks: Vec<_> = container
            .metadata
            .tracks
            .iter()
            .map(|t| {
                json!({
                    "id": t.id,
                    "type": t.track_type.to_string(),
                    "codec": t.codec,
                    "properties": {
                        "language": t.language,
                        "track_name": t.track_name,
                    },
                })
            })
            .collect();

        let doc = json!({
            "attachments": attachments,
            "container": { "type": "Matroska", "recognized": true },
            "tracks": tracks,
        });
        ToolOutput::ok(doc.to_string())
    }

    fn merge(&self, args: &[String]) -> ToolOutput {
        let output = PathBuf::from(&args[1]);
        let mut rest = args[2..].iter();
        let mut clean = false;
        let mut source: Option<PathBuf> = None;

        for arg in rest.by_ref() {
            match arg.as_str() {
                "--no-subtitles" | "--no-attachments" => clean = true,
                _ => {
                    source = Some(PathBuf::from(arg));
                    break;
                }
            }
        }
        let Some(source) = source else {
            return ToolOutput::failed(2, "Error: no source file");
        };

        let mut containers = self.containers.lock();
        let Some(original) = containers.get(&source) else {
            return ToolOutput::failed(2, "Error: The file could not be opened for reading");
        };

        let mut built = original.clone();
        if clean {
            built
                .metadata
                .tracks
                .retain(|t| t.track_type != TrackType::Subtitles);
            built.metadata.attachments.clear();
            built.attachments.clear();
        }

        let mut language = String::new();
        let mut name = String::new();
        while let Some(arg) = rest.next() {
            match arg.as_str() {
                "--attach-file" => {
                    let Some(file) = rest.next() else {
                        return ToolOutput::failed(2, "Error: --attach-file needs a file");
                    };
                    let Ok(bytes) = fs::read(file) else {
                        return ToolOutput::failed(2, format!("Error: cannot read {}", file));
                    };
                    let path = Path::new(file);
                    let id = built
                        .metadata
                        .attachments
                        .iter()
                        .map(|a| a.id)
                        .max()
                        .unwrap_or(0)
                        + 1;
                    let file_name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    built.metadata.attachments.push(
                        Attachment::new(id, file_name, content_type_for(path))
                            .with_size(bytes.len() as u64),
                    );
                    built.attachments.insert(id, bytes);
                }
                "--language" => {
                    language = rest
                        .next()
                        .and_then(|v| v.strip_prefix("0:"))
                        .unwrap_or_default()
                        .to_string();
                }
                "--track-name" => {
                    name = rest
                        .next()
                        .and_then(|v| v.strip_prefix("0:"))
                        .unwrap_or_default()
                        .to_string();
                }
                track_file => {
                    let Ok(bytes) = fs::read(track_file) else {
                        return ToolOutput::failed(2, format!("Error: cannot read {}", track_file));
                    };
                    let id = built.metadata.tracks.len() as u32;
                    let codec = if track_file.ends_with(".ass") {
                        ASS_CODEC
                    } else {
                        "VobSub"
                    };
                    built.metadata.tracks.push(
                        Track::new(id, TrackType::Subtitles, codec)
                            .with_language(std::mem::take(&mut language))
                            .with_name(std::mem::take(&mut name)),
                    );
                    built.tracks.insert(id, bytes);
                }
            }
        }

        if let Some(parent) = output.parent() {
            if fs::create_dir_all(parent).is_err() {
                return ToolOutput::failed(2, "Error: cannot create output directory");
            }
        }
        if fs::write(&output, b"MKV").is_err() {
            return ToolOutput::failed(2, "Error: cannot write output");
        }
        containers.insert(output, built);
        ToolOutput::ok("Multiplexing took 0 seconds.")
    }

    fn mkvextract(&self, args: &[String]) -> ToolOutput {
        let containers = self.containers.lock();
        let Some(container) = args.first().and_then(|f| containers.get(Path::new(f))) else {
            return ToolOutput::failed(2, "Error: The file could not be opened for reading");
        };

        let mut mode = "";
        for arg in &args[1..] {
            if arg == "attachments" || arg == "tracks" {
                mode = arg.as_str();
                continue;
            }
            let Some((id, path)) = arg.split_once(':') else {
                return ToolOutput::failed(2, format!("Error: bad spec {}", arg));
            };
            let Ok(id) = id.parse::<u32>() else {
                return ToolOutput::failed(2, format!("Error: bad id {}", arg));
            };
            let payload = if mode == "attachments" {
                container.attachments.get(&id)
            } else {
                container.tracks.get(&id)
            };
            let Some(payload) = payload else {
                return ToolOutput::failed(2, format!("Error: no {} with id {}", mode, id));
            };
            if fs::write(path, payload).is_err() {
                return ToolOutput::failed(2, format!("Error: cannot write {}", path));
            }
        }

        ToolOutput::ok("Progress: 100%")
    }
}

fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .as_deref()
    {
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",
        Some("ttc") => "font/collection",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_calls_and_defaults_to_success() {
        let runner = FakeRunner::new();
        let out = runner.run("anything", &["a".to_string()]).unwrap();
        assert!(out.success());
        assert_eq!(runner.calls_to("anything").len(), 1);
    }

    #[test]
    fn identify_unknown_file_fails() {
        let runner = FakeRunner::new();
        FakeMkvToolnix::new().install(&runner);
        let out = runner
            .run("mkvmerge", &["-J".to_string(), "/nope.mkv".to_string()])
            .unwrap();
        assert_eq!(out.exit_code, 2);
    }
}
