use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use ragctx_context::{ContextBuilder, ContextOptions};
use ragctx_core::chunker::ChunkingConfig;
use ragctx_core::config::{expand_path, Config};
use ragctx_core::types::{ChunkScope, Document, MediaKind};
use ragctx_embed::SharedEmbedder;
use tracing::error;
use walkdir::WalkDir;

const USAGE: &str = "Usage: ragctx [--config FILE] [--top-k N] [--profile documents|general] [--per-document] [--json] <query> <path[=media-type]>...";

#[derive(Debug, Default, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    top_k: Option<usize>,
    profile: Option<String>,
    per_document: bool,
    json: bool,
    query: String,
    inputs: Vec<String>,
}

fn parse_args(raw: Vec<String>) -> anyhow::Result<Args> {
    let mut args = Args::default();
    let mut positional = Vec::new();
    let mut it = raw.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => args.config = Some(expand_path(it.next().ok_or_else(|| anyhow::anyhow!("--config requires a path"))?)),
            "--top-k" => {
                let v = it.next().ok_or_else(|| anyhow::anyhow!("--top-k requires a number"))?;
                args.top_k = Some(v.parse().map_err(|_| anyhow::anyhow!("--top-k requires a number, got '{v}'"))?);
            }
            "--profile" => args.profile = Some(it.next().ok_or_else(|| anyhow::anyhow!("--profile requires a name"))?),
            "--per-document" => args.per_document = true,
            "--json" => args.json = true,
            flag if flag.starts_with("--") => anyhow::bail!("Unknown flag: {flag}"),
            _ => positional.push(arg),
        }
    }
    if positional.len() < 2 {
        anyhow::bail!("{USAGE}");
    }
    args.query = positional.remove(0);
    args.inputs = positional;
    Ok(args)
}

const MEDIA_TOP_LEVEL: &[&str] = &["application", "text", "image", "audio", "video", "font", "model", "multipart", "message"];
const MEDIA_SHORT_FORMS: &[&str] = &["pdf", "docx", "txt", "text", "plain-text"];

fn looks_like_media_type(s: &str) -> bool {
    let s = s.to_ascii_lowercase();
    if MEDIA_SHORT_FORMS.contains(&s.as_str()) {
        return true;
    }
    match s.split_once('/') {
        Some((top, sub)) => MEDIA_TOP_LEVEL.contains(&top) && !sub.is_empty() && !sub.contains('/'),
        None => false,
    }
}

/// Split a trailing `=media/type`. Anything after the last `=` that is not a
/// media type stays part of the path.
fn split_media_type(input: &str) -> (&str, Option<&str>) {
    match input.rsplit_once('=') {
        Some((path, media)) if looks_like_media_type(media) => (path, Some(media)),
        _ => (input, None),
    }
}

/// `path` or `path=media/type`; directories expand to the supported files inside.
fn collect_documents(inputs: &[String]) -> Vec<Document> {
    let mut docs = Vec::new();
    for input in inputs {
        let (path, media_type) = split_media_type(input);
        let (path, media_type) = (expand_path(path), media_type.map(str::to_string));
        if path.is_dir() {
            docs.extend(list_supported_files(&path).into_iter().map(Document::new));
        } else {
            docs.push(Document { path, media_type });
        }
    }
    docs
}

fn list_supported_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .filter(|p| MediaKind::from_path(p).is_some())
        .collect();
    files.sort();
    files
}

fn resolve_options(config: &Config, args: &Args) -> anyhow::Result<ContextOptions> {
    let mut options = ContextOptions::from_settings(&config.rag_settings()?)?;
    match args.profile.as_deref() {
        Some("documents") => options.chunking = ChunkingConfig::documents(),
        Some("general") => options.chunking = ChunkingConfig::default(),
        Some(other) => anyhow::bail!("Unknown profile '{other}' (expected documents or general)"),
        None => {}
    }
    if let Some(k) = args.top_k {
        if k == 0 { anyhow::bail!("--top-k must be at least 1"); }
        options.top_k = k;
    }
    if args.per_document {
        options.scope = ChunkScope::PerDocument;
    }
    Ok(options)
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        pb.set_style(style);
    }
    pb.set_message("building context");
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ragctx_core::logging::init();
    let args = match parse_args(env::args().skip(1).collect()) {
        Ok(a) => a,
        Err(e) => { eprintln!("{e}"); std::process::exit(1); }
    };
    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };
    let options = resolve_options(&config, &args)?;
    let embedder = SharedEmbedder::from_settings(config.embed_settings()?);
    let builder = ContextBuilder::with_default_extractor(embedder, options);
    let docs = collect_documents(&args.inputs);

    let pb = spinner();
    let result = if args.json {
        let (b, d, q) = (builder.clone(), docs.clone(), args.query.clone());
        tokio::task::spawn_blocking(move || b.retrieve(&d, &q, options.top_k))
            .await?
            .map(|hits| serde_json::to_string_pretty(&hits))
    } else {
        builder.build_context_async(docs, args.query.clone()).await.map(Ok)
    };
    pb.finish_and_clear();

    match result {
        Ok(output) => {
            let output = output?;
            if output.is_empty() || output == "[]" {
                eprintln!("No text could be extracted; no grounding available.");
            }
            println!("{output}");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "context build failed");
            eprintln!("{}", e.user_message());
            std::process::exit(2);
        }
    }
}
