//! Whisper model catalog, local cache lookup and download.

use anyhow::{bail, Context, Result};
use futures_util::{Stream, StreamExt};
use log::info;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const HUGGINGFACE_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/";

/// Validates that a model filename is safe (no path traversal).
///
/// Rejects filenames containing path separators or `..` sequences.
fn sanitize_model_filename(filename: &str) -> Result<()> {
    if filename.is_empty() {
        bail!("Model filename must not be empty");
    }
    if filename.contains('/')
        || filename.contains('\\')
        || filename.contains("..")
        || filename.contains('\0')
    {
        bail!("Invalid model filename: {}", filename);
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelInfo {
    /// Size tag used on the command line, e.g. "base"
    pub tag: &'static str,
    pub filename: &'static str,
    pub size_bytes: u64,
    pub sha256: &'static str,
}

impl ModelInfo {
    pub fn url(&self) -> String {
        format!("{}{}", HUGGINGFACE_BASE_URL, self.filename)
    }

    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(self.filename)
    }
}

/// Where a model comes from after resolving the user's model name.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedModel {
    /// A file that already exists on disk
    Local(PathBuf),
    /// A catalog entry that may still need downloading
    Catalog(ModelInfo),
}

pub fn get_available_models() -> Vec<ModelInfo> {
    vec![
        // Full precision models
        ModelInfo {
            tag: "tiny",
            filename: "ggml-tiny.bin",
            size_bytes: 77_691_713,
            sha256: "be07e048e1e599ad46341c8d2a135645097a538221678b7acdd1b1919c6e1b21",
        },
        ModelInfo {
            tag: "base",
            filename: "ggml-base.bin",
            size_bytes: 147_951_465,
            sha256: "60ed5bc3dd14eea856493d334349b405782ddcaf0028d4b5df4088345fba2efe",
        },
        ModelInfo {
            tag: "small",
            filename: "ggml-small.bin",
            size_bytes: 487_601_967,
            sha256: "1be3a9b2063867b937e64e2ec7483364a79917e157fa98c5d94b5c1fffea987b",
        },
        ModelInfo {
            tag: "medium",
            filename: "ggml-medium.bin",
            size_bytes: 1_533_763_059,
            sha256: "6c14d5adee5f86394037b4e4e8b59f1673b6cee10e3cf0b11bbdbee79c156208",
        },
        ModelInfo {
            tag: "large-v3",
            filename: "ggml-large-v3.bin",
            size_bytes: 3_095_033_483,
            sha256: "64d182b440b98d5203c4f9bd541544d84c605196c4f7b845dfa11fb23594d1e2",
        },
        // Quantized models
        ModelInfo {
            tag: "tiny-q5_1",
            filename: "ggml-tiny-q5_1.bin",
            size_bytes: 32_152_673,
            sha256: "818710568da3ca15689e31a743197b520007872ff9576237bda97bd1b469c3d7",
        },
        ModelInfo {
            tag: "base-q5_1",
            filename: "ggml-base-q5_1.bin",
            size_bytes: 59_707_625,
            sha256: "422f1ae452ade6f30a004d7e5c6a43195e4433bc370bf23fac9cc591f01a8898",
        },
        ModelInfo {
            tag: "base-q8_0",
            filename: "ggml-base-q8_0.bin",
            size_bytes: 81_768_585,
            sha256: "c577b9a86e7e048a0b7eada054f4dd79a56bbfa911fbdacf900ac5b567cbb7d9",
        },
        ModelInfo {
            tag: "small-q5_1",
            filename: "ggml-small-q5_1.bin",
            size_bytes: 190_085_487,
            sha256: "ae85e4a935d7a567bd102fe55afc16bb595bdb618e11b2fc7591bc08120411bb",
        },
        ModelInfo {
            tag: "small-q8_0",
            filename: "ggml-small-q8_0.bin",
            size_bytes: 264_464_607,
            sha256: "49c8fb02b65e6049d5fa6c04f81f53b867b5ec9540406812c643f177317f779f",
        },
        ModelInfo {
            tag: "medium-q5_0",
            filename: "ggml-medium-q5_0.bin",
            size_bytes: 539_212_467,
            sha256: "19fea4b380c3a618ec4723c3eef2eb785ffba0d0538cf43f8f235e7b3b34220f",
        },
    ]
}

/// Look up a catalog entry by size tag or filename.
pub fn find_model(name: &str) -> Option<ModelInfo> {
    let name = name.trim().to_ascii_lowercase();
    let name = match name.as_str() {
        "large" => "large-v3".to_string(),
        _ => name,
    };

    get_available_models()
        .into_iter()
        .find(|m| m.tag == name || m.filename == name)
}

/// Resolve a model name from the CLI or config.
///
/// Accepts a path to an existing file, a catalog size tag, a catalog
/// filename, or any other filename already present in `models_dir`.
pub fn resolve_model(name: &str, models_dir: &Path) -> Result<ResolvedModel> {
    let as_path = Path::new(name);
    if as_path.is_file() {
        return Ok(ResolvedModel::Local(as_path.to_path_buf()));
    }

    if let Some(info) = find_model(name) {
        return Ok(ResolvedModel::Catalog(info));
    }

    if sanitize_model_filename(name).is_ok() {
        let in_models_dir = models_dir.join(name);
        if in_models_dir.is_file() {
            return Ok(ResolvedModel::Local(in_models_dir));
        }
    }

    let tags: Vec<&str> = get_available_models().iter().map(|m| m.tag).collect();
    bail!(
        "Model not found: {}. Known models: {}",
        name,
        tags.join(", ")
    );
}

/// Return the on-disk path of a resolved model, downloading it if needed.
pub fn ensure_model(model: &ResolvedModel, models_dir: &Path) -> Result<PathBuf> {
    match model {
        ResolvedModel::Local(path) => Ok(path.clone()),
        ResolvedModel::Catalog(info) => {
            let path = info.path_in(models_dir);
            if path.exists() {
                return Ok(path);
            }

            info!(
                "Model {} not cached, downloading {} ({})",
                info.tag,
                info.filename,
                format_size(info.size_bytes)
            );
            let runtime = tokio::runtime::Runtime::new()
                .context("Failed to start download runtime")?;
            runtime.block_on(download_model(info, models_dir))
        }
    }
}

pub fn is_model_downloaded(filename: &str, models_dir: &Path) -> bool {
    if sanitize_model_filename(filename).is_err() {
        return false;
    }
    models_dir.join(filename).exists()
}

fn verify_checksum(path: &Path, expected: &str) -> Result<()> {
    let mut file = fs::File::open(path)
        .with_context(|| format!("Failed to open file for verification: {}", path.display()))?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher).context("Failed to compute checksum")?;
    let hash = format!("{:x}", hasher.finalize());
    if hash != expected {
        bail!(
            "Checksum mismatch for {}: expected {}, got {}",
            path.display(),
            expected,
            hash
        );
    }
    Ok(())
}

/// Download a catalog model with checksum verification and atomic rename
/// from temp to final path.
pub async fn download_model(info: &ModelInfo, dir: &Path) -> Result<PathBuf> {
    sanitize_model_filename(info.filename)?;

    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    let url = info.url();
    let temp_path = dir.join(format!("{}.downloading", info.filename));
    let final_path = info.path_in(dir);

    let response = reqwest::Client::new()
        .get(&url)
        .send()
        .await
        .with_context(|| format!("Failed to connect: {}", url))?;

    if !response.status().is_success() {
        bail!("Failed to download {}: HTTP {}", info.filename, response.status());
    }

    save_stream(response.bytes_stream(), &temp_path).await?;

    let finished = verify_checksum(&temp_path, info.sha256).and_then(|()| {
        fs::rename(&temp_path, &final_path).with_context(|| {
            format!(
                "Failed to rename {} -> {}",
                temp_path.display(),
                final_path.display()
            )
        })
    });
    if let Err(e) = finished {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    info!("Model saved to {}", final_path.display());
    Ok(final_path)
}

/// Write a byte stream to `path`; the file is removed if anything fails.
async fn save_stream<S, B, E>(mut stream: S, path: &Path) -> Result<()>
where
    S: Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: std::error::Error + Send + Sync + 'static,
{
    let result = async {
        let mut file = fs::File::create(path)
            .with_context(|| format!("Failed to create file: {}", path.display()))?;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("Download interrupted")?;
            file.write_all(chunk.as_ref())
                .context("Failed to write model data")?;
        }

        file.flush().context("Failed to write model data")?;
        Ok::<_, anyhow::Error>(())
    }
    .await;

    if result.is_err() {
        let _ = fs::remove_file(path);
    }
    result
}

pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{} MB", bytes / MB)
    } else if bytes >= KB {
        format!("{} KB", bytes / KB)
    } else {
        format!("{} B", bytes)
    }
}
