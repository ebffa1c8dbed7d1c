use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;

use crate::app::{HarvestError, Result};

/// External tool that joins ordered segment lists into one container.
#[async_trait]
pub trait Muxer: Send + Sync {
    /// Concatenate the files listed in `video_manifest` (and `audio_manifest`)
    /// and copy the streams into `output`, replacing it if present.
    async fn concat(
        &self,
        video_manifest: &Path,
        audio_manifest: Option<&Path>,
        output: &Path,
    ) -> Result<()>;
}

pub struct FfmpegMuxer {
    binary: PathBuf,
}

impl FfmpegMuxer {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub async fn is_available(&self) -> bool {
        tokio::process::Command::new(&self.binary)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn args(video_manifest: &Path, audio_manifest: Option<&Path>, output: &Path) -> Vec<String> {
        let mut args: Vec<String> = vec!["-y".into(), "-loglevel".into(), "error".into()];
        for manifest in std::iter::once(video_manifest).chain(audio_manifest) {
            args.extend([
                "-f".into(),
                "concat".into(),
                "-safe".into(),
                "0".into(),
                "-i".into(),
                manifest.to_string_lossy().into_owned(),
            ]);
        }
        args.extend(["-c".into(), "copy".into()]);
        args.push(output.to_string_lossy().into_owned());
        args
    }
}

#[async_trait]
impl Muxer for FfmpegMuxer {
    async fn concat(
        &self,
        video_manifest: &Path,
        audio_manifest: Option<&Path>,
        output: &Path,
    ) -> Result<()> {
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let result = tokio::process::Command::new(&self.binary)
            .args(Self::args(video_manifest, audio_manifest, output))
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                HarvestError::Muxer(format!("Failed to run {}: {}", self.binary.display(), e))
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(HarvestError::Muxer(format!(
                "{} exited with {}: {}",
                self.binary.display(),
                result.status,
                stderr.trim()
            )));
        }

        Ok(())
    }
}

/// Concat-demuxer manifest listing `files` in order, relative to the manifest's directory.
pub fn concat_manifest<'a>(files: impl IntoIterator<Item = &'a str>) -> String {
    files
        .into_iter()
        .map(|f| format!("file '{}'\n", f.replace('\'', "'\\''")))
        .collect()
}
