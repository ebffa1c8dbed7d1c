pub mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{Config, ConfigError};

#[derive(Parser)]
#[command(name = "harvester")]
#[command(about = "Archive posts, images and videos from a profile timeline", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/harvester/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Archive root, overrides `harvest.output_dir`
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Show the browser window (needed to log in on first use)
    #[arg(long, global = true)]
    pub headed: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Discover a profile's posts and archive them
    Profile {
        /// Profile URL, e.g. https://x.com/rustlang
        url: String,

        #[command(flatten)]
        limits: Limits,

        /// Do not save simple posts during discovery; every post goes through full extraction
        #[arg(long)]
        no_download: bool,

        /// Write placeholders instead of rebuilding videos
        #[arg(long)]
        no_video: bool,

        /// Seconds to wait between processed posts
        #[arg(long)]
        pacing: Option<u64>,
    },
    /// Print a profile's post links without saving anything
    Links {
        /// Profile URL
        url: String,

        #[command(flatten)]
        limits: Limits,
    },
    /// Archive individual posts
    Post {
        /// Post URLs (https://x.com/<author>/status/<id>)
        #[arg(required = true)]
        urls: Vec<String>,

        /// Write placeholders instead of rebuilding videos
        #[arg(long)]
        no_video: bool,
    },
}

#[derive(Args, Debug, Clone, Copy, Default)]
pub struct Limits {
    /// Stop after scanning this many posts (0 = unlimited)
    #[arg(long)]
    pub max_posts: Option<usize>,

    /// Return at most this many links (0 = unlimited)
    #[arg(long)]
    pub max_links: Option<usize>,
}

impl Cli {
    /// Load the config file and apply command-line overrides.
    pub fn resolve_config(&self) -> Result<Config, ConfigError> {
        let mut config = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };

        if let Some(output) = &self.output {
            config.harvest.output_dir = output.clone();
        }
        if self.headed {
            config.scraper.headless = false;
        }

        match &self.command {
            Commands::Profile {
                limits,
                no_download,
                no_video,
                pacing,
                ..
            } => {
                limits.apply(&mut config);
                config.harvest.download &= !no_download;
                config.video.enabled &= !no_video;
                if let Some(secs) = pacing {
                    config.harvest.pacing_secs = *secs;
                }
            }
            Commands::Links { limits, .. } => {
                limits.apply(&mut config);
                config.harvest.download = false;
            }
            Commands::Post { no_video, .. } => {
                config.video.enabled &= !no_video;
            }
        }

        Ok(config)
    }
}

impl Limits {
    fn apply(&self, config: &mut Config) {
        if let Some(n) = self.max_posts {
            config.harvest.max_posts = n;
        }
        if let Some(n) = self.max_links {
            config.harvest.max_links = n;
        }
    }
}
