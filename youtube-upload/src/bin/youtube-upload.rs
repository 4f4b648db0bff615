use clap::{Args, Parser, Subcommand};
use eyre::{Context, OptionExt};
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use youtube_upload::{
    AccessControl, ClientConfig, Credentials, Permission, UploadClient, UploadOptions,
};

#[derive(Parser, Debug)]
#[command(name = "youtube-upload")]
#[command(about = "Upload, update and delete videos through the legacy YouTube API")]
struct Cli {
    /// JSON file with the client configuration
    #[arg(long, default_value = "youtube-upload.json")]
    config: PathBuf,

    /// Account name (overrides the config file)
    #[arg(long)]
    username: Option<String>,

    /// Log in with this password (overrides the config file)
    #[arg(long, conflicts_with = "bearer")]
    password: Option<String>,

    /// Use this OAuth access token instead of logging in
    #[arg(long)]
    bearer: Option<String>,

    /// Developer key (overrides the config file)
    #[arg(long)]
    developer_key: Option<String>,

    /// Log request headers and response bodies
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a video file and print its new ID
    Upload {
        file: PathBuf,
        #[command(flatten)]
        metadata: MetadataArgs,
    },
    /// Replace the metadata of an uploaded video
    Update {
        video_id: String,
        #[command(flatten)]
        metadata: MetadataArgs,
    },
    /// Delete an uploaded video
    Delete { video_id: String },
    /// Get a token for uploading from a browser form
    Token {
        /// Where the browser goes after the upload
        #[arg(long)]
        next_url: String,
        #[command(flatten)]
        metadata: MetadataArgs,
    },
}

#[derive(Args, Debug)]
struct MetadataArgs {
    #[arg(long, default_value = "")]
    title: String,
    #[arg(long, default_value = "")]
    description: String,
    #[arg(long, default_value = "")]
    category: String,
    /// Comma-separated keywords
    #[arg(long, value_delimiter = ',')]
    keywords: Vec<String>,
    #[arg(long)]
    private: bool,
    #[arg(long, default_value = youtube_upload::metadata::DEFAULT_MIME_TYPE)]
    mime_type: String,
    /// Name sent to the provider for the upload (random when unset)
    #[arg(long)]
    filename: Option<String>,
    #[arg(long, value_name = "PERMISSION")]
    rate: Option<Permission>,
    #[arg(long, value_name = "PERMISSION")]
    comment: Option<Permission>,
    #[arg(long, value_name = "PERMISSION")]
    comment_vote: Option<Permission>,
    #[arg(long, value_name = "PERMISSION")]
    video_respond: Option<Permission>,
    #[arg(long, value_name = "PERMISSION")]
    embed: Option<Permission>,
    #[arg(long, value_name = "PERMISSION")]
    syndicate: Option<Permission>,
}

impl MetadataArgs {
    fn into_options(self) -> UploadOptions {
        let mut options = UploadOptions::new()
            .title(self.title)
            .description(self.description)
            .category(self.category)
            .keywords(self.keywords)
            .private(self.private)
            .mime_type(self.mime_type)
            .access(AccessControl {
                rate: self.rate,
                comment: self.comment,
                comment_vote: self.comment_vote,
                video_respond: self.video_respond,
                embed: self.embed,
                syndicate: self.syndicate,
            });
        if let Some(filename) = self.filename {
            options = options.filename(filename);
        }
        options
    }
}

/// Reads the config file (if any) and applies command-line overrides on top.
fn load_config(cli: &Cli) -> eyre::Result<ClientConfig> {
    let from_flags = match (&cli.password, &cli.bearer) {
        (Some(password), _) => Some(Credentials::Password(password.clone())),
        (None, Some(token)) => Some(Credentials::Bearer(token.clone())),
        (None, None) => None,
    };

    let mut config = if cli.config.exists() {
        let raw = std::fs::read_to_string(&cli.config)
            .with_context(|| format!("read {}", cli.config.display()))?;
        serde_json::from_str::<ClientConfig>(&raw)
            .with_context(|| format!("parse {}", cli.config.display()))?
    } else {
        let username = cli
            .username
            .clone()
            .ok_or_eyre("no config file found and no --username given")?;
        let credentials = from_flags
            .clone()
            .ok_or_eyre("no config file found and neither --password nor --bearer given")?;
        let developer_key = cli
            .developer_key
            .clone()
            .ok_or_eyre("no config file found and no --developer-key given")?;
        ClientConfig::new(username, credentials, developer_key)
    };

    if let Some(username) = &cli.username {
        config.username = username.clone();
    }
    if let Some(credentials) = from_flags {
        config.credentials = credentials;
    }
    if let Some(developer_key) = &cli.developer_key {
        config.developer_key = developer_key.clone();
    }
    config.debug |= cli.debug;
    Ok(config)
}

fn main() -> eyre::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let default_level = if config.debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .init();

    let client = UploadClient::new(config).context("set up upload client")?;

    match cli.command {
        Command::Upload { file, metadata } => {
            let video = std::fs::File::open(&file)
                .with_context(|| format!("open {}", file.display()))?;
            let mut options = metadata.into_options();
            if options.filename.is_none()
                && let Some(name) = file.file_name().and_then(|n| n.to_str())
            {
                options = options.filename(name);
            }

            tracing::info!(file = %file.display(), title = options.title, "uploading");
            let id = client
                .upload(video, &options)
                .with_context(|| format!("upload {}", file.display()))?;
            println!("{id}");
        }
        Command::Update { video_id, metadata } => {
            let record = client
                .update(&video_id, &metadata.into_options())
                .with_context(|| format!("update video {video_id}"))?;
            match record.title {
                Some(title) => println!("{}\t{title}", record.id),
                None => println!("{}", record.id),
            }
        }
        Command::Delete { video_id } => {
            client
                .delete(&video_id)
                .with_context(|| format!("delete video {video_id}"))?;
            tracing::info!(video_id, "deleted");
        }
        Command::Token { next_url, metadata } => {
            let token = client
                .get_upload_token(&metadata.into_options(), &next_url)
                .context("request browser upload token")?;
            println!("url:   {}", token.url);
            println!("token: {}", token.token);
        }
    }

    Ok(())
}
