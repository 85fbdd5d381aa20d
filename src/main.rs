use std::process::ExitCode;

use clap::Parser;
use tokio::io::AsyncWriteExt;

use ftpbox::api::types::{DataResponse, ErrorResponse, ItemResource};
use ftpbox::ftp::TransportError;
use ftpbox::{Api, Config, FtpTransport, ItemSnapshot, Storage, StorageError};

use cli::Action;

/// CLI surface: one subcommand per server action, JSON on stdout.
mod cli {
    use std::path::PathBuf;

    use clap::{Parser, Subcommand};

    #[derive(Parser, Debug)]
    #[command(name = "ftpbox", about = "Browse and manage files on an FTP server")]
    pub struct Args {
        /// JSON config file; FTPBOX_* env vars fill anything it omits
        #[arg(long, global = true)]
        pub config: Option<PathBuf>,

        #[command(subcommand)]
        pub action: Action,
    }

    #[derive(Subcommand, Debug)]
    pub enum Action {
        /// Print the shared client configuration
        Initiate,
        /// Compile the metadata snapshot for one path
        Info { path: String },
        /// List the entries of a directory
        List { path: String },
        /// Recursively search a directory for a name fragment
        Seek { path: String, query: String },
        /// Create a directory named NAME under PATH
        Mkdir { path: String, name: String },
        /// Rename an item within its directory
        Rename { path: String, new_name: String },
        /// Copy an item into a target directory
        Copy { source: String, target: String },
        /// Move an item into a target directory
        Move { source: String, target: String },
        /// Stream a file's bytes to stdout
        Read { path: String },
        /// Fetch an image into a local file
        Image {
            path: String,
            out: PathBuf,
            /// Fetch the conventional thumbnail instead of the original
            #[arg(long)]
            thumbnail: bool,
        },
        /// Download a file into a local file
        Download { path: String, out: PathBuf },
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    env_logger::init();

    let args = cli::Args::parse();
    let config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            log::error!("configuration rejected: {err}");
            return ExitCode::FAILURE;
        }
    };
    log::info!(
        "ftpbox starting (server {}, root {})",
        config.connection.addr(),
        config.root
    );

    let transport = FtpTransport::new(config.connection.clone());
    let api = Api::new(Storage::new(config, transport));

    let outcome = run(&api, args.action).await;
    api.close().await;

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            print_json(&ErrorResponse::from(&err));
            ExitCode::FAILURE
        }
    }
}

async fn run(api: &Api<FtpTransport>, action: Action) -> Result<(), StorageError> {
    match action {
        Action::Initiate => print_json(&DataResponse::new(api.initiate())),
        Action::Info { path } => {
            let snapshot = api.get_info(&path).await?;
            print_json(&DataResponse::new(ItemResource::from(snapshot)));
        }
        Action::List { path } => {
            let entries = api.read_folder(&path).await?;
            print_resources(entries);
        }
        Action::Seek { path, query } => {
            let matches = api.seek_folder(&path, &query).await?;
            print_resources(matches);
        }
        Action::Mkdir { path, name } => {
            let created = api.add_folder(&path, &name).await?;
            print_json(&DataResponse::new(ItemResource::from(created)));
        }
        Action::Rename { path, new_name } => {
            let (old, new) = api.rename(&path, &new_name).await?;
            print_pair(old, new);
        }
        Action::Copy { source, target } => {
            let (old, new) = api.copy(&source, &target).await?;
            print_pair(old, new);
        }
        Action::Move { source, target } => {
            let (old, new) = api.move_item(&source, &target).await?;
            print_pair(old, new);
        }
        Action::Read { path } => {
            let mut stdout = tokio::io::stdout();
            let (_, bytes) = api.read_file(&path, &mut stdout).await?;
            stdout.flush().await.map_err(TransportError::Staging)?;
            log::info!("streamed {bytes} bytes from {path}");
        }
        Action::Image {
            path,
            out,
            thumbnail,
        } => {
            let mut file = tokio::fs::File::create(&out)
                .await
                .map_err(TransportError::Staging)?;
            let (snapshot, bytes) = api.get_image(&path, thumbnail, &mut file).await?;
            file.flush().await.map_err(TransportError::Staging)?;
            log::info!("wrote {bytes} bytes to {}", out.display());
            print_json(&DataResponse::new(ItemResource::from(snapshot)));
        }
        Action::Download { path, out } => {
            let mut file = tokio::fs::File::create(&out)
                .await
                .map_err(TransportError::Staging)?;
            let (snapshot, bytes) = api.download(&path, &mut file).await?;
            file.flush().await.map_err(TransportError::Staging)?;
            log::info!("wrote {bytes} bytes to {}", out.display());
            print_json(&DataResponse::new(ItemResource::from(snapshot)));
        }
    }
    Ok(())
}

fn print_resources(snapshots: Vec<ItemSnapshot>) {
    let resources: Vec<ItemResource> = snapshots.into_iter().map(ItemResource::from).collect();
    print_json(&DataResponse::new(resources));
}

fn print_pair(old: ItemSnapshot, new: ItemSnapshot) {
    print_json(&DataResponse::new(vec![
        ItemResource::from(old),
        ItemResource::from(new),
    ]));
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(body) => println!("{body}"),
        Err(err) => log::error!("response serialization failed: {err}"),
    }
}
