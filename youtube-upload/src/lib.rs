//! Client for the legacy (GData, Atom-based) YouTube upload API.
//!
//! The interesting part is the upload body: a `multipart/related` document
//! made of a small Atom entry describing the video followed by the raw video
//! bytes. [`chain::ChainedStream`] presents those pieces as one reader with an
//! exact length, so a video file is streamed straight from disk into a
//! fixed-length request.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use youtube_upload::{ClientConfig, Credentials, UploadClient, UploadOptions};
//!
//! # fn example() -> youtube_upload::Result<()> {
//! let config = ClientConfig::new("someone", Credentials::Password("secret".into()), "dev-key");
//! let client = UploadClient::new(config)?;
//!
//! let video = std::fs::File::open("holiday.mp4")?;
//! let options = UploadOptions::new()
//!     .title("Holiday")
//!     .description("Two weeks in one minute")
//!     .category("Travel")
//!     .keywords(["beach", "timelapse"]);
//! let id = client.upload(video, &options)?;
//! println!("uploaded as {id}");
//! # Ok(())
//! # }
//! ```

mod auth;
pub mod chain;
pub mod client;
pub mod config;
pub mod error;
pub mod metadata;
#[cfg(test)]
mod mock;
pub mod multipart;
pub mod response;

pub use chain::{ChainedStream, Segment};
pub use client::UploadClient;
pub use config::{ClientConfig, Credentials};
pub use error::{Error, Result};
pub use metadata::{AccessControl, Permission, UploadOptions};
pub use response::{UploadToken, VideoRecord};
