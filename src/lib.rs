//! # zipvfs
//!
//! Random-access ZIP reader with a filesystem-like API.
//!
//! An archive's central directory is indexed once when it is opened; after
//! that, reads, existence checks, stat queries and directory listings are
//! answered from the index plus positioned reads against a single shared
//! descriptor. Paths the archive doesn't know fall through to the host
//! filesystem, so call sites can't tell in-archive from on-disk resolution
//! without inspecting the result.
//!
//! ## Features
//!
//! - Blocking and async forms of every read operation
//! - Support for STORED (uncompressed) and DEFLATE compression methods
//! - Directory entries reachable with or without their trailing `/`
//! - [`ZipFs`]: a facade taking host paths such as `/srv/mods.zip/lib/a.js`,
//!   backed by a caller-owned [`ArchiveRegistry`]
//! - [`Resolver`]: module entry lookup through `package.json` `main`
//!   fields, extensions and `index` files
//!
//! ## Example
//!
//! ```no_run
//! use zipvfs::ZipArchive;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let archive = ZipArchive::open("bundle.zip").await?;
//!
//!     for name in archive.readdir("lib").await? {
//!         println!("{}", name);
//!     }
//!
//!     let text = archive.read_to_string("lib/index.js").await?;
//!     println!("{}", text);
//!
//!     archive.close()?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod io;
pub mod path;
pub mod resolve;
pub mod vfs;
pub mod zip;

pub use cli::Cli;
pub use error::{ZipFsError, ZipFsResult};
pub use io::{LocalFileReader, ReadAt};
pub use resolve::{Resolver, package_main, package_main_blocking};
pub use vfs::{ArchiveRegistry, ZipFs, split_archive_path};
pub use zip::{
    CompressionMethod, Encoding, EntryStat, FileContents, ReadOptions, Stat, ZipArchive, ZipEntry,
};
