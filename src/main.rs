//! Main entry point for the zipvfs CLI application.
//!
//! Reads paths that may reach into ZIP archives through the [`ZipFs`]
//! facade, falling back to the host filesystem like the library does.

use anyhow::{Context, Result, bail};
use clap::Parser;
use tokio::io::AsyncWriteExt;

use zipvfs::{Cli, Stat, ZipFs, path};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_filter()))
        .init();

    let fs = ZipFs::new();
    let result = run(&fs, &cli).await;
    fs.registry().close_all()?;
    result
}

async fn run(fs: &ZipFs, cli: &Cli) -> Result<()> {
    if cli.resolve {
        match fs.resolve(&cli.path).await? {
            Some(found) => println!("{}", found),
            None => bail!("Cannot resolve {}", cli.path),
        }
        return Ok(());
    }

    if cli.stat {
        let stat = fs
            .stat(&cli.path)
            .await
            .with_context(|| format!("Couldn't stat {}", cli.path))?;
        print_stat(&cli.path, &stat);
        return Ok(());
    }

    if cli.is_listing() || (!cli.pipe && fs.is_dir(&cli.path).await?) {
        return list_dir(fs, &cli.path, cli.verbose).await;
    }

    let data = fs
        .read_file(&cli.path)
        .await
        .with_context(|| format!("Couldn't read {}", cli.path))?;
    let mut stdout = tokio::io::stdout();
    stdout.write_all(&data).await?;
    stdout.flush().await?;
    Ok(())
}

fn print_stat(path: &str, stat: &Stat) {
    match stat {
        Stat::Entry(e) => {
            let (year, month, day, hour, minute, second) = e.modified;
            println!("  Name: {}", e.name);
            println!("  Type: {}", if e.is_directory { "directory" } else { "file" });
            println!("  Size: {}", e.size);
            println!("Packed: {}", e.compressed_size);
            println!("Method: {}", e.compression_method.as_u16());
            println!(" CRC32: {:08x}", e.crc32);
            println!("  Date: {year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}");
        }
        Stat::ImpliedDir { name } => {
            println!("  Name: {}", name);
            println!("  Type: directory (implied)");
        }
        Stat::Host { exists } => {
            println!("{}: host path, {}", path, if *exists { "exists" } else { "missing" });
        }
    }
}

/// List a directory, one name per line or as a table in verbose mode.
async fn list_dir(fs: &ZipFs, dir: &str, verbose: bool) -> Result<()> {
    let names = fs
        .readdir(dir)
        .await
        .with_context(|| format!("Couldn't list {}", dir))?;

    if !verbose {
        for name in &names {
            println!("{}", name);
        }
        return Ok(());
    }

    // Print table header for verbose output
    println!(
        "{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  Name",
        "Length", "Size", "Cmpr", "Date", "Time"
    );
    println!("{}", "-".repeat(70));

    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;
    for name in &names {
        let child = path::join(dir, name);
        match fs.stat(&child).await? {
            Stat::Entry(e) => {
                let (year, month, day, hour, minute, _) = e.modified;
                let suffix = if e.is_directory { "/" } else { "" };
                println!(
                    "{:>10}  {:>10}  {}  {:04}-{:02}-{:02}  {:02}:{:02}  {}{}",
                    e.size,
                    e.compressed_size,
                    ratio(e.compressed_size, e.size),
                    year,
                    month,
                    day,
                    hour,
                    minute,
                    name,
                    suffix
                );
                if !e.is_directory {
                    total_uncompressed += e.size;
                    total_compressed += e.compressed_size;
                }
            }
            Stat::ImpliedDir { .. } => {
                println!("{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  {}/", "", "", "", "", "", name);
            }
            Stat::Host { .. } => {
                // Host files carry no ZIP metadata.
                println!("{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  {}", "", "", "", "", "", name);
            }
        }
    }

    println!("{}", "-".repeat(70));
    println!(
        "{:>10}  {:>10}  {}  {:>19}  {} entries",
        total_uncompressed,
        total_compressed,
        ratio(total_compressed, total_uncompressed),
        "",
        names.len()
    );
    Ok(())
}

/// Compression ratio as percentage saved
fn ratio(compressed: u64, uncompressed: u64) -> String {
    if uncompressed > 0 && compressed <= uncompressed {
        format!("{:>4}%", 100 - (compressed * 100 / uncompressed))
    } else {
        "  0%".to_string()
    }
}
