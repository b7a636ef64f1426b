use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "zipvfs")]
#[command(version)]
#[command(about = "Browse ZIP archives as if they were directories", long_about = None)]
#[command(after_help = "Examples:\n  \
  zipvfs -l bundle.zip/lib               list the lib directory inside bundle.zip\n  \
  zipvfs -p bundle.zip/lib/index.js      print an entry\n  \
  zipvfs -r bundle.zip/node_modules/foo  resolve a module entry file")]
pub struct Cli {
    /// Path, optionally reaching into a .zip file (e.g. app.zip/lib/a.js)
    #[arg(value_name = "PATH")]
    pub path: String,

    /// List directory contents
    #[arg(short = 'l')]
    pub list: bool,

    /// List verbosely (size, compression, date)
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Print file contents to stdout
    #[arg(short = 'p')]
    pub pipe: bool,

    /// Show entry metadata
    #[arg(short = 's')]
    pub stat: bool,

    /// Resolve a module request to its entry file
    #[arg(short = 'r')]
    pub resolve: bool,

    /// Debug logging (-dd => trace)
    #[arg(short = 'd', action = clap::ArgAction::Count)]
    pub debug: u8,
}

impl Cli {
    pub fn is_listing(&self) -> bool {
        self.list || self.verbose
    }

    pub fn log_filter(&self) -> &'static str {
        match self.debug {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }
}
