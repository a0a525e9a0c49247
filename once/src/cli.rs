use clap::error::ErrorKind;
use clap::Parser;
use once_core::Invocation;

#[derive(Parser, Debug)]
#[command(
    name = "once",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("CARGO_GIT_SHA"), ")"),
    about = "Run a command, terminating any previous run of it first",
    long_about = "once runs <COMMAND> after sending SIGTERM to the instance it started last time.\n\n\
                  Interrupting once forwards SIGTERM to the command's whole process group.\n\
                  State lives in $ONCE_DIR (default: the user cache directory).\n\n\
                  Arguments after COMMAND are passed through unchanged, but a leading\n\
                  --help, --version or -- is read by once itself: `once -- ls` runs `ls`."
)]
pub struct Cli {
    /// Command to run, followed by its arguments (passed through unchanged)
    #[arg(
        value_name = "COMMAND",
        required = true,
        num_args = 1..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub argv: Vec<String>,
}

impl Cli {
    pub fn into_invocation(self) -> Invocation {
        let mut argv = self.argv.into_iter();
        let command = argv.next().unwrap_or_default();
        Invocation::new(command, argv.collect())
    }
}

/// Parse `std::env::args`. Help and version exit 0; any other usage error
/// exits 1 like every other setup failure.
pub fn parse() -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    }
}
