use clap::Parser;
use std::path::PathBuf;

use mpfs2_extract::{formats, AppContext, Strictness};

#[derive(Parser, Debug)]
#[command(about = "Extract files from a Microchip Proprietary File System (MPFS2) image")]
struct Args {
    input_target: PathBuf,

    /// be verbose
    #[arg(short, long)]
    verbose: bool,

    /// extract files
    #[arg(short = 'x', long)]
    extract: bool,

    /// list files
    #[arg(short, long)]
    list: bool,

    /// list dynamic variables
    #[arg(short = 'V', long)]
    variables: bool,

    /// directory to extract files
    #[arg(short = 'd', long, default_value = "export")]
    extract_dir: PathBuf,

    /// stop at the first bad record instead of reporting it and going on
    #[arg(long)]
    strict: bool,

    /// extra options (dump_index, dump_tables)
    #[arg(short = 'o', long = "option")]
    options: Vec<String>,
}

fn main() {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("warn"));
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let app_ctx = AppContext {
        input_path: args.input_target,
        output_dir: args.extract_dir,
        options: args.options,
        strictness: if args.strict { Strictness::FailFast } else { Strictness::Lenient },
        list: args.list,
        verbose: args.verbose,
        extract: args.extract,
        variables: args.variables,
    };

    if app_ctx.file().is_none() {
        return Err(format!("Cannot open {}", app_ctx.input_path.display()).into());
    }

    for format in formats::get_registry() {
        if let Some(ctx) = (format.detector_func)(&app_ctx)? {
            log::info!("{} file detected", format.name);
            return (format.extractor_func)(&app_ctx, ctx);
        }
    }

    Err("File is not a MPFS filesystem".into())
}
