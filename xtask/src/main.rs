use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for primer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all checks: fmt, clippy, tests, doc
    Check,
    /// Run cargo fmt --check on all crates
    Fmt,
    /// Run clippy on all crates
    Clippy,
    /// Run all tests
    Test,
    /// Build rustdoc for the workspace
    Doc,
    /// Build the entire workspace
    Build,
    /// Render every lesson offscreen into a directory
    Smoke {
        #[arg(long, default_value = "target/smoke")]
        out_dir: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check => {
            run_fmt()?;
            run_clippy()?;
            run_tests()?;
            run_doc()?;
        }
        Commands::Fmt => run_fmt()?,
        Commands::Clippy => run_clippy()?,
        Commands::Test => run_tests()?,
        Commands::Doc => run_doc()?,
        Commands::Build => run_build()?,
        Commands::Smoke { out_dir } => run_smoke(&out_dir)?,
    }

    Ok(())
}

fn cargo(step: &str, args: &[&str]) -> Result<()> {
    println!("==> Running cargo {}", args.join(" "));
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("{step} failed");
    }
    Ok(())
}

fn run_fmt() -> Result<()> {
    cargo("cargo fmt check", &["fmt", "--all", "--", "--check"])
}

fn run_clippy() -> Result<()> {
    cargo(
        "cargo clippy",
        &[
            "clippy",
            "--workspace",
            "--all-targets",
            "--",
            "-D",
            "warnings",
        ],
    )
}

fn run_tests() -> Result<()> {
    cargo("cargo test", &["test", "--workspace"])
}

fn run_doc() -> Result<()> {
    cargo("cargo doc", &["doc", "--workspace", "--no-deps"])
}

fn run_build() -> Result<()> {
    cargo("cargo build", &["build", "--workspace"])
}

const LESSONS: [&str; 5] = ["triangle", "camera", "texture", "vertex-buffer", "cube"];

fn run_smoke(out_dir: &str) -> Result<()> {
    std::fs::create_dir_all(out_dir)?;
    for lesson in LESSONS {
        let out = format!("{out_dir}/{lesson}.png");
        cargo(
            &format!("smoke render of {lesson}"),
            &[
                "run",
                "-q",
                "-p",
                "primer-cli",
                "--",
                "render",
                "--example",
                lesson,
                "--time",
                "0.5",
                "--out",
                &out,
            ],
        )?;
    }
    Ok(())
}
