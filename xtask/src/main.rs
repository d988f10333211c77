//! Development tasks for clipai
//!
//! Usage:
//!   cargo xtask install [--prefix DIR]  Install release binary (default: /usr/local)
//!   cargo xtask uninstall [--prefix DIR] Remove the installed binary
//!   cargo xtask dist                     Build release binary and man pages
//!   cargo xtask man                      Generate man pages into target/man

use std::env;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};

const BINARY: &str = "clipai";

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();

    if args.is_empty() {
        print_help();
        return ExitCode::SUCCESS;
    }

    let prefix = args
        .iter()
        .position(|a| a == "--prefix")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/usr/local"));

    let result = match args[0].as_str() {
        "install" => install(&prefix),
        "uninstall" => uninstall(&prefix),
        "dist" => dist(),
        "man" => man().map(|_| ()),
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_help();
            Err(anyhow::anyhow!("Unknown command"))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_help() {
    eprintln!(
        r#"
clipai development tasks

Usage: cargo xtask <COMMAND> [OPTIONS]

Commands:
  install    Build release binary and install to <prefix>/bin
  uninstall  Remove clipai from <prefix>/bin
  dist       Build optimized release binary and man pages
  man        Generate man pages into target/man

Options:
  --prefix DIR   Install prefix (default: /usr/local, uses sudo when not writable)

Examples:
  cargo xtask install                   # Install to /usr/local/bin
  cargo xtask install --prefix ~/.local # Install without sudo
  cargo xtask uninstall
"#
    );
}

/// Get the project root directory
fn project_root() -> anyhow::Result<PathBuf> {
    let dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => env::current_dir()?,
    };

    // xtask is in a subdirectory, go up one level
    Ok(dir.parent().unwrap_or(&dir).to_path_buf())
}

fn cargo_build_release(root: &Path, envs: &[(&str, &str)]) -> anyhow::Result<PathBuf> {
    let status = Command::new("cargo")
        .args(["build", "--release", "--bin", BINARY])
        .envs(envs.iter().copied())
        .current_dir(root)
        .status()?;

    if !status.success() {
        anyhow::bail!("Build failed");
    }

    let binary = root.join("target/release").join(BINARY);
    if !binary.exists() {
        anyhow::bail!("Binary not found at {:?}", binary);
    }
    Ok(binary)
}

/// Run a command, through sudo when the target directory is not writable
fn run_privileged(program: &str, args: &[&str], target_dir: &Path) -> anyhow::Result<()> {
    let status = if is_writable(target_dir) {
        Command::new(program).args(args).status()?
    } else {
        Command::new("sudo").arg(program).args(args).status()?
    };

    if !status.success() {
        anyhow::bail!("{} failed", program);
    }
    Ok(())
}

/// Whether a file can be created in `dir`
fn is_writable(dir: &Path) -> bool {
    let marker = dir.join(".clipai-xtask-write-test");
    let ok = std::fs::write(&marker, b"").is_ok();
    let _ = std::fs::remove_file(&marker);
    ok
}

/// Build release binary and install to <prefix>/bin
fn install(prefix: &Path) -> anyhow::Result<()> {
    let root = project_root()?;

    println!("==> Building release binary...");
    let binary = cargo_build_release(&root, &[])?;

    let bin_dir = prefix.join("bin");
    let target = bin_dir.join(BINARY);
    println!("==> Installing to {}...", target.display());

    std::fs::create_dir_all(&bin_dir).ok();
    let binary_str = binary.to_string_lossy();
    let target_str = target.to_string_lossy();
    run_privileged("install", &["-m755", &binary_str, &target_str], &bin_dir)?;

    println!("==> Installed successfully!");
    println!();
    println!("Installed: {}", target.display());
    println!("Next: run `clipai setup`");

    // Show version
    let _ = Command::new(&target).arg("--version").status();

    Ok(())
}

/// Remove clipai from <prefix>/bin
fn uninstall(prefix: &Path) -> anyhow::Result<()> {
    let bin_dir = prefix.join("bin");
    let target = bin_dir.join(BINARY);
    println!("==> Removing {}...", target.display());

    let target_str = target.to_string_lossy();
    run_privileged("rm", &["-f", &target_str], &bin_dir)?;

    println!("==> Uninstalled successfully!");
    Ok(())
}

/// Generate man pages and copy them into target/man
fn man() -> anyhow::Result<PathBuf> {
    let root = project_root()?;

    println!("==> Generating man pages...");
    cargo_build_release(&root, &[("CLIPAI_GEN_MANPAGES", "1")])?;

    // build.rs writes into OUT_DIR; collect the newest copy
    let build_dir = root.join("target/release/build");
    let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
    for entry in std::fs::read_dir(&build_dir)? {
        let dir = entry?.path().join("out/man");
        if !dir.join("clipai.1").exists() {
            continue;
        }
        let modified = std::fs::metadata(dir.join("clipai.1"))?.modified()?;
        if newest.as_ref().map_or(true, |(t, _)| modified > *t) {
            newest = Some((modified, dir));
        }
    }

    let Some((_, source)) = newest else {
        anyhow::bail!("No generated man pages found under {:?}", build_dir);
    };

    let dest = root.join("target/man");
    std::fs::create_dir_all(&dest)?;
    for entry in std::fs::read_dir(&source)? {
        let path = entry?.path();
        if let Some(name) = path.file_name() {
            std::fs::copy(&path, dest.join(name))?;
        }
    }

    println!("==> Man pages: {}", dest.display());
    Ok(dest)
}

/// Build optimized release binary for distribution
fn dist() -> anyhow::Result<()> {
    let root = project_root()?;

    println!("==> Building distribution binary...");
    let binary = cargo_build_release(&root, &[])?;
    println!("==> Built: {:?}", binary);

    man()?;

    // Show binary info
    let _ = Command::new("ls").arg("-lh").arg(&binary).status();
    let _ = Command::new(&binary).arg("--version").status();

    Ok(())
}
