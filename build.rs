//! Man pages for clipai
//!
//! Renders `clipai.1` plus one page per subcommand (`clipai-tone.1`,
//! `clipai-tone-set.1`, ...) from the clap definitions in `src/cli.rs`.
//! Pages are only built for release profiles or when
//! `CLIPAI_GEN_MANPAGES` is set; `cargo xtask man` collects them from
//! `OUT_DIR/man`.

use clap::CommandFactory;
use clap_mangen::Man;
use std::env;
use std::fs::{self, File};
use std::io::Error;
use std::path::{Path, PathBuf};

include!("src/cli.rs");

/// Write the page for `cmd` as `<stem>.1`, then recurse into its subcommands
fn render_tree(cmd: &clap::Command, stem: &str, dir: &Path) -> Result<(), Error> {
    let mut file = File::create(dir.join(format!("{}.1", stem)))?;
    Man::new(cmd.clone()).render(&mut file)?;

    for sub in cmd.get_subcommands().filter(|s| s.get_name() != "help") {
        render_tree(sub, &format!("{}-{}", stem, sub.get_name()), dir)?;
    }
    Ok(())
}

fn main() -> Result<(), Error> {
    println!("cargo:rerun-if-changed=src/cli.rs");
    println!("cargo:rerun-if-env-changed=CLIPAI_GEN_MANPAGES");

    let release = env::var("PROFILE").is_ok_and(|p| p == "release");
    if !release && env::var_os("CLIPAI_GEN_MANPAGES").is_none() {
        return Ok(());
    }

    let out_dir = env::var_os("OUT_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("target"));
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir)?;

    render_tree(&Cli::command(), "clipai", &man_dir)?;

    println!("cargo:warning=clipai man pages: {}", man_dir.display());
    Ok(())
}
