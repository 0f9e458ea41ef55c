// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn flag(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).action(ArgAction::SetTrue).help(help)
}

fn value(name: &'static str, value_name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).value_name(value_name).help(help)
}

fn build_cli() -> Command {
    Command::new("firmirror")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Firmirror Contributors")
        .about("Mirror vendor firmware into an LVFS-compatible repository")
        .subcommand_required(true)
        .subcommand(
            Command::new("refresh")
                .about("Refresh all the firmware from the vendor repositories")
                .long_about(
                    "Refresh all the firmware from the vendor repositories. Firmware already in \
                     the repository is never replaced, even if the vendor pushed an updated file \
                     under the same name; delete it from the repository to fetch it again.",
                )
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .value_name("FILE")
                        .help("TOML configuration file; flags override its values"),
                )
                .arg(
                    Arg::new("output-dir")
                        .short('o')
                        .long("output-dir")
                        .value_name("DIR")
                        .help("Output directory for the repository (ignored when using S3)"),
                )
                .arg(value("cache-dir", "DIR", "Directory for temporary per-firmware work files"))
                .arg(flag("dell-enable", "Enable Dell firmware fetching"))
                .arg(value("dell-machines-id", "ID", "System IDs to fetch firmware for (\"0C60\"), or \"*\" for all"))
                .arg(flag("hpe-enable", "Enable HPE firmware fetching"))
                .arg(
                    value("hpe-gens", "GEN", "Server generations to fetch firmware for")
                        .value_parser(["gen10", "gen11", "gen12"]),
                )
                .arg(flag("s3-enable", "Use the S3 backend instead of the local filesystem"))
                .arg(value("s3-bucket", "BUCKET", "Bucket for the repository files"))
                .arg(value("s3-prefix", "PREFIX", "Prefix for all object keys"))
                .arg(value("s3-region", "REGION", "AWS region"))
                .arg(value("s3-endpoint", "URL", "Custom endpoint URL for S3-compatible services"))
                .arg(value("sign-certificate", "FILE", "Certificate for signing metadata"))
                .arg(value("sign-private-key", "FILE", "Private key for signing metadata")),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "elvish", "fish", "powershell", "zsh"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory - use CARGO_MANIFEST_DIR which is always set by cargo
    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = manifest_dir.join("man").join("firmirror.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
