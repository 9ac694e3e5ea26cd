//! Build-time version stamping shared by every binary crate. A binary's own
//! `build.rs` calls [`build`]; the resulting env vars are read back at
//! runtime through the [`version`] macro.

use std::path::Path;
use std::process::Command;

/// Call from a binary crate's `build.rs`.
pub fn build() {
    println!(
        "cargo:rustc-env=FLEET_BUILD_USER={}",
        option_env!("USER").unwrap_or_default()
    );
    println!(
        "cargo:rustc-env=FLEET_BUILD_HOSTNAME={}",
        option_env!("HOSTNAME").unwrap_or_default()
    );
    println!(
        "cargo:rustc-env=FLEET_BUILD_DATE={}",
        run("date", &["-u", "+%Y-%m-%dT%H:%M:%SZ"])
    );
    println!(
        "cargo:rustc-env=FLEET_BUILD_RUSTC_VERSION={}",
        run(option_env!("RUSTC").unwrap_or("rustc"), &["--version"])
    );

    let can_git = Command::new("git")
        .args(["rev-parse"])
        .status()
        .map(|s| s.success())
        .unwrap_or(false);
    if !can_git {
        println!("cargo:warning=No git, version will be blank");
        println!("cargo:rustc-env=FLEET_BUILD_GIT_TAG=");
        println!("cargo:rustc-env=FLEET_BUILD_GIT_HASH=");
        return;
    }

    git_allow();

    let sha = option_env!("CI_COMMIT_SHORT_SHA")
        .map(String::from)
        .unwrap_or_else(|| run("git", &["rev-parse", "--short=8", "HEAD"]));
    println!("cargo:rustc-env=FLEET_BUILD_GIT_HASH={sha}");

    let build_version = option_env!("VERSION").map(String::from).unwrap_or_else(|| {
        run(
            "git",
            &["describe", "--tags", "--first-parent", "--always", "--long"],
        )
    });
    println!("cargo:rustc-env=FLEET_BUILD_GIT_TAG={build_version}");

    if std::env::var("FLEET_VERSION_AVOID_REBUILD").is_err() {
        let git_query_head =
            run("git", &["rev-parse", "--path-format=absolute", "--git-dir"]) + "/HEAD";
        let git_head = if Path::new(&git_query_head).exists() {
            git_query_head
        } else {
            concat!(env!("CARGO_MANIFEST_DIR"), "/../../.git/HEAD").to_string()
        };
        if Path::new(&git_head).exists() {
            println!("cargo:rerun-if-changed={git_head}");
        }
    }
}

/// git exits 128 "detected dubious ownership" inside containers; work
/// around it once rather than failing every build.
fn git_allow() {
    match Command::new("git").arg("status").status() {
        Err(err) => println!("cargo:warning=build.rs error running 'git status': {err}."),
        Ok(status) => {
            if status.code() == Some(128) {
                git_mark_safe_directory();
            }
        }
    }
}

fn git_mark_safe_directory() {
    let repo_root = option_env!("REPO_ROOT").unwrap_or("*");
    run("git", &["config", "--global", "--add", "safe.directory", repo_root]);
}

fn run(cmd: &str, args: &[&str]) -> String {
    let output = match Command::new(cmd).args(args).output() {
        Ok(output) => {
            if !output.status.success() {
                println!(
                    "cargo:warning=build.rs failed running '{cmd} {}': '{output:?}'",
                    args.join(" ")
                );
                return String::new();
            }
            output
        }
        Err(err) => {
            println!("cargo:warning=build.rs error running '{cmd} {}': {err}.", args.join(" "));
            return String::new();
        }
    };
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Individual parts of the version. Usage: `fleet_version::v!(build_version)`.
/// Expands to an empty `&str` if that part isn't present.
#[macro_export]
macro_rules! v {
    (build_version) => {
        option_env!("FLEET_BUILD_GIT_TAG").unwrap_or_default()
    };
    (build_date) => {
        option_env!("FLEET_BUILD_DATE").unwrap_or_default()
    };
    (git_sha) => {
        option_env!("FLEET_BUILD_GIT_HASH").unwrap_or_default()
    };
    (rust_version) => {
        option_env!("FLEET_BUILD_RUSTC_VERSION").unwrap_or_default()
    };
    (build_user) => {
        option_env!("FLEET_BUILD_USER").unwrap_or_default()
    };
    (build_hostname) => {
        option_env!("FLEET_BUILD_HOSTNAME").unwrap_or_default()
    };
}

/// Full version string, suitable for `--version` output.
#[macro_export]
macro_rules! version {
    () => {
        format!(
            "build_version={}, build_date={}, git_sha={}, rust_version={}, build_user={}, build_hostname={}",
            option_env!("FLEET_BUILD_GIT_TAG").unwrap_or_default(),
            option_env!("FLEET_BUILD_DATE").unwrap_or_default(),
            option_env!("FLEET_BUILD_GIT_HASH").unwrap_or_default(),
            option_env!("FLEET_BUILD_RUSTC_VERSION").unwrap_or_default(),
            option_env!("FLEET_BUILD_USER").unwrap_or_default(),
            option_env!("FLEET_BUILD_HOSTNAME").unwrap_or_default(),
        )
    };
}
