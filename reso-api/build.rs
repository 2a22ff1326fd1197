//! Embeds build identification for the startup banner
//!
//! `GIT_HASH` comes from `RESO_GIT_HASH` when set (release images are built
//! outside a checkout), otherwise from `git rev-parse`.

use std::process::Command;

fn git_hash() -> Option<String> {
    if let Ok(hash) = std::env::var("RESO_GIT_HASH") {
        let hash = hash.trim().to_string();
        if !hash.is_empty() {
            return Some(hash);
        }
    }

    let output = Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|s| s.trim().to_string())
}

fn main() {
    let hash = git_hash().unwrap_or_else(|| "unknown".to_string());
    let built_at = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=GIT_HASH={}", hash);
    println!("cargo:rustc-env=BUILD_TIMESTAMP={}", built_at);
    println!("cargo:rustc-env=BUILD_PROFILE={}", profile);
    println!("cargo:rerun-if-env-changed=RESO_GIT_HASH");
}
