use std::process::Command;

/// Runs `git` and returns trimmed stdout, or `None` outside a checkout.
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|s| s.trim().to_string())
}

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");
    println!("cargo:rerun-if-changed=.git/refs/tags");
    println!("cargo:rerun-if-env-changed=STOCK_RELEASE_BUILD");

    let hash = git(&["rev-parse", "--short", "HEAD"]).unwrap_or_default();
    let commit_date =
        git(&["log", "-1", "--format=%cd", "--date=format:%Y-%m-%d %H:%M"]).unwrap_or_default();

    // Packaged tarballs have no .git, so packagers can force the release banner.
    let forced = std::env::var("STOCK_RELEASE_BUILD").is_ok_and(|v| v == "1");

    let version = env!("CARGO_PKG_VERSION");
    let release_tag = format!("v{}", version);
    let tagged = git(&["tag", "--points-at", "HEAD"])
        .is_some_and(|tags| tags.lines().any(|tag| tag == release_tag));
    let clean = git(&["status", "--porcelain"]).is_some_and(|s| s.is_empty());

    let is_release = forced || (tagged && clean);

    println!("cargo:rustc-env=GIT_HASH={}", hash);
    println!("cargo:rustc-env=GIT_COMMIT_DATE={}", commit_date);
    println!("cargo:rustc-env=IS_RELEASE={}", is_release);
}
