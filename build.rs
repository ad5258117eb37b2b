// Build script: embeds the build timestamp and git revision into the binary
// so the startup banner can report what is actually running.

use std::{fs, path::Path, process::Command, time::SystemTime};

fn main() {
    let now = SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis();
    println!("cargo:rustc-env=BUILD_TIME={}", now);

    println!("cargo:rerun-if-changed=.git/HEAD");
    if Path::new(".git/refs/heads").exists() {
        println!("cargo:rerun-if-changed=.git/refs/heads");
    }

    let (branch, commit) = git_info();
    println!("cargo:rustc-env=GIT_BRANCH={}", branch);
    println!("cargo:rustc-env=GIT_COMMIT={}", commit);
}

fn git_info() -> (String, String) {
    let mut branch = git(&["rev-parse", "--abbrev-ref", "HEAD"]);
    let mut commit = git(&["rev-parse", "HEAD"]);

    // No git CLI available: parse .git/HEAD by hand.
    if branch.is_none() || commit.is_none() {
        if let Ok(head) = fs::read_to_string(".git/HEAD") {
            if let Some(ref_path) = head.strip_prefix("ref: ") {
                let ref_path = ref_path.trim();
                branch = branch.or_else(|| ref_path.rsplit('/').next().map(str::to_string));
                commit = commit.or_else(|| {
                    fs::read_to_string(format!(".git/{}", ref_path))
                        .ok()
                        .map(|s| s.trim().to_string())
                });
            } else {
                commit = commit.or_else(|| Some(head.trim().to_string()));
            }
        }
    }

    (
        branch.unwrap_or_else(|| "unknown".into()),
        commit.unwrap_or_else(|| "unknown".into()),
    )
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let s = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!s.is_empty()).then_some(s)
}
