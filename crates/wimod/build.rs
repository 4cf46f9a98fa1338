use std::process::Command;

fn main() {
    for (var, key) in [("TARGET", "WIMOD_BUILD_TARGET"), ("PROFILE", "WIMOD_BUILD_PROFILE")] {
        if let Ok(value) = std::env::var(var) {
            println!("cargo:rustc-env={key}={value}");
        }
        println!("cargo:rerun-if-env-changed={var}");
    }

    // Best effort: builds from a source tarball have no git metadata.
    let hash = Command::new("git")
        .args(["rev-parse", "--short=12", "HEAD"])
        .output()
        .ok()
        .filter(|out| out.status.success())
        .and_then(|out| String::from_utf8(out.stdout).ok());
    if let Some(hash) = hash {
        println!("cargo:rustc-env=WIMOD_GIT_HASH={}", hash.trim());
    }
}
