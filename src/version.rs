//! Version and build report printed in verbose/debug mode

/// Commit hash, when provided at build time via `GIT_COMMIT`
const COMMIT: Option<&str> = option_env!("GIT_COMMIT");

/// Branch name, when provided at build time via `GIT_BRANCH`
const BRANCH: Option<&str> = option_env!("GIT_BRANCH");

/// Build timestamp, when provided at build time via `BUILD_TIME`
const BUILD_TIME: Option<&str> = option_env!("BUILD_TIME");

/// Version report; verbose adds build metadata, debug adds platform details
pub fn report(verbose: bool, debug: bool) -> String {
    let mut report = String::new();

    if verbose {
        report.push_str(&format!(
            "{} version: [{}]\n",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        ));
        report.push_str(&format!("- Branch:     [{}]\n", BRANCH.unwrap_or_default()));
        report.push_str(&format!("- Build Time: [{}]\n", BUILD_TIME.unwrap_or_default()));
        report.push_str(&format!("- Commit:     [{}]\n", COMMIT.unwrap_or_default()));
    }

    if debug {
        report.push_str(&format!(
            "- Platform:   [{}-{}]\n",
            std::env::consts::OS,
            std::env::consts::ARCH
        ));
    }

    report
}
