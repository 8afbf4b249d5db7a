use std::process::Command;

/// Local fully-qualified hostname, used as the runner name.
///
/// Tries `hostname --fqdn` first, then plain `hostname`, then the HOSTNAME
/// environment variable. Registration needs a stable, non-empty name; the
/// final fallback is "localhost".
pub fn fqdn() -> String {
    for args in [&["--fqdn"][..], &[][..]] {
        if let Ok(output) = Command::new("hostname").args(args).output() {
            if output.status.success() {
                let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !name.is_empty() {
                    return name;
                }
            }
        }
    }
    std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string())
}
