//! Facts about target platforms that the stages need

/// Executable suffix for binaries on the given os
pub fn exe_suffix(os: &str) -> &'static str {
    if os == "windows" {
        ".exe"
    } else {
        ""
    }
}

/// Strip the executable suffix off a binary name, if it has one
pub fn strip_exe_suffix<'a>(name: &'a str, os: &str) -> &'a str {
    let suffix = exe_suffix(os);
    if suffix.is_empty() {
        name
    } else {
        name.strip_suffix(suffix).unwrap_or(name)
    }
}

/// The architecture name snapcraft uses for a given arch
///
/// Anything we don't know about is passed through unchanged.
pub fn snap_arch(arch: &str) -> &str {
    match arch {
        "amd64" => "amd64",
        "386" => "i386",
        "arm64" => "arm64",
        "arm" => "armhf",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_gets_exe() {
        assert_eq!(exe_suffix("windows"), ".exe");
        assert_eq!(exe_suffix("linux"), "");
        assert_eq!(strip_exe_suffix("myapp.exe", "windows"), "myapp");
        assert_eq!(strip_exe_suffix("myapp.exe", "linux"), "myapp.exe");
    }

    #[test]
    fn snap_arches() {
        assert_eq!(snap_arch("386"), "i386");
        assert_eq!(snap_arch("arm"), "armhf");
        assert_eq!(snap_arch("ppc64le"), "ppc64le");
    }
}
