//! Jailbreak mode classifier. Pure function of package metadata: no I/O,
//! never fails, always returns a value.
use crate::jailbreak::JailbreakMode;

pub trait Classifiable {
    fn rootless_flag(&self) -> &str;
    fn filename(&self) -> &str;
    fn package_id(&self) -> &str;
    fn description(&self) -> &str;
    fn display_name(&self) -> &str;
    fn architecture(&self) -> &str;
    fn depends(&self) -> &str;
}

const ROOTLESS_ONLY_DEPENDS: &[&str] = &["ellekit", "libhooker", "com.ex.substitute", "org.coolstar.libhooker", "com.opa334.altlist"];
const ROOTFUL_STRONG_DEPENDS: &[&str] = &["cydia", "com.saurik", "substrate.safemode"];

/// Runs the prioritized rule cascade against a package's metadata and
/// returns its jailbreak compatibility, or `Unknown` when nothing matches.
pub fn classify(pkg: &impl Classifiable) -> JailbreakMode {
    let rootless_flag = pkg.rootless_flag().to_ascii_lowercase();
    if matches!(rootless_flag.as_str(), "yes" | "true" | "1") {
        return JailbreakMode::Rootless;
    }

    let filename_lower = pkg.filename().to_ascii_lowercase();
    if filename_lower.contains("rootless") {
        return JailbreakMode::Rootless;
    }
    if filename_lower.contains("rootful") {
        return JailbreakMode::Rootful;
    }

    let package_lower = pkg.package_id().to_ascii_lowercase();
    if package_lower.contains("rootless") {
        return JailbreakMode::Rootless;
    }
    if package_lower.contains("rootful") {
        return JailbreakMode::Rootful;
    }

    let desc_lower = pkg.description().to_ascii_lowercase();
    let name_lower = pkg.display_name().to_ascii_lowercase();
    if ["/var/jb", "rootless", "无根"].iter().any(|t| desc_lower.contains(t) || name_lower.contains(t)) {
        return JailbreakMode::Rootless;
    }

    let arch_lower = pkg.architecture().to_ascii_lowercase();
    let is_modern_arch = arch_lower.contains("arm64") || arch_lower.contains("arm64e");
    let depends_lower = pkg.depends().to_ascii_lowercase();

    if ROOTLESS_ONLY_DEPENDS.iter().any(|i| depends_lower.contains(i)) {
        return JailbreakMode::Rootless;
    }

    let has_mobilesubstrate = depends_lower.contains("mobilesubstrate");

    if is_modern_arch && has_mobilesubstrate && !ROOTFUL_STRONG_DEPENDS.iter().any(|i| depends_lower.contains(i)) {
        return JailbreakMode::Rootless;
    }

    if !pkg.architecture().is_empty() && arch_lower.contains("arm") && !arch_lower.contains("arm64") {
        return JailbreakMode::Rootful;
    }

    if has_mobilesubstrate {
        return JailbreakMode::Unknown;
    }

    JailbreakMode::Unknown
}

/// True when a package is safe to install under Rootless: it classifies as
/// Rootless outright, its architecture targets arm64e, or it carries no
/// rootless/rootful signal at all (an absent flag defaults to compatible
/// rather than excluded).
pub fn is_rootless_compatible(pkg: &impl Classifiable) -> bool {
    if classify(pkg) == JailbreakMode::Rootless {
        return true;
    }
    if pkg.architecture().to_ascii_lowercase().contains("arm64e") {
        return true;
    }
    pkg.rootless_flag().is_empty()
}

/// Whether `package_arch` can run on a device reporting `device_arch`,
/// using dpkg's own multiarch-style fallback chain (an unset package
/// architecture is assumed to be compatible with everything).
pub fn is_architecture_compatible(package_arch: &str, device_arch: &str) -> bool {
    if package_arch.is_empty() {
        return true;
    }
    let package_arch = package_arch.to_ascii_lowercase();
    let device_arch = device_arch.to_ascii_lowercase();

    let compatible: &[&str] = match device_arch.as_str() {
        "arm64" => &["iphoneos-arm64", "iphoneos-arm", "all", "any", "darwin-arm64", "darwin-arm"],
        "arm64e" => &["iphoneos-arm64e", "iphoneos-arm64", "iphoneos-arm", "all", "any", "darwin-arm64e", "darwin-arm64", "darwin-arm"],
        "armv7" | "armv7s" => &["iphoneos-arm", "all", "any", "darwin-arm"],
        _ => &[],
    };
    if compatible.is_empty() {
        return package_arch.contains(device_arch.as_str());
    }
    compatible.iter().any(|arch| package_arch.contains(arch))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    struct Fixture {
        rootless: &'static str,
        filename: &'static str,
        package: &'static str,
        description: &'static str,
        name: &'static str,
        architecture: &'static str,
        depends: &'static str,
    }

    impl Classifiable for Fixture {
        fn rootless_flag(&self) -> &str { self.rootless }
        fn filename(&self) -> &str { self.filename }
        fn package_id(&self) -> &str { self.package }
        fn description(&self) -> &str { self.description }
        fn display_name(&self) -> &str { self.name }
        fn architecture(&self) -> &str { self.architecture }
        fn depends(&self) -> &str { self.depends }
    }

    const EMPTY: Fixture = Fixture { rootless: "", filename: "", package: "", description: "", name: "", architecture: "", depends: "" };

    #[rstest]
    #[case(Fixture { rootless: "yes", ..EMPTY }, JailbreakMode::Rootless)]
    #[case(Fixture { filename: "tweak_rootless_iphoneos-arm64.deb", ..EMPTY }, JailbreakMode::Rootless)]
    #[case(Fixture { filename: "tweak_rootful.deb", ..EMPTY }, JailbreakMode::Rootful)]
    #[case(Fixture { package: "com.example.rootless", ..EMPTY }, JailbreakMode::Rootless)]
    #[case(Fixture { description: "requires /var/jb to function", ..EMPTY }, JailbreakMode::Rootless)]
    #[case(Fixture { name: "无根工具", ..EMPTY }, JailbreakMode::Rootless)]
    #[case(Fixture { depends: "ellekit", ..EMPTY }, JailbreakMode::Rootless)]
    #[case(Fixture { architecture: "iphoneos-arm64", depends: "mobilesubstrate", ..EMPTY }, JailbreakMode::Rootless)]
    #[case(Fixture { architecture: "iphoneos-arm64", depends: "mobilesubstrate, com.saurik.substrate", ..EMPTY }, JailbreakMode::Unknown)]
    #[case(Fixture { architecture: "iphoneos-arm", depends: "", ..EMPTY }, JailbreakMode::Rootful)]
    #[case(Fixture { depends: "mobilesubstrate", ..EMPTY }, JailbreakMode::Unknown)]
    #[case(EMPTY, JailbreakMode::Unknown)]
    fn cascade(#[case] pkg: Fixture, #[case] expected: JailbreakMode) {
        assert_eq!(classify(&pkg), expected);
    }

    #[rstest]
    #[case(Fixture { rootless: "yes", ..EMPTY }, true)]
    #[case(Fixture { architecture: "iphoneos-arm64e", depends: "mobilesubstrate, com.saurik.substrate", ..EMPTY }, true)]
    #[case(EMPTY, true)]
    #[case(Fixture { architecture: "iphoneos-arm", depends: "", rootless: "no", ..EMPTY }, false)]
    fn rootless_compatibility(#[case] pkg: Fixture, #[case] expected: bool) {
        assert_eq!(is_rootless_compatible(&pkg), expected);
    }

    #[test]
    fn arch_compatibility_matrix() {
        assert!(is_architecture_compatible("iphoneos-arm64", "arm64"));
        assert!(is_architecture_compatible("all", "arm64e"));
        assert!(!is_architecture_compatible("iphoneos-arm64e", "armv7"));
        assert!(is_architecture_compatible("", "arm64"));
    }
}
