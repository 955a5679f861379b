use std::sync::LazyLock;

use api_types::VersionInfo;

/// Build identity of this broker, checked against clients at registration.
pub static VERSION: LazyLock<VersionInfo> = LazyLock::new(|| VersionInfo {
    major: parse_component(env!("CARGO_PKG_VERSION_MAJOR")),
    minor: parse_component(env!("CARGO_PKG_VERSION_MINOR")),
    patch: parse_component(env!("CARGO_PKG_VERSION_PATCH")),
    build: option_env!("BROKER_BUILD_ID").unwrap_or("dev").to_string(),
    commit: option_env!("BROKER_BUILD_COMMIT")
        .unwrap_or("unknown")
        .to_string(),
    build_date: option_env!("BROKER_BUILD_DATE")
        .unwrap_or("unknown")
        .to_string(),
});

/// Defines the application version string shown by the CLI.
pub static VERSION_STRING: LazyLock<String> = LazyLock::new(|| {
    format!(
        "{}+{}",
        &*VERSION,
        VERSION.commit.get(..7).unwrap_or(&VERSION.commit)
    )
});

fn parse_component(raw: &str) -> u16 {
    raw.parse().expect("cargo version components are numeric")
}
