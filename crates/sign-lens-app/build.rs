//! Embeds the workspace `VERSION` file as `SIGN_LENS_VERSION`.

use std::path::Path;

fn main() {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").expect("cargo sets CARGO_MANIFEST_DIR");
    let version_file = Path::new(&manifest_dir)
        .ancestors()
        .nth(2)
        .expect("app crate lives under <root>/crates/")
        .join("VERSION");

    println!("cargo:rerun-if-changed={}", version_file.display());

    let contents = std::fs::read_to_string(&version_file)
        .unwrap_or_else(|error| panic!("cannot read {}: {error}", version_file.display()));
    let version = contents.trim();
    assert!(
        !version.is_empty() && !version.contains(char::is_whitespace),
        "VERSION must hold a single non-empty token"
    );

    println!("cargo:rustc-env=SIGN_LENS_VERSION={version}");
}
