use std::path::Path;

// Bakes the workspace `VERSION` file into the binary as TICKET_GATE_VERSION.
fn main() {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").expect("cargo sets CARGO_MANIFEST_DIR");
    let version_file = Path::new(&manifest_dir)
        .ancestors()
        .nth(2)
        .map(|root| root.join("VERSION"))
        .expect("app crate lives two levels below the workspace root");
    println!("cargo:rerun-if-changed={}", version_file.display());

    let version = std::fs::read_to_string(&version_file)
        .unwrap_or_else(|error| panic!("cannot read {}: {error}", version_file.display()));
    let version = version.trim();
    if version.is_empty() {
        panic!("{} is empty", version_file.display());
    }
    println!("cargo:rustc-env=TICKET_GATE_VERSION={version}");
}
