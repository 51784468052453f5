use std::path::PathBuf;

// Ship the engine settings next to the produced executable so the sandbox
// starts up without manual setup.
fn main() {
    println!("cargo:rerun-if-changed=Kestrel.ini");

    let out_dir = PathBuf::from(std::env::var("OUT_DIR").unwrap());

    // OUT_DIR is target/<profile>/build/<pkg>-<hash>/out; the executable
    // lands three levels up
    if let Some(profile_dir) = out_dir.ancestors().nth(3) {
        if let Err(err) = std::fs::copy("Kestrel.ini", profile_dir.join("Kestrel.ini")) {
            println!("cargo:warning=Failed to copy Kestrel.ini next to the executable: {}", err);
        }
    }
}
