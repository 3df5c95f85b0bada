use std::env;
use std::fs;
use std::io;
use std::path::Path;

fn main() -> io::Result<()> {
    println!("cargo:rerun-if-changed=resources/Info.plist");

    // Bundle resources land next to the build output for app packaging
    let out_dir = env::var("OUT_DIR").map_err(|e| io::Error::new(io::ErrorKind::NotFound, e))?;
    let resources_dir = Path::new("resources");

    if resources_dir.exists() {
        let target_dir = Path::new(&out_dir).join("resources");
        fs::create_dir_all(&target_dir)?;

        for entry in fs::read_dir(resources_dir)? {
            let entry = entry?;
            fs::copy(entry.path(), target_dir.join(entry.file_name()))?;
        }
    }

    println!("cargo:rustc-env=MACOSX_DEPLOYMENT_TARGET=12.0");
    Ok(())
}
