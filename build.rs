fn main() {
    // Bake a default backend URL into the binary when one is given at build time
    match std::env::var("AIBREWER_BACKEND_URL") {
        Ok(url) if !url.trim().is_empty() => {
            println!("cargo:rustc-env=DEFAULT_BACKEND_URL={}", url.trim());
        }
        _ => {
            println!("cargo:rustc-env=DEFAULT_BACKEND_URL=");
        }
    }

    // Re-run build script if AIBREWER_BACKEND_URL changes
    println!("cargo:rerun-if-env-changed=AIBREWER_BACKEND_URL");

    tauri_build::build()
}
