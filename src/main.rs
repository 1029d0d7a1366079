/// Native entry point: headless viewer that exports annotation layers as SVG.
#[cfg(not(target_arch = "wasm32"))]
fn main() {
    if let Err(e) = heiv::native::run() {
        eprintln!("heiv: {}", e);
        std::process::exit(1);
    }
}

// WASM doesn't use main(), it uses wasm_bindgen's start function
#[cfg(target_arch = "wasm32")]
fn main() {}
