// build.rs

fn main() {
    // Cocoa links through the objc2 crates; only the X11 backend needs native libraries here.
    let target_os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    if target_os == "macos" {
        return;
    }

    // xcb and x11-xcb back the window/connection wrappers, gl provides the GLX/GL entry points.
    let libraries = ["x11", "x11-xcb", "xcb", "gl"];

    let mut pkg_config_success = true;

    for lib in &libraries {
        if pkg_config::probe_library(lib).is_err() {
            eprintln!(
                "pkg-config failed for library '{}'. Falling back to manual linking.",
                lib
            );
            pkg_config_success = false;
            break;
        }
    }

    if !pkg_config_success {
        // Assumes the libraries live in a standard search path.
        println!("cargo:rustc-link-lib=X11");
        println!("cargo:rustc-link-lib=X11-xcb");
        println!("cargo:rustc-link-lib=xcb");
        println!("cargo:rustc-link-lib=GL");
        println!("cargo:rustc-link-search=/usr/lib");
        eprintln!(
            "Manual linking flags applied. Ensure X11, XCB and OpenGL development libraries are installed."
        );
    } else {
        eprintln!("pkg-config successfully found libraries. Linking configured automatically.");
    }
}
