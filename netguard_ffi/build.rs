//! 生成 C 头文件 include/netguard.h

use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=src/lib.rs");

    let crate_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => return,
    };

    let mut config = cbindgen::Config::default();
    config.language = cbindgen::Language::C;
    config.include_guard = Some("NETGUARD_H".to_string());

    // 头文件生成失败不影响库本身的构建
    match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_config(config)
        .generate()
    {
        Ok(bindings) => {
            bindings.write_to_file(crate_dir.join("include").join("netguard.h"));
        }
        Err(e) => {
            println!("cargo:warning=cbindgen failed: {}", e);
        }
    }
}
