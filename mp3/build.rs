fn main() {
    // libmp3lame is only needed by the native engine.
    if std::env::var_os("CARGO_FEATURE_LAME").is_none() {
        return;
    }

    println!("cargo:rustc-link-search=native=/opt/homebrew/lib");
    println!("cargo:rustc-link-lib=mp3lame");
}
