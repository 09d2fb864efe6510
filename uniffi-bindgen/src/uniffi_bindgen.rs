//! Generates the Swift and Kotlin bindings for `walletpass-core`.

fn main() {
    uniffi::uniffi_bindgen_main();
}
