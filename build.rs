fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // ESP-IDF link arguments are only needed for the firmware image;
    // host builds and tests skip the ESP-IDF environment entirely.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
