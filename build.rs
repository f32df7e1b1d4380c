fn main() {
    // Host-target test builds carry no ESP-IDF toolchain; only emit the
    // esp-idf link/env plumbing when the espidf feature is enabled.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
