fn main() {
    // Emits the ESP-IDF link environment when building for the device.
    // On host targets there is no esp-idf-sys metadata and this is a no-op.
    embuild::espidf::sysenv::output();
}
