fn main() {
    // Emits the ESP-IDF environment for espidf targets; a no-op when the
    // cached environment is absent (host builds and tests).
    embuild::espidf::sysenv::output();
}
