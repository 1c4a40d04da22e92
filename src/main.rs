fn main() {
    if let Err(e) = askai::cli::main() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
