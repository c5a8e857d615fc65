fn main() {
    if let Err(err) = stylemap::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
